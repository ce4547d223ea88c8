//! Once-only model loading shared across threads.

use crate::error::Result;
use once_cell::sync::OnceCell;
use std::time::Instant;

type Loader<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

/// A model handle that is loaded on first use and at most once.
///
/// Concurrent first callers block on a single initializer. A failed load
/// leaves the cell empty so a later call retries.
pub struct LazyModel<T> {
    name: String,
    cell: OnceCell<T>,
    loader: Loader<T>,
}

impl<T> LazyModel<T> {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            cell: OnceCell::new(),
            loader: Box::new(loader),
        }
    }

    /// Wrap an already-built model.
    pub fn ready(name: impl Into<String>, model: T) -> Self {
        Self {
            name: name.into(),
            cell: OnceCell::with_value(model),
            loader: Box::new(|| {
                Err(crate::error::VoiceAuthError::Other(
                    "preloaded model has no loader".to_string(),
                ))
            }),
        }
    }

    pub fn get(&self) -> Result<&T> {
        self.cell.get_or_try_init(|| {
            tracing::info!(model = %self.name, "loading model");
            let start = Instant::now();
            let model = (self.loader)();
            match &model {
                Ok(_) => tracing::info!(
                    model = %self.name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "model loaded"
                ),
                Err(e) => tracing::error!(model = %self.name, error = %e, "model load failed"),
            }
            model
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Force the load now instead of on the first request.
    pub fn preload(&self) -> Result<()> {
        self.get().map(|_| ())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> std::fmt::Debug for LazyModel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyModel")
            .field("name", &self.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
