//! Voiceprint persistence: one embedding per user.

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::InMemoryStore;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The enrolled voice embedding of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voiceprint {
    pub user_id: String,
    pub embedding: Vec<f32>,
    pub updated_at: DateTime<Utc>,
}

impl Voiceprint {
    pub fn new(user_id: &str, embedding: Vec<f32>) -> Self {
        Self {
            user_id: user_id.to_string(),
            embedding,
            updated_at: Utc::now(),
        }
    }
}

/// Keyed store of voiceprints.
///
/// `get` and `upsert` report storage failures so callers can tell "not
/// enrolled" apart from "store broken". `exists` and `delete` fail safe:
/// storage errors are logged and reported as `false`.
pub trait VoiceprintStore: Send + Sync {
    fn get(&self, user_id: &str) -> Result<Option<Voiceprint>>;

    /// Create or overwrite the voiceprint for `user_id` as one atomic step.
    fn upsert(&self, user_id: &str, embedding: Vec<f32>) -> Result<Voiceprint>;

    fn exists(&self, user_id: &str) -> bool {
        match self.get(user_id) {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::error!(user_id, error = %e, "voiceprint lookup failed");
                false
            }
        }
    }

    /// Remove the voiceprint; `true` only if one was deleted.
    fn delete(&self, user_id: &str) -> bool;
}

impl<T: VoiceprintStore + ?Sized> VoiceprintStore for std::sync::Arc<T> {
    fn get(&self, user_id: &str) -> Result<Option<Voiceprint>> {
        (**self).get(user_id)
    }

    fn upsert(&self, user_id: &str, embedding: Vec<f32>) -> Result<Voiceprint> {
        (**self).upsert(user_id, embedding)
    }

    fn exists(&self, user_id: &str) -> bool {
        (**self).exists(user_id)
    }

    fn delete(&self, user_id: &str) -> bool {
        (**self).delete(user_id)
    }
}
