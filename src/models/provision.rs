//! Locating the speaker encoder artifact.

use crate::config::EmbeddingConfig;
use crate::error::{Result, VoiceAuthError};
use std::fmt;
use std::path::PathBuf;

/// Where the speaker encoder weights come from.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingSource {
    /// A local ONNX file configured explicitly.
    Local(PathBuf),
    /// A file in a Hugging Face Hub model repository, cached on first download.
    Hub {
        repo: String,
        filename: String,
        cache_dir: Option<PathBuf>,
    },
}

impl EmbeddingSource {
    /// An explicit `model_path` wins over the hub coordinates.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        match &config.model_path {
            Some(path) => Self::Local(path.clone()),
            None => Self::Hub {
                repo: config.hf_repo.clone(),
                filename: config.hf_filename.clone(),
                cache_dir: config.cache_dir.clone(),
            },
        }
    }

    /// Resolve to a file on disk, downloading it when needed.
    ///
    /// A missing local file is a configuration error; a failed download is an
    /// `EmbeddingProvisioning` error.
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            Self::Local(path) => {
                if path.exists() {
                    Ok(path.clone())
                } else {
                    Err(VoiceAuthError::EmbeddingModelNotFound {
                        path: path.to_string_lossy().to_string(),
                    })
                }
            }
            Self::Hub {
                repo,
                filename,
                cache_dir,
            } => fetch_from_hub(repo, filename, cache_dir.as_ref()),
        }
    }
}

impl fmt::Display for EmbeddingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Hub { repo, filename, .. } => write!(f, "hf://{}/{}", repo, filename),
        }
    }
}

#[cfg(feature = "model-download")]
fn fetch_from_hub(repo: &str, filename: &str, cache_dir: Option<&PathBuf>) -> Result<PathBuf> {
    use hf_hub::api::sync::ApiBuilder;

    let provisioning = |message: String| VoiceAuthError::EmbeddingProvisioning { message };

    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir.clone());
    }
    let api = builder
        .build()
        .map_err(|e| provisioning(format!("HF Hub API init: {e}")))?;

    tracing::info!(repo, filename, "fetching speaker encoder from Hugging Face Hub");
    api.model(repo.to_string())
        .get(filename)
        .map_err(|e| provisioning(format!("download {repo}/{filename}: {e}")))
}

#[cfg(not(feature = "model-download"))]
fn fetch_from_hub(repo: &str, filename: &str, _cache_dir: Option<&PathBuf>) -> Result<PathBuf> {
    Err(VoiceAuthError::EmbeddingProvisioning {
        message: format!(
            "cannot fetch {repo}/{filename}: built without the model-download feature; \
             set embedding.model_path to a local ONNX file"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let config = EmbeddingConfig {
            model_path: Some(PathBuf::from("/models/ecapa.onnx")),
            ..EmbeddingConfig::default()
        };
        assert_eq!(
            EmbeddingSource::from_config(&config),
            EmbeddingSource::Local(PathBuf::from("/models/ecapa.onnx"))
        );
    }

    #[test]
    fn default_source_is_the_hub() {
        let source = EmbeddingSource::from_config(&EmbeddingConfig::default());
        match &source {
            EmbeddingSource::Hub { repo, filename, .. } => {
                assert_eq!(repo, crate::defaults::EMBEDDING_HF_REPO);
                assert_eq!(filename, crate::defaults::EMBEDDING_HF_FILENAME);
            }
            other => panic!("Expected hub source, got {:?}", other),
        }
        assert!(source.to_string().starts_with("hf://Wespeaker/"));
    }

    #[test]
    fn missing_local_file_is_configuration_error() {
        let err = EmbeddingSource::Local(PathBuf::from("/nonexistent/ecapa.onnx"))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, VoiceAuthError::EmbeddingModelNotFound { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn existing_local_file_resolves() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = EmbeddingSource::Local(file.path().to_path_buf());
        assert_eq!(source.resolve().unwrap(), file.path());
    }
}
