//! Voiceprints persisted as a single JSON document.
//!
//! Every mutation rewrites the whole file through a temp file in the same
//! directory followed by a rename, so readers never observe a partial write.

use crate::error::{Result, VoiceAuthError};
use crate::store::{Voiceprint, VoiceprintStore};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    voiceprints: Vec<Voiceprint>,
}

/// File-backed store. One in-process lock serializes each read-modify-write;
/// across processes the last writer wins.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable or corrupt one is `StoreUnavailable`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };
        let file = store.read_file()?;
        tracing::debug!(
            path = %store.path.display(),
            voiceprints = file.voiceprints.len(),
            "opened voiceprint store"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identities with an enrolled voiceprint, in file order.
    pub fn user_ids(&self) -> Result<Vec<String>> {
        let _guard = self.guard()?;
        Ok(self
            .read_file()?
            .voiceprints
            .into_iter()
            .map(|v| v.user_id)
            .collect())
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|e| VoiceAuthError::StoreUnavailable {
            message: format!("store lock poisoned: {}", e),
        })
    }

    fn read_file(&self) -> Result<StoreFile> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreFile {
                    version: FORMAT_VERSION,
                    voiceprints: Vec::new(),
                });
            }
            Err(e) => {
                return Err(VoiceAuthError::StoreUnavailable {
                    message: format!("cannot read {}: {}", self.path.display(), e),
                });
            }
        };

        let file: StoreFile =
            serde_json::from_slice(&bytes).map_err(|e| VoiceAuthError::StoreUnavailable {
                message: format!("corrupt store file {}: {}", self.path.display(), e),
            })?;
        if file.version != FORMAT_VERSION {
            return Err(VoiceAuthError::StoreUnavailable {
                message: format!(
                    "unsupported store format version {} in {}",
                    file.version,
                    self.path.display()
                ),
            });
        }
        Ok(file)
    }

    fn write_file(&self, file: &StoreFile) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".voiceprints-")
            .suffix(".tmp")
            .tempfile_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, file)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn persistence(e: VoiceAuthError) -> VoiceAuthError {
        match e {
            VoiceAuthError::Persistence { .. } => e,
            other => VoiceAuthError::Persistence {
                message: other.to_string(),
            },
        }
    }
}

impl VoiceprintStore for JsonFileStore {
    fn get(&self, user_id: &str) -> Result<Option<Voiceprint>> {
        let _guard = self.guard()?;
        Ok(self
            .read_file()?
            .voiceprints
            .into_iter()
            .find(|v| v.user_id == user_id))
    }

    fn upsert(&self, user_id: &str, embedding: Vec<f32>) -> Result<Voiceprint> {
        let _guard = self.guard().map_err(Self::persistence)?;
        let mut file = self.read_file().map_err(Self::persistence)?;

        if let Some(other) = file.voiceprints.iter().find(|v| v.user_id != user_id)
            && other.embedding.len() != embedding.len()
        {
            return Err(VoiceAuthError::Persistence {
                message: format!(
                    "embedding dimension {} does not match stored dimension {}",
                    embedding.len(),
                    other.embedding.len()
                ),
            });
        }

        let voiceprint = Voiceprint::new(user_id, embedding);
        match file.voiceprints.iter_mut().find(|v| v.user_id == user_id) {
            Some(existing) => *existing = voiceprint.clone(),
            None => file.voiceprints.push(voiceprint.clone()),
        }

        self.write_file(&file).map_err(Self::persistence)?;
        tracing::info!(user_id, path = %self.path.display(), "voiceprint saved");
        Ok(voiceprint)
    }

    fn delete(&self, user_id: &str) -> bool {
        let result = self.guard().and_then(|_guard| {
            let mut file = self.read_file()?;
            let before = file.voiceprints.len();
            file.voiceprints.retain(|v| v.user_id != user_id);
            if file.voiceprints.len() == before {
                return Ok(false);
            }
            self.write_file(&file)?;
            Ok(true)
        });

        match result {
            Ok(deleted) => {
                if deleted {
                    tracing::info!(user_id, "voiceprint deleted");
                }
                deleted
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "voiceprint delete failed");
                false
            }
        }
    }
}
