use crate::error::{Result, VoiceAuthError};
use crate::store::{Voiceprint, VoiceprintStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    voiceprints: Mutex<HashMap<String, Voiceprint>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Voiceprint>>> {
        self.voiceprints
            .lock()
            .map_err(|e| VoiceAuthError::StoreUnavailable {
                message: format!("voiceprint map lock poisoned: {}", e),
            })
    }
}

impl VoiceprintStore for InMemoryStore {
    fn get(&self, user_id: &str) -> Result<Option<Voiceprint>> {
        Ok(self.lock()?.get(user_id).cloned())
    }

    fn upsert(&self, user_id: &str, embedding: Vec<f32>) -> Result<Voiceprint> {
        let mut map = self.lock().map_err(|e| VoiceAuthError::Persistence {
            message: e.to_string(),
        })?;

        if let Some(other) = map.values().find(|v| v.user_id != user_id)
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
        map.insert(user_id.to_string(), voiceprint.clone());
        Ok(voiceprint)
    }

    fn delete(&self, user_id: &str) -> bool {
        match self.lock() {
            Ok(mut map) => map.remove(user_id).is_some(),
            Err(e) => {
                tracing::error!(user_id, error = %e, "voiceprint delete failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_get() {
        let store = InMemoryStore::new();
        assert!(store.get("alice").unwrap().is_none());

        let saved = store.upsert("alice", vec![1.0, 0.0]).unwrap();
        assert_eq!(saved.user_id, "alice");
        assert_eq!(store.get("alice").unwrap().unwrap().embedding, vec![1.0, 0.0]);
        assert!(store.exists("alice"));
        assert!(!store.exists("bob"));
    }

    #[test]
    fn upsert_overwrites() {
        let store = InMemoryStore::new();
        store.upsert("alice", vec![1.0, 0.0]).unwrap();
        let first = store.get("alice").unwrap().unwrap().updated_at;
        store.upsert("alice", vec![0.0, 1.0]).unwrap();

        let current = store.get("alice").unwrap().unwrap();
        assert_eq!(current.embedding, vec![0.0, 1.0]);
        assert!(current.updated_at >= first);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn rejects_mixed_dimensions_across_users() {
        let store = InMemoryStore::new();
        store.upsert("alice", vec![1.0, 0.0, 0.0]).unwrap();

        let err = store.upsert("bob", vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(err, VoiceAuthError::Persistence { .. }));
        assert!(!store.exists("bob"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sole_user_may_change_dimension() {
        let store = InMemoryStore::new();
        store.upsert("alice", vec![1.0, 0.0, 0.0]).unwrap();
        store.upsert("alice", vec![0.5; 192]).unwrap();
        assert_eq!(store.get("alice").unwrap().unwrap().embedding.len(), 192);
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let store = InMemoryStore::new();
        store.upsert("alice", vec![1.0]).unwrap();
        assert!(store.delete("alice"));
        assert!(!store.delete("alice"));
        assert!(store.is_empty());
    }
}
