//! Challenge phrase issuance.

use crate::error::{Result, VoiceAuthError};
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Compiled-in phrase set used until a phrase file replaces it.
pub const DEFAULT_PHRASES: [&str; 10] = [
    "I authorize access to this system using my unique voice as my personal credential",
    "My voice confirms my identity and grants me access to my protected account",
    "I am providing this voice sample willingly so the system can recognize me",
    "This is my natural speaking voice and I accept its use for secure sign in",
    "The characteristics of my voice are unique and verify who I am today",
    "I understand my voice will be compared with the sample I enrolled earlier",
    "Please verify my identity by comparing this recording with my voiceprint",
    "I consent to the analysis of my voice for authentication and access control",
    "My spoken words serve as a biometric key that only I can provide",
    "With this statement I confirm my identity and request access to the system",
];

/// Where the active phrase set came from after a load attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PhraseSource {
    File { path: PathBuf, count: usize },
    Defaults { reason: String },
}

/// Hands out challenge phrases from a replaceable set.
#[derive(Debug)]
pub struct ChallengeIssuer {
    phrases: RwLock<Arc<Vec<String>>>,
}

impl Default for ChallengeIssuer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeIssuer {
    pub fn new() -> Self {
        Self {
            phrases: RwLock::new(Arc::new(
                DEFAULT_PHRASES.iter().map(|p| p.to_string()).collect(),
            )),
        }
    }

    /// Issuer over a custom set; blank-only input is rejected.
    pub fn with_phrases(phrases: Vec<String>) -> Result<Self> {
        let issuer = Self::new();
        issuer.replace(phrases)?;
        Ok(issuer)
    }

    /// A phrase chosen uniformly at random.
    pub fn issue(&self) -> String {
        self.issue_with(&mut rand::thread_rng())
    }

    pub fn issue_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let phrases = self.phrases();
        // The set is never empty: `replace` refuses empty input.
        phrases.choose(rng).cloned().unwrap_or_default()
    }

    /// Snapshot of the active set.
    pub fn phrases(&self) -> Arc<Vec<String>> {
        match self.phrases.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Install a new set. Entries are trimmed and blank ones dropped.
    pub fn replace(&self, phrases: Vec<String>) -> Result<()> {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if phrases.is_empty() {
            return Err(VoiceAuthError::ConfigInvalidValue {
                key: "challenge.phrases".to_string(),
                message: "phrase set must contain at least one non-blank phrase".to_string(),
            });
        }

        let mut guard = match self.phrases.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(phrases);
        Ok(())
    }

    /// Replace the set with the lines of `path`, keeping the current set when the
    /// file is missing, unreadable or has no usable lines.
    pub fn load_from_file(&self, path: &Path) -> PhraseSource {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                let reason = if e.kind() == std::io::ErrorKind::NotFound {
                    format!("{} not found", path.display())
                } else {
                    format!("cannot read {}: {}", path.display(), e)
                };
                tracing::info!(%reason, "using built-in challenge phrases");
                return PhraseSource::Defaults { reason };
            }
        };

        let phrases = parse_phrases(&text);
        let count = phrases.len();
        match self.replace(phrases) {
            Ok(()) => {
                tracing::info!(path = %path.display(), count, "loaded challenge phrases");
                PhraseSource::File {
                    path: path.to_path_buf(),
                    count,
                }
            }
            Err(_) => {
                let reason = format!("{} contains no phrases", path.display());
                tracing::warn!(%reason, "using built-in challenge phrases");
                PhraseSource::Defaults { reason }
            }
        }
    }
}

/// One phrase per non-blank line, trimmed.
pub fn parse_phrases(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn issues_one_of_the_defaults() {
        let issuer = ChallengeIssuer::new();
        let phrase = issuer.issue();
        assert!(DEFAULT_PHRASES.contains(&phrase.as_str()));
        assert_eq!(issuer.phrases().len(), 10);
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let issuer = ChallengeIssuer::new();
        let a = issuer.issue_with(&mut StdRng::seed_from_u64(7));
        let b = issuer.issue_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn issue_covers_the_whole_set() {
        let issuer = ChallengeIssuer::with_phrases(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let seen: HashSet<String> = (0..200).map(|_| issuer.issue_with(&mut rng)).collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn replace_rejects_blank_sets() {
        let issuer = ChallengeIssuer::new();
        assert!(issuer.replace(vec![]).is_err());
        assert!(issuer.replace(vec!["  ".into(), "".into()]).is_err());
        assert_eq!(issuer.phrases().len(), 10);
    }

    #[test]
    fn parse_phrases_trims_and_drops_blank_lines() {
        let parsed = parse_phrases("  first phrase \n\n\t\nsecond\r\n   \nthird  ");
        assert_eq!(parsed, vec!["first phrase", "second", "third"]);
    }

    #[test]
    fn load_from_file_replaces_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.txt");
        std::fs::write(&path, "ola mundo\n\nbom dia\n").unwrap();

        let issuer = ChallengeIssuer::new();
        assert_eq!(
            issuer.load_from_file(&path),
            PhraseSource::File {
                path: path.clone(),
                count: 2
            }
        );
        assert_eq!(*issuer.phrases(), vec!["ola mundo", "bom dia"]);
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = ChallengeIssuer::new();
        let source = issuer.load_from_file(&dir.path().join("absent.txt"));
        assert!(matches!(source, PhraseSource::Defaults { ref reason } if reason.contains("not found")));
        assert_eq!(issuer.phrases().len(), 10);
    }

    #[test]
    fn empty_file_keeps_current_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.txt");
        std::fs::write(&path, "\n   \n").unwrap();

        let issuer = ChallengeIssuer::with_phrases(vec!["keep me".into()]).unwrap();
        assert!(matches!(
            issuer.load_from_file(&path),
            PhraseSource::Defaults { .. }
        ));
        assert_eq!(*issuer.phrases(), vec!["keep me"]);
    }

    #[test]
    fn snapshot_survives_replacement() {
        let issuer = ChallengeIssuer::new();
        let before = issuer.phrases();
        issuer.replace(vec!["new".into()]).unwrap();
        assert_eq!(before.len(), 10);
        assert_eq!(*issuer.phrases(), vec!["new"]);
    }
}
