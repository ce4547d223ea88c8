use crate::defaults;
use crate::error::{Result, VoiceAuthError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub verification: VerificationConfig,
    pub stt: SttConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub challenge: ChallengeConfig,
    pub audio: AudioConfig,
    pub service: ServiceConfig,
}

/// Decision thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerificationConfig {
    /// Minimum cosine similarity for a verification to authenticate
    pub similarity_threshold: f32,
    /// Minimum Jaccard word-set similarity for a phrase to match
    pub phrase_match_threshold: f32,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model_path: PathBuf,
    pub language: String,
    pub threads: Option<usize>,
    pub chunk_frames: usize,
}

/// Speaker encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Local ONNX file. When unset the model is fetched from the Hugging Face Hub.
    pub model_path: Option<PathBuf>,
    pub hf_repo: String,
    pub hf_filename: String,
    pub cache_dir: Option<PathBuf>,
    pub input_name: String,
    pub output_name: String,
    pub dimension: usize,
    pub sample_rate: u32,
    pub threads: usize,
}

/// Voiceprint store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

/// Challenge phrase configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChallengeConfig {
    pub phrases_file: PathBuf,
}

/// Audio handling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AudioConfig {
    /// Directory for temporary decode files (system temp dir when unset)
    pub spool_dir: Option<PathBuf>,
}

/// Caller-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Timeout wrapped around a whole enroll/verify call, e.g. "30s"
    pub request_timeout: Option<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
            phrase_match_threshold: defaults::PHRASE_MATCH_THRESHOLD,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::STT_MODEL_PATH),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
            chunk_frames: defaults::TRANSCRIBE_CHUNK_FRAMES,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            hf_repo: defaults::EMBEDDING_HF_REPO.to_string(),
            hf_filename: defaults::EMBEDDING_HF_FILENAME.to_string(),
            cache_dir: None,
            input_name: defaults::EMBEDDING_INPUT_NAME.to_string(),
            output_name: defaults::EMBEDDING_OUTPUT_NAME.to_string(),
            dimension: defaults::EMBEDDING_DIMENSION,
            sample_rate: defaults::SAMPLE_RATE,
            threads: 1,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            phrases_file: PathBuf::from(defaults::PHRASES_FILE),
        }
    }
}

impl ServiceConfig {
    /// Parsed request timeout, if one is configured.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        match self.request_timeout.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => humantime::parse_duration(raw).map(Some).map_err(|e| {
                VoiceAuthError::ConfigInvalidValue {
                    key: "service.request_timeout".to_string(),
                    message: e.to_string(),
                }
            }),
        }
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(defaults::APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(defaults::STORE_FILE_NAME)
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoiceAuthError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                VoiceAuthError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(VoiceAuthError::ConfigFileNotFound { .. }) => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOICEAUTH_SIMILARITY_THRESHOLD → verification.similarity_threshold
    /// - VOICEAUTH_PHRASE_THRESHOLD → verification.phrase_match_threshold
    /// - VOICEAUTH_STT_MODEL → stt.model_path
    /// - VOICEAUTH_EMBEDDING_MODEL → embedding.model_path
    /// - VOICEAUTH_STORE_PATH → store.path
    /// - VOICEAUTH_PHRASES_FILE → challenge.phrases_file
    ///
    /// Empty values are ignored. Unparsable thresholds are an error.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(value) = env_value("VOICEAUTH_SIMILARITY_THRESHOLD") {
            self.verification.similarity_threshold =
                parse_threshold("VOICEAUTH_SIMILARITY_THRESHOLD", &value)?;
        }

        if let Some(value) = env_value("VOICEAUTH_PHRASE_THRESHOLD") {
            self.verification.phrase_match_threshold =
                parse_threshold("VOICEAUTH_PHRASE_THRESHOLD", &value)?;
        }

        if let Some(model) = env_value("VOICEAUTH_STT_MODEL") {
            self.stt.model_path = PathBuf::from(model);
        }

        if let Some(model) = env_value("VOICEAUTH_EMBEDDING_MODEL") {
            self.embedding.model_path = Some(PathBuf::from(model));
        }

        if let Some(path) = env_value("VOICEAUTH_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }

        if let Some(path) = env_value("VOICEAUTH_PHRASES_FILE") {
            self.challenge.phrases_file = PathBuf::from(path);
        }

        Ok(self)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let similarity = self.verification.similarity_threshold;
        if !(-1.0..=1.0).contains(&similarity) {
            return Err(invalid(
                "verification.similarity_threshold",
                format!("{similarity} is outside [-1, 1]"),
            ));
        }

        let phrase = self.verification.phrase_match_threshold;
        if !(0.0..=1.0).contains(&phrase) {
            return Err(invalid(
                "verification.phrase_match_threshold",
                format!("{phrase} is outside [0, 1]"),
            ));
        }

        if self.stt.chunk_frames == 0 {
            return Err(invalid("stt.chunk_frames", "must be positive".to_string()));
        }

        if self.embedding.dimension == 0 {
            return Err(invalid(
                "embedding.dimension",
                "must be positive".to_string(),
            ));
        }

        if self.embedding.sample_rate == 0 {
            return Err(invalid(
                "embedding.sample_rate",
                "must be positive".to_string(),
            ));
        }

        if self.embedding.model_path.is_none()
            && (self.embedding.hf_repo.trim().is_empty()
                || self.embedding.hf_filename.trim().is_empty())
        {
            return Err(invalid(
                "embedding",
                "either model_path or hf_repo + hf_filename must be set".to_string(),
            ));
        }

        self.service.timeout()?;
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_display_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| VoiceAuthError::ConfigParse {
            message: format!("cannot render configuration: {e}"),
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voiceauth/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(defaults::APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_threshold(key: &str, value: &str) -> Result<f32> {
    value
        .trim()
        .parse::<f32>()
        .map_err(|e| invalid(key, format!("'{value}' is not a number: {e}")))
}

fn invalid(key: &str, message: String) -> VoiceAuthError {
    VoiceAuthError::ConfigInvalidValue {
        key: key.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_voiceauth_env() {
        for key in [
            "VOICEAUTH_SIMILARITY_THRESHOLD",
            "VOICEAUTH_PHRASE_THRESHOLD",
            "VOICEAUTH_STT_MODEL",
            "VOICEAUTH_EMBEDDING_MODEL",
            "VOICEAUTH_STORE_PATH",
            "VOICEAUTH_PHRASES_FILE",
        ] {
            remove_env(key);
        }
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.verification.similarity_threshold, 0.75);
        assert_eq!(config.verification.phrase_match_threshold, 0.5);

        assert_eq!(config.stt.model_path, PathBuf::from("models/ggml-base.bin"));
        assert_eq!(config.stt.language, "auto");
        assert_eq!(config.stt.chunk_frames, 4000);

        assert_eq!(config.embedding.model_path, None);
        assert_eq!(config.embedding.dimension, 192);
        assert_eq!(config.embedding.sample_rate, 16000);

        assert!(config.store.path.ends_with("voiceprints.json"));
        assert_eq!(config.challenge.phrases_file, PathBuf::from("phrases.txt"));
        assert_eq!(config.audio.spool_dir, None);
        assert_eq!(config.service.request_timeout, None);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [verification]
            similarity_threshold = 0.8
            phrase_match_threshold = 0.6

            [stt]
            model_path = "/models/ggml-small.bin"
            language = "pt"
            threads = 2
            chunk_frames = 8000

            [embedding]
            model_path = "/models/ecapa.onnx"
            input_name = "x"
            output_name = "embedding"

            [store]
            path = "/var/lib/voiceauth/voiceprints.json"

            [challenge]
            phrases_file = "/etc/voiceauth/phrases.txt"

            [service]
            request_timeout = "45s"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.verification.similarity_threshold, 0.8);
        assert_eq!(config.verification.phrase_match_threshold, 0.6);
        assert_eq!(config.stt.model_path, PathBuf::from("/models/ggml-small.bin"));
        assert_eq!(config.stt.language, "pt");
        assert_eq!(config.stt.threads, Some(2));
        assert_eq!(config.stt.chunk_frames, 8000);
        assert_eq!(
            config.embedding.model_path,
            Some(PathBuf::from("/models/ecapa.onnx"))
        );
        assert_eq!(config.embedding.input_name, "x");
        assert_eq!(config.embedding.output_name, "embedding");
        assert_eq!(config.embedding.dimension, 192);
        assert_eq!(
            config.store.path,
            PathBuf::from("/var/lib/voiceauth/voiceprints.json")
        );
        assert_eq!(
            config.challenge.phrases_file,
            PathBuf::from("/etc/voiceauth/phrases.txt")
        );
        assert_eq!(
            config.service.timeout().unwrap(),
            Some(Duration::from_secs(45))
        );
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [verification]
            similarity_threshold = 0.9
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.verification.similarity_threshold, 0.9);
        assert_eq!(config.verification.phrase_match_threshold, 0.5);
        assert_eq!(config.stt, SttConfig::default());
        assert_eq!(config.embedding, EmbeddingConfig::default());
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let missing = Path::new("/tmp/nonexistent_voiceauth_config_12345.toml");
        match Config::load(missing) {
            Err(VoiceAuthError::ConfigFileNotFound { path }) => {
                assert!(path.contains("nonexistent_voiceauth_config_12345"));
            }
            other => panic!("Expected ConfigFileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_voiceauth_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_rejects_invalid_toml() {
        let invalid_toml = r#"
            [verification
            similarity_threshold = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        let result = Config::load_or_default(temp_file.path());
        assert!(matches!(result, Err(VoiceAuthError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_thresholds() {
        let mut config = Config::default();
        config.verification.similarity_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(VoiceAuthError::ConfigInvalidValue { key, .. }) if key == "verification.similarity_threshold"
        ));

        let mut config = Config::default();
        config.verification.phrase_match_threshold = -0.1;
        assert!(matches!(
            config.validate(),
            Err(VoiceAuthError::ConfigInvalidValue { key, .. }) if key == "verification.phrase_match_threshold"
        ));
    }

    #[test]
    fn test_validate_requires_an_embedding_source() {
        let mut config = Config::default();
        config.embedding.hf_repo = String::new();
        assert!(config.validate().is_err());

        config.embedding.model_path = Some(PathBuf::from("/models/ecapa.onnx"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_timeout() {
        let mut config = Config::default();
        config.service.request_timeout = Some("soon".to_string());
        assert!(config.validate().is_err());

        config.service.request_timeout = Some("2m".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.service.timeout().unwrap(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_env_override_thresholds() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voiceauth_env();

        set_env("VOICEAUTH_SIMILARITY_THRESHOLD", "0.82");
        set_env("VOICEAUTH_PHRASE_THRESHOLD", "0.7");
        let config = Config::default().with_env_overrides().unwrap();

        assert_eq!(config.verification.similarity_threshold, 0.82);
        assert_eq!(config.verification.phrase_match_threshold, 0.7);

        clear_voiceauth_env();
    }

    #[test]
    fn test_env_override_paths() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voiceauth_env();

        set_env("VOICEAUTH_STT_MODEL", "/m/ggml-tiny.bin");
        set_env("VOICEAUTH_EMBEDDING_MODEL", "/m/ecapa.onnx");
        set_env("VOICEAUTH_STORE_PATH", "/data/vp.json");
        set_env("VOICEAUTH_PHRASES_FILE", "/data/phrases.txt");

        let config = Config::default().with_env_overrides().unwrap();

        assert_eq!(config.stt.model_path, PathBuf::from("/m/ggml-tiny.bin"));
        assert_eq!(
            config.embedding.model_path,
            Some(PathBuf::from("/m/ecapa.onnx"))
        );
        assert_eq!(config.store.path, PathBuf::from("/data/vp.json"));
        assert_eq!(
            config.challenge.phrases_file,
            PathBuf::from("/data/phrases.txt")
        );

        clear_voiceauth_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voiceauth_env();

        set_env("VOICEAUTH_STT_MODEL", "");
        let config = Config::default().with_env_overrides().unwrap();

        assert_eq!(config.stt.model_path, PathBuf::from("models/ggml-base.bin"));

        clear_voiceauth_env();
    }

    #[test]
    fn test_env_override_invalid_threshold_is_error() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voiceauth_env();

        set_env("VOICEAUTH_SIMILARITY_THRESHOLD", "high");
        let result = Config::default().with_env_overrides();
        assert!(matches!(
            result,
            Err(VoiceAuthError::ConfigInvalidValue { .. })
        ));

        clear_voiceauth_env();
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("voiceauth"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_display_toml_lists_every_section() {
        let text = Config::default().to_display_toml().unwrap();
        for section in ["[verification]", "[stt]", "[embedding]", "[store]", "[challenge]"] {
            assert!(text.contains(section), "missing {section} in:\n{text}");
        }
        assert!(text.contains("similarity_threshold = 0.75"));
    }
}
