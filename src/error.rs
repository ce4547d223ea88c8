//! Error types for voiceauth.

use thiserror::Error;

/// Coarse classification of a [`VoiceAuthError`].
///
/// Mirrors the failure taxonomy callers reason about: configuration problems are
/// fatal, input problems are rejected before the pipeline runs, and the stage
/// kinds map onto pipeline outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Input,
    Transcription,
    PhraseMismatch,
    Embedding,
    Persistence,
    NotEnrolled,
    Timeout,
    Io,
    Other,
}

#[derive(Error, Debug)]
pub enum VoiceAuthError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Transcription model not found at {path}")]
    TranscriptionModelNotFound { path: String },

    #[error("Failed to load transcription model: {message}")]
    TranscriptionModelLoad { message: String },

    #[error("Embedding model not found at {path}")]
    EmbeddingModelNotFound { path: String },

    #[error("Failed to load embedding model: {message}")]
    EmbeddingModelLoad { message: String },

    // Input errors
    #[error("Audio payload is empty")]
    EmptyAudio,

    #[error("Invalid audio payload: {message}")]
    InvalidAudio { message: String },

    // Transcription errors
    #[error("Transcription inference failed: {message}")]
    TranscriptionInferenceFailed { message: String },

    #[error("Transcription produced no text")]
    EmptyTranscription,

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    // Phrase validation
    #[error("Phrase mismatch: expected '{expected}', heard '{transcription}'")]
    PhraseMismatch {
        transcription: String,
        expected: String,
    },

    // Embedding errors
    #[error("Embedding extraction failed: {message}")]
    Embedding { message: String },

    #[error("Embedding model provisioning failed: {message}")]
    EmbeddingProvisioning { message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // Persistence errors
    #[error("Voiceprint store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Voiceprint persistence failed: {message}")]
    Persistence { message: String },

    #[error("No voiceprint enrolled for user {user_id}")]
    NotEnrolled { user_id: String },

    #[error("Request timed out after {seconds:.1}s")]
    Timeout { seconds: f64 },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl VoiceAuthError {
    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigFileNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalidValue { .. }
            | Self::Config(_)
            | Self::TranscriptionModelNotFound { .. }
            | Self::TranscriptionModelLoad { .. }
            | Self::EmbeddingModelNotFound { .. }
            | Self::EmbeddingModelLoad { .. } => ErrorKind::Configuration,
            Self::EmptyAudio | Self::InvalidAudio { .. } => ErrorKind::Input,
            Self::TranscriptionInferenceFailed { .. }
            | Self::EmptyTranscription
            | Self::Transcription { .. } => ErrorKind::Transcription,
            Self::PhraseMismatch { .. } => ErrorKind::PhraseMismatch,
            Self::Embedding { .. }
            | Self::EmbeddingProvisioning { .. }
            | Self::DimensionMismatch { .. } => ErrorKind::Embedding,
            Self::StoreUnavailable { .. } | Self::Persistence { .. } | Self::Json(_) => {
                ErrorKind::Persistence
            }
            Self::NotEnrolled { .. } => ErrorKind::NotEnrolled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Io(_) => ErrorKind::Io,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether the error belongs to the fatal class that escapes the orchestrator
    /// instead of becoming a pipeline outcome.
    ///
    /// Fatal: configuration, malformed input, an unreachable store, an embedding
    /// dimension contract violation and caller-level timeouts.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Input | ErrorKind::Timeout
        ) || matches!(
            self,
            Self::StoreUnavailable { .. } | Self::DimensionMismatch { .. }
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoiceAuthError>;
