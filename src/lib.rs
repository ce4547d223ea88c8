//! voiceauth - Voice biometrics gated by a spoken challenge phrase
//!
//! Enrollment stores a speaker embedding once the recording is confirmed to
//! contain the issued phrase; verification repeats the phrase check and
//! compares a fresh embedding against the stored one.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
pub mod challenge;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod embedding;
pub mod error;
pub mod models;
pub mod phrase;
pub mod pipeline;
pub mod similarity;
pub mod store;
pub mod stt;

// Seams (source → model → store)
pub use audio::AudioSource;
pub use embedding::SpeakerEncoder;
pub use store::VoiceprintStore;
pub use stt::transcriber::Transcriber;

// Composition root
pub use app::VoiceAuth;

// Pipeline
pub use pipeline::{EnrollOutcome, FailureReason, Pipeline, PipelineConfig, VerifyOutcome};

// Error handling
pub use error::{ErrorKind, Result, VoiceAuthError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
