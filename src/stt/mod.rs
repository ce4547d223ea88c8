//! Speech-to-text: engine trait, Whisper engine and the bytes-to-text adapter.

pub mod adapter;
pub mod transcriber;
pub mod whisper;

pub use adapter::TranscriptionAdapter;
pub use transcriber::{MockTranscriber, Transcriber};
pub use whisper::{WhisperConfig, WhisperTranscriber};
