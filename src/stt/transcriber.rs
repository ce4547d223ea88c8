use crate::audio::AudioSource;
use crate::error::{Result, VoiceAuthError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait Transcriber: Send + Sync {
    /// Transcribe audio samples to text.
    ///
    /// # Arguments
    /// * `audio` - Audio samples as 16-bit PCM at 16kHz mono
    ///
    /// # Returns
    /// Transcribed text or error
    fn transcribe(&self, audio: &[i16]) -> Result<String>;

    /// Drain `source` chunk by chunk, then transcribe the collected audio.
    ///
    /// Engines that decode incrementally can override this; the default
    /// buffers every chunk and runs a single inference.
    fn transcribe_stream(&self, source: &mut dyn AudioSource) -> Result<String> {
        let mut audio = Vec::new();
        let mut chunks = 0usize;
        loop {
            let chunk = source.read_samples()?;
            if chunk.is_empty() {
                break;
            }
            chunks += 1;
            audio.extend_from_slice(&chunk);
        }
        tracing::debug!(chunks, samples = audio.len(), "audio stream drained");
        self.transcribe(&audio)
    }

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across requests.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        (**self).transcribe(audio)
    }

    fn transcribe_stream(&self, source: &mut dyn AudioSource) -> Result<String> {
        (**self).transcribe_stream(source)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock transcriber for testing
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of `transcribe` calls so far, shared between clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio: &[i16]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            Err(VoiceAuthError::TranscriptionInferenceFailed {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
