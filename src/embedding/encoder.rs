use crate::defaults;
use crate::error::{Result, VoiceAuthError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait for speaker encoders: mono waveform in, fixed-length voice embedding out.
pub trait SpeakerEncoder: Send + Sync {
    /// Encode a whole utterance.
    ///
    /// `waveform` is mono, normalized to [-1.0, 1.0], at [`Self::sample_rate`].
    fn encode(&self, waveform: &[f32]) -> Result<Vec<f32>>;

    /// Length of every vector `encode` returns.
    fn dimension(&self) -> usize;

    fn sample_rate(&self) -> u32 {
        defaults::SAMPLE_RATE
    }

    fn model_name(&self) -> &str;
}

impl<T: SpeakerEncoder + ?Sized> SpeakerEncoder for Arc<T> {
    fn encode(&self, waveform: &[f32]) -> Result<Vec<f32>> {
        (**self).encode(waveform)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock encoder returning a fixed vector.
#[derive(Debug, Clone)]
pub struct MockEncoder {
    embedding: Vec<f32>,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockEncoder {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of `encode` calls so far, shared between clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SpeakerEncoder for MockEncoder {
    fn encode(&self, _waveform: &[f32]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(VoiceAuthError::Embedding {
                message: "mock encoder failure".to_string(),
            });
        }
        Ok(self.embedding.clone())
    }

    fn dimension(&self) -> usize {
        self.embedding.len()
    }

    fn model_name(&self) -> &str {
        "mock-encoder"
    }
}
