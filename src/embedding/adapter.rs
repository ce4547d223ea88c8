//! Audio bytes in, voice embedding out.

use crate::audio::DecodedAudio;
use crate::config::EmbeddingConfig;
use crate::defaults;
use crate::embedding::encoder::SpeakerEncoder;
use crate::embedding::onnx::{OnnxEncoderConfig, OnnxSpeakerEncoder};
use crate::error::{Result, VoiceAuthError};
use crate::models::lazy::LazyModel;
use crate::models::provision::EmbeddingSource;
use std::sync::Arc;

pub struct EmbeddingAdapter {
    encoder: LazyModel<Arc<dyn SpeakerEncoder>>,
    min_audio_ms: u64,
}

impl EmbeddingAdapter {
    pub fn new(encoder: LazyModel<Arc<dyn SpeakerEncoder>>) -> Self {
        Self {
            encoder,
            min_audio_ms: defaults::MIN_EMBEDDING_AUDIO_MS,
        }
    }

    /// Adapter over the ONNX encoder described by `config`, provisioned and
    /// loaded on first use.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let source = EmbeddingSource::from_config(config);
        let config = config.clone();
        let encoder = LazyModel::new(format!("speaker-encoder ({})", source), move || {
            let path = source.resolve()?;
            let encoder = OnnxSpeakerEncoder::new(OnnxEncoderConfig::from_embedding(&config, &path))?;
            Ok(Arc::new(encoder) as Arc<dyn SpeakerEncoder>)
        });
        Self::new(encoder)
    }

    /// Adapter over an encoder that is already loaded.
    pub fn with_encoder(encoder: Arc<dyn SpeakerEncoder>) -> Self {
        let name = encoder.model_name().to_string();
        Self::new(LazyModel::ready(name, encoder))
    }

    pub fn with_min_audio_ms(mut self, min_audio_ms: u64) -> Self {
        self.min_audio_ms = min_audio_ms;
        self
    }

    pub fn preload(&self) -> Result<()> {
        self.encoder.preload()
    }

    pub fn is_loaded(&self) -> bool {
        self.encoder.is_loaded()
    }

    /// Extract one embedding from a WAV payload.
    ///
    /// Decode, average channels to mono, resample to the encoder rate, then run
    /// the encoder once over the whole waveform. The result always has the
    /// encoder's dimension and only finite values.
    pub fn extract_embedding(&self, audio: &[u8]) -> Result<Vec<f32>> {
        if audio.is_empty() {
            return Err(VoiceAuthError::EmptyAudio);
        }

        let encoder = self.encoder.get()?;

        let decoded = DecodedAudio::from_bytes(audio).map_err(|e| VoiceAuthError::Embedding {
            message: e.to_string(),
        })?;
        let duration_ms = decoded.duration_ms();
        if duration_ms < self.min_audio_ms {
            return Err(VoiceAuthError::Embedding {
                message: format!(
                    "audio too short: {}ms (minimum {}ms)",
                    duration_ms, self.min_audio_ms
                ),
            });
        }

        let waveform = decoded.into_mono_at(encoder.sample_rate());
        let embedding = encoder.encode(&waveform)?;

        if embedding.len() != encoder.dimension() {
            return Err(VoiceAuthError::Embedding {
                message: format!(
                    "encoder returned {} values, expected {}",
                    embedding.len(),
                    encoder.dimension()
                ),
            });
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(VoiceAuthError::Embedding {
                message: "encoder returned non-finite values".to_string(),
            });
        }

        tracing::debug!(
            model = encoder.model_name(),
            dimension = embedding.len(),
            duration_ms,
            "extracted embedding"
        );
        Ok(embedding)
    }
}
