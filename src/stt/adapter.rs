//! Audio bytes in, transcription text out.

use crate::audio::{SpooledAudio, WavAudioSource};
use crate::config::{AudioConfig, SttConfig};
use crate::error::{Result, VoiceAuthError};
use crate::models::lazy::LazyModel;
use crate::stt::transcriber::Transcriber;
use std::path::PathBuf;
use std::sync::Arc;

/// Wraps a lazily loaded transcription engine with WAV decoding and chunking.
pub struct TranscriptionAdapter {
    engine: LazyModel<Arc<dyn Transcriber>>,
    chunk_frames: usize,
    spool_dir: Option<PathBuf>,
}

impl TranscriptionAdapter {
    pub fn new(engine: LazyModel<Arc<dyn Transcriber>>, chunk_frames: usize) -> Self {
        Self {
            engine,
            chunk_frames: chunk_frames.max(1),
            spool_dir: None,
        }
    }

    /// Adapter over the Whisper engine described by `stt`, loaded on first use.
    pub fn from_config(stt: &SttConfig, audio: &AudioConfig) -> Self {
        let whisper = crate::stt::whisper::WhisperConfig::from(stt);
        let engine = LazyModel::new("whisper", move || {
            let transcriber = crate::stt::whisper::WhisperTranscriber::new(whisper.clone())?;
            Ok(Arc::new(transcriber) as Arc<dyn Transcriber>)
        });
        Self::new(engine, stt.chunk_frames).with_spool_dir(audio.spool_dir.clone())
    }

    /// Adapter over an engine that is already loaded.
    pub fn with_engine(engine: Arc<dyn Transcriber>, chunk_frames: usize) -> Self {
        let name = engine.model_name().to_string();
        Self::new(LazyModel::ready(name, engine), chunk_frames)
    }

    pub fn with_spool_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.spool_dir = dir;
        self
    }

    pub fn preload(&self) -> Result<()> {
        self.engine.preload()
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_loaded()
    }

    /// Transcribe a WAV payload.
    ///
    /// Model load failures keep their configuration class. Decoding and inference
    /// failures are transcription-stage errors. Whitespace-only output is
    /// `EmptyTranscription`.
    pub fn transcribe(&self, audio: &[u8]) -> Result<String> {
        if audio.is_empty() {
            return Err(VoiceAuthError::EmptyAudio);
        }

        let engine = self.engine.get()?;

        let spooled = SpooledAudio::write(audio, self.spool_dir.as_deref())?;
        let decoded = spooled.decode().map_err(|e| VoiceAuthError::Transcription {
            message: e.to_string(),
        })?;
        let mut source = WavAudioSource::from_decoded(decoded, self.chunk_frames);

        let text = engine.transcribe_stream(&mut source)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceAuthError::EmptyTranscription);
        }

        tracing::debug!(model = engine.model_name(), chars = text.len(), "transcribed audio");
        Ok(text.to_string())
    }
}
