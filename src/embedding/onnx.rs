//! ONNX Runtime speaker encoder (WeSpeaker ECAPA-TDNN style models).
//!
//! The model takes `[1, frames, 80]` mean-normalized fbank features and returns
//! `[1, dimension]`. Requires the `onnx` feature; without it the encoder is a stub
//! that only validates the model path.

use crate::config::EmbeddingConfig;
use crate::embedding::encoder::SpeakerEncoder;
use crate::embedding::fbank::{Fbank, FbankConfig, subtract_mean};
use crate::error::{Result, VoiceAuthError};
use std::path::{Path, PathBuf};

#[cfg(feature = "onnx")]
use ort::session::{Session, builder::GraphOptimizationLevel};
#[cfg(feature = "onnx")]
use ort::value::Value;
#[cfg(feature = "onnx")]
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct OnnxEncoderConfig {
    pub model_path: PathBuf,
    pub input_name: String,
    pub output_name: String,
    pub dimension: usize,
    pub sample_rate: u32,
    pub threads: usize,
}

impl OnnxEncoderConfig {
    pub fn from_embedding(config: &EmbeddingConfig, model_path: &Path) -> Self {
        Self {
            model_path: model_path.to_path_buf(),
            input_name: config.input_name.clone(),
            output_name: config.output_name.clone(),
            dimension: config.dimension,
            sample_rate: config.sample_rate,
            threads: config.threads.max(1),
        }
    }
}

pub struct OnnxSpeakerEncoder {
    #[cfg(feature = "onnx")]
    session: Mutex<Session>,
    config: OnnxEncoderConfig,
    fbank: Fbank,
    model_name: String,
}

impl std::fmt::Debug for OnnxSpeakerEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSpeakerEncoder")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OnnxSpeakerEncoder {
    /// Load the encoder.
    ///
    /// # Errors
    /// `EmbeddingModelNotFound` if the file is missing, `EmbeddingModelLoad` if
    /// ONNX Runtime cannot build a session from it.
    pub fn new(config: OnnxEncoderConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(VoiceAuthError::EmbeddingModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let fbank = Fbank::new(FbankConfig {
            sample_rate: config.sample_rate,
            ..FbankConfig::default()
        });

        #[cfg(feature = "onnx")]
        let session = Mutex::new(build_session(&config)?);

        Ok(Self {
            #[cfg(feature = "onnx")]
            session,
            config,
            fbank,
            model_name,
        })
    }

    pub fn config(&self) -> &OnnxEncoderConfig {
        &self.config
    }

    /// Mean-normalized fbank features flattened row-major, with the frame count.
    fn features(&self, waveform: &[f32]) -> Result<(usize, Vec<f32>)> {
        let mut features =
            self.fbank
                .compute(waveform)
                .ok_or_else(|| VoiceAuthError::Embedding {
                    message: format!(
                        "audio too short for feature extraction: {} samples",
                        waveform.len()
                    ),
                })?;
        subtract_mean(&mut features);
        let frames = features.len();
        Ok((frames, features.into_iter().flatten().collect()))
    }
}

#[cfg(feature = "onnx")]
fn build_session(config: &OnnxEncoderConfig) -> Result<Session> {
    Session::builder()
        .map_err(load_err)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(load_err)?
        .with_intra_threads(config.threads)
        .map_err(load_err)?
        .commit_from_file(&config.model_path)
        .map_err(load_err)
}

#[cfg(feature = "onnx")]
fn load_err(e: impl std::fmt::Display) -> VoiceAuthError {
    VoiceAuthError::EmbeddingModelLoad {
        message: e.to_string(),
    }
}

#[cfg(feature = "onnx")]
impl SpeakerEncoder for OnnxSpeakerEncoder {
    fn encode(&self, waveform: &[f32]) -> Result<Vec<f32>> {
        let (frames, flat) = self.features(waveform)?;
        let mels = self.fbank.config().num_mels;

        let infer_err = |message: String| VoiceAuthError::Embedding { message };

        let input = Value::from_array(
            ndarray::Array3::from_shape_vec((1, frames, mels), flat)
                .map_err(|e| infer_err(format!("Failed to shape fbank features: {}", e)))?,
        )
        .map_err(|e| infer_err(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| infer_err(format!("Failed to acquire session lock: {}", e)))?;

        let outputs = session
            .run(ort::inputs![self.config.input_name.as_str() => input])
            .map_err(|e| infer_err(format!("Encoder inference failed: {}", e)))?;

        let output = outputs
            .get(self.config.output_name.as_str())
            .ok_or_else(|| infer_err(format!("Missing '{}' in outputs", self.config.output_name)))?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| infer_err(format!("Failed to extract embedding: {}", e)))?;

        Ok(data.to_vec())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "onnx"))]
impl SpeakerEncoder for OnnxSpeakerEncoder {
    fn encode(&self, waveform: &[f32]) -> Result<Vec<f32>> {
        self.features(waveform)?;
        Err(VoiceAuthError::Embedding {
            message: concat!(
                "ONNX feature not enabled. This binary was built without speaker embedding.\n",
                "To fix: cargo build --release --features onnx"
            )
            .to_string(),
        })
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
