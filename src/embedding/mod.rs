//! Speaker embeddings: encoder trait, fbank front-end, ONNX encoder and adapter.

pub mod adapter;
pub mod encoder;
pub mod fbank;
pub mod onnx;

pub use adapter::EmbeddingAdapter;
pub use encoder::{MockEncoder, SpeakerEncoder};
pub use onnx::{OnnxEncoderConfig, OnnxSpeakerEncoder};
