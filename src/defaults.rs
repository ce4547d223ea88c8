//! Default configuration constants for voiceauth.
//!
//! Shared by the configuration types, the adapters and the CLI so every layer
//! agrees on the same numbers.

/// Sample rate expected by both the transcription engine and the speaker encoder.
pub const SAMPLE_RATE: u32 = 16000;

/// Cosine similarity a verification attempt must reach to authenticate.
pub const SIMILARITY_THRESHOLD: f32 = 0.75;

/// Jaccard word-set similarity a transcription must reach to count as the
/// expected challenge phrase.
pub const PHRASE_MATCH_THRESHOLD: f32 = 0.5;

/// Output dimension of the reference ECAPA-TDNN speaker encoder.
pub const EMBEDDING_DIMENSION: usize = 192;

/// Frames handed to the transcription engine per chunk while streaming a file.
pub const TRANSCRIBE_CHUNK_FRAMES: usize = 4000;

/// Default Whisper model file.
pub const STT_MODEL_PATH: &str = "models/ggml-base.bin";

/// Default language code for transcription.
///
/// "auto" lets Whisper detect the spoken language automatically.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Hugging Face repository hosting the default speaker encoder.
pub const EMBEDDING_HF_REPO: &str = "Wespeaker/wespeaker-voxceleb-ECAPA-TDNN512";

/// ONNX file inside [`EMBEDDING_HF_REPO`].
pub const EMBEDDING_HF_FILENAME: &str = "voxceleb_ECAPA512.onnx";

/// Input tensor name of the speaker encoder (`[batch, frames, mels]` fbank features).
pub const EMBEDDING_INPUT_NAME: &str = "feats";

/// Output tensor name of the speaker encoder (`[batch, dimension]`).
pub const EMBEDDING_OUTPUT_NAME: &str = "embs";

/// Optional external challenge phrase list, one phrase per line.
pub const PHRASES_FILE: &str = "phrases.txt";

/// File name of the JSON voiceprint store inside the data directory.
pub const STORE_FILE_NAME: &str = "voiceprints.json";

/// Application directory name under the XDG config and data directories.
pub const APP_DIR: &str = "voiceauth";

/// Minimum audio duration the speaker encoder accepts, in milliseconds.
///
/// Shorter clips do not fill enough fbank frames for a stable embedding.
pub const MIN_EMBEDDING_AUDIO_MS: u64 = 500;
