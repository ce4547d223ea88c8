//! Audio payload handling: container checks, decoding and chunked reading.

pub mod spool;
pub mod wav;

pub use spool::SpooledAudio;
pub use wav::{DecodedAudio, WavAudioSource};

use crate::error::Result;

/// A finite source of 16kHz mono PCM16 samples read in chunks.
///
/// An empty chunk signals the source is exhausted.
pub trait AudioSource: Send {
    fn read_samples(&mut self) -> Result<Vec<i16>>;
}
