//! WAV decoding, channel down-mixing and resampling.

use crate::audio::AudioSource;
use crate::defaults::SAMPLE_RATE;
use crate::error::{Result, VoiceAuthError};
use std::io::Read;

/// Decoded WAV payload, interleaved and normalized to [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Decode any hound-readable WAV stream (integer PCM 8-32 bit or 32-bit float).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader).map_err(|e| invalid(format!(
            "Failed to parse WAV file: {}",
            e
        )))?;

        let spec = wav_reader.spec();
        if spec.channels == 0 {
            return Err(invalid("WAV header declares zero channels".to_string()));
        }
        if spec.sample_rate == 0 {
            return Err(invalid("WAV header declares a zero sample rate".to_string()));
        }

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => {
                if spec.bits_per_sample != 32 {
                    return Err(invalid(format!(
                        "Unsupported float sample width: {} bits",
                        spec.bits_per_sample
                    )));
                }
                wav_reader
                    .samples::<f32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| invalid(format!("Failed to read WAV samples: {}", e)))?
            }
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(invalid(format!(
                        "Unsupported integer sample width: {} bits",
                        spec.bits_per_sample
                    )));
                }
                let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
                wav_reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| invalid(format!("Failed to read WAV samples: {}", e)))?
            }
        };

        if samples.is_empty() {
            return Err(invalid("WAV file contains no samples".to_string()));
        }

        Ok(Self {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }

    /// Decode an in-memory WAV payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(std::io::Cursor::new(bytes))
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_ms(&self) -> u64 {
        self.frames() as u64 * 1000 / self.sample_rate as u64
    }

    /// Collapse to mono by averaging all channels of each frame.
    ///
    /// A trailing partial frame is dropped.
    pub fn into_mono(self) -> Vec<f32> {
        let channels = self.channels as usize;
        if channels == 1 {
            return self.samples;
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Mono waveform at `target_rate`: down-mix first, then resample.
    pub fn into_mono_at(self, target_rate: u32) -> Vec<f32> {
        let source_rate = self.sample_rate;
        let mono = self.into_mono();
        resample(&mono, source_rate, target_rate)
    }
}

/// Reject payloads that are not a RIFF/WAVE container before any decoding work.
pub fn check_container(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(VoiceAuthError::EmptyAudio);
    }
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(VoiceAuthError::InvalidAudio {
            message: "payload is not a RIFF/WAVE audio file".to_string(),
        });
    }
    Ok(())
}

/// Convert normalized samples to 16-bit PCM, clamping out-of-range values.
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect()
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}

fn invalid(message: String) -> VoiceAuthError {
    VoiceAuthError::InvalidAudio { message }
}

/// Audio source over a decoded WAV file, yielding 16kHz mono PCM16 in fixed-size chunks.
pub struct WavAudioSource {
    samples: Vec<i16>,
    position: usize,
    chunk_size: usize,
}

impl WavAudioSource {
    /// Create from any reader, down-mixing and resampling to 16kHz mono.
    pub fn from_reader<R: Read>(reader: R, chunk_size: usize) -> Result<Self> {
        let decoded = DecodedAudio::from_reader(reader)?;
        Ok(Self::from_decoded(decoded, chunk_size))
    }

    pub fn from_decoded(decoded: DecodedAudio, chunk_size: usize) -> Self {
        let samples = to_pcm16(&decoded.into_mono_at(SAMPLE_RATE));
        Self {
            samples,
            position: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Total number of samples available.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Consume the source and return all samples as a single buffer.
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

impl AudioSource for WavAudioSource {
    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.position >= self.samples.len() {
            return Ok(Vec::new());
        }

        let end = std::cmp::min(self.position + self.chunk_size, self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;

        Ok(chunk)
    }
}
