use crate::audio::wav::DecodedAudio;
use crate::error::{Result, VoiceAuthError};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// A request payload written to a uniquely named temporary WAV file.
///
/// The file lives exactly as long as this value and is removed on drop,
/// including when the stage that spooled it fails.
pub struct SpooledAudio {
    file: tempfile::NamedTempFile,
}

impl SpooledAudio {
    /// Write `bytes` to a fresh temporary file, inside `dir` when given.
    pub fn write(bytes: &[u8], dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("voiceauth-").suffix(".wav");

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!(path = %file.path().display(), bytes = bytes.len(), "spooled audio payload");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Open an independent read handle positioned at the start of the file.
    pub fn open(&self) -> Result<BufReader<File>> {
        let file = self.file.reopen()?;
        Ok(BufReader::new(file))
    }

    /// Decode the spooled file as WAV.
    pub fn decode(&self) -> Result<DecodedAudio> {
        DecodedAudio::from_reader(self.open()?).map_err(|e| match e {
            VoiceAuthError::InvalidAudio { message } => VoiceAuthError::InvalidAudio {
                message: format!("{} ({})", message, self.path().display()),
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wav_bytes(samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn spooled_file_is_named_and_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let spooled = SpooledAudio::write(&wav_bytes(&[1, 2, 3]), Some(dir.path())).unwrap();

        let path = spooled.path().to_path_buf();
        assert!(path.exists());
        assert!(path.starts_with(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("voiceauth-"));
        assert!(name.ends_with(".wav"));

        drop(spooled);
        assert!(!path.exists());
    }

    #[test]
    fn concurrent_spools_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = SpooledAudio::write(b"RIFF", Some(dir.path())).unwrap();
        let b = SpooledAudio::write(b"RIFF", Some(dir.path())).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn decode_reads_spooled_wav() {
        let spooled = SpooledAudio::write(&wav_bytes(&[0, 100, 200, 300]), None).unwrap();
        let decoded = spooled.decode().unwrap();
        assert_eq!(decoded.frames(), 4);

        // Decoding twice reopens from the start.
        assert_eq!(spooled.decode().unwrap().frames(), 4);
    }

    #[test]
    fn decode_failure_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let spooled = SpooledAudio::write(b"not a wav file", Some(dir.path())).unwrap();
            assert!(matches!(
                spooled.decode(),
                Err(VoiceAuthError::InvalidAudio { .. })
            ));
            spooled.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
