use std::io::Cursor;
use std::path::Path;

use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }
}

/// Temporary audio file for a single request.
///
/// The file is named `<uuid>.<ext>` and is removed from disk when the
/// artifact is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct AudioArtifact {
    file: NamedTempFile,
    filename: String,
    format: AudioFormat,
}

impl AudioArtifact {
    pub fn create(dir: &Path, format: AudioFormat) -> Result<Self, AppError> {
        let id = Uuid::new_v4().to_string();
        let suffix = format!(".{}", format.extension());

        let file = tempfile::Builder::new()
            .prefix(&id)
            .suffix(&suffix)
            .rand_bytes(0)
            .tempfile_in(dir)?;

        Ok(Self {
            file,
            filename: format!("{}{}", id, suffix),
            format,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Read back whatever the engine wrote.
    pub async fn read(&self) -> Result<Vec<u8>, AppError> {
        Ok(tokio::fs::read(self.path()).await?)
    }
}

/// Length of a WAV payload in seconds, if the header is readable.
pub fn wav_duration_seconds(wav: &[u8]) -> Option<f32> {
    let reader = hound::WavReader::new(Cursor::new(wav)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    Some(reader.duration() as f32 / spec.sample_rate as f32)
}
