//! Audio formats and the transcoding collaborator.
//!
//! WAV is the canonical encoding: reference audio is normalized to WAV before
//! it reaches the synthesis engine or permanent storage, and the engine always
//! writes WAV. Other formats only exist at the edges (uploads, example clips,
//! delivery format of the final output).

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::thread;

use crate::config::StudioConfig;
use crate::error::{Result, StudioError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Ogg,
    Flac,
}

impl AudioFormat {
    pub const CANONICAL: AudioFormat = AudioFormat::Wav;

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "ogg" => Some(Self::Ogg),
            "flac" => Some(Self::Flac),
            _ => None,
        }
    }

    /// Detect the format of a file or upload name from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_canonical(&self) -> bool {
        *self == Self::CANONICAL
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| StudioError::UnsupportedFormat(s.to_string()))
    }
}

/// Converts an audio file into another encoding.
///
/// Implementations must write `output` completely before returning and must
/// not touch `input`.
pub trait Transcoder {
    fn transcode(&self, input: &Path, output: &Path, format: AudioFormat) -> Result<PathBuf>;
}

impl<T: Transcoder + ?Sized> Transcoder for &T {
    fn transcode(&self, input: &Path, output: &Path, format: AudioFormat) -> Result<PathBuf> {
        (**self).transcode(input, output, format)
    }
}

/// Transcoder backed by the `ffmpeg` command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    bin: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(config.ffmpeg_bin.clone())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path, output: &Path, format: AudioFormat) -> Result<PathBuf> {
        log::debug!(
            "Transcoding {} -> {} ({format})",
            input.display(),
            output.display()
        );

        let result = Command::new(&self.bin)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(input)
            .args(["-f", ffmpeg_muxer(format)])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StudioError::ToolNotFound(self.bin.display().to_string())
                } else {
                    StudioError::Io(e)
                }
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(StudioError::Transcode {
                input: input.to_path_buf(),
                reason: format!(
                    "ffmpeg exited with code {:?}: {}",
                    result.status.code(),
                    stderr.trim()
                ),
            });
        }

        Ok(output.to_path_buf())
    }
}

fn ffmpeg_muxer(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Wav => "wav",
        AudioFormat::Mp3 => "mp3",
        AudioFormat::Ogg => "ogg",
        AudioFormat::Flac => "flac",
    }
}

/// Wait until `path` exists and is non-empty.
///
/// Checks up to `config.poll_attempts` times, sleeping `config.poll_interval()`
/// between checks.
pub fn wait_for_audio(path: &Path, config: &StudioConfig) -> Result<()> {
    let attempts = config.poll_attempts.max(1);
    for attempt in 0..attempts {
        if is_non_empty(path) {
            return Ok(());
        }
        if attempt + 1 < attempts {
            thread::sleep(config.poll_interval());
        }
    }
    Err(StudioError::OutputNotReady(path.to_path_buf()))
}

/// Remove whatever a failed transcode left at `path`.
pub(crate) fn discard_partial(path: &Path) {
    if !path.exists() {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => log::debug!("Removed partial output {}", path.display()),
        Err(e) => log::warn!("Could not remove partial output {}: {e}", path.display()),
    }
}

pub(crate) fn is_non_empty(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
