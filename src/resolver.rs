//! Reference-audio resolution.
//!
//! Turns the active reference source (an upload, a saved profile or a built-in
//! example clip) into a single canonical WAV file on disk and records whether
//! that file is a temporary owned by the current run.
//!
//! # Lifecycle
//!
//! ```text
//! resolve(source) ──► synthesize ──► persist profile audio ──► cleanup(resolved)
//! ```
//!
//! `cleanup` must run exactly once per resolved reference, after every step
//! that still reads the file, on success and failure paths alike.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::{discard_partial, AudioFormat, Transcoder};
use crate::error::{Result, StudioError};
use crate::profile::VoiceProfile;

/// An uploaded audio blob, captured once and shared by value.
///
/// The bytes are immutable; the resolver and the permanent-copy step both read
/// the same buffer, so nothing depends on re-reading an upload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAudio {
    /// Original file name; its extension identifies the encoding.
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

impl UploadedAudio {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file as if it had been uploaded.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(StudioError::MissingReferenceFile(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, bytes))
    }

    pub fn format(&self) -> Result<AudioFormat> {
        AudioFormat::from_path(Path::new(&self.file_name))
            .ok_or_else(|| StudioError::UnsupportedFormat(self.file_name.clone()))
    }
}

/// Where the reference voice of a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    Upload(UploadedAudio),
    /// Permanent audio of a saved profile.
    Profile(PathBuf),
    /// A built-in example clip.
    Example(PathBuf),
}

impl ReferenceSource {
    /// Pick the active source: upload, then saved profile, then example clip.
    pub fn select(
        upload: Option<UploadedAudio>,
        profile: Option<&VoiceProfile>,
        example: Option<PathBuf>,
    ) -> Option<Self> {
        upload
            .map(Self::Upload)
            .or_else(|| profile.map(|p| Self::Profile(p.audio_path.clone())))
            .or_else(|| example.map(Self::Example))
    }

    pub fn upload(&self) -> Option<&UploadedAudio> {
        match self {
            Self::Upload(upload) => Some(upload),
            _ => None,
        }
    }
}

/// A canonical WAV ready for the synthesis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub path: PathBuf,
    /// True when the file was created by the resolver and must be cleaned up.
    pub is_temporary: bool,
}

pub struct ReferenceResolver<T> {
    transcoder: T,
    temp_dir: PathBuf,
}

impl<T: Transcoder> ReferenceResolver<T> {
    pub fn new(transcoder: T, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            transcoder,
            temp_dir: temp_dir.into(),
        }
    }

    /// Resolve the active source. `None` means synthesis runs without a reference.
    pub fn resolve(&self, source: Option<&ReferenceSource>) -> Result<Option<ResolvedReference>> {
        let Some(source) = source else {
            log::debug!("No reference audio selected; using the model's default voice");
            return Ok(None);
        };

        let resolved = match source {
            ReferenceSource::Upload(upload) => self.resolve_upload(upload)?,
            ReferenceSource::Profile(path) => {
                ensure_exists(path)?;
                ResolvedReference {
                    path: path.clone(),
                    is_temporary: false,
                }
            }
            ReferenceSource::Example(path) => self.resolve_example(path)?,
        };

        log::info!(
            "Resolved reference audio {} (temporary: {})",
            resolved.path.display(),
            resolved.is_temporary
        );
        Ok(Some(resolved))
    }

    /// Delete a resolved reference if, and only if, the resolver created it.
    ///
    /// Safe to call more than once: an already removed file is not an error.
    pub fn cleanup(&self, resolved: &ResolvedReference) -> Result<()> {
        if !resolved.is_temporary || !resolved.path.exists() {
            return Ok(());
        }
        std::fs::remove_file(&resolved.path).map_err(|e| StudioError::FileDeleteFailure {
            path: resolved.path.clone(),
            reason: e.to_string(),
        })?;
        log::debug!("Removed temporary reference {}", resolved.path.display());
        Ok(())
    }

    fn resolve_upload(&self, upload: &UploadedAudio) -> Result<ResolvedReference> {
        let format = upload.format()?;
        let raw_path = self.write_temp(&upload.bytes, format)?;

        if format.is_canonical() {
            return Ok(ResolvedReference {
                path: raw_path,
                is_temporary: true,
            });
        }

        let wav_path = raw_path.with_extension(AudioFormat::CANONICAL.extension());
        let converted = self
            .transcoder
            .transcode(&raw_path, &wav_path, AudioFormat::CANONICAL);
        if converted.is_err() {
            discard_partial(&wav_path);
        }
        if let Err(e) = std::fs::remove_file(&raw_path) {
            log::warn!(
                "Could not remove pre-transcode upload {}: {e}",
                raw_path.display()
            );
        }

        Ok(ResolvedReference {
            path: converted?,
            is_temporary: true,
        })
    }

    fn resolve_example(&self, path: &Path) -> Result<ResolvedReference> {
        ensure_exists(path)?;
        let format = AudioFormat::from_path(path)
            .ok_or_else(|| StudioError::UnsupportedFormat(path.display().to_string()))?;

        if format.is_canonical() {
            return Ok(ResolvedReference {
                path: path.to_path_buf(),
                is_temporary: false,
            });
        }

        // Sibling of the clip: clip.mp3 -> clip.tmp.wav
        let wav_path = path.with_extension(format!("tmp.{}", AudioFormat::CANONICAL.extension()));
        match self
            .transcoder
            .transcode(path, &wav_path, AudioFormat::CANONICAL)
        {
            Ok(path) => Ok(ResolvedReference {
                path,
                is_temporary: true,
            }),
            Err(e) => {
                discard_partial(&wav_path);
                Err(e)
            }
        }
    }

    /// Write bytes to a uniquely named file that outlives this call.
    fn write_temp(&self, bytes: &[u8], format: AudioFormat) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.temp_dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("reference-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile_in(&self.temp_dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        let path = file.into_temp_path().keep().map_err(|e| StudioError::Io(e.error))?;
        Ok(path)
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(StudioError::MissingReferenceFile(path.to_path_buf()))
    }
}
