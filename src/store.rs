//! Flat-file store of voice profiles and custody of their audio.
//!
//! Profiles are kept as an ordered JSON array. Order is insertion order and
//! is the only addressing scheme: a profile's position is its identity.
//!
//! ```text
//! perfis_modelos.json          [ {name, gender, audio_path, model, language, data}, ... ]
//! Modelos/perfis/<name>_<ts>.wav      (<name>_<ts>_2.wav, ... on collision)
//! ```
//!
//! The store owns only the files under its audio directory. A profile whose
//! audio lives elsewhere (a copy-failure fallback) keeps that file untouched
//! when it is deleted.
//!
//! A single active session is assumed. Concurrent writers are not detected;
//! the last `save` wins.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::audio::{discard_partial, AudioFormat, Transcoder};
use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use crate::profile::{sanitize_name, VoiceProfile};
use crate::resolver::{ResolvedReference, UploadedAudio};

/// Outcome of copying reference audio into permanent storage.
#[derive(Debug)]
pub struct PersistedAudio {
    /// Path to record in the profile.
    pub path: PathBuf,
    /// Set when the copy failed and `path` is the resolver's file instead.
    pub warning: Option<StudioError>,
}

impl PersistedAudio {
    pub fn is_fallback(&self) -> bool {
        self.warning.is_some()
    }
}

/// Outcome of a multi-profile deletion.
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Removed profiles, highest index first.
    pub removed: Vec<VoiceProfile>,
    /// Audio files that could not be removed.
    pub warnings: Vec<StudioError>,
}

pub struct ProfileStore<T> {
    file: PathBuf,
    audio_dir: PathBuf,
    transcoder: T,
}

impl<T: Transcoder> ProfileStore<T> {
    pub fn new(file: impl Into<PathBuf>, audio_dir: impl Into<PathBuf>, transcoder: T) -> Self {
        Self {
            file: file.into(),
            audio_dir: audio_dir.into(),
            transcoder,
        }
    }

    pub fn from_config(config: &StudioConfig, transcoder: T) -> Self {
        Self::new(
            config.profiles_file.clone(),
            config.profiles_audio_dir.clone(),
            transcoder,
        )
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Load all profiles in stored order. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<VoiceProfile>> {
        if !self.file.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.file)?;
        serde_json::from_str(&content).map_err(|e| StudioError::CorruptState {
            path: self.file.clone(),
            reason: e.to_string(),
        })
    }

    /// Replace the stored sequence, preserving the given order.
    ///
    /// The new content is written to a sibling temporary file and renamed over
    /// the old one, so readers never observe a half-written store.
    pub fn save(&self, profiles: &[VoiceProfile]) -> Result<()> {
        let parent = match self.file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        serde_json::to_writer_pretty(&mut tmp, profiles)?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.persist(&self.file).map_err(|e| StudioError::Io(e.error))?;

        log::debug!("Saved {} profiles to {}", profiles.len(), self.file.display());
        Ok(())
    }

    /// Append a profile and return its position.
    pub fn append(&self, profile: VoiceProfile) -> Result<usize> {
        let mut profiles = self.load()?;
        log::info!("Saving profile '{}'", profile.name);
        profiles.push(profile);
        self.save(&profiles)?;
        Ok(profiles.len() - 1)
    }

    /// Permanent audio path for a profile: `<sanitized name>_<timestamp>.wav`.
    ///
    /// This is the preferred name; `persist_audio` appends `_2`, `_3`, ...
    /// when it is already taken.
    pub fn permanent_audio_path(&self, name: &str, timestamp: &str) -> PathBuf {
        self.numbered_audio_path(name, timestamp, 1)
    }

    fn numbered_audio_path(&self, name: &str, timestamp: &str, n: u32) -> PathBuf {
        let stem = match n {
            1 => format!("{}_{timestamp}", sanitize_name(name)),
            n => format!("{}_{timestamp}_{n}", sanitize_name(name)),
        };
        self.audio_dir
            .join(format!("{stem}.{}", AudioFormat::CANONICAL.extension()))
    }

    /// Whether `path` is audio this store created and may delete.
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.audio_dir)
    }

    /// Copy a resolved reference into permanent storage.
    ///
    /// A canonical upload is written verbatim from its buffered bytes; any
    /// other reference is rendered from the resolved (canonical) file. The
    /// target never overwrites another profile's audio. Never fails: on error
    /// the resolver's path is returned with a warning.
    pub fn persist_audio(
        &self,
        name: &str,
        timestamp: &str,
        resolved: &ResolvedReference,
        upload: Option<&UploadedAudio>,
    ) -> PersistedAudio {
        match self.copy_into(name, timestamp, resolved, upload) {
            Ok(target) => {
                log::info!("Stored reference audio at {}", target.display());
                PersistedAudio {
                    path: target,
                    warning: None,
                }
            }
            Err(e) => {
                let target = self.permanent_audio_path(name, timestamp);
                log::warn!(
                    "Could not store reference audio at {}: {e}; keeping {}",
                    target.display(),
                    resolved.path.display()
                );
                PersistedAudio {
                    path: resolved.path.clone(),
                    warning: Some(StudioError::AudioCopyFailure {
                        path: target,
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }

    fn copy_into(
        &self,
        name: &str,
        timestamp: &str,
        resolved: &ResolvedReference,
        upload: Option<&UploadedAudio>,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.audio_dir)?;
        let (target, mut file) = self.reserve_audio_path(name, timestamp)?;

        let canonical_upload =
            upload.filter(|u| u.format().is_ok_and(|format| format.is_canonical()));
        let written = match canonical_upload {
            Some(upload) => file.write_all(&upload.bytes).map_err(StudioError::from),
            None => {
                drop(file);
                self.transcoder
                    .transcode(&resolved.path, &target, AudioFormat::CANONICAL)
                    .map(|_| ())
            }
        };

        match written {
            Ok(()) => Ok(target),
            Err(e) => {
                discard_partial(&target);
                Err(e)
            }
        }
    }

    /// Create the first free numbered audio file for `name` at `timestamp`.
    fn reserve_audio_path(&self, name: &str, timestamp: &str) -> Result<(PathBuf, File)> {
        let mut n = 1;
        loop {
            let candidate = self.numbered_audio_path(name, timestamp, n);
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Delete the profiles at `indices` together with the audio they own.
    ///
    /// Indices refer to positions in the stored sequence before deletion and
    /// are processed from highest to lowest so pending positions never shift.
    /// Only files inside the store's audio directory that no remaining
    /// profile points at are removed. A file that cannot be removed is
    /// reported in the returned warnings and does not keep its record alive.
    /// The store is saved once at the end.
    pub fn delete(&self, indices: &BTreeSet<usize>) -> Result<DeleteReport> {
        let mut profiles = self.load()?;
        let mut report = DeleteReport::default();

        for &idx in indices.iter().rev() {
            if idx >= profiles.len() {
                log::warn!("Ignoring profile index {idx}: only {} stored", profiles.len());
                continue;
            }

            let profile = profiles.remove(idx);
            log::info!("Deleted profile '{}' at position {idx}", profile.name);
            report.removed.push(profile);
        }

        for profile in &report.removed {
            let path = &profile.audio_path;
            if !self.owns(path) {
                log::info!("Keeping {}: not stored by this profile store", path.display());
                continue;
            }
            if profiles.iter().any(|p| &p.audio_path == path) {
                log::info!("Keeping {}: still used by another profile", path.display());
                continue;
            }
            if let Err(e) = remove_audio(path) {
                log::warn!("{e}");
                report.warnings.push(e);
            }
        }

        self.save(&profiles)?;
        Ok(report)
    }
}

fn remove_audio(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::remove_file(path).map_err(|e| StudioError::FileDeleteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
