use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudioError};

/// Paths and tool settings shared by the resolver, the store and the studio.
///
/// Defaults are relative to the working directory, matching the layout the
/// studio has always used on disk:
///
/// ```text
/// ./perfis_modelos.json     # profile records
/// ./Modelos/perfis/         # permanent profile audio
/// ./audios/                 # generated audio + subtitles
/// ./exemplos/               # built-in example clips
/// ```
///
/// ```rust
/// use voice_studio::config::StudioConfigBuilder;
///
/// let config = StudioConfigBuilder::default()
///     .output_dir("renders")
///     .use_gpu(true)
///     .build()?;
/// assert_eq!(config.output_dir.to_str(), Some("renders"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct StudioConfig {
    /// JSON file holding the ordered profile records.
    pub profiles_file: PathBuf,
    /// Directory owning the permanent audio of every profile.
    pub profiles_audio_dir: PathBuf,
    /// Directory receiving synthesized audio and subtitles.
    pub output_dir: PathBuf,
    /// Directory scanned for built-in example clips.
    pub samples_dir: PathBuf,
    /// Where temporary reference files are created. `None` = system temp dir.
    #[builder(setter(into, strip_option))]
    pub temp_dir: Option<PathBuf>,
    /// `ffmpeg` binary used for transcoding.
    pub ffmpeg_bin: PathBuf,
    /// Coqui `tts` binary used for synthesis.
    pub tts_bin: PathBuf,
    /// Ask the synthesis engine to run on the GPU when available.
    pub use_gpu: bool,
    /// How many times to check for a non-empty output before transcoding.
    pub poll_attempts: u32,
    /// Delay between two output checks, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            profiles_file: PathBuf::from("perfis_modelos.json"),
            profiles_audio_dir: PathBuf::from("Modelos").join("perfis"),
            output_dir: PathBuf::from("audios"),
            samples_dir: PathBuf::from("exemplos"),
            temp_dir: None,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            tts_bin: PathBuf::from("tts"),
            use_gpu: false,
            poll_attempts: 10,
            poll_interval_ms: 100,
        }
    }
}

impl StudioConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| StudioError::Config(format!("{}: {e}", path.display())))
    }

    /// Directory for temporary reference files.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
