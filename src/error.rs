use std::path::PathBuf;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, StudioError>;

#[derive(thiserror::Error, Debug)]
pub enum StudioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Reference audio not found: {}", .0.display())]
    MissingReferenceFile(PathBuf),
    #[error("Profile store {} is corrupt: {reason}", .path.display())]
    CorruptState { path: PathBuf, reason: String },
    #[error("Failed to save permanent reference audio {}: {reason}", .path.display())]
    AudioCopyFailure { path: PathBuf, reason: String },
    #[error("Failed to delete {}: {reason}", .path.display())]
    FileDeleteFailure { path: PathBuf, reason: String },
    #[error("Unknown language/model '{0}'. Run `voice-studio models` to list the catalog.")]
    UnknownLanguage(String),
    #[error("Text to synthesize is empty")]
    EmptyText,
    #[error("Unsupported audio format '{0}'")]
    UnsupportedFormat(String),
    #[error("'{0}' not found on PATH. Install it or set its path in the configuration.")]
    ToolNotFound(String),
    #[error("Transcoding {} failed: {reason}", .input.display())]
    Transcode { input: PathBuf, reason: String },
    #[error("Synthesized audio {} was not written", .0.display())]
    OutputNotReady(PathBuf),
    #[error("Synthesis failed: {0}")]
    Synthesis(Box<dyn std::error::Error + Send + Sync>),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StudioError {
    /// True for the kinds that are reported to the user but never abort an operation.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            StudioError::AudioCopyFailure { .. } | StudioError::FileDeleteFailure { .. }
        )
    }
}
