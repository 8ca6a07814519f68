//! Coqui TTS engine driven through the `tts` command-line tool.
//!
//! # System Requirements
//!
//! The Coqui `tts` CLI must be installed (`pip install TTS`) and either on
//! PATH or configured via [`StudioConfig::tts_bin`](crate::config::StudioConfig).
//! Models are downloaded by Coqui on first use.
//!
//! # Voice cloning
//!
//! When a request carries reference audio, every sample is passed through
//! `--speaker_wav` and the language through `--language_idx`. Without a
//! reference the model's default voice is used.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use voice_studio::{engines::coqui::CoquiCliEngine, SynthesisEngine, SynthesisRequest};
//!
//! let mut engine = CoquiCliEngine::new("tts");
//! let request = SynthesisRequest {
//!     text: "Hello, world!".into(),
//!     model_id: "tts_models/en/ljspeech/tacotron2-DDC".into(),
//!     language_code: None,
//!     reference_audio: Vec::new(),
//! };
//! engine.synthesize_to_file(&request, Path::new("hello.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::audio::is_non_empty;
use crate::config::StudioConfig;
use crate::error::StudioError;
use crate::{EngineError, SynthesisEngine, SynthesisRequest, SynthesisResult};

pub struct CoquiCliEngine {
    bin: PathBuf,
    use_gpu: bool,
    scratch_dir: PathBuf,
}

impl CoquiCliEngine {
    /// Create an engine running `bin` on the CPU.
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            use_gpu: false,
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self {
            bin: config.tts_bin.clone(),
            use_gpu: config.use_gpu,
            scratch_dir: config.temp_dir(),
        }
    }

    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    fn command_args(&self, request: &SynthesisRequest, out_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--text".into(),
            request.text.as_str().into(),
            "--model_name".into(),
            request.model_id.as_str().into(),
            "--out_path".into(),
            out_path.into(),
        ];

        if !request.reference_audio.is_empty() {
            args.push("--speaker_wav".into());
            args.extend(request.reference_audio.iter().map(OsString::from));
            if let Some(lang) = &request.language_code {
                args.push("--language_idx".into());
                args.push(lang.into());
            }
        }

        if self.use_gpu {
            args.push("--use_cuda".into());
            args.push("true".into());
        }
        args
    }
}

impl SynthesisEngine for CoquiCliEngine {
    fn synthesize(
        &mut self,
        request: &SynthesisRequest,
    ) -> Result<SynthesisResult, EngineError> {
        std::fs::create_dir_all(&self.scratch_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("coqui-")
            .suffix(".wav")
            .tempfile_in(&self.scratch_dir)?
            .into_temp_path();

        self.synthesize_to_file(request, &scratch)?;
        Ok(SynthesisResult::read_wav(&scratch)?)
    }

    fn synthesize_to_file(
        &mut self,
        request: &SynthesisRequest,
        wav_path: &Path,
    ) -> Result<(), EngineError> {
        log::info!(
            "Synthesizing {} chars with {} ({} reference samples)",
            request.text.chars().count(),
            request.model_id,
            request.reference_audio.len()
        );

        let output = Command::new(&self.bin)
            .args(self.command_args(request, wav_path))
            .env("COQUI_TOS_AGREED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StudioError::ToolNotFound(self.bin.display().to_string())
                } else {
                    StudioError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} exited with code {:?}: {}",
                self.bin.display(),
                output.status.code(),
                stderr.trim()
            )
            .into());
        }

        if !is_non_empty(wav_path) {
            return Err(StudioError::OutputNotReady(wav_path.to_path_buf()).into());
        }
        Ok(())
    }
}
