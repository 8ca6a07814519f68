//! # voice-studio
//!
//! A text-to-speech front-end pipeline with reusable voice profiles.
//!
//! ## Features
//!
//! - **Model catalog**: eight language/model choices, two of them able to clone a voice
//! - **Reference audio**: uploads, saved profiles or built-in example clips, normalized to WAV
//! - **Voice profiles**: a flat JSON store of named reference voices with owned audio files
//! - **Outputs**: synthesized audio in WAV, MP3, OGG or FLAC plus a placeholder SRT subtitle
//!
//! Synthesis and transcoding are delegated to collaborators: any
//! [`SynthesisEngine`] (the bundled one drives the Coqui `tts` CLI) and any
//! [`audio::Transcoder`] (the bundled one drives `ffmpeg`).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voice_studio::{
//!     audio::FfmpegTranscoder, config::StudioConfig, engines::coqui::CoquiCliEngine,
//!     studio::{RunRequestBuilder, Studio},
//! };
//!
//! let config = StudioConfig::default();
//! let engine = CoquiCliEngine::from_config(&config);
//! let transcoder = FfmpegTranscoder::from_config(&config);
//! let mut studio = Studio::new(config, engine, transcoder);
//!
//! let request = RunRequestBuilder::default()
//!     .text("Olá, mundo!")
//!     .language("Portuguese")
//!     .build()?;
//! let outcome = studio.run(request)?;
//! println!("Audio saved to {}", outcome.audio_path.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod catalog;
pub mod config;
pub mod engines;
pub mod error;
pub mod profile;
pub mod resolver;
pub mod samples;
pub mod store;
pub mod studio;
pub mod subtitle;

pub use error::{Result, StudioError};

use std::path::{Path, PathBuf};

/// Boxed error returned by synthesis engines.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Everything an engine needs for one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub model_id: String,
    /// Language code, only set when the model is conditioned on a reference.
    pub language_code: Option<String>,
    /// Reference voice samples (canonical WAV). Empty = the model's default voice.
    pub reference_audio: Vec<PathBuf>,
}

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug)]
pub struct SynthesisResult {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> std::result::Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Read a WAV file, downmixing to mono and normalizing integer samples to [-1, 1].
    pub fn read_wav(path: &Path) -> std::result::Result<Self, hound::Error> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let channels = spec.channels.max(1) as usize;
        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// Engines are opaque: the studio only hands them text, a model id and
/// optional reference audio. An engine must accept an empty reference list and
/// fall back to the model's default voice.
pub trait SynthesisEngine {
    /// Synthesize speech for the given request.
    fn synthesize(
        &mut self,
        request: &SynthesisRequest,
    ) -> std::result::Result<SynthesisResult, EngineError>;

    /// Synthesize speech and write it to a WAV file.
    ///
    /// Returns only once the file is completely written. Default
    /// implementation calls `synthesize()` then `SynthesisResult::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        request: &SynthesisRequest,
        wav_path: &Path,
    ) -> std::result::Result<(), EngineError> {
        self.synthesize(request)?.write_wav(wav_path)?;
        Ok(())
    }
}
