//! Speech synthesis engines.
//!
//! This module contains implementations of the [`SynthesisEngine`](crate::SynthesisEngine)
//! collaborator.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `coqui` - Coqui TTS through its `tts` command-line tool (enabled by default)

#[cfg(feature = "coqui")]
pub mod coqui;
