//! One synthesis run, end to end.
//!
//! ```text
//! select inputs ─► resolve reference ─► synthesize WAV ─► convert format
//!               ─► write subtitle ─► (optional) save profile ─► cleanup
//! ```
//!
//! The resolved reference is cleaned up on every path once resolution has
//! succeeded, after the profile copy has read it.

use std::path::{Path, PathBuf};

use derive_builder::Builder;

use crate::audio::{wait_for_audio, AudioFormat, Transcoder};
use crate::catalog::{self, ModelEntry};
use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use crate::profile::{now_timestamp, sanitize_name, Gender, VoiceProfile};
use crate::resolver::{ReferenceResolver, ReferenceSource, ResolvedReference, UploadedAudio};
use crate::store::ProfileStore;
use crate::subtitle;
use crate::{SynthesisEngine, SynthesisRequest};

/// Inputs gathered from the user for one run.
#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct RunRequest {
    #[builder(setter(into))]
    pub text: String,
    /// Catalog label. Empty selects the catalog default.
    #[builder(setter(into))]
    pub language: String,
    #[builder(setter(into, strip_option))]
    pub upload: Option<UploadedAudio>,
    /// Saved profile picked as reference voice.
    #[builder(setter(into, strip_option))]
    pub profile: Option<VoiceProfile>,
    #[builder(setter(into, strip_option))]
    pub example: Option<PathBuf>,
    /// Name for a new profile. Blank = do not save one.
    #[builder(setter(into, strip_option))]
    pub save_as: Option<String>,
    pub gender: Gender,
    pub output_format: AudioFormat,
}

#[derive(Debug)]
pub struct RunOutcome {
    /// Audio in the requested format.
    pub audio_path: PathBuf,
    pub subtitle_path: PathBuf,
    pub saved_profile: Option<VoiceProfile>,
    /// Non-fatal problems to show the user.
    pub warnings: Vec<StudioError>,
}

pub struct Studio<E, T> {
    config: StudioConfig,
    engine: E,
    transcoder: T,
    resolver: ReferenceResolver<T>,
    store: ProfileStore<T>,
}

impl<E, T> Studio<E, T>
where
    E: SynthesisEngine,
    T: Transcoder + Clone,
{
    pub fn new(config: StudioConfig, engine: E, transcoder: T) -> Self {
        let resolver = ReferenceResolver::new(transcoder.clone(), config.temp_dir());
        let store = ProfileStore::from_config(&config, transcoder.clone());
        Self {
            config,
            engine,
            transcoder,
            resolver,
            store,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn store(&self) -> &ProfileStore<T> {
        &self.store
    }

    pub fn run(&mut self, request: RunRequest) -> Result<RunOutcome> {
        self.run_at(request, &now_timestamp())
    }

    /// Run with an explicit timestamp, shared by output names and the saved profile.
    pub fn run_at(&mut self, request: RunRequest, timestamp: &str) -> Result<RunOutcome> {
        if request.text.trim().is_empty() {
            return Err(StudioError::EmptyText);
        }
        let entry = if request.language.trim().is_empty() {
            catalog::default_entry()
        } else {
            catalog::find(&request.language)
                .ok_or_else(|| StudioError::UnknownLanguage(request.language.clone()))?
        };

        let source = ReferenceSource::select(
            request.upload.clone(),
            request.profile.as_ref(),
            request.example.clone(),
        );
        let resolved = self.resolver.resolve(source.as_ref())?;

        let mut result =
            self.render(&request, entry, timestamp, source.as_ref(), resolved.as_ref());

        if let Some(resolved) = &resolved {
            // A profile that fell back to the resolver's file now owns it.
            let adopted = matches!(
                &result,
                Ok(outcome) if outcome
                    .saved_profile
                    .as_ref()
                    .is_some_and(|p| p.audio_path == resolved.path)
            );
            if adopted {
                log::warn!(
                    "Profile keeps {} as its audio; not cleaning it up",
                    resolved.path.display()
                );
            } else if let Err(e) = self.resolver.cleanup(resolved) {
                log::warn!("{e}");
                if let Ok(outcome) = &mut result {
                    outcome.warnings.push(e);
                }
            }
        }

        result
    }

    fn render(
        &mut self,
        request: &RunRequest,
        entry: &ModelEntry,
        timestamp: &str,
        source: Option<&ReferenceSource>,
        resolved: Option<&ResolvedReference>,
    ) -> Result<RunOutcome> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let base = self.output_base(request, entry, timestamp);
        let wav_path = self.config.output_dir.join(format!("{base}.wav"));
        let subtitle_path = self.config.output_dir.join(format!("{base}.srt"));

        let synthesis = self.synthesis_request(request, entry, resolved);
        self.engine
            .synthesize_to_file(&synthesis, &wav_path)
            .map_err(StudioError::Synthesis)?;

        let audio_path = if request.output_format.is_canonical() {
            wav_path
        } else {
            let final_path = self
                .config
                .output_dir
                .join(format!("{base}.{}", request.output_format));
            wait_for_audio(&wav_path, &self.config)?;
            self.transcoder
                .transcode(&wav_path, &final_path, request.output_format)?
        };
        subtitle::write_placeholder(&subtitle_path, &request.text)?;
        log::info!("Audio saved to {}", audio_path.display());

        let mut outcome = RunOutcome {
            audio_path,
            subtitle_path,
            saved_profile: None,
            warnings: Vec::new(),
        };

        let name = request.save_as.as_deref().map(str::trim).unwrap_or_default();
        if let Some(resolved) = resolved.filter(|_| !name.is_empty()) {
            self.save_profile(name, request, entry, timestamp, source, resolved, &mut outcome);
        }
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn save_profile(
        &self,
        name: &str,
        request: &RunRequest,
        entry: &ModelEntry,
        timestamp: &str,
        source: Option<&ReferenceSource>,
        resolved: &ResolvedReference,
        outcome: &mut RunOutcome,
    ) {
        let upload = source.and_then(ReferenceSource::upload);
        let persisted = self.store.persist_audio(name, timestamp, resolved, upload);
        let fallback = persisted.is_fallback();
        if let Some(warning) = persisted.warning {
            outcome.warnings.push(warning);
        }

        let profile = VoiceProfile {
            name: name.to_string(),
            gender: request.gender,
            audio_path: persisted.path,
            model_id: entry.model_id.to_string(),
            language: entry.label.to_string(),
            created_at: timestamp.to_string(),
        };

        match self.store.append(profile.clone()) {
            Ok(_) => outcome.saved_profile = Some(profile),
            Err(e) => {
                log::error!("Profile '{name}' was not saved: {e}");
                if !fallback {
                    discard_orphan(&profile.audio_path);
                }
                outcome.warnings.push(e);
            }
        }
    }

    fn synthesis_request(
        &self,
        request: &RunRequest,
        entry: &ModelEntry,
        resolved: Option<&ResolvedReference>,
    ) -> SynthesisRequest {
        let reference = resolved.filter(|_| entry.supports_cloning());
        if resolved.is_some() && reference.is_none() {
            log::info!(
                "{} cannot clone voices; using its default voice",
                entry.model_id
            );
        }

        SynthesisRequest {
            text: request.text.clone(),
            model_id: entry.model_id.to_string(),
            language_code: reference.map(|_| entry.language_code.to_string()),
            reference_audio: reference.map(|r| vec![r.path.clone()]).unwrap_or_default(),
        }
    }

    /// `<voice>_<language tag>_<timestamp>`, where voice is the selected
    /// profile's name or the language label.
    fn output_base(&self, request: &RunRequest, entry: &ModelEntry, timestamp: &str) -> String {
        let voice = match &request.profile {
            Some(profile) if !profile.name.trim().is_empty() => sanitize_name(&profile.name),
            _ => sanitize_name(&entry.label.to_lowercase()),
        };
        format!("{voice}_{}_{timestamp}", entry.file_tag)
    }
}

fn discard_orphan(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        log::warn!("Could not remove unreferenced audio {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::RecordingTranscoder;
    use crate::config::StudioConfigBuilder;
    use crate::{EngineError, SynthesisResult};
    use std::collections::BTreeSet;

    /// Engine that records requests and writes a short tone.
    #[derive(Default)]
    struct FakeEngine {
        requests: Vec<SynthesisRequest>,
        fail: bool,
    }

    impl SynthesisEngine for FakeEngine {
        fn synthesize(
            &mut self,
            request: &SynthesisRequest,
        ) -> std::result::Result<SynthesisResult, EngineError> {
            self.requests.push(request.clone());
            for reference in &request.reference_audio {
                assert!(reference.exists(), "reference cleaned up too early");
            }
            if self.fail {
                return Err("engine exploded".into());
            }
            Ok(SynthesisResult {
                samples: vec![0.1; 160],
                sample_rate: 16000,
            })
        }
    }

    fn studio<'a>(
        dir: &Path,
        transcoder: &'a RecordingTranscoder,
    ) -> Studio<FakeEngine, &'a RecordingTranscoder> {
        let config = StudioConfigBuilder::default()
            .profiles_file(dir.join("perfis_modelos.json"))
            .profiles_audio_dir(dir.join("Modelos").join("perfis"))
            .output_dir(dir.join("audios"))
            .samples_dir(dir.join("exemplos"))
            .temp_dir(dir.join("tmp"))
            .build()
            .unwrap();
        Studio::new(config, FakeEngine::default(), transcoder)
    }

    fn temp_files(dir: &Path) -> usize {
        std::fs::read_dir(dir.join("tmp"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn plain_run_writes_audio_and_subtitle() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::default();
        let mut studio = studio(dir.path(), &transcoder);
        let request = RunRequestBuilder::default()
            .text("Hello there")
            .language("English")
            .build()
            .unwrap();

        let outcome = studio.run_at(request, "01-01-2025_10-00").unwrap();

        assert_eq!(
            outcome.audio_path,
            dir.path().join("audios").join("english_en_us_01-01-2025_10-00.wav")
        );
        assert!(std::fs::metadata(&outcome.audio_path).unwrap().len() > 0);
        assert_eq!(
            std::fs::read_to_string(&outcome.subtitle_path).unwrap(),
            "1\n00:00:00,000 --> 00:00:10,000\nHello there\n"
        );
        assert!(outcome.saved_profile.is_none());
        assert_eq!(transcoder.call_count(), 0);
        assert!(studio.engine.requests[0].reference_audio.is_empty());
    }

    #[test]
    fn non_wav_output_is_transcoded_from_the_wav() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::default();
        let mut studio = studio(dir.path(), &transcoder);
        let request = RunRequestBuilder::default()
            .text("Hola")
            .language("Spanish")
            .output_format(AudioFormat::Mp3)
            .build()
            .unwrap();

        let outcome = studio.run_at(request, "01-01-2025_10-00").unwrap();

        assert_eq!(outcome.audio_path.extension().unwrap(), "mp3");
        assert!(outcome.audio_path.exists());
        let (input, _, format) = transcoder.calls.borrow()[0].clone();
        assert_eq!(input.extension().unwrap(), "wav");
        assert_eq!(format, AudioFormat::Mp3);
    }

    #[test]
    fn upload_is_cloned_saved_as_profile_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::default();
        let mut studio = studio(dir.path(), &transcoder);
        let request = RunRequestBuilder::default()
            .text("Olá, mundo!")
            .language("Portuguese")
            .upload(UploadedAudio::new("ana.wav", b"RIFFana".to_vec()))
            .save_as("Ana Silva")
            .gender(Gender::Female)
            .build()
            .unwrap();

        let outcome = studio.run_at(request, "01-01-2025_10-00").unwrap();

        let sent = &studio.engine.requests[0];
        assert_eq!(sent.reference_audio.len(), 1);
        assert_eq!(sent.language_code.as_deref(), Some("pt"));
        assert_eq!(temp_files(dir.path()), 0, "temporary reference must be removed");

        let saved = outcome.saved_profile.unwrap();
        assert_eq!(
            saved.audio_path,
            dir.path()
                .join("Modelos")
                .join("perfis")
                .join("Ana_Silva_01-01-2025_10-00.wav")
        );
        assert_eq!(std::fs::read(&saved.audio_path).unwrap(), b"RIFFana");
        assert_eq!(saved.language, "Portuguese");
        assert_eq!(studio.store().load().unwrap(), vec![saved]);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn saved_profile_names_the_output_and_is_not_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::default();
        let mut studio = studio(dir.path(), &transcoder);
        let wav = dir.path().join("ana.wav");
        std::fs::write(&wav, b"RIFF").unwrap();
        let profile = VoiceProfile {
            name: "Ana Silva".into(),
            gender: Gender::Female,
            audio_path: wav.clone(),
            model_id: catalog::XTTS_V2.into(),
            language: "Portuguese".into(),
            created_at: "01-01-2025_09-00".into(),
        };
        let request = RunRequestBuilder::default()
            .text("Olá")
            .language("Portuguese")
            .profile(profile)
            .build()
            .unwrap();

        let outcome = studio.run_at(request, "01-01-2025_10-00").unwrap();

        assert_eq!(
            outcome.audio_path.file_name().unwrap(),
            "Ana_Silva_pt_br_01-01-2025_10-00.wav"
        );
        assert_eq!(studio.engine.requests[0].reference_audio, vec![wav.clone()]);
        assert!(wav.exists());
    }

    #[test]
    fn missing_reference_aborts_before_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::default();
        let mut studio = studio(dir.path(), &transcoder);
        let request = RunRequestBuilder::default()
            .text("Olá")
            .example(dir.path().join("exemplos").join("female_gone.wav"))
            .build()
            .unwrap();

        let err = studio.run_at(request, "01-01-2025_10-00").unwrap_err();

        assert!(matches!(err, StudioError::MissingReferenceFile(_)));
        assert!(studio.engine.requests.is_empty());
    }

    #[test]
    fn engine_failure_still_cleans_up_reference() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::default();
        let mut studio = studio(dir.path(), &transcoder);
        studio.engine.fail = true;
        let request = RunRequestBuilder::default()
            .text("Olá")
            .upload(UploadedAudio::new("me.mp3", b"ID3".to_vec()))
            .save_as("Me")
            .build()
            .unwrap();

        let err = studio.run_at(request, "01-01-2025_10-00").unwrap_err();

        assert!(matches!(err, StudioError::Synthesis(_)));
        assert_eq!(temp_files(dir.path()), 0);
        assert!(studio.store().load().unwrap().is_empty());
    }

    #[test]
    fn non_cloning_model_ignores_reference() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::default();
        let mut studio = studio(dir.path(), &transcoder);
        let request = RunRequestBuilder::default()
            .text("Bonjour")
            .language("French")
            .upload(UploadedAudio::new("me.wav", b"RIFF".to_vec()))
            .build()
            .unwrap();

        studio.run_at(request, "01-01-2025_10-00").unwrap();

        let sent = &studio.engine.requests[0];
        assert!(sent.reference_audio.is_empty());
        assert_eq!(sent.language_code, None);
        assert_eq!(temp_files(dir.path()), 0);
    }

    #[test]
    fn blank_text_and_unknown_language_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::default();
        let mut studio = studio(dir.path(), &transcoder);

        let blank = RunRequestBuilder::default().text("   ").build().unwrap();
        assert!(matches!(
            studio.run_at(blank, "01-01-2025_10-00"),
            Err(StudioError::EmptyText)
        ));

        let unknown = RunRequestBuilder::default()
            .text("hi")
            .language("Klingon")
            .build()
            .unwrap();
        assert!(matches!(
            studio.run_at(unknown, "01-01-2025_10-00"),
            Err(StudioError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn failed_copy_records_the_resolved_path() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::failing();
        let mut studio = studio(dir.path(), &transcoder);
        let clip = dir.path().join("narrator.wav");
        std::fs::write(&clip, b"RIFF").unwrap();
        let request = RunRequestBuilder::default()
            .text("Olá")
            .example(clip.clone())
            .save_as("Narrator")
            .build()
            .unwrap();

        let outcome = studio.run_at(request, "01-01-2025_10-00").unwrap();

        let saved = outcome.saved_profile.unwrap();
        assert_eq!(saved.audio_path, clip);
        assert!(matches!(
            outcome.warnings[0],
            StudioError::AudioCopyFailure { .. }
        ));
        assert!(clip.exists());

        studio.store().delete(&BTreeSet::from([0])).unwrap();
        assert!(studio.store().load().unwrap().is_empty());
        assert!(clip.exists(), "example clip belongs to no profile");
    }

    #[test]
    fn repeated_profile_name_in_one_minute_keeps_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = RecordingTranscoder::default();
        let mut studio = studio(dir.path(), &transcoder);

        for bytes in ["RIFFone", "RIFFtwo"] {
            let request = RunRequestBuilder::default()
                .text("Olá")
                .upload(UploadedAudio::new("ana.wav", bytes.as_bytes().to_vec()))
                .save_as("Ana")
                .build()
                .unwrap();
            studio.run_at(request, "01-01-2025_10-00").unwrap();
        }

        let stored = studio.store().load().unwrap();
        assert_ne!(stored[0].audio_path, stored[1].audio_path);
        assert_eq!(std::fs::read(&stored[0].audio_path).unwrap(), b"RIFFone");

        studio.store().delete(&BTreeSet::from([0])).unwrap();
        let remaining = studio.store().load().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(std::fs::read(&remaining[0].audio_path).unwrap(), b"RIFFtwo");
    }
}
