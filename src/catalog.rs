//! Catalog of the synthesis models offered by the studio.
//!
//! Each entry binds the language label shown to the user to a Coqui model
//! identifier, the language code passed to the engine, and the short tag used
//! in generated file names.

/// One selectable language/model combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEntry {
    /// Display label, also stored in saved profiles.
    pub label: &'static str,
    pub model_id: &'static str,
    /// Language code handed to the engine.
    pub language_code: &'static str,
    /// Tag embedded in output file names (e.g. `pt_br`).
    pub file_tag: &'static str,
}

pub const XTTS_V2: &str = "tts_models/multilingual/multi-dataset/xtts_v2";
pub const YOUR_TTS: &str = "tts_models/multilingual/multi-dataset/your_tts";

/// Models that accept a reference voice sample.
pub const CLONING_MODELS: [&str; 2] = [XTTS_V2, YOUR_TTS];

pub const MODELS: [ModelEntry; 8] = [
    ModelEntry {
        label: "Portuguese",
        model_id: XTTS_V2,
        language_code: "pt",
        file_tag: "pt_br",
    },
    ModelEntry {
        label: "English",
        model_id: "tts_models/en/ljspeech/tacotron2-DDC",
        language_code: "en",
        file_tag: "en_us",
    },
    ModelEntry {
        label: "Spanish",
        model_id: "tts_models/es/mai/tacotron2-DDC",
        language_code: "es",
        file_tag: "es_es",
    },
    ModelEntry {
        label: "German",
        model_id: "tts_models/de/thorsten/tacotron2-DCA",
        language_code: "de",
        file_tag: "de_de",
    },
    ModelEntry {
        label: "French",
        model_id: "tts_models/fr/mai/tacotron2-DDC",
        language_code: "fr",
        file_tag: "fr_fr",
    },
    ModelEntry {
        label: "Chinese",
        model_id: "tts_models/zh-CN/baker/tacotron2-DDC-GST",
        language_code: "zh",
        file_tag: "zh_cn",
    },
    ModelEntry {
        label: "Dutch",
        model_id: "tts_models/nl/mai/tacotron2-DDC",
        language_code: "nl",
        file_tag: "nl_nl",
    },
    ModelEntry {
        label: "YourTTS (multi)",
        model_id: YOUR_TTS,
        language_code: "pt",
        file_tag: "multi",
    },
];

impl ModelEntry {
    /// Whether this model can be conditioned on a reference voice.
    pub fn supports_cloning(&self) -> bool {
        CLONING_MODELS.contains(&self.model_id)
    }
}

/// Look up an entry by its display label (case-insensitive).
pub fn find(label: &str) -> Option<&'static ModelEntry> {
    MODELS
        .iter()
        .find(|entry| entry.label.eq_ignore_ascii_case(label.trim()))
}

/// The entry preselected when nothing else is chosen.
pub fn default_entry() -> &'static ModelEntry {
    &MODELS[0]
}
