use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in file names and `created_at` (`01-01-2025_10-00`).
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y_%H-%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Unspecified,
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unspecified" => Ok(Self::Unspecified),
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            other => Err(format!(
                "unknown gender '{other}' (expected unspecified, male or female)"
            )),
        }
    }
}

/// A named, reusable reference voice bound to a model/language choice.
///
/// Serialized field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub name: String,
    pub gender: Gender,
    /// Permanent WAV owned by the profile store.
    pub audio_path: PathBuf,
    #[serde(rename = "model")]
    pub model_id: String,
    /// Catalog label selected when the profile was created.
    pub language: String,
    #[serde(rename = "data")]
    pub created_at: String,
}

impl VoiceProfile {
    /// Label used when listing profiles for selection.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.gender)
    }

    /// Whether the owned audio file is still present. List views use this to
    /// skip the preview instead of failing.
    pub fn audio_available(&self) -> bool {
        self.audio_path.is_file()
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }
}

/// Make a user-chosen name safe to embed in a file name.
///
/// Whitespace and path/shell-hostile characters become `_`; everything else,
/// including non-ASCII letters, is kept.
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "profile".to_string()
    } else {
        sanitized
    }
}

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn profile() -> VoiceProfile {
        VoiceProfile {
            name: "Ana Silva".into(),
            gender: Gender::Female,
            audio_path: PathBuf::from("Modelos/perfis/Ana_Silva_01-01-2025_10-00.wav"),
            model_id: "tts_models/multilingual/multi-dataset/xtts_v2".into(),
            language: "Portuguese".into(),
            created_at: "01-01-2025_10-00".into(),
        }
    }

    #[test]
    fn serializes_with_on_disk_field_names() {
        let value = serde_json::to_value(profile()).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["audio_path", "data", "gender", "language", "model", "name"]
        );
        assert_eq!(value["gender"], "female");
        assert_eq!(value["data"], "01-01-2025_10-00");
    }

    #[test]
    fn sanitize_replaces_spaces_and_separators() {
        assert_eq!(sanitize_name(" Ana Silva "), "Ana_Silva");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("João"), "João");
        assert_eq!(sanitize_name("   "), "profile");
        assert_eq!(sanitize_name(".."), "profile");
    }

    #[test]
    fn timestamp_uses_day_month_year_layout() {
        let at = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(format_timestamp::<Utc>(&at), "01-01-2025_10-00");
    }

    #[test]
    fn gender_parses_short_and_long_names() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("m".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("".parse::<Gender>().unwrap(), Gender::Unspecified);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn missing_audio_is_reported_not_fatal() {
        let p = profile();
        assert!(!p.audio_available());
        assert_eq!(p.display_label(), "Ana Silva (female)");
    }
}
