use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SelectionError;

/// Target languages offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
    Ru,
    Ja,
    Ko,
    Zh,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::It,
        Language::Pt,
        Language::Ru,
        Language::Ja,
        Language::Ko,
        Language::Zh,
    ];

    /// Code sent to the backend verbatim
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
            Language::Ru => "ru",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Zh => "zh",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
            Language::Ru => "Russian",
            Language::Ja => "Japanese",
            Language::Ko => "Korean",
            Language::Zh => "Chinese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| SelectionError::UnknownLanguage(s.to_string()))
    }
}

/// Subtitle file formats the backend can encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Ass,
}

impl SubtitleFormat {
    pub const ALL: [SubtitleFormat; 3] = [SubtitleFormat::Srt, SubtitleFormat::Vtt, SubtitleFormat::Ass];

    pub fn code(self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Ass => "ass",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "SubRip (SRT)",
            SubtitleFormat::Vtt => "WebVTT (VTT)",
            SubtitleFormat::Ass => "Advanced SubStation Alpha (ASS)",
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SubtitleFormat {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().trim_start_matches('.').to_ascii_lowercase();
        SubtitleFormat::ALL
            .into_iter()
            .find(|format| format.code() == code)
            .ok_or_else(|| SelectionError::UnknownFormat(s.to_string()))
    }
}

/// Options chosen by the user before a run. Persist across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSelection {
    pub target_language: Language,
    pub output_format: SubtitleFormat,
    pub translate: bool,
}

impl UserSelection {
    pub fn new(target_language: Language, output_format: SubtitleFormat, translate: bool) -> Self {
        Self {
            target_language,
            output_format,
            translate,
        }
    }

    /// The backend only translates when the target is not English
    pub fn translation_applies(&self) -> bool {
        self.translate && self.target_language != Language::En
    }

    pub fn summary(&self) -> String {
        format!(
            "language={} ({}), format={} ({}), translate={}",
            self.target_language.code(),
            self.target_language.name(),
            self.output_format.code(),
            self.output_format.name(),
            self.translate
        )
    }
}

impl Default for UserSelection {
    fn default() -> Self {
        Self {
            target_language: Language::En,
            output_format: SubtitleFormat::Srt,
            translate: false,
        }
    }
}
