use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Languages the service exposes. Anything else coerces to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Eng,
    Khm,
}

impl Language {
    pub const ALL: &'static [Language] = &[Language::Eng, Language::Khm];

    /// Tesseract language identifier.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Eng => "eng",
            Language::Khm => "khm",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Eng => "English",
            Language::Khm => "Khmer",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "eng" => Some(Language::Eng),
            "khm" => Some(Language::Khm),
            _ => None,
        }
    }

    /// Resolve a user-supplied code, falling back to the default. The second
    /// value reports whether a fallback happened so callers can surface it.
    pub fn coerce(code: Option<&str>) -> (Self, bool) {
        match code {
            None | Some("") => (Language::default(), false),
            Some(code) => match Language::from_code(code) {
                Some(lang) => (lang, false),
                None => (Language::default(), true),
            },
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("tesseract not found at `{command}` (install tesseract-ocr or set TESSERACT_CMD)")]
    EngineNotFound { command: String },
    #[error("{0}")]
    EngineFailure(String),
    #[error("unexpected OCR failure: {0}")]
    Unknown(String),
}
