use serde::Serialize;
use thiserror::Error;

use crate::ocr::Language;

/// One incoming upload, as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Raw language code from the form; coerced to [`Language`] inside the
    /// pipeline so the substitution can be reported back.
    pub lang: Option<String>,
}

/// The single structured result of a pipeline run, independent of whether
/// the transport renders it as JSON or HTML.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionOutcome {
    pub image_name: String,
    pub text: String,
    pub lang: Language,
    /// `None` when the artifact write failed (degraded, not fatal).
    pub artifact_name: Option<String>,
    pub warnings: Vec<String>,
}

impl RecognitionOutcome {
    pub fn is_empty_text(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no file selected")]
    EmptyFilename,
    #[error("file type not allowed: .{0}")]
    UnsupportedFileType(String),
    #[error("failed to store upload: {0}")]
    Storage(String),
    #[error("failed to open image: {0}")]
    ImageDecode(String),
    #[error("OCR error from tesseract: {message}")]
    Engine {
        message: String,
        hint: Option<String>,
    },
    #[error("OCR error: {0}")]
    UnknownOcr(String),
}

impl PipelineError {
    /// Whether the fault lies with the request (4xx) or the server side (5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptyFilename | PipelineError::UnsupportedFileType(_)
        )
    }

    /// User-facing message lines, hint included.
    pub fn user_messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        if let PipelineError::Engine {
            hint: Some(hint), ..
        } = self
        {
            messages.push(hint.clone());
        }
        messages
    }
}
