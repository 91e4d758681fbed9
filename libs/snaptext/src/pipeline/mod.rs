mod types;

pub use types::{PipelineError, RecognitionOutcome, UploadRequest};

use crate::ocr::{EngineConfig, Language, OcrError};
use crate::storage::{storage_name, CollisionPolicy, FilenameError, UploadStore};

const KHM_PACK_HINT: &str =
    "Khmer language (khm) may not be installed. Make sure khm.traineddata is present in the Tesseract tessdata folder.";

/// Run one upload through sanitize → store → decode → OCR → artifact.
///
/// Stages are strictly sequential; the first four abort on failure, the
/// artifact write only degrades the outcome.
pub fn run_pipeline(
    request: &UploadRequest,
    engine: &EngineConfig,
    store: &UploadStore,
    policy: CollisionPolicy,
) -> Result<RecognitionOutcome, PipelineError> {
    // Validated
    let name = storage_name(&request.filename, policy).map_err(|e| match e {
        FilenameError::Empty => PipelineError::EmptyFilename,
        FilenameError::UnsupportedType(ext) => PipelineError::UnsupportedFileType(ext),
    })?;

    let mut warnings = Vec::new();
    let (lang, coerced) = Language::coerce(request.lang.as_deref());
    if coerced {
        warnings.push(format!(
            "Unsupported language {:?}; defaulting to English.",
            request.lang.as_deref().unwrap_or_default()
        ));
    }

    let image_name = name.image_name();
    let image_path = store
        .save_image(&image_name, &request.bytes)
        .map_err(|e| PipelineError::Storage(e.to_string()))?;

    // Decoded
    let decoded = image::load_from_memory(&request.bytes)
        .map_err(|e| PipelineError::ImageDecode(e.to_string()))?;
    log::info!(
        "stored {} ({}x{} px, {} bytes)",
        image_name,
        decoded.width(),
        decoded.height(),
        request.bytes.len()
    );

    // Recognized
    let text = engine.recognize(&image_path, lang).map_err(|e| match e {
        OcrError::EngineNotFound { .. } | OcrError::EngineFailure(_) => PipelineError::Engine {
            message: e.to_string(),
            hint: (lang == Language::Khm).then(|| KHM_PACK_HINT.to_string()),
        },
        OcrError::Unknown(msg) => PipelineError::UnknownOcr(msg),
    })?;

    if text.trim().is_empty() {
        let reachable = engine.is_reachable();
        warnings.push("OCR returned no text. Ensure Tesseract is installed and the image is clear.".to_string());
        warnings.push(format!(
            "Tesseract reachable: {}. command={}",
            reachable,
            engine.command().display()
        ));
        if lang == Language::Khm {
            warnings.push(KHM_PACK_HINT.to_string());
        }
        log::warn!(
            "OCR empty for {}; engine reachable: {}",
            image_name,
            reachable
        );
    }

    // Persisted (non-fatal on failure)
    let artifact_name = name.artifact_name();
    let artifact_name = match store.write_artifact(&artifact_name, &text) {
        Ok(_) => Some(artifact_name),
        Err(e) => {
            log::warn!("could not write {}: {}", artifact_name, e);
            warnings.push("Could not save the text file; download unavailable.".to_string());
            None
        }
    };

    Ok(RecognitionOutcome {
        image_name,
        text,
        lang,
        artifact_name,
        warnings,
    })
}
