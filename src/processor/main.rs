use anyhow::{Context, Result};
use clap::Parser;
use snaptext::common::init_logger_exe;
use snaptext::ocr::{EngineConfig, Language};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "A CLI tool to extract text from an image", long_about = None)]
struct Cli {
    #[arg(help = "input image (png, jpg, jpeg, tiff, bmp, gif)")]
    image: PathBuf,
    #[arg(long, default_value = "eng", help = "OCR language: eng or khm")]
    lang: String,
    #[arg(long, help = "path to the tesseract binary (overrides TESSERACT_CMD)")]
    tesseract_cmd: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logger_exe();
    let cli = Cli::parse();

    let engine = match cli.tesseract_cmd {
        Some(cmd) => EngineConfig::with_command(cmd),
        None => EngineConfig::from_env(),
    };

    let (lang, coerced) = Language::coerce(Some(cli.lang.as_str()));
    if coerced {
        log::warn!("Unsupported language {:?}; defaulting to English.", cli.lang);
    }

    // Fail on unreadable images before shelling out to the engine.
    image::open(&cli.image)
        .with_context(|| format!("failed to open image {}", cli.image.display()))?;

    let text = engine.recognize(&cli.image, lang)?;

    if text.trim().is_empty() {
        log::warn!(
            "OCR returned no text. Tesseract reachable: {}. command={}",
            engine.is_reachable(),
            engine.command().display()
        );
        if lang == Language::Khm {
            log::warn!("If using Khmer, make sure khm.traineddata is present in the Tesseract tessdata folder.");
        }
    }

    println!("{}", text);
    Ok(())
}
