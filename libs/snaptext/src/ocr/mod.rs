mod engine;
mod types;

pub use engine::EngineConfig;
pub use types::{Language, OcrError};
