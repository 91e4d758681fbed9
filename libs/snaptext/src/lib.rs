pub mod common;
pub mod ocr;
pub mod pipeline;
pub mod storage;
