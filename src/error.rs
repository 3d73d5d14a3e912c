//! Crate-level error type and `Result` alias for structured error handling.
//! Wraps underlying I/O, decode, resize and encode failures, and provides
//! semantic variants for clustering and consistency checks.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JPEG encode error: {0}")]
    Encode(#[from] jpeg_encoder::EncodingError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resize error: {0}")]
    Resize(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Insufficient data: {context}")]
    InsufficientData { context: String },

    #[error("Consistency error: {detail}")]
    Consistency { detail: String },

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Image {width}x{height} is too small to align to the output grid")]
    DegenerateImage { width: u32, height: u32 },

    #[error("Processing error: {0}")]
    Processing(String),
}

impl Error {
    pub fn resize<E: std::fmt::Display>(e: E) -> Self {
        Error::Resize(e.to_string())
    }

    pub fn insufficient(context: impl Into<String>) -> Self {
        Error::InsufficientData {
            context: context.into(),
        }
    }
}
