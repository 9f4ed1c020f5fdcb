//! Errors raised by image handles and the factory.
//!
//! Variants carry the values involved (paths, sizes, format names); the
//! `Display` text is only a default rendering for the CLI.

use super::backend::BackendError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("{} not found or is not an image", .path.display())]
    NotAnImage { path: PathBuf },
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: String },
    #[error("Missing image dimensions or dimensions are wrong (width: {width:?}, height: {height:?})")]
    InvalidDimensions {
        width: Option<i64>,
        height: Option<i64>,
    },
    #[error("{} must be an existing, writable directory", .directory.display())]
    DirectoryNotWritable { directory: PathBuf },
    #[error("Image of {width}x{height} has not been created")]
    AllocationFailed { width: u32, height: u32 },
    #[error("Unknown image driver: {name}")]
    UnknownDriver { name: String },
    #[error("Backend refused the {operation} copy")]
    OperationFailed { operation: &'static str },
    #[error("Backend error: {0}")]
    Backend(BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BackendError> for ImageError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::UnsupportedFormat(format) => ImageError::UnsupportedFormat { format },
            BackendError::AllocationFailed { width, height } => {
                ImageError::AllocationFailed { width, height }
            }
            other => ImageError::Backend(other),
        }
    }
}
