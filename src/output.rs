//! CLI output formatting.
//!
//! Formatters return lines (or a JSON string) instead of printing, so the
//! exact output is unit testable; `main` does the printing.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! photo.jpg
//!     Size: 400x300
//!     Type: jpg (image/jpeg)
//! ```
//!
//! ## Save
//!
//! ```text
//! photo.jpg → upload/photo-small.jpg (200x150, image/jpeg)
//! ```

use crate::imaging::ImageMetadata;
use serde::Serialize;
use std::path::Path;

/// Serializable view of an image for `info --json`.
#[derive(Debug, Serialize)]
pub struct InfoReport<'a> {
    pub file: &'a Path,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "type")]
    pub extension: &'static str,
    pub mime: &'static str,
}

impl<'a> InfoReport<'a> {
    pub fn new(file: &'a Path, metadata: &ImageMetadata) -> Self {
        Self {
            file,
            width: metadata.width,
            height: metadata.height,
            extension: metadata.extension(),
            mime: metadata.mime(),
        }
    }
}

pub fn format_info(file: &Path, metadata: &ImageMetadata) -> Vec<String> {
    vec![
        file.display().to_string(),
        format!("    Size: {}x{}", metadata.width, metadata.height),
        format!("    Type: {} ({})", metadata.extension(), metadata.mime()),
    ]
}

pub fn format_info_json(file: &Path, metadata: &ImageMetadata) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&InfoReport::new(file, metadata))
}

pub fn format_saved(source: &Path, target: &Path, metadata: &ImageMetadata) -> String {
    format!(
        "{} → {} ({}x{}, {})",
        source.display(),
        target.display(),
        metadata.width,
        metadata.height,
        metadata.mime()
    )
}

pub fn print_info(file: &Path, metadata: &ImageMetadata) {
    for line in format_info(file, metadata) {
        println!("{}", line);
    }
}
