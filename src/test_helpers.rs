//! Shared test utilities for the rasterkit test suite.
//!
//! Writes small synthetic images to disk so backend and handle tests can run
//! against real files without checked-in fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = tmp.path().join("photo.jpg");
//! create_test_jpeg(&path, 400, 300);
//! ```

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =========================================================================
// Synthetic image writers
// =========================================================================

/// Write an opaque gradient JPEG.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save_with_format(path, ImageFormat::Jpeg).unwrap();
}

/// Write a PNG whose left half is opaque red and right half fully
/// transparent.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

/// Write a single-frame GIF.
pub fn create_test_gif(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
    img.save_with_format(path, ImageFormat::Gif).unwrap();
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Create an empty placeholder file and return its canonical path.
///
/// Handles resolve real paths before probing, so mock-backed tests still need
/// a file to exist; the mock is then registered under the returned path.
pub fn touch(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"").unwrap();
    path.canonicalize().unwrap()
}
