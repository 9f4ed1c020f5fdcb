//! Driver selection.
//!
//! Backends are picked by name from a closed set, so an unknown name is an
//! error at parse time rather than a missing type at run time.

use super::error::ImageError;
use super::handle::ImageHandle;
use super::rust_backend::RustBackend;
use crate::config::RasterConfig;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// An image handle on the default backend.
pub type Image = ImageHandle<RustBackend>;

/// Available raster drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Driver {
    /// Pure Rust, built on the `image` crate.
    #[default]
    Rust,
}

impl Driver {
    pub const DEFAULT: Driver = Driver::Rust;

    pub fn name(self) -> &'static str {
        match self {
            Driver::Rust => "rust",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Driver {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rust" | "image" => Ok(Driver::Rust),
            _ => Err(ImageError::UnknownDriver {
                name: s.to_string(),
            }),
        }
    }
}

/// Open `path` with the named driver, or the default driver when `None`.
pub fn open(path: impl AsRef<Path>, driver: Option<&str>) -> Result<Image, ImageError> {
    let driver = match driver {
        Some(name) => name.parse()?,
        None => Driver::DEFAULT,
    };
    match driver {
        Driver::Rust => ImageHandle::open(RustBackend::new(), path),
    }
}

/// Open `path` with the driver and default save directory from `config`.
pub fn open_with_config(path: impl AsRef<Path>, config: &RasterConfig) -> Result<Image, ImageError> {
    let mut image = open(path, Some(&config.driver))?;
    image.set_image_directory(&config.image_directory);
    Ok(image)
}
