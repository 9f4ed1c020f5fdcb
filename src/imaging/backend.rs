//! Raster backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the only boundary to pixel-level work:
//! probing, decoding, canvas allocation, resampled and cropped copies,
//! filters, alpha compositing and encoding. Everything above it
//! ([`calculations`](super::calculations), [`params`](super::params),
//! [`handle`](super::handle)) is backend-agnostic.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Each backend owns the representation of its pixel buffers through
//! the associated [`ImageBackend::Resource`] type; callers never look inside.

use super::params::{EncodeParams, Filter, Opacity};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Could not allocate a {width}x{height} canvas")]
    AllocationFailed { width: u32, height: u32 },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Width and height of an image or canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Raster formats the library can identify.
///
/// Only JPEG, GIF and PNG can be written (see
/// [`resolve_encoder`](super::params::resolve_encoder)); WebP and TIFF are
/// accepted as inputs when the backend can decode them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Jpeg,
    Gif,
    Png,
    WebP,
    Tiff,
}

impl ImageType {
    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageType::Jpeg => "jpg",
            ImageType::Gif => "gif",
            ImageType::Png => "png",
            ImageType::WebP => "webp",
            ImageType::Tiff => "tiff",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageType::Jpeg => "image/jpeg",
            ImageType::Gif => "image/gif",
            ImageType::Png => "image/png",
            ImageType::WebP => "image/webp",
            ImageType::Tiff => "image/tiff",
        }
    }

    /// Match a file extension (case-insensitive, leading dot allowed).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageType::Jpeg),
            "gif" => Some(ImageType::Gif),
            "png" => Some(ImageType::Png),
            "webp" => Some(ImageType::WebP),
            "tif" | "tiff" => Some(ImageType::Tiff),
            _ => None,
        }
    }
}

/// Result of probing a file: geometry and format, no pixels decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub dimensions: Dimensions,
    pub image_type: ImageType,
}

/// Sampling quality for [`ImageBackend::resampled_copy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resample {
    /// Nearest-neighbour; used for the intermediate half-step reductions.
    Fast,
    /// Full-quality resampling for the final copy.
    Smooth,
}

/// Primitive raster operations every backend must provide.
///
/// Resources are exclusively owned by whoever holds them; dropping a resource
/// releases it. Copy primitives write into a caller-supplied destination
/// canvas and report `false` if the copy could not be performed.
pub trait ImageBackend {
    /// Opaque pixel buffer owned by one image handle at a time.
    type Resource;

    /// Short driver name, used in logs.
    fn name(&self) -> &'static str;

    /// Whether this backend has a decoder for the given type.
    fn can_decode(&self, image_type: ImageType) -> bool;

    /// Read dimensions and format without decoding pixels.
    fn probe(&self, path: &Path) -> Result<Probe, BackendError>;

    /// Decode a file into a new resource.
    fn decode(&self, path: &Path, image_type: ImageType) -> Result<Self::Resource, BackendError>;

    /// Allocate a transparent canvas with alpha blending disabled.
    fn create_canvas(&self, width: u32, height: u32) -> Result<Self::Resource, BackendError>;

    /// Current size of a resource.
    fn dimensions(&self, resource: &Self::Resource) -> Dimensions;

    /// Scale the whole of `src` (`src_size`) into the top-left `dst_size`
    /// region of `dst`.
    fn resampled_copy(
        &self,
        dst: &mut Self::Resource,
        src: &Self::Resource,
        src_size: Dimensions,
        dst_size: Dimensions,
        resample: Resample,
    ) -> bool;

    /// Copy the `size` rectangle of `src` at (`offset_x`, `offset_y`) to the
    /// origin of `dst`.
    fn crop_copy(
        &self,
        dst: &mut Self::Resource,
        src: &Self::Resource,
        offset_x: u32,
        offset_y: u32,
        size: Dimensions,
    ) -> bool;

    /// Apply a filter in place. `args` holds between zero and four values;
    /// their meaning depends on the filter.
    fn apply_filter(
        &self,
        resource: &mut Self::Resource,
        filter: Filter,
        args: &[i32],
    ) -> Result<(), BackendError>;

    /// Enable or disable alpha blending for later draws onto `resource`.
    fn set_alpha_blending(&self, resource: &mut Self::Resource, enabled: bool);

    /// Decode `overlay` (an encoded image) and draw it onto `dst`. Offsets
    /// may be negative or run past the edge; the overlay is clipped.
    fn alpha_composite(
        &self,
        dst: &mut Self::Resource,
        overlay: &[u8],
        offset_x: i64,
        offset_y: i64,
        opacity: Opacity,
    ) -> Result<(), BackendError>;

    /// Encode a resource into an in-memory buffer.
    fn encode(
        &self,
        resource: &Self::Resource,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError>;
}
