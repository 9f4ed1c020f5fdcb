//! # rasterkit
//!
//! Load a raster image, transform it, and write it back out, with the pixel
//! work delegated to a swappable backend.
//!
//! ```text
//! open(path) → resize / crop / filter / watermark → save(name, dir) | render(type)
//! ```
//!
//! Opening a file only probes its size and format. Pixels are decoded on the
//! first operation that needs them, and every operation re-reads the size from
//! the backend afterwards, so [`imaging::ImageHandle::metadata`] always
//! describes the pixels the handle actually holds.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Geometry resolution, parameter clamping, the image handle, backends and driver selection |
//! | [`config`] | `rasterkit.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Corrective, Not Strict
//!
//! Out-of-range inputs are normalized, not rejected: quality and opacity are
//! clamped to 1-100, crop rectangles are pulled inside the image, and
//! watermark offsets are passed through so the backend clips the mark. The
//! only geometric input that fails is a resize with no usable dimension.
//!
//! ## One Resource Per Handle
//!
//! An [`imaging::ImageHandle`] owns at most one backend resource. Operations
//! render into a fresh canvas and swap it in, dropping the old buffer at
//! once, so a multi-step downscale never holds more than two buffers and a
//! dropped handle frees everything it owned.
//!
//! ## Backends Behind a Trait
//!
//! All pixel work goes through [`imaging::ImageBackend`]. The handle and
//! the geometry code never see pixels, which lets the whole orchestration be
//! tested against a recording mock.

pub mod config;
pub mod imaging;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
