//! Image processing behind a swappable raster backend.
//!
//! | Operation | Where it is resolved | Backend primitive |
//! |---|---|---|
//! | **Open** | [`ImageHandle::open`] | `probe` |
//! | **Resize** | [`resolve_resize`] + [`plan_downscale`] | `create_canvas` + `resampled_copy` |
//! | **Crop** | [`resolve_crop`] | `create_canvas` + `crop_copy` |
//! | **Filter** | [`filter_arguments`] | `apply_filter` |
//! | **Watermark** | [`resolve_watermark`] | `set_alpha_blending` + `alpha_composite` |
//! | **Save / render** | [`resolve_encoder`] | `encode` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry (unit testable)
//! - **Parameters**: Clamped values, offsets, encoders and filters
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Handle**: [`ImageHandle`], sequencing calculations and backend calls
//! - **Factory**: driver selection by name

pub mod backend;
mod calculations;
mod error;
mod factory;
mod handle;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, ImageType, Probe, Resample};
pub use calculations::{
    CropRect, WatermarkPlacement, plan_downscale, resolve_crop, resolve_offset, resolve_resize,
    resolve_watermark,
};
pub use error::ImageError;
pub use factory::{Driver, Image, open, open_with_config};
pub use handle::{DEFAULT_IMAGE_DIRECTORY, HandleState, ImageHandle, ImageMetadata};
pub use params::{
    EncodeParams, Encoder, Filter, Offset, Opacity, PNG_COMPRESSION_LEVEL, Quality,
    filter_arguments, resolve_encoder,
};
pub use rust_backend::RustBackend;
