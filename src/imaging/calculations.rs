//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any I/O or images. They
//! turn partial user input (missing dimensions, sentinel offsets, raw opacity)
//! into concrete numbers the backend can execute.

use super::backend::Dimensions;
use super::error::ImageError;
use super::params::{Offset, Opacity};

/// Resolve the target size of a resize.
///
/// Either side may be omitted (or zero) and is then derived from the other
/// so the aspect ratio is kept. Both results are rounded and never smaller
/// than 1.
///
/// # Errors
/// [`ImageError::InvalidDimensions`] when neither side is given or a side is
/// negative.
///
/// # Examples
/// ```
/// # use rasterkit::imaging::{Dimensions, resolve_resize};
/// // 400x300 → 200 wide keeps 4:3
/// let target = resolve_resize(Dimensions::new(400, 300), Some(200), None).unwrap();
/// assert_eq!(target, Dimensions::new(200, 150));
/// ```
pub fn resolve_resize(
    source: Dimensions,
    width: Option<i64>,
    height: Option<i64>,
) -> Result<Dimensions, ImageError> {
    let w = width.unwrap_or(0);
    let h = height.unwrap_or(0);

    if (w == 0 && h == 0) || w < 0 || h < 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }

    let (src_w, src_h) = (source.width as f64, source.height as f64);
    let (mut w, mut h) = (w as f64, h as f64);

    if w == 0.0 {
        w = h * src_w / src_h;
    }
    if h == 0.0 {
        h = w / (src_w / src_h);
    }

    Ok(Dimensions::new(round_at_least_one(w), round_at_least_one(h)))
}

fn round_at_least_one(value: f64) -> u32 {
    value.round().clamp(1.0, u32::MAX as f64) as u32
}

/// Plan the cheap half-step reductions that precede a large downscale.
///
/// Only applies when the target is smaller than half the source on both
/// axes. Each step halves the previous size and no step goes below 110% of
/// the target, so the final smooth resample always has some slack to work
/// with. Returns an empty plan when no reduction is worthwhile.
pub fn plan_downscale(source: Dimensions, target: Dimensions) -> Vec<Dimensions> {
    let mut steps = Vec::new();

    let (mut w, mut h) = (source.width as f64, source.height as f64);
    if target.width as f64 >= w / 2.0 || target.height as f64 >= h / 2.0 {
        return steps;
    }

    let floor_w = (target.width as f64 * 1.1).round();
    let floor_h = (target.height as f64 * 1.1).round();

    while w / 2.0 > floor_w && h / 2.0 > floor_h {
        w /= 2.0;
        h /= 2.0;
        steps.push(Dimensions::new(round_at_least_one(w), round_at_least_one(h)));
    }

    steps
}

/// Resolve an [`Offset`] on one axis, given the source length and the length
/// of the thing being placed. The result may be negative or exceed the free
/// space; callers decide whether to clamp.
pub fn resolve_offset(source: u32, size: u32, offset: Offset) -> i64 {
    let free = source as i64 - size as i64;
    match offset {
        Offset::Center => (free as f64 / 2.0).round() as i64,
        Offset::End => free,
        Offset::Px(px) if px < 0 => free + px,
        Offset::Px(px) => px,
    }
}

/// A crop rectangle that lies entirely inside its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl CropRect {
    pub fn size(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Resolve a crop request against the source size.
///
/// A missing or zero width/height means "the whole axis". Oversized requests
/// are capped to the source, offsets are resolved per [`resolve_offset`] and
/// kept inside the image, and finally the size shrinks (the offset never
/// moves) so that `offset + size <= source` on each axis.
pub fn resolve_crop(
    source: Dimensions,
    width: Option<u32>,
    height: Option<u32>,
    offset_x: Offset,
    offset_y: Offset,
) -> CropRect {
    let (x, width) = crop_axis(source.width, width, offset_x);
    let (y, height) = crop_axis(source.height, height, offset_y);
    CropRect {
        width,
        height,
        offset_x: x,
        offset_y: y,
    }
}

fn crop_axis(source: u32, requested: Option<u32>, offset: Offset) -> (u32, u32) {
    let size = match requested {
        Some(0) | None => source,
        Some(size) => size.min(source),
    };
    let last = source.saturating_sub(1) as i64;
    let start = resolve_offset(source, size, offset).clamp(0, last) as u32;
    (start, size.min(source - start))
}

/// Where and how strongly to draw a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkPlacement {
    pub offset_x: i64,
    pub offset_y: i64,
    pub opacity: Opacity,
}

/// Resolve watermark placement on `source` for a mark of size `mark`.
///
/// Offsets follow the same rules as crop offsets but are not clamped: a mark
/// hanging over the edge is clipped when drawn. Opacity is clamped to 1-100.
pub fn resolve_watermark(
    source: Dimensions,
    mark: Dimensions,
    offset_x: Offset,
    offset_y: Offset,
    opacity: i64,
) -> WatermarkPlacement {
    WatermarkPlacement {
        offset_x: resolve_offset(source.width, mark.width, offset_x),
        offset_y: resolve_offset(source.height, mark.height, offset_y),
        opacity: Opacity::new(opacity),
    }
}
