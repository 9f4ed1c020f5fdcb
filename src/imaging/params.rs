//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the [`handle`](super::handle) (which decides what to do
//! with an image) and the [`backend`](super::backend) (which does the pixel
//! work). Every out-of-range input is normalised here rather than rejected.
//!
//! ## Types
//!
//! - [`Quality`]: Encoding quality (1–100, default 100). Clamped on construction.
//! - [`Opacity`]: Watermark opacity (1–100, default 100). Clamped on construction.
//! - [`Offset`]: Placement along one axis: centred, flush with the far edge, or a signed pixel position.
//! - [`Encoder`] / [`EncodeParams`]: The output encoder table and its effective settings.
//! - [`Filter`]: The closed set of filters a backend applies.

use super::backend::ImageType;
use super::error::ImageError;
use std::fmt;
use std::str::FromStr;

/// Clamp any integer into the closed range 1..=100.
fn percent(value: i64) -> u32 {
    value.clamp(1, 100) as u32
}

/// Quality setting for image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: i64) -> Self {
        Self(percent(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Watermark opacity (1-100). 100 draws the overlay unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opacity(u32);

impl Opacity {
    pub fn new(value: i64) -> Self {
        Self(percent(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Opacity as a multiplier in `0.01..=1.0`.
    pub fn factor(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(100)
    }
}

/// Position along one axis, relative to the free space on that axis.
///
/// - [`Offset::Center`] centres the content (rounded to the nearest pixel).
/// - [`Offset::End`] places it flush against the right/bottom edge.
/// - [`Offset::Px`] with `n >= 0` is an absolute position; with `n < 0` it is
///   measured back from the right/bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Offset {
    #[default]
    Center,
    End,
    Px(i64),
}

impl From<i64> for Offset {
    fn from(px: i64) -> Self {
        Offset::Px(px)
    }
}

impl From<bool> for Offset {
    fn from(flag: bool) -> Self {
        if flag { Offset::End } else { Offset::Px(0) }
    }
}

impl From<Option<i64>> for Offset {
    fn from(px: Option<i64>) -> Self {
        px.map_or(Offset::Center, Offset::Px)
    }
}

impl FromStr for Offset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(Offset::Center),
            "end" | "right" | "bottom" | "true" => Ok(Offset::End),
            other => other
                .parse::<i64>()
                .map(Offset::Px)
                .map_err(|_| format!("invalid offset '{s}': expected center, end or an integer")),
        }
    }
}

/// Encoders available for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    Jpeg,
    Gif,
    Png,
}

impl Encoder {
    pub fn name(self) -> &'static str {
        match self {
            Encoder::Jpeg => "jpeg",
            Encoder::Gif => "gif",
            Encoder::Png => "png",
        }
    }
}

/// PNG compression level used for every PNG write. Compression in PNG is
/// lossless, so the requested quality has no bearing on it.
pub const PNG_COMPRESSION_LEVEL: u32 = 9;

/// Fully resolved encoder settings.
///
/// `quality` is the encoder-specific knob: JPEG quality, PNG compression
/// level, or `None` for GIF which has neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub encoder: Encoder,
    pub image_type: ImageType,
    pub quality: Option<u32>,
}

/// Map an extension or type name to its encoder, canonical type and
/// effective quality.
///
/// Matching is case-insensitive and tolerates a leading dot. Anything outside
/// jpg/jpeg, gif and png is [`ImageError::UnsupportedFormat`].
pub fn resolve_encoder(extension: &str, quality: Quality) -> Result<EncodeParams, ImageError> {
    let unsupported = || ImageError::UnsupportedFormat {
        format: extension.to_string(),
    };
    let image_type = ImageType::from_extension(extension).ok_or_else(unsupported)?;
    let (encoder, quality) = match image_type {
        ImageType::Jpeg => (Encoder::Jpeg, Some(quality.value())),
        ImageType::Gif => (Encoder::Gif, None),
        ImageType::Png => (Encoder::Png, Some(PNG_COMPRESSION_LEVEL)),
        ImageType::WebP | ImageType::Tiff => return Err(unsupported()),
    };
    Ok(EncodeParams {
        encoder,
        image_type,
        quality,
    })
}

/// Pixel filters a backend can apply.
///
/// Arguments travel separately as `&[i32]`:
///
/// | Filter | Arguments |
/// |---|---|
/// | `Brightness` | level (-255..255) |
/// | `Contrast` | level (-100..100, negative raises contrast) |
/// | `Colorize` | red, green, blue, alpha offsets |
/// | `Smooth` | centre weight |
/// | `Pixelate` | block size |
/// | others | none |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Negate,
    Grayscale,
    Brightness,
    Contrast,
    Colorize,
    EdgeDetect,
    Emboss,
    GaussianBlur,
    SelectiveBlur,
    MeanRemoval,
    Smooth,
    Pixelate,
}

impl Filter {
    pub const ALL: [Filter; 12] = [
        Filter::Negate,
        Filter::Grayscale,
        Filter::Brightness,
        Filter::Contrast,
        Filter::Colorize,
        Filter::EdgeDetect,
        Filter::Emboss,
        Filter::GaussianBlur,
        Filter::SelectiveBlur,
        Filter::MeanRemoval,
        Filter::Smooth,
        Filter::Pixelate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Filter::Negate => "negate",
            Filter::Grayscale => "grayscale",
            Filter::Brightness => "brightness",
            Filter::Contrast => "contrast",
            Filter::Colorize => "colorize",
            Filter::EdgeDetect => "edgedetect",
            Filter::Emboss => "emboss",
            Filter::GaussianBlur => "gaussian-blur",
            Filter::SelectiveBlur => "selective-blur",
            Filter::MeanRemoval => "mean-removal",
            Filter::Smooth => "smooth",
            Filter::Pixelate => "pixelate",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Filter::ALL
            .into_iter()
            .find(|filter| filter.name().replace('-', "") == wanted)
            .ok_or_else(|| format!("unknown filter '{s}'"))
    }
}

/// Collect the filter arguments that were actually supplied.
///
/// Arguments are positional, so the list ends at the first missing one:
/// `[Some(1), None, Some(3), None]` forwards only `[1]`.
pub fn filter_arguments(args: [Option<i32>; 4]) -> Vec<i32> {
    args.into_iter().map_while(|arg| arg).collect()
}
