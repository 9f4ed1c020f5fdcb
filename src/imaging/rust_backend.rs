//! Pure Rust raster backend built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Primitive | Crate / function |
//! |---|---|
//! | Probe | `image::ImageReader::with_guessed_format` + `into_dimensions` |
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image` crate (pure Rust decoders), held as RGBA8 |
//! | Resampled copy | `image::imageops::resize` (`Nearest` for half-steps, `Lanczos3` final) |
//! | Crop copy | `image::imageops::crop_imm` |
//! | Composite | `image::imageops::overlay` (blending on) / `replace` (blending off) |
//! | Filters | `imageops` colour ops, `blur`, `filter3x3` kernels |
//! | Encode → JPEG / PNG / GIF | `JpegEncoder`, `PngEncoder`, `GifEncoder` |

use super::backend::{BackendError, Dimensions, ImageBackend, ImageType, Probe, Resample};
use super::params::{EncodeParams, Encoder, Filter, Opacity};
use image::buffer::ConvertBuffer;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, Frame, ImageEncoder, ImageFormat, ImageReader, RgbImage, RgbaImage};
use std::path::Path;

/// Decoded pixels plus the drawing mode for later composites.
pub struct Raster {
    pixels: RgbaImage,
    alpha_blending: bool,
}

impl Raster {
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn alpha_blending(&self) -> bool {
        self.alpha_blending
    }
}

/// Raster backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-primitive mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn image_type_of(format: ImageFormat) -> Option<ImageType> {
    match format {
        ImageFormat::Jpeg => Some(ImageType::Jpeg),
        ImageFormat::Gif => Some(ImageType::Gif),
        ImageFormat::Png => Some(ImageType::Png),
        ImageFormat::WebP => Some(ImageType::WebP),
        ImageFormat::Tiff => Some(ImageType::Tiff),
        _ => None,
    }
}

fn format_of(image_type: ImageType) -> ImageFormat {
    match image_type {
        ImageType::Jpeg => ImageFormat::Jpeg,
        ImageType::Gif => ImageFormat::Gif,
        ImageType::Png => ImageFormat::Png,
        ImageType::WebP => ImageFormat::WebP,
        ImageType::Tiff => ImageFormat::Tiff,
    }
}

/// Draw `top` onto `dst` at (`x`, `y`), honouring the blending flag.
fn draw(dst: &mut Raster, top: &RgbaImage, x: i64, y: i64) {
    if dst.alpha_blending {
        imageops::overlay(&mut dst.pixels, top, x, y);
    } else {
        imageops::replace(&mut dst.pixels, top, x, y);
    }
}

/// Run a 3x3 kernel over the colour channels, leaving alpha untouched.
fn convolve(pixels: &RgbaImage, kernel: &[f32; 9]) -> RgbaImage {
    let mut filtered = imageops::filter3x3(pixels, kernel);
    for (out, src) in filtered.pixels_mut().zip(pixels.pixels()) {
        out.0[3] = src.0[3];
    }
    filtered
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn arg(args: &[i32], index: usize, default: i32) -> i32 {
    args.get(index).copied().unwrap_or(default)
}

/// A colour-channel offset, limited to what can change an 8-bit channel.
fn channel_arg(args: &[i32], index: usize) -> i32 {
    arg(args, index, 0).clamp(-255, 255)
}

fn png_compression(level: Option<u32>) -> CompressionType {
    match level {
        Some(0..=3) => CompressionType::Fast,
        Some(4..=6) | None => CompressionType::Default,
        Some(_) => CompressionType::Best,
    }
}

impl ImageBackend for RustBackend {
    type Resource = Raster;

    fn name(&self) -> &'static str {
        "rust"
    }

    fn can_decode(&self, image_type: ImageType) -> bool {
        format_of(image_type).reading_enabled()
    }

    fn probe(&self, path: &Path) -> Result<Probe, BackendError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let image_type = reader
            .format()
            .and_then(image_type_of)
            .ok_or_else(|| BackendError::UnsupportedFormat(path.display().to_string()))?;
        let (width, height) = reader.into_dimensions().map_err(|e| BackendError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Probe {
            dimensions: Dimensions::new(width, height),
            image_type,
        })
    }

    fn decode(&self, path: &Path, image_type: ImageType) -> Result<Raster, BackendError> {
        let format = format_of(image_type);
        if !format.reading_enabled() {
            return Err(BackendError::UnsupportedFormat(
                image_type.extension().to_string(),
            ));
        }
        let mut reader = ImageReader::open(path)?;
        reader.set_format(format);
        let decoded = reader.decode().map_err(|e| BackendError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), ?image_type, "decoded image");
        Ok(Raster {
            pixels: decoded.into_rgba8(),
            alpha_blending: false,
        })
    }

    fn create_canvas(&self, width: u32, height: u32) -> Result<Raster, BackendError> {
        let failed = || BackendError::AllocationFailed { width, height };
        if width == 0 || height == 0 {
            return Err(failed());
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(failed)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| failed())?;
        buf.resize(len, 0);
        let pixels = RgbaImage::from_raw(width, height, buf).ok_or_else(failed)?;
        Ok(Raster {
            pixels,
            alpha_blending: false,
        })
    }

    fn dimensions(&self, resource: &Raster) -> Dimensions {
        Dimensions::new(resource.pixels.width(), resource.pixels.height())
    }

    fn resampled_copy(
        &self,
        dst: &mut Raster,
        src: &Raster,
        src_size: Dimensions,
        dst_size: Dimensions,
        resample: Resample,
    ) -> bool {
        let dst_full = self.dimensions(dst);
        if src_size != self.dimensions(src)
            || dst_size.width > dst_full.width
            || dst_size.height > dst_full.height
        {
            return false;
        }
        let filter = match resample {
            Resample::Fast => FilterType::Nearest,
            Resample::Smooth => FilterType::Lanczos3,
        };
        let scaled = imageops::resize(&src.pixels, dst_size.width, dst_size.height, filter);
        draw(dst, &scaled, 0, 0);
        true
    }

    fn crop_copy(
        &self,
        dst: &mut Raster,
        src: &Raster,
        offset_x: u32,
        offset_y: u32,
        size: Dimensions,
    ) -> bool {
        let src_full = self.dimensions(src);
        let fits_x = offset_x
            .checked_add(size.width)
            .is_some_and(|end| end <= src_full.width);
        let fits_y = offset_y
            .checked_add(size.height)
            .is_some_and(|end| end <= src_full.height);
        if !fits_x || !fits_y {
            return false;
        }
        let region =
            imageops::crop_imm(&src.pixels, offset_x, offset_y, size.width, size.height).to_image();
        draw(dst, &region, 0, 0);
        true
    }

    fn apply_filter(
        &self,
        resource: &mut Raster,
        filter: Filter,
        args: &[i32],
    ) -> Result<(), BackendError> {
        let pixels = &mut resource.pixels;
        match filter {
            Filter::Negate => imageops::invert(pixels),
            Filter::Grayscale => {
                for pixel in pixels.pixels_mut() {
                    let [r, g, b, a] = pixel.0;
                    let luma = to_channel(0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32);
                    pixel.0 = [luma, luma, luma, a];
                }
            }
            Filter::Brightness => *pixels = imageops::brighten(&*pixels, channel_arg(args, 0)),
            // Negative levels raise contrast.
            Filter::Contrast => {
                let level = arg(args, 0, 0).clamp(-100, 100);
                *pixels = imageops::contrast(&*pixels, -level as f32)
            }
            Filter::Colorize => {
                let (dr, dg, db) = (channel_arg(args, 0), channel_arg(args, 1), channel_arg(args, 2));
                // Alpha argument uses the 0 (opaque) to 127 (clear) scale.
                let fade = arg(args, 3, 0).clamp(0, 127) as f32 / 127.0;
                for pixel in pixels.pixels_mut() {
                    let [r, g, b, a] = pixel.0;
                    pixel.0 = [
                        to_channel((r as i32 + dr) as f32),
                        to_channel((g as i32 + dg) as f32),
                        to_channel((b as i32 + db) as f32),
                        to_channel(a as f32 * (1.0 - fade)),
                    ];
                }
            }
            Filter::EdgeDetect => {
                *pixels = convolve(&*pixels, &[-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0])
            }
            Filter::Emboss => {
                *pixels = convolve(&*pixels, &[-2.0, -1.0, 0.0, -1.0, 1.0, 1.0, 0.0, 1.0, 2.0])
            }
            Filter::GaussianBlur => *pixels = imageops::blur(&*pixels, 1.0),
            Filter::SelectiveBlur => *pixels = imageops::blur(&*pixels, 0.5),
            Filter::MeanRemoval => {
                *pixels = convolve(&*pixels, &[-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0])
            }
            Filter::Smooth => {
                let weight = arg(args, 0, 1) as f32;
                *pixels = convolve(&*pixels, &[1.0, 1.0, 1.0, 1.0, weight, 1.0, 1.0, 1.0, 1.0])
            }
            Filter::Pixelate => {
                let block = arg(args, 0, 1).max(1) as u32;
                let (w, h) = pixels.dimensions();
                let coarse = imageops::resize(
                    &*pixels,
                    (w / block).max(1),
                    (h / block).max(1),
                    FilterType::Nearest,
                );
                *pixels = imageops::resize(&coarse, w, h, FilterType::Nearest);
            }
        }
        tracing::debug!(%filter, ?args, "applied filter");
        Ok(())
    }

    fn set_alpha_blending(&self, resource: &mut Raster, enabled: bool) {
        resource.alpha_blending = enabled;
    }

    fn alpha_composite(
        &self,
        dst: &mut Raster,
        overlay: &[u8],
        offset_x: i64,
        offset_y: i64,
        opacity: Opacity,
    ) -> Result<(), BackendError> {
        let mut top = image::load_from_memory(overlay)
            .map_err(|e| BackendError::Decode {
                path: "<overlay>".to_string(),
                reason: e.to_string(),
            })?
            .into_rgba8();
        if opacity.value() < 100 {
            let factor = opacity.factor();
            for pixel in top.pixels_mut() {
                pixel.0[3] = to_channel(pixel.0[3] as f32 * factor);
            }
        }
        draw(dst, &top, offset_x, offset_y);
        Ok(())
    }

    fn encode(&self, resource: &Raster, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let pixels = &resource.pixels;
        let (width, height) = pixels.dimensions();
        let failed = |e: image::ImageError| {
            BackendError::ProcessingFailed(format!("{} encode failed: {e}", params.encoder.name()))
        };

        let mut bytes = Vec::new();
        match params.encoder {
            Encoder::Jpeg => {
                // JPEG has no alpha channel.
                let rgb: RgbImage = pixels.convert();
                let quality = params.quality.unwrap_or(100).clamp(1, 100) as u8;
                JpegEncoder::new_with_quality(&mut bytes, quality)
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(failed)?;
            }
            Encoder::Png => {
                PngEncoder::new_with_quality(
                    &mut bytes,
                    png_compression(params.quality),
                    PngFilter::Adaptive,
                )
                .write_image(pixels.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(failed)?;
            }
            Encoder::Gif => {
                let mut encoder = GifEncoder::new(&mut bytes);
                encoder
                    .encode_frame(Frame::new(pixels.clone()))
                    .map_err(failed)?;
            }
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{Quality, resolve_encoder};
    use crate::test_helpers::{create_test_gif, create_test_jpeg, create_test_png};
    use image::Rgba;

    fn solid(backend: &RustBackend, w: u32, h: u32, color: [u8; 4]) -> Raster {
        let mut raster = backend.create_canvas(w, h).unwrap();
        for pixel in raster.pixels.pixels_mut() {
            pixel.0 = color;
        }
        raster
    }

    #[test]
    fn probe_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let probe = RustBackend::new().probe(&path).unwrap();
        assert_eq!(probe.dimensions, Dimensions::new(200, 150));
        assert_eq!(probe.image_type, ImageType::Jpeg);
    }

    #[test]
    fn probe_detects_content_not_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("actually-png.jpg");
        create_test_png(&path, 30, 20);

        let probe = RustBackend::new().probe(&path).unwrap();
        assert_eq!(probe.image_type, ImageType::Png);
    }

    #[test]
    fn probe_nonexistent_file_errors() {
        let result = RustBackend::new().probe(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn probe_text_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.png");
        std::fs::write(&path, "definitely not pixels").unwrap();

        assert!(RustBackend::new().probe(&path).is_err());
    }

    #[test]
    fn decodes_compiled_in_formats() {
        let backend = RustBackend::new();
        for ty in [ImageType::Jpeg, ImageType::Png, ImageType::Gif] {
            assert!(backend.can_decode(ty), "expected a decoder for {ty:?}");
        }
    }

    #[test]
    fn decode_gif_to_rgba() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("anim.gif");
        create_test_gif(&path, 16, 8);

        let backend = RustBackend::new();
        let raster = backend.decode(&path, ImageType::Gif).unwrap();
        assert_eq!(backend.dimensions(&raster), Dimensions::new(16, 8));
        assert!(!raster.alpha_blending());
    }

    #[test]
    fn canvas_is_transparent() {
        let backend = RustBackend::new();
        let canvas = backend.create_canvas(3, 2).unwrap();
        assert_eq!(backend.dimensions(&canvas), Dimensions::new(3, 2));
        assert!(canvas.pixels().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn canvas_of_zero_size_fails() {
        let result = RustBackend::new().create_canvas(0, 5);
        assert!(matches!(
            result,
            Err(BackendError::AllocationFailed {
                width: 0,
                height: 5
            })
        ));
    }

    #[test]
    fn resampled_copy_scales_into_canvas() {
        let backend = RustBackend::new();
        let src = solid(&backend, 40, 20, [200, 10, 10, 255]);
        let mut dst = backend.create_canvas(10, 5).unwrap();

        let ok = backend.resampled_copy(
            &mut dst,
            &src,
            Dimensions::new(40, 20),
            Dimensions::new(10, 5),
            Resample::Smooth,
        );
        assert!(ok);
        let [r, g, b, a] = dst.pixels().get_pixel(5, 2).0;
        assert!(r.abs_diff(200) <= 1 && g.abs_diff(10) <= 1 && b.abs_diff(10) <= 1);
        assert_eq!(a, 255);
    }

    #[test]
    fn resampled_copy_refuses_mismatched_source_size() {
        let backend = RustBackend::new();
        let src = solid(&backend, 40, 20, [1, 2, 3, 255]);
        let mut dst = backend.create_canvas(10, 5).unwrap();
        assert!(!backend.resampled_copy(
            &mut dst,
            &src,
            Dimensions::new(41, 20),
            Dimensions::new(10, 5),
            Resample::Fast,
        ));
    }

    #[test]
    fn crop_copy_takes_region() {
        let backend = RustBackend::new();
        let mut src = solid(&backend, 10, 10, [0, 0, 0, 255]);
        src.pixels.put_pixel(7, 8, Rgba([255, 255, 255, 255]));
        let mut dst = backend.create_canvas(3, 2).unwrap();

        assert!(backend.crop_copy(&mut dst, &src, 6, 7, Dimensions::new(3, 2)));
        assert_eq!(dst.pixels().get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
        assert_eq!(dst.pixels().get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn crop_copy_refuses_out_of_bounds() {
        let backend = RustBackend::new();
        let src = solid(&backend, 10, 10, [0, 0, 0, 255]);
        let mut dst = backend.create_canvas(5, 5).unwrap();
        assert!(!backend.crop_copy(&mut dst, &src, 6, 0, Dimensions::new(5, 5)));
    }

    #[test]
    fn negate_inverts_colour_keeps_alpha() {
        let backend = RustBackend::new();
        let mut raster = solid(&backend, 2, 2, [10, 20, 30, 128]);
        backend.apply_filter(&mut raster, Filter::Negate, &[]).unwrap();
        assert_eq!(raster.pixels().get_pixel(0, 0), &Rgba([245, 235, 225, 128]));
    }

    #[test]
    fn grayscale_equalises_channels() {
        let backend = RustBackend::new();
        let mut raster = solid(&backend, 2, 2, [255, 0, 0, 255]);
        backend.apply_filter(&mut raster, Filter::Grayscale, &[]).unwrap();
        let [r, g, b, a] = raster.pixels().get_pixel(1, 1).0;
        assert_eq!((r, g, b, a), (76, 76, 76, 255));
    }

    #[test]
    fn brightness_uses_first_argument() {
        let backend = RustBackend::new();
        let mut raster = solid(&backend, 2, 2, [100, 100, 100, 255]);
        backend
            .apply_filter(&mut raster, Filter::Brightness, &[20])
            .unwrap();
        assert_eq!(raster.pixels().get_pixel(0, 0), &Rgba([120, 120, 120, 255]));
    }

    #[test]
    fn colorize_offsets_channels() {
        let backend = RustBackend::new();
        let mut raster = solid(&backend, 1, 1, [100, 100, 250, 255]);
        backend
            .apply_filter(&mut raster, Filter::Colorize, &[50, -150, 50])
            .unwrap();
        assert_eq!(raster.pixels().get_pixel(0, 0), &Rgba([150, 0, 255, 255]));
    }

    #[test]
    fn extreme_arguments_saturate() {
        let backend = RustBackend::new();
        let mut raster = solid(&backend, 2, 2, [10, 10, 10, 255]);

        backend
            .apply_filter(&mut raster, Filter::Colorize, &[i32::MAX, i32::MIN, i32::MAX, i32::MIN])
            .unwrap();
        assert_eq!(raster.pixels().get_pixel(0, 0), &Rgba([255, 0, 255, 255]));

        backend
            .apply_filter(&mut raster, Filter::Brightness, &[i32::MIN])
            .unwrap();
        assert_eq!(raster.pixels().get_pixel(0, 0), &Rgba([0, 0, 0, 255]));

        backend
            .apply_filter(&mut raster, Filter::Brightness, &[i32::MAX])
            .unwrap();
        assert_eq!(raster.pixels().get_pixel(1, 1), &Rgba([255, 255, 255, 255]));

        for level in [i32::MIN, i32::MAX] {
            backend
                .apply_filter(&mut raster, Filter::Contrast, &[level])
                .unwrap();
        }
        assert!(raster.pixels().pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn edge_detect_keeps_opacity() {
        let backend = RustBackend::new();
        let mut raster = solid(&backend, 4, 4, [90, 90, 90, 255]);
        backend
            .apply_filter(&mut raster, Filter::EdgeDetect, &[])
            .unwrap();
        assert!(raster.pixels().pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn pixelate_keeps_size() {
        let backend = RustBackend::new();
        let mut raster = solid(&backend, 9, 7, [1, 2, 3, 255]);
        backend
            .apply_filter(&mut raster, Filter::Pixelate, &[4])
            .unwrap();
        assert_eq!(backend.dimensions(&raster), Dimensions::new(9, 7));
    }

    fn encoded_png(color: [u8; 4], w: u32, h: u32) -> Vec<u8> {
        let backend = RustBackend::new();
        let raster = solid(&backend, w, h, color);
        let params = resolve_encoder("png", Quality::default()).unwrap();
        backend.encode(&raster, &params).unwrap()
    }

    #[test]
    fn composite_with_blending_mixes_by_opacity() {
        let backend = RustBackend::new();
        let mut base = solid(&backend, 4, 4, [0, 0, 0, 255]);
        backend.set_alpha_blending(&mut base, true);
        let overlay = encoded_png([255, 255, 255, 255], 2, 2);

        backend
            .alpha_composite(&mut base, &overlay, 1, 1, Opacity::new(50))
            .unwrap();

        let [r, _, _, a] = base.pixels().get_pixel(1, 1).0;
        assert!((120..=135).contains(&r), "half-opaque white over black, got {r}");
        assert_eq!(a, 255);
        assert_eq!(base.pixels().get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn composite_clips_overhanging_overlay() {
        let backend = RustBackend::new();
        let mut base = solid(&backend, 4, 4, [0, 0, 0, 255]);
        backend.set_alpha_blending(&mut base, true);
        let overlay = encoded_png([255, 0, 0, 255], 3, 3);

        backend
            .alpha_composite(&mut base, &overlay, -2, 3, Opacity::default())
            .unwrap();

        assert_eq!(base.pixels().get_pixel(0, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(base.pixels().get_pixel(1, 2), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn composite_rejects_garbage_overlay() {
        let backend = RustBackend::new();
        let mut base = solid(&backend, 4, 4, [0, 0, 0, 255]);
        let result = backend.alpha_composite(&mut base, b"nope", 0, 0, Opacity::default());
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn encode_produces_requested_formats() {
        let backend = RustBackend::new();
        let raster = solid(&backend, 12, 9, [30, 60, 90, 255]);

        for (ext, format) in [
            ("jpg", ImageFormat::Jpeg),
            ("png", ImageFormat::Png),
            ("gif", ImageFormat::Gif),
        ] {
            let params = resolve_encoder(ext, Quality::new(85)).unwrap();
            let bytes = backend.encode(&raster, &params).unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), format);
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (12, 9));
        }
    }

    #[test]
    fn png_keeps_transparency() {
        let bytes = encoded_png([10, 20, 30, 0], 2, 2);
        let decoded = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    }
}
