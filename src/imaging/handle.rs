//! The image handle: one source file, its metadata, and at most one live
//! backend resource.
//!
//! A handle is opened from a path and only probes the file; pixels are decoded
//! the first time an operation needs them. Every mutating operation follows
//! the same shape:
//!
//! 1. resolve the request into concrete numbers ([`calculations`](super::calculations),
//!    [`params`](super::params)),
//! 2. materialize the resource if needed,
//! 3. run the backend primitive into a fresh canvas,
//! 4. swap the canvas in (dropping the old resource) and re-read the
//!    dimensions from the backend.
//!
//! Mutating operations return `&mut Self` so they chain with `?`:
//!
//! ```no_run
//! # use rasterkit::imaging::{Offset, open};
//! # fn demo() -> Result<(), rasterkit::imaging::ImageError> {
//! let mut image = open("photo.jpg", None)?;
//! image
//!     .resize(Some(800), None)?
//!     .crop(Some(600), Some(400), Offset::Center, Offset::End)?;
//! image.save(Some("photo-small"), None, 85)?;
//! # Ok(())
//! # }
//! ```

use super::backend::{Dimensions, ImageBackend, ImageType, Resample};
use super::calculations::{plan_downscale, resolve_crop, resolve_resize, resolve_watermark};
use super::error::ImageError;
use super::params::{EncodeParams, Filter, Offset, Quality, filter_arguments, resolve_encoder};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default save directory, relative to the working directory.
pub const DEFAULT_IMAGE_DIRECTORY: &str = "upload";

/// Geometry and format of the image as it currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub image_type: ImageType,
}

impl ImageMetadata {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn mime(&self) -> &'static str {
        self.image_type.mime()
    }

    pub fn extension(&self) -> &'static str {
        self.image_type.extension()
    }
}

/// Whether the handle currently holds decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unloaded,
    Loaded,
}

/// An image on disk plus whatever has been done to it so far.
///
/// The backend resource is owned exclusively by the handle and released when
/// the handle is dropped, including when an operation fails halfway.
pub struct ImageHandle<B: ImageBackend> {
    backend: B,
    file: PathBuf,
    real_path: PathBuf,
    metadata: ImageMetadata,
    resource: Option<B::Resource>,
    image_directory: PathBuf,
}

impl<B: ImageBackend> ImageHandle<B> {
    /// Probe `path` and build an unloaded handle around it.
    ///
    /// # Errors
    /// - [`ImageError::NotAnImage`] if the file is missing, cannot be probed
    ///   or reports an empty size.
    /// - [`ImageError::UnsupportedFormat`] if the backend has no decoder for
    ///   the probed type.
    pub fn open(backend: B, path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let file = path.as_ref().to_path_buf();
        let not_an_image = || ImageError::NotAnImage { path: file.clone() };

        let real_path = file.canonicalize().map_err(|err| {
            debug!(path = %file.display(), error = %err, "cannot resolve image path");
            not_an_image()
        })?;

        let probe = backend.probe(&real_path).map_err(|err| {
            debug!(path = %real_path.display(), error = %err, "probe failed");
            not_an_image()
        })?;

        if probe.dimensions.width == 0 || probe.dimensions.height == 0 {
            return Err(not_an_image());
        }

        if !backend.can_decode(probe.image_type) {
            return Err(ImageError::UnsupportedFormat {
                format: probe.image_type.extension().to_string(),
            });
        }

        debug!(
            path = %real_path.display(),
            width = probe.dimensions.width,
            height = probe.dimensions.height,
            driver = backend.name(),
            "opened image"
        );

        Ok(Self {
            backend,
            file,
            real_path,
            metadata: ImageMetadata {
                width: probe.dimensions.width,
                height: probe.dimensions.height,
                image_type: probe.image_type,
            },
            resource: None,
            image_directory: PathBuf::from(DEFAULT_IMAGE_DIRECTORY),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The path as it was given to [`open`](Self::open).
    pub fn filename(&self) -> &Path {
        &self.file
    }

    pub fn real_path(&self) -> &Path {
        &self.real_path
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn width(&self) -> u32 {
        self.metadata.width
    }

    pub fn height(&self) -> u32 {
        self.metadata.height
    }

    pub fn extension(&self) -> &'static str {
        self.metadata.extension()
    }

    pub fn mime(&self) -> &'static str {
        self.metadata.mime()
    }

    pub fn state(&self) -> HandleState {
        match self.resource {
            Some(_) => HandleState::Loaded,
            None => HandleState::Unloaded,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn image_directory(&self) -> &Path {
        &self.image_directory
    }

    /// Default directory for [`save`](Self::save) when none is passed.
    pub fn set_image_directory(&mut self, directory: impl Into<PathBuf>) -> &mut Self {
        self.image_directory = directory.into();
        self
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resize to the given width and/or height. A missing side keeps the
    /// aspect ratio.
    ///
    /// Large reductions go through cheap half-step copies first, then a
    /// single smooth copy to the exact target.
    pub fn resize(
        &mut self,
        width: Option<i64>,
        height: Option<i64>,
    ) -> Result<&mut Self, ImageError> {
        let target = resolve_resize(self.metadata.dimensions(), width, height)?;

        for step in plan_downscale(self.metadata.dimensions(), target) {
            self.resample_into(step, Resample::Fast)?;
        }
        self.resample_into(target, Resample::Smooth)?;

        Ok(self)
    }

    /// Cut a rectangle out of the image. A missing or zero side keeps the
    /// full width/height.
    pub fn crop(
        &mut self,
        width: Option<u32>,
        height: Option<u32>,
        offset_x: impl Into<Offset>,
        offset_y: impl Into<Offset>,
    ) -> Result<&mut Self, ImageError> {
        let rect = resolve_crop(
            self.metadata.dimensions(),
            width,
            height,
            offset_x.into(),
            offset_y.into(),
        );

        let (backend, source) = self.loaded()?;
        let mut canvas = backend.create_canvas(rect.width, rect.height)?;
        if !backend.crop_copy(&mut canvas, source, rect.offset_x, rect.offset_y, rect.size()) {
            return Err(ImageError::OperationFailed { operation: "crop" });
        }
        self.replace_resource(canvas);

        Ok(self)
    }

    /// Apply a filter. Arguments are passed on up to the first missing one.
    pub fn filter(
        &mut self,
        filter: Filter,
        args: [Option<i32>; 4],
    ) -> Result<&mut Self, ImageError> {
        let args = filter_arguments(args);
        let (backend, resource) = self.loaded()?;
        backend.apply_filter(resource, filter, &args)?;
        self.refresh_dimensions();

        Ok(self)
    }

    /// Draw `mark` over this image.
    ///
    /// The mark is encoded to PNG and handed to the backend as bytes, so it
    /// may come from a different backend. It is read, never modified.
    pub fn watermark<O: ImageBackend>(
        &mut self,
        mark: &ImageHandle<O>,
        offset_x: impl Into<Offset>,
        offset_y: impl Into<Offset>,
        opacity: i64,
    ) -> Result<&mut Self, ImageError> {
        let placement = resolve_watermark(
            self.metadata.dimensions(),
            mark.metadata.dimensions(),
            offset_x.into(),
            offset_y.into(),
            opacity,
        );
        if placement.opacity.value() as i64 != opacity {
            warn!(requested = opacity, used = placement.opacity.value(), "opacity clamped");
        }

        let overlay = mark.encode_snapshot(&resolve_encoder("png", Quality::default())?)?;

        let (backend, resource) = self.loaded()?;
        backend.set_alpha_blending(resource, true);
        backend.alpha_composite(
            resource,
            &overlay,
            placement.offset_x,
            placement.offset_y,
            placement.opacity,
        )?;
        self.refresh_dimensions();

        Ok(self)
    }

    /// Encode the image and write it to disk, returning the written path.
    ///
    /// Without a `name` the original file name is reused. A given name has
    /// surrounding dots stripped and gets the current type's extension.
    /// Without a `directory` the handle's image directory is used.
    ///
    /// # Errors
    /// [`ImageError::DirectoryNotWritable`] is raised before anything is
    /// decoded or encoded.
    pub fn save(
        &mut self,
        name: Option<&str>,
        directory: Option<&Path>,
        quality: i64,
    ) -> Result<PathBuf, ImageError> {
        let file_name = self.target_file_name(name);
        let directory = directory.unwrap_or(self.image_directory.as_path()).to_path_buf();
        ensure_writable(&directory)?;

        let target = directory.join(&file_name);
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let params = resolve_encoder(extension, clamped_quality(quality))?;

        let bytes = self.encode(&params)?;
        fs::write(&target, &bytes)?;
        self.update_type(params.image_type);

        info!(
            path = %target.display(),
            bytes = bytes.len(),
            encoder = params.encoder.name(),
            "saved image"
        );
        Ok(target)
    }

    /// Encode the image into memory. `image_type` defaults to the current
    /// type.
    pub fn render(&mut self, image_type: Option<&str>, quality: i64) -> Result<Vec<u8>, ImageError> {
        let extension = image_type.unwrap_or(self.metadata.extension());
        let params = resolve_encoder(extension, clamped_quality(quality))?;

        let bytes = self.encode(&params)?;
        self.update_type(params.image_type);

        Ok(bytes)
    }

    // =========================================================================
    // Resource management
    // =========================================================================

    /// The backend together with the decoded resource, decoding on first use.
    fn loaded(&mut self) -> Result<(&B, &mut B::Resource), ImageError> {
        let resource = match self.resource.take() {
            Some(resource) => resource,
            None => {
                debug!(path = %self.real_path.display(), driver = self.backend.name(), "decoding");
                self.backend.decode(&self.real_path, self.metadata.image_type)?
            }
        };
        Ok((&self.backend, self.resource.insert(resource)))
    }

    /// Swap in a new resource, releasing the previous one, and take the
    /// dimensions the backend reports for it.
    fn replace_resource(&mut self, resource: B::Resource) {
        let size = self.backend.dimensions(&resource);
        debug!(width = size.width, height = size.height, "resource replaced");
        self.resource = Some(resource);
        self.set_dimensions(size);
    }

    fn refresh_dimensions(&mut self) {
        if let Some(resource) = &self.resource {
            let size = self.backend.dimensions(resource);
            self.set_dimensions(size);
        }
    }

    fn set_dimensions(&mut self, size: Dimensions) {
        self.metadata.width = size.width;
        self.metadata.height = size.height;
    }

    fn resample_into(&mut self, size: Dimensions, resample: Resample) -> Result<(), ImageError> {
        let (backend, source) = self.loaded()?;
        let source_size = backend.dimensions(source);
        let mut canvas = backend.create_canvas(size.width, size.height)?;
        if !backend.resampled_copy(&mut canvas, source, source_size, size, resample) {
            return Err(ImageError::OperationFailed {
                operation: "resampled",
            });
        }
        self.replace_resource(canvas);
        Ok(())
    }

    fn encode(&mut self, params: &EncodeParams) -> Result<Vec<u8>, ImageError> {
        let (backend, resource) = self.loaded()?;
        Ok(backend.encode(resource, params)?)
    }

    /// Encode without touching the handle. An unloaded handle decodes into a
    /// temporary resource that is dropped right after encoding.
    fn encode_snapshot(&self, params: &EncodeParams) -> Result<Vec<u8>, ImageError> {
        match &self.resource {
            Some(resource) => Ok(self.backend.encode(resource, params)?),
            None => {
                let resource = self.backend.decode(&self.real_path, self.metadata.image_type)?;
                Ok(self.backend.encode(&resource, params)?)
            }
        }
    }

    fn update_type(&mut self, image_type: ImageType) {
        if self.metadata.image_type != image_type {
            debug!(from = ?self.metadata.image_type, to = ?image_type, "image type changed");
            self.metadata.image_type = image_type;
        }
    }

    fn target_file_name(&self, name: Option<&str>) -> String {
        let extension = self.metadata.extension();
        match name.map(|name| name.trim_matches('.')).filter(|name| !name.is_empty()) {
            Some(name) if has_extension(name, extension) => name.to_string(),
            Some(name) => format!("{name}.{extension}"),
            None => self
                .file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("image.{extension}")),
        }
    }
}

fn has_extension(name: &str, extension: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn clamped_quality(requested: i64) -> Quality {
    let quality = Quality::new(requested);
    if quality.value() as i64 != requested {
        warn!(requested, used = quality.value(), "quality clamped");
    }
    quality
}

/// Permission bits say nothing about ownership, ACLs or read-only mounts, so
/// writability is tested by creating (and immediately dropping) an anonymous
/// file in the directory.
fn ensure_writable(directory: &Path) -> Result<(), ImageError> {
    let writable = directory.is_dir() && tempfile::tempfile_in(directory).is_ok();
    if writable {
        Ok(())
    } else {
        debug!(directory = %directory.display(), "directory is not writable");
        Err(ImageError::DirectoryNotWritable {
            directory: directory.to_path_buf(),
        })
    }
}
