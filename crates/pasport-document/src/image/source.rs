// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoded source photographs and the lookup seam through which the export
// pipeline resolves a slot's image identifier.

use std::collections::HashMap;
use std::fmt;

use image::{DynamicImage, RgbaImage};
use pasport_core::error::{PasportError, Result};
use pasport_core::types::ImageId;
use tracing::{debug, info, instrument};

/// An immutable decoded photograph.
///
/// Pixels are held as straight-alpha RGBA8 regardless of the encoded format.
/// Rendering only ever borrows it.
pub struct SourceImage {
    pixels: RgbaImage,
}

impl SourceImage {
    // -- Construction ---------------------------------------------------------

    /// Decode a photograph from encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            PasportError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Self::from_dynamic(img)
    }

    /// Load a photograph from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            PasportError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Self::from_dynamic(img)
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        Self::from_rgba(image.into_rgba8())
    }

    /// Wrap an RGBA buffer. Zero-sized buffers are rejected.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(PasportError::ImageError(format!(
                "image has no pixels ({}x{})",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Borrow the pixel buffer.
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Resolves image identifiers to decoded photographs.
///
/// Implemented by whatever holds the card's images for the duration of an
/// export. A `None` is not an error: the slot is printed blank.
pub trait ImageSource {
    fn source_image(&self, id: &ImageId) -> Option<&SourceImage>;
}

impl ImageSource for HashMap<ImageId, SourceImage> {
    fn source_image(&self, id: &ImageId) -> Option<&SourceImage> {
        self.get(id)
    }
}

/// An in-memory set of decoded photographs keyed by identifier.
#[derive(Debug, Default)]
pub struct ImageLibrary {
    images: HashMap<ImageId, SourceImage>,
}

impl ImageLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a photograph, replacing any previous one with the same id.
    pub fn insert(&mut self, id: ImageId, image: SourceImage) {
        self.images.insert(id, image);
    }

    pub fn get(&self, id: &ImageId) -> Option<&SourceImage> {
        self.images.get(id)
    }

    pub fn contains(&self, id: &ImageId) -> bool {
        self.images.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageSource for ImageLibrary {
    fn source_image(&self, id: &ImageId) -> Option<&SourceImage> {
        self.get(id)
    }
}
