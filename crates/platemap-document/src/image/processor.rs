// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, downscale, and encode menu page rasters.

use image::{DynamicImage, ImageFormat};
use platemap_core::error::PlatemapError;
use tracing::{debug, info, instrument};

/// Wrapper around a single decoded menu page.
///
/// Transformations consume `self` and return a new `ImageProcessor`, so calls
/// chain:
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&upload)?
///     .downscale_to_width(1200)
///     .to_jpeg_bytes(85)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, PlatemapError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            PlatemapError::ImageLoad(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Page image loaded");
        Self::checked(img)
    }

    /// Decode raw upload bytes (JPEG, PNG, etc.).
    ///
    /// Corrupt or truncated uploads fail here with `ImageLoad`; nothing
    /// downstream runs on a partial decode.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, PlatemapError> {
        let img = image::load_from_memory(data)
            .map_err(|err| PlatemapError::ImageLoad(format!("failed to decode image: {}", err)))?;
        debug!(width = img.width(), height = img.height(), "Page image decoded from bytes");
        Self::checked(img)
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    fn checked(image: DynamicImage) -> Result<Self, PlatemapError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PlatemapError::ImageLoad("image has zero width or height".into()));
        }
        Ok(Self { image })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Shrink the image so it is at most `max_width` pixels wide, preserving
    /// aspect ratio. Narrower images pass through untouched.
    #[instrument(skip(self), fields(max_width))]
    pub fn downscale_to_width(self, max_width: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        if max_width == 0 || w <= max_width {
            return self;
        }
        let scale = max_width as f64 / w as f64;
        let new_h = ((h as f64 * scale).round() as u32).max(1);
        info!(from_w = w, from_h = h, to_w = max_width, to_h = new_h, "Downscaling upload");
        let resized = self
            .image
            .resize_exact(max_width, new_h, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    /// Lossless encoding, for frames handed to the local corner detector.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, PlatemapError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, PlatemapError> {
        encode_jpeg(&self.image, quality)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), PlatemapError> {
        self.image.save(path.as_ref()).map_err(|err| {
            PlatemapError::ImageEncode(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

/// JPEG-encode any image. Alpha is dropped; JPEG has no alpha channel.
pub(crate) fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, PlatemapError> {
    let mut buffer = Vec::new();
    let rgb = image.to_rgb8();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|err| PlatemapError::ImageEncode(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}

fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, PlatemapError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| PlatemapError::ImageEncode(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
