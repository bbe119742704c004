// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Letterbox normalizer: renders a page of any resolution into the fixed
// square analysis frame the vision model works on, and records where the
// content landed so frame coordinates can be mapped back.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use platemap_core::error::PlatemapError;
use platemap_core::LetterboxMetrics;
use tracing::{debug, instrument};

use crate::image::processor::{ImageProcessor, encode_jpeg};

/// A page rendered into the square analysis frame.
#[derive(Debug, Clone)]
pub struct LetterboxFrame {
    image: RgbImage,
    metrics: LetterboxMetrics,
    source_width: u32,
    source_height: u32,
}

impl LetterboxFrame {
    /// The square frame raster.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Placement of the content inside the frame.
    pub fn metrics(&self) -> LetterboxMetrics {
        self.metrics
    }

    /// Edge length of the frame in pixels.
    pub fn frame_size(&self) -> u32 {
        self.image.width()
    }

    /// Dimensions of the page before normalization.
    pub fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    /// JPEG payload for the remote collaborators.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, PlatemapError> {
        encode_jpeg(&DynamicImage::ImageRgb8(self.image.clone()), quality)
    }
}

/// Compute where an `image_w` x `image_h` image lands inside a square frame.
///
/// `scale = min(frame/w, frame/h)`; the scaled content is centred, so at most
/// one axis carries padding.
pub fn compute_metrics(
    image_w: u32,
    image_h: u32,
    frame_size: u32,
) -> Result<LetterboxMetrics, PlatemapError> {
    if image_w == 0 || image_h == 0 || frame_size == 0 {
        return Err(PlatemapError::DegenerateGeometry(format!(
            "cannot letterbox {image_w}x{image_h} into a {frame_size}px frame"
        )));
    }
    let frame = frame_size as f64;
    let scale = (frame / image_w as f64).min(frame / image_h as f64);
    let w = image_w as f64 * scale;
    let h = image_h as f64 * scale;
    Ok(LetterboxMetrics {
        x: (frame - w) / 2.0,
        y: (frame - h) / 2.0,
        w,
        h,
        scale,
    })
}

/// Render `image` into a `frame_size` square filled with `background`.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn letterbox(
    image: &DynamicImage,
    frame_size: u32,
    background: [u8; 3],
) -> Result<LetterboxFrame, PlatemapError> {
    let metrics = compute_metrics(image.width(), image.height(), frame_size)?;

    // The raster needs whole pixels; the metrics keep the exact values.
    let content_w = (metrics.w.round() as u32).clamp(1, frame_size);
    let content_h = (metrics.h.round() as u32).clamp(1, frame_size);
    let scaled = imageops::resize(&image.to_rgb8(), content_w, content_h, FilterType::Triangle);

    let mut canvas = RgbImage::from_pixel(frame_size, frame_size, Rgb(background));
    imageops::overlay(
        &mut canvas,
        &scaled,
        metrics.x.round() as i64,
        metrics.y.round() as i64,
    );

    debug!(
        x = metrics.x,
        y = metrics.y,
        w = metrics.w,
        h = metrics.h,
        scale = metrics.scale,
        "Letterbox frame built"
    );

    Ok(LetterboxFrame {
        image: canvas,
        metrics,
        source_width: image.width(),
        source_height: image.height(),
    })
}

/// Decode `data` and letterbox it. Decode failures surface as `ImageLoad`.
pub fn letterbox_bytes(
    data: &[u8],
    frame_size: u32,
    background: [u8; 3],
) -> Result<LetterboxFrame, PlatemapError> {
    let processor = ImageProcessor::from_bytes(data)?;
    letterbox(processor.as_dynamic(), frame_size, background)
}
