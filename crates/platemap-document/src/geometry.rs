// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate mapping between the analysis frame and percent space.
//
// Every mapping takes the `LetterboxMetrics` of the frame the coordinates were
// produced against. Mixing metrics from two different frames silently shifts
// geometry, so the metrics travel with the frame rather than being recomputed.

use platemap_core::error::PlatemapError;
use platemap_core::{CoordSpace, CornerSet, LetterboxMetrics, PERCENT_MAX, Point, Rect};

/// Upper bound of the frame coordinate vocabulary the models answer in.
pub const FRAME_SCALE: f64 = 1000.0;

/// Percent-of-content to frame pixel: `pct/100 * content + padding`.
pub fn to_normalized_frame(pct: f64, padding_px: f64, content_dim_px: f64) -> f64 {
    pct / PERCENT_MAX * content_dim_px + padding_px
}

/// Frame pixel to percent-of-content: `(px - padding) / content * 100`.
///
/// Callers must reject `content_dim_px <= 0` first; see [`ensure_usable`].
pub fn from_normalized_frame(frame_px: f64, padding_px: f64, content_dim_px: f64) -> f64 {
    (frame_px - padding_px) / content_dim_px * PERCENT_MAX
}

/// Reject metrics that would divide by zero or propagate NaN.
pub fn ensure_usable(metrics: &LetterboxMetrics) -> Result<(), PlatemapError> {
    if metrics.is_degenerate() {
        return Err(PlatemapError::DegenerateGeometry(format!(
            "letterbox content {}x{} at ({}, {})",
            metrics.w, metrics.h, metrics.x, metrics.y
        )));
    }
    Ok(())
}

/// Project a percent-space rect into frame pixels. No clamping.
pub fn rect_to_frame(rect: &Rect, metrics: &LetterboxMetrics) -> Result<Rect, PlatemapError> {
    ensure_usable(metrics)?;
    Ok(Rect::new(
        to_normalized_frame(rect.x, metrics.x, metrics.w),
        to_normalized_frame(rect.y, metrics.y, metrics.h),
        rect.w / PERCENT_MAX * metrics.w,
        rect.h / PERCENT_MAX * metrics.h,
    ))
}

/// Project a frame-pixel rect into percent space. No clamping.
pub fn rect_from_frame(rect: &Rect, metrics: &LetterboxMetrics) -> Result<Rect, PlatemapError> {
    ensure_usable(metrics)?;
    if !rect.is_finite() {
        return Err(PlatemapError::DegenerateGeometry(format!("non-finite rect {rect:?}")));
    }
    Ok(Rect::new(
        from_normalized_frame(rect.x, metrics.x, metrics.w),
        from_normalized_frame(rect.y, metrics.y, metrics.h),
        rect.w / metrics.w * PERCENT_MAX,
        rect.h / metrics.h * PERCENT_MAX,
    ))
}

/// Keep a percent rect on the page: origin within `[0, 99.5]`, size at least
/// 0.5 and never past the right/bottom edge.
pub fn clamp_percent_rect(rect: &Rect) -> Rect {
    let x = rect.x.clamp(0.0, 99.5);
    let y = rect.y.clamp(0.0, 99.5);
    let w = rect.w.clamp(0.5, PERCENT_MAX).min(PERCENT_MAX - x);
    let h = rect.h.clamp(0.5, PERCENT_MAX).min(PERCENT_MAX - y);
    Rect::new(x, y, w, h)
}

/// Frame-space counterpart of [`clamp_percent_rect`]: origin within
/// `[0, 999]`, size at least one pixel.
pub fn clamp_frame_rect(rect: &Rect) -> Rect {
    let x = rect.x.clamp(0.0, FRAME_SCALE - 1.0);
    let y = rect.y.clamp(0.0, FRAME_SCALE - 1.0);
    let w = rect.w.clamp(1.0, FRAME_SCALE).min(FRAME_SCALE - x);
    let h = rect.h.clamp(1.0, FRAME_SCALE).min(FRAME_SCALE - y);
    Rect::new(x, y, w, h)
}

/// Guess the units of an unlabelled rectangle.
///
/// Order matters: a box that fits 0–1 is a ratio, one that fits 0–100 is a
/// percentage, one that fits the image is pixels, and anything up to 1200 is
/// frame units. Small frame-unit boxes are misread as percentages, so callers
/// only reach for this when the model is known to mix units.
pub fn infer_coord_space(rect: &Rect, image_dims: Option<(f64, f64)>) -> Option<CoordSpace> {
    if !rect.is_usable() {
        return None;
    }
    let values = [rect.x, rect.y, rect.w, rect.h];
    let non_negative = values.iter().all(|v| *v >= 0.0);
    if !non_negative {
        return None;
    }
    let max = values.iter().copied().fold(0.0_f64, f64::max);

    if max <= 1.2 {
        return Some(CoordSpace::Ratio);
    }
    let fits_percent = values.iter().all(|v| *v <= 100.5)
        && rect.right() <= 100.5
        && rect.bottom() <= 100.5;
    if fits_percent {
        return Some(CoordSpace::Percent);
    }
    if let Some((iw, ih)) = image_dims.filter(|(w, h)| *w > 0.0 && *h > 0.0) {
        let fits_image = rect.x <= iw * 1.1
            && rect.w <= iw * 1.1
            && rect.right() <= iw * 1.1
            && rect.y <= ih * 1.1
            && rect.h <= ih * 1.1
            && rect.bottom() <= ih * 1.1;
        if fits_image {
            return Some(CoordSpace::Pixels);
        }
    }
    if max <= 1200.0 && rect.right() <= 1200.0 && rect.bottom() <= 1200.0 {
        return Some(CoordSpace::Thousand);
    }
    None
}

/// Convert a rect in `space` into clamped frame units.
///
/// `image_dims` are the pixel dimensions of the image the model was shown and
/// are required for `CoordSpace::Pixels`.
pub fn rect_to_thousand(
    rect: &Rect,
    space: CoordSpace,
    image_dims: Option<(f64, f64)>,
) -> Result<Rect, PlatemapError> {
    if !rect.is_usable() {
        return Err(PlatemapError::DegenerateGeometry(format!("unusable rect {rect:?}")));
    }
    let raw = match space {
        CoordSpace::Thousand => *rect,
        CoordSpace::Percent => rect.scaled(FRAME_SCALE / PERCENT_MAX),
        CoordSpace::Ratio => rect.scaled(FRAME_SCALE),
        CoordSpace::Pixels => {
            let (iw, ih) = image_dims
                .filter(|(w, h)| *w > 0.0 && *h > 0.0)
                .ok_or_else(|| {
                    PlatemapError::DegenerateGeometry("pixel rect without image dimensions".into())
                })?;
            Rect::new(
                rect.x / iw * FRAME_SCALE,
                rect.y / ih * FRAME_SCALE,
                rect.w / iw * FRAME_SCALE,
                rect.h / ih * FRAME_SCALE,
            )
        }
    };
    Ok(clamp_frame_rect(&raw))
}

/// Map a model-reported rect back to a clamped percent-space overlay box.
///
/// Content lying in the letterbox bars (negative offsets) is clamped onto the
/// page rather than producing negative percentages.
pub fn project_detected_rect(
    rect: &Rect,
    space: CoordSpace,
    metrics: &LetterboxMetrics,
    image_dims: Option<(f64, f64)>,
) -> Result<Rect, PlatemapError> {
    let frame_rect = rect_to_thousand(rect, space, image_dims)?;
    let pct = rect_from_frame(&frame_rect, metrics)?;
    Ok(clamp_percent_rect(&pct))
}

/// Project an existing percent overlay into frame units as a positional hint
/// for re-analysis. Returns `None` for unusable boxes.
pub fn percent_hint(rect: &Rect, metrics: &LetterboxMetrics) -> Option<Rect> {
    if !rect.is_usable() {
        return None;
    }
    let clamped = Rect::new(
        rect.x.clamp(0.0, PERCENT_MAX),
        rect.y.clamp(0.0, PERCENT_MAX),
        rect.w.clamp(0.1, PERCENT_MAX),
        rect.h.clamp(0.1, PERCENT_MAX),
    );
    rect_to_frame(&clamped, metrics).ok()
}

/// Map corners reported against a letterboxed detection frame onto the
/// 0–1000 scale of the original image.
pub fn corners_from_frame(
    corners: &CornerSet,
    detection: &LetterboxMetrics,
) -> Result<CornerSet, PlatemapError> {
    ensure_usable(detection)?;
    let map = |v: f64, pad: f64, dim: f64| ((v - pad) / dim * FRAME_SCALE).clamp(0.0, FRAME_SCALE);
    Ok(corners.map(|p| {
        Point::new(
            map(p.x, detection.x, detection.w),
            map(p.y, detection.y, detection.h),
        )
    }))
}

/// Place image-relative corners (0–1000) onto a letterboxed display frame,
/// for drawing editor handles.
pub fn corners_to_frame(
    corners: &CornerSet,
    display: &LetterboxMetrics,
) -> Result<CornerSet, PlatemapError> {
    ensure_usable(display)?;
    let map = |v: f64, pad: f64, dim: f64| v / FRAME_SCALE * dim + pad;
    Ok(corners.map(|p| Point::new(map(p.x, display.x, display.w), map(p.y, display.y, display.h))))
}
