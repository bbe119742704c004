// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification of a menu page from its confirmed corners.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use platemap_core::error::PlatemapError;
use platemap_core::{Corner, CornerSet};
use tracing::{debug, info, instrument};

/// Convert 0–1000 corners into pixel positions on a `width` x `height`
/// image, clockwise from top-left.
pub fn corners_to_pixels(corners: &CornerSet, width: u32, height: u32) -> [(f32, f32); 4] {
    let (w, h) = (width as f64, height as f64);
    Corner::ALL.map(|c| {
        let p = corners.get(c);
        (
            (p.x / CornerSet::SCALE * w) as f32,
            (p.y / CornerSet::SCALE * h) as f32,
        )
    })
}

/// Output size for a source quadrilateral: the longer of each pair of
/// opposite edges.
pub fn destination_size(quad: &[(f32, f32); 4]) -> (u32, u32) {
    let [tl, tr, br, bl] = *quad;
    let len = |a: (f32, f32), b: (f32, f32)| (a.0 - b.0).hypot(a.1 - b.1);
    let width = len(br, bl).max(len(tr, tl));
    let height = len(tr, br).max(len(tl, bl));
    (width.round() as u32, height.round() as u32)
}

/// Warp the quadrilateral bounded by `corners` onto an axis-aligned rectangle.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn rectify(image: &DynamicImage, corners: &CornerSet) -> Result<DynamicImage, PlatemapError> {
    let src = corners_to_pixels(&corners.clamped(), image.width(), image.height());
    let (out_w, out_h) = destination_size(&src);
    if out_w == 0 || out_h == 0 {
        return Err(PlatemapError::DegenerateGeometry(format!(
            "corner quadrilateral collapses to {out_w}x{out_h}"
        )));
    }

    let dest: [(f32, f32); 4] = [
        (0.0, 0.0),
        (out_w as f32, 0.0),
        (out_w as f32, out_h as f32),
        (0.0, out_h as f32),
    ];
    debug!(?src, out_w, out_h, "Rectification target computed");

    let projection = Projection::from_control_points(src, dest).ok_or_else(|| {
        PlatemapError::DegenerateGeometry("corners do not define a perspective transform".into())
    })?;

    let rgba = image.to_rgba8();
    let mut output = RgbaImage::new(out_w, out_h);
    warp_into(
        &rgba,
        &projection,
        Interpolation::Bilinear,
        Rgba([255, 255, 255, 255]),
        &mut output,
    );

    info!(out_w, out_h, "Page rectified");
    Ok(DynamicImage::ImageRgba8(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use platemap_core::Point;

    #[test]
    fn destination_takes_longer_opposite_edges() {
        let quad = [(10.0, 0.0), (110.0, 0.0), (120.0, 200.0), (0.0, 190.0)];
        let (w, h) = destination_size(&quad);
        assert_eq!(w, 120);
        assert_eq!(h, 200);
    }

    #[test]
    fn full_image_corners_keep_dimensions() {
        let page = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 80, Rgb([10, 20, 30])));
        let corners = CornerSet {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(1000.0, 0.0),
            bottom_right: Point::new(1000.0, 1000.0),
            bottom_left: Point::new(0.0, 1000.0),
        };
        let out = rectify(&page, &corners).expect("rectify");
        assert_eq!((out.width(), out.height()), (100, 80));
    }

    #[test]
    fn inset_corners_shrink_output() {
        let page = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 200, Rgb([200, 200, 200])));
        let out = rectify(&page, &CornerSet::FULL_FRAME).expect("rectify");
        assert_eq!((out.width(), out.height()), (180, 180));
    }

    #[test]
    fn collapsed_corners_are_rejected() {
        let page = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
        let point = Point::new(500.0, 500.0);
        let corners = CornerSet {
            top_left: point,
            top_right: point,
            bottom_right: point,
            bottom_left: point,
        };
        let err = rectify(&page, &corners).err().expect("must fail");
        assert!(matches!(err, PlatemapError::DegenerateGeometry(_)));
    }
}
