// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Offline page-corner detection: Canny edges, Hough lines, and the
// quadrilateral formed by the outermost horizontal and vertical lines.

use image::DynamicImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use platemap_core::{CornerSet, Point};
use tracing::{debug, instrument, warn};

/// Locate the page quadrilateral in `image`, on the 0–1000 scale.
///
/// Returns `None` when no clean quadrilateral is found; callers fall back to
/// the full-frame corners.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn detect_page_corners(image: &DynamicImage) -> Option<CornerSet> {
    let (w, h) = (image.width(), image.height());
    if w < 8 || h < 8 {
        return None;
    }

    let gray = image.to_luma8();
    let blurred = gaussian_blur_f32(&gray, 2.0);
    let edges = canny(&blurred, 50.0, 150.0);

    // Scale the vote threshold with the diagonal so small and large photos
    // behave alike.
    let diagonal = (w as f64).hypot(h as f64);
    let vote_threshold = (diagonal * 0.25).max(80.0) as u32;
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold,
            suppression_radius: 8,
        },
    );
    debug!(line_count = lines.len(), vote_threshold, "Hough lines detected");

    let (horizontal, vertical) = classify_lines(&lines);
    if horizontal.len() < 2 || vertical.len() < 2 {
        warn!(
            horizontal = horizontal.len(),
            vertical = vertical.len(),
            "Not enough page edges found"
        );
        return None;
    }

    let (mid_x, mid_y) = (w as f64 / 2.0, h as f64 / 2.0);
    let top = extreme(&horizontal, |l| y_at(l, mid_x), false)?;
    let bottom = extreme(&horizontal, |l| y_at(l, mid_x), true)?;
    let left = extreme(&vertical, |l| x_at(l, mid_y), false)?;
    let right = extreme(&vertical, |l| x_at(l, mid_y), true)?;

    let quad = [
        intersect(&top, &left)?,
        intersect(&top, &right)?,
        intersect(&bottom, &right)?,
        intersect(&bottom, &left)?,
    ];

    let area = shoelace_area(&quad);
    let min_area = w as f64 * h as f64 * 0.10;
    if area < min_area {
        warn!(area, min_area, "Detected quadrilateral too small");
        return None;
    }

    let to_scale = |p: (f64, f64)| {
        Point::new(
            p.0 / w as f64 * CornerSet::SCALE,
            p.1 / h as f64 * CornerSet::SCALE,
        )
    };
    let corners = CornerSet {
        top_left: to_scale(quad[0]),
        top_right: to_scale(quad[1]),
        bottom_right: to_scale(quad[2]),
        bottom_left: to_scale(quad[3]),
    }
    .clamped();
    debug!(?corners, "Page quadrilateral found");
    Some(corners)
}

/// Split lines into (horizontal, vertical) by their normal angle.
///
/// `x*cos(t) + y*sin(t) = r`: a normal near 90 degrees is a horizontal line,
/// a normal near 0 or 180 degrees is a vertical one. Diagonals are dropped.
fn classify_lines(lines: &[PolarLine]) -> (Vec<PolarLine>, Vec<PolarLine>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for line in lines {
        let angle = line.angle_in_degrees;
        if (60..=120).contains(&angle) {
            horizontal.push(*line);
        } else if angle <= 30 || angle >= 150 {
            vertical.push(*line);
        }
    }
    (horizontal, vertical)
}

fn extreme(
    lines: &[PolarLine],
    position: impl Fn(&PolarLine) -> Option<f64>,
    largest: bool,
) -> Option<PolarLine> {
    let positioned = lines.iter().filter_map(|l| position(l).map(|p| (*l, p)));
    let pick = if largest {
        positioned.max_by(|a, b| a.1.total_cmp(&b.1))
    } else {
        positioned.min_by(|a, b| a.1.total_cmp(&b.1))
    };
    pick.map(|(line, _)| line)
}

fn normal(line: &PolarLine) -> (f64, f64, f64) {
    let theta = (line.angle_in_degrees as f64).to_radians();
    (theta.cos(), theta.sin(), line.r as f64)
}

/// y of a mostly horizontal line at column `x`.
fn y_at(line: &PolarLine, x: f64) -> Option<f64> {
    let (cos, sin, r) = normal(line);
    (sin.abs() > 1e-6).then(|| (r - x * cos) / sin)
}

/// x of a mostly vertical line at row `y`.
fn x_at(line: &PolarLine, y: f64) -> Option<f64> {
    let (cos, sin, r) = normal(line);
    (cos.abs() > 1e-6).then(|| (r - y * sin) / cos)
}

/// Intersection of two polar lines, `None` when (nearly) parallel.
fn intersect(a: &PolarLine, b: &PolarLine) -> Option<(f64, f64)> {
    let (cos_a, sin_a, r_a) = normal(a);
    let (cos_b, sin_b, r_b) = normal(b);
    let denom = cos_a * sin_b - sin_a * cos_b;
    if denom.abs() < 1e-6 {
        return None;
    }
    Some((
        (r_a * sin_b - r_b * sin_a) / denom,
        (r_b * cos_a - r_a * cos_b) / denom,
    ))
}

fn shoelace_area(quad: &[(f64, f64); 4]) -> f64 {
    let mut twice = 0.0;
    for i in 0..quad.len() {
        let j = (i + 1) % quad.len();
        twice += quad[i].0 * quad[j].1 - quad[j].0 * quad[i].1;
    }
    twice.abs() / 2.0
}
