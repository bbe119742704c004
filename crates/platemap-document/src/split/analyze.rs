// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Box-size analysis and column detection.
//
// Decides whether detected dish boxes would render too small on a phone, and
// where the whitespace between menu columns lies.

use platemap_core::{LetterboxMetrics, PERCENT_MAX, PlatemapConfig, Rect};
use serde::Serialize;
use tracing::{debug, info};

/// Strip counts are never allowed past this.
pub const MAX_STRIPS: u32 = 5;

/// Verdict of [`analyze_box_sizes`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxSizeReport {
    pub needs_split: bool,
    pub strip_count: u32,
    /// Projected on-screen height of the smallest box, in display pixels.
    /// Infinite when there are no boxes.
    pub smallest_box_height: f64,
    pub avg_box_height: f64,
}

impl BoxSizeReport {
    fn unsplit(smallest: f64, avg: f64) -> Self {
        Self {
            needs_split: false,
            strip_count: 1,
            smallest_box_height: smallest,
            avg_box_height: avg,
        }
    }
}

/// Project frame-space `overlays` onto a phone `reference_width` pixels wide
/// and decide how many horizontal strips are needed for the smallest box to
/// reach `min_pixel_height`.
pub fn analyze_box_sizes(
    overlays: &[Rect],
    metrics: &LetterboxMetrics,
    min_pixel_height: f64,
    reference_width: f64,
) -> BoxSizeReport {
    analyze_box_sizes_with_limit(overlays, metrics, min_pixel_height, reference_width, MAX_STRIPS)
}

/// [`analyze_box_sizes`] with a configurable strip ceiling.
pub fn analyze_box_sizes_with_limit(
    overlays: &[Rect],
    metrics: &LetterboxMetrics,
    min_pixel_height: f64,
    reference_width: f64,
    max_strips: u32,
) -> BoxSizeReport {
    let heights: Vec<f64> = overlays
        .iter()
        .map(|o| o.h)
        .filter(|h| h.is_finite())
        .collect();
    if heights.is_empty() {
        return BoxSizeReport::unsplit(f64::INFINITY, f64::INFINITY);
    }

    let content_w = positive_or(metrics.w, 1000.0);
    let content_h = positive_or(metrics.h, 1000.0);
    let display_height = reference_width * (content_h / content_w);

    let projected = heights.iter().map(|h| h / content_h * display_height);
    let (smallest, total) =
        projected.fold((f64::INFINITY, 0.0), |(min, sum), px| (min.min(px), sum + px));
    let avg = total / heights.len() as f64;

    if smallest >= min_pixel_height {
        debug!(smallest, avg, "Boxes large enough; no split");
        return BoxSizeReport::unsplit(smallest, avg);
    }

    let scale_needed = min_pixel_height / smallest;
    let strips = if scale_needed.is_finite() {
        (scale_needed.ceil() as u32).clamp(1, max_strips.max(1))
    } else {
        max_strips.max(1)
    };
    info!(smallest, avg, scale_needed, strips, "Box size analysis");

    BoxSizeReport {
        needs_split: strips > 1,
        strip_count: strips,
        smallest_box_height: smallest,
        avg_box_height: avg,
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { fallback }
}

/// Vertical split points (0–100) between menu columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLayout {
    pub column_count: usize,
    pub split_points: Vec<f64>,
}

impl ColumnLayout {
    pub fn single() -> Self {
        Self {
            column_count: 1,
            split_points: Vec::new(),
        }
    }
}

/// Tuning for the coverage-gap scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnOptions {
    /// Narrowest empty run, in percent buckets, that counts as a gutter.
    pub min_gap_buckets: usize,
    /// Most split points returned.
    pub max_splits: usize,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            min_gap_buckets: 3,
            max_splits: 2,
        }
    }
}

impl From<&PlatemapConfig> for ColumnOptions {
    fn from(config: &PlatemapConfig) -> Self {
        Self {
            min_gap_buckets: config.min_gap_buckets,
            max_splits: config.max_column_splits,
        }
    }
}

/// Detect columns from overlays of unknown scale.
///
/// An overlay with any component above 150 is taken to be on the 0–1000
/// scale and divided by ten; everything else is read as percent. Prefer
/// [`detect_columns_with`] when the scale is known.
pub fn detect_columns(overlays: &[Rect]) -> ColumnLayout {
    let normalized: Vec<Rect> = overlays
        .iter()
        .map(|o| {
            let max = o.x.max(o.y).max(o.w).max(o.h);
            if max > 150.0 { o.scaled(0.1) } else { *o }
        })
        .collect();
    detect_columns_with(&normalized, ColumnOptions::default())
}

/// Detect columns from percent-space overlays.
pub fn detect_columns_with(overlays: &[Rect], options: ColumnOptions) -> ColumnLayout {
    if overlays.len() < 2 {
        return ColumnLayout::single();
    }

    let mut coverage = [0u32; 100];
    for o in overlays.iter().filter(|o| o.is_finite()) {
        let start = o.x.floor().clamp(0.0, PERCENT_MAX) as usize;
        let end = o.right().ceil().clamp(0.0, PERCENT_MAX) as usize;
        for bucket in coverage.iter_mut().take(end).skip(start) {
            *bucket += 1;
        }
    }

    // A run still open at bucket 89 is a margin, not a gutter.
    let mut gaps: Vec<(usize, usize)> = Vec::new();
    let mut gap_start: Option<usize> = None;
    for (x, &count) in coverage.iter().enumerate().take(90).skip(10) {
        if count == 0 {
            gap_start.get_or_insert(x);
        } else if let Some(start) = gap_start.take() {
            if x - start >= options.min_gap_buckets {
                gaps.push((start, x));
            }
        }
    }

    gaps.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)));
    gaps.truncate(options.max_splits);
    let mut split_points: Vec<f64> = gaps
        .iter()
        .map(|(start, end)| (*start + *end) as f64 / 2.0)
        .collect();
    split_points.sort_by(f64::total_cmp);

    debug!(?split_points, gaps = gaps.len(), "Column detection");
    ColumnLayout {
        column_count: split_points.len() + 1,
        split_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> LetterboxMetrics {
        LetterboxMetrics::identity(1000.0)
    }

    #[test]
    fn no_boxes_never_split() {
        let report = analyze_box_sizes(&[], &square(), 75.0, 375.0);
        assert!(!report.needs_split);
        assert_eq!(report.strip_count, 1);
        assert!(report.smallest_box_height.is_infinite());
    }

    #[test]
    fn box_exactly_at_threshold_is_not_split() {
        // 200 / 1000 * 375 = 75.
        let report = analyze_box_sizes(&[Rect::new(0.0, 0.0, 100.0, 200.0)], &square(), 75.0, 375.0);
        assert_eq!(report.smallest_box_height, 75.0);
        assert!(!report.needs_split);

        let report = analyze_box_sizes(&[Rect::new(0.0, 0.0, 100.0, 199.0)], &square(), 75.0, 375.0);
        assert!(report.needs_split);
        assert_eq!(report.strip_count, 2);
    }

    #[test]
    fn strip_count_is_capped() {
        // 15.625 / 1000 * 400 = 6.25 display px, so 12x would be needed.
        let report = analyze_box_sizes(&[Rect::new(0.0, 0.0, 50.0, 15.625)], &square(), 75.0, 400.0);
        assert_eq!(report.smallest_box_height, 6.25);
        assert_eq!(report.strip_count, 5);
        assert!(report.needs_split);
    }

    #[test]
    fn average_and_zero_metrics_fallback() {
        let metrics = LetterboxMetrics { x: 0.0, y: 0.0, w: 0.0, h: 0.0, scale: 0.0 };
        let boxes = [Rect::new(0.0, 0.0, 10.0, 400.0), Rect::new(0.0, 0.0, 10.0, 600.0)];
        let report = analyze_box_sizes(&boxes, &metrics, 75.0, 375.0);
        assert_eq!(report.smallest_box_height, 150.0);
        assert_eq!(report.avg_box_height, 187.5);
    }

    #[test]
    fn zero_height_box_uses_the_ceiling() {
        let report = analyze_box_sizes(&[Rect::new(0.0, 0.0, 10.0, 0.0)], &square(), 75.0, 375.0);
        assert_eq!(report.strip_count, 5);
    }

    #[test]
    fn two_columns_split_in_the_gutter() {
        let layout = detect_columns(&[Rect::new(0.0, 0.0, 30.0, 10.0), Rect::new(60.0, 0.0, 40.0, 10.0)]);
        assert_eq!(layout.column_count, 2);
        assert_eq!(layout.split_points, vec![45.0]);
    }

    #[test]
    fn single_overlay_is_one_column() {
        assert_eq!(detect_columns(&[Rect::new(0.0, 0.0, 30.0, 10.0)]), ColumnLayout::single());
    }

    #[test]
    fn thousand_scale_overlays_are_normalized() {
        let layout = detect_columns(&[
            Rect::new(0.0, 0.0, 300.0, 100.0),
            Rect::new(600.0, 0.0, 400.0, 100.0),
        ]);
        assert_eq!(layout.split_points, vec![45.0]);
    }

    #[test]
    fn keeps_two_widest_gutters_left_to_right() {
        let layout = detect_columns(&[
            Rect::new(0.0, 0.0, 20.0, 5.0),  // gap 20..30 (10)
            Rect::new(30.0, 0.0, 10.0, 5.0), // gap 40..44 (4)
            Rect::new(44.0, 0.0, 20.0, 5.0), // gap 64..80 (16)
            Rect::new(80.0, 0.0, 20.0, 5.0),
        ]);
        assert_eq!(layout.column_count, 3);
        assert_eq!(layout.split_points, vec![25.0, 72.0]);
    }

    #[test]
    fn narrow_and_trailing_gaps_are_ignored() {
        let layout = detect_columns(&[
            Rect::new(0.0, 0.0, 49.0, 5.0),
            Rect::new(51.0, 0.0, 20.0, 5.0),
        ]);
        assert_eq!(layout, ColumnLayout::single());
    }
}
