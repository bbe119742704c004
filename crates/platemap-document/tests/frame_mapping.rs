// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Property tests for the letterbox metrics and frame <-> percent mapping.

use platemap_core::{CoordSpace, Rect};
use platemap_document::compute_metrics;
use platemap_document::geometry::{
    clamp_percent_rect, from_normalized_frame, project_detected_rect, to_normalized_frame,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn percent_survives_a_trip_through_the_frame(
        w in 1u32..8000,
        h in 1u32..8000,
        px in 0.0f64..=100.0,
        py in 0.0f64..=100.0,
    ) {
        let m = compute_metrics(w, h, 1000).expect("non-zero dims");
        let fx = to_normalized_frame(px, m.x, m.w);
        let fy = to_normalized_frame(py, m.y, m.h);
        prop_assert!((from_normalized_frame(fx, m.x, m.w) - px).abs() < 1e-9);
        prop_assert!((from_normalized_frame(fy, m.y, m.h) - py).abs() < 1e-9);
    }

    #[test]
    fn content_fits_and_is_centred(w in 1u32..8000, h in 1u32..8000) {
        let m = compute_metrics(w, h, 1000).expect("non-zero dims");
        prop_assert!(m.w <= 1000.0 + 1e-9 && m.h <= 1000.0 + 1e-9);
        prop_assert!((m.x * 2.0 + m.w - 1000.0).abs() < 1e-9);
        prop_assert!((m.y * 2.0 + m.h - 1000.0).abs() < 1e-9);
        // Aspect ratio is preserved exactly up to rounding.
        prop_assert!((m.w / m.h - w as f64 / h as f64).abs() < 1e-6 * (w as f64 / h as f64).max(1.0));
    }

    #[test]
    fn projected_boxes_always_land_on_the_page(
        w in 1u32..5000,
        h in 1u32..5000,
        x in -200.0f64..1200.0,
        y in -200.0f64..1200.0,
        bw in 0.01f64..1200.0,
        bh in 0.01f64..1200.0,
    ) {
        let m = compute_metrics(w, h, 1000).expect("non-zero dims");
        let pct = project_detected_rect(&Rect::new(x, y, bw, bh), CoordSpace::Thousand, &m, None)
            .expect("usable rect");
        prop_assert!(pct.x >= 0.0 && pct.y >= 0.0);
        prop_assert!(pct.w >= 0.0 && pct.h >= 0.0);
        prop_assert!(pct.right() <= 100.0 + 1e-9 && pct.bottom() <= 100.0 + 1e-9);
        prop_assert_eq!(clamp_percent_rect(&pct), pct);
    }
}

#[test]
fn phone_photo_end_to_end() {
    let m = compute_metrics(1200, 1600, 1000).expect("metrics");
    assert_eq!(m.scale, 0.625);
    let pct = project_detected_rect(&Rect::new(100.0, 100.0, 200.0, 50.0), CoordSpace::Thousand, &m, None)
        .expect("map");
    // Left of the content area: clamped rather than negative.
    assert_eq!(pct.x, 0.0);
    assert_eq!(pct.y, 10.0);
    assert!(pct.x >= 0.0);
}
