// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the analysis pipeline and the interactive editor.
///
/// Every field has a default, so a partial `config.json` is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatemapConfig {
    /// Edge length of the square analysis frame, in pixels.
    pub frame_size: u32,
    /// RGB fill for the letterbox bars around the scaled content.
    pub letterbox_background: [u8; 3],
    /// Smallest acceptable on-screen dish height, in display pixels.
    pub min_box_pixel_height: f64,
    /// Display width the box-size analysis projects onto (a phone screen).
    pub reference_display_width: f64,
    /// Hard ceiling on horizontal strips per column.
    pub max_strips: u32,
    /// Minimum width, in histogram buckets, of a column gap.
    pub min_gap_buckets: usize,
    /// Maximum number of vertical split points kept by column detection.
    pub max_column_splits: usize,
    /// Edge-snapping distance in percentage points.
    pub snap_threshold: f64,
    /// Corner handle hit radius on the 0–1000 corner scale.
    pub corner_hit_radius: f64,
    /// JPEG quality for section and frame output (1–100).
    pub jpeg_quality: u8,
    /// Uploads wider than this are downscaled when rectification is skipped.
    pub max_upload_width: u32,
    /// Undo/redo snapshots kept by the editor.
    pub history_limit: usize,
}

impl Default for PlatemapConfig {
    fn default() -> Self {
        Self {
            frame_size: 1000,
            letterbox_background: [0, 0, 0],
            min_box_pixel_height: 75.0,
            reference_display_width: 375.0,
            max_strips: 5,
            min_gap_buckets: 3,
            max_column_splits: 2,
            snap_threshold: 0.3,
            corner_hit_radius: 50.0,
            jpeg_quality: 85,
            max_upload_width: 1200,
            history_limit: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config: PlatemapConfig =
            serde_json::from_str(r#"{ "max_strips": 3 }"#).expect("parse");
        assert_eq!(config.max_strips, 3);
        assert_eq!(config.frame_size, 1000);
        assert_eq!(config.snap_threshold, 0.3);
    }
}
