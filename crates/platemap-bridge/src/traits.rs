// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator traits and the payloads that cross them.
//
// Both collaborators see the letterboxed analysis frame and answer on its
// 0–1000 scale. Mapping back to percent space happens on our side.

use async_trait::async_trait;
use platemap_core::error::Result;
use platemap_core::{CoordSpace, CornerSet, Rect};
use serde::{Deserialize, Serialize};

/// Which question the vision model is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Only the new page is sent; every returned box is new.
    Discovery,
    /// Old and new page are sent with the existing boxes as hints.
    Remap,
}

/// An existing overlay projected into frame space for re-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayHint {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub coord_space: CoordSpace,
}

impl OverlayHint {
    pub fn new(id: impl Into<String>, frame_rect: Rect) -> Self {
        Self {
            id: id.into(),
            x: frame_rect.x,
            y: frame_rect.y,
            w: frame_rect.w,
            h: frame_rect.h,
            coord_space: CoordSpace::Thousand,
        }
    }
}

/// Input to [`VisionAnalyzer::analyze`]. Images are JPEG-encoded frames.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub mode: AnalysisMode,
    /// `None` in discovery mode.
    pub old_image: Option<Vec<u8>>,
    pub new_image: Vec<u8>,
    pub overlays: Vec<OverlayHint>,
    pub frame_width: u32,
    pub frame_height: u32,
    pub page_index: usize,
}

impl VisionRequest {
    pub fn discovery(new_image: Vec<u8>, frame_size: u32, page_index: usize) -> Self {
        Self {
            mode: AnalysisMode::Discovery,
            old_image: None,
            new_image,
            overlays: Vec::new(),
            frame_width: frame_size,
            frame_height: frame_size,
            page_index,
        }
    }
}

fn missing() -> f64 {
    f64::NAN
}

/// One box reported by the vision model.
///
/// Missing coordinates deserialize as NaN so a malformed entry reaches the
/// degenerate-geometry handling instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedDish {
    #[serde(alias = "name")]
    pub id: String,
    #[serde(default = "missing")]
    pub x: f64,
    #[serde(default = "missing")]
    pub y: f64,
    #[serde(default = "missing")]
    pub w: f64,
    #[serde(default = "missing")]
    pub h: f64,
    /// Unit label, when the model states one.
    #[serde(
        default,
        alias = "coord_space",
        alias = "space",
        alias = "units",
        alias = "unit",
        skip_serializing_if = "Option::is_none"
    )]
    pub coord_space: Option<String>,
}

impl DetectedDish {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            coord_space: None,
        }
    }

    pub fn with_space(mut self, space: &str) -> Self {
        self.coord_space = Some(space.to_string());
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// The stated unit, if it is one we understand.
    pub fn space(&self) -> Option<CoordSpace> {
        self.coord_space.as_deref().and_then(CoordSpace::parse)
    }
}

/// Answer from [`VisionAnalyzer::analyze`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionResponse {
    #[serde(default)]
    pub updated_overlays: Vec<DetectedDish>,
    #[serde(default)]
    pub new_overlays: Vec<DetectedDish>,
    /// Flat list some detectors return instead of the two above.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dishes: Vec<DetectedDish>,
}

impl VisionResponse {
    /// `new_overlays`, or the flat `dishes` list when the model used that
    /// shape and reported nothing else.
    pub fn new_entries(&self) -> &[DetectedDish] {
        if self.updated_overlays.is_empty() && self.new_overlays.is_empty() {
            &self.dishes
        } else {
            &self.new_overlays
        }
    }

    pub fn raw_count(&self) -> usize {
        self.updated_overlays.len() + self.new_entries().len()
    }
}

/// Input to [`CornerDetector::detect_corners`].
#[derive(Debug, Clone)]
pub struct CornerRequest {
    /// JPEG-encoded analysis frame.
    pub image: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Remote (or local) dish-box detection.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(&self, request: VisionRequest) -> Result<VisionResponse>;
}

/// Page-corner detection. Corners are on the 0–1000 scale of the frame.
#[async_trait]
pub trait CornerDetector: Send + Sync {
    async fn detect_corners(&self, request: CornerRequest) -> Result<CornerSet>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_accepts_model_shapes() {
        let json = r#"{
            "updatedOverlays": [{"id": "Soup", "x": 10, "y": 20, "w": 30, "h": 5, "units": "%"}],
            "newOverlays": [{"name": "Salad", "x": 100, "y": 200, "w": 300}]
        }"#;
        let response: VisionResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(response.updated_overlays[0].space(), Some(CoordSpace::Percent));
        assert_eq!(response.new_overlays[0].id, "Salad");
        assert!(response.new_overlays[0].h.is_nan());
        assert_eq!(response.raw_count(), 2);
    }

    #[test]
    fn flat_dish_list_counts_as_new() {
        let json = r#"{"dishes": [{"name": "Pho", "x": 1, "y": 2, "w": 3, "h": 4}]}"#;
        let response: VisionResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(response.new_entries().len(), 1);
        assert_eq!(response.new_entries()[0].id, "Pho");
    }

    #[test]
    fn hints_are_labelled_thousand() {
        let hint = OverlayHint::new("Soup", Rect::new(1.0, 2.0, 3.0, 4.0));
        let json = serde_json::to_string(&hint).expect("serialize");
        assert!(json.contains(r#""coordSpace":"thousand""#));
    }
}
