// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Platemap overlay engine.
//
// Three coordinate spaces appear throughout:
//   - original-pixel: pixels of the decoded page image
//   - frame: pixels of the fixed square analysis frame (0–1000 by default)
//   - percent: percentage of the page image's content area (0–100)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Upper bound of the percentage coordinate space.
pub const PERCENT_MAX: f64 = 100.0;

/// Stable in-memory identity of an overlay inside the editor.
///
/// Overlay `id`s are dish labels and may repeat or change while editing; the
/// key never does. It is not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayKey(pub Uuid);

impl OverlayKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OverlayKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OverlayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned rectangle. The coordinate space is implied by context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Default box for manually added overlays and for overlays whose
    /// returned geometry could not be used.
    pub const PLACEHOLDER: Rect = Rect {
        x: 10.0,
        y: 10.0,
        w: 20.0,
        h: 8.0,
    };

    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// All four components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }

    /// Finite with strictly positive width and height.
    pub fn is_usable(&self) -> bool {
        self.is_finite() && self.w > 0.0 && self.h > 0.0
    }

    /// Multiply every component by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.w * factor, self.h * factor)
    }
}

/// A dish annotation on one page image.
///
/// Geometry is in percent space. Allergen, diet, and ingredient fields are
/// opaque to the engine and carried through `metadata` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    #[serde(skip)]
    pub key: OverlayKey,
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub page_index: usize,
    /// Bounds of the section this overlay was detected in, when the page was
    /// produced by splitting a larger image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_section: Option<SectionBounds>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Overlay {
    pub fn new(id: impl Into<String>, rect: Rect, page_index: usize) -> Self {
        Self {
            key: OverlayKey::new(),
            id: id.into(),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            page_index,
            origin_section: None,
            metadata: Map::new(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.w = rect.w;
        self.h = rect.h;
    }

    pub fn with_origin_section(mut self, bounds: SectionBounds) -> Self {
        self.origin_section = Some(bounds);
        self
    }
}

/// A 2-D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Placement of real image content inside the square analysis frame.
///
/// `x`/`y` are the letterbox padding and `w`/`h` the scaled content size, all
/// in frame pixels. `scale` is frame pixels per original pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LetterboxMetrics {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub scale: f64,
}

impl LetterboxMetrics {
    /// Metrics for content that fills the whole frame.
    pub fn identity(frame_size: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: frame_size,
            h: frame_size,
            scale: 1.0,
        }
    }

    /// Zero, negative, or non-finite content size. Mapping through such
    /// metrics would divide by zero.
    pub fn is_degenerate(&self) -> bool {
        !(self.x.is_finite()
            && self.y.is_finite()
            && self.w.is_finite()
            && self.h.is_finite()
            && self.w > 0.0
            && self.h > 0.0)
    }
}

/// One of the four handles of a [`CornerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    /// Clockwise from top-left, the order perspective transforms expect.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];
}

/// Quadrilateral outline of a physical menu page, on a 0–1000 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CornerSet {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl CornerSet {
    /// Upper bound of the corner scale.
    pub const SCALE: f64 = 1000.0;

    /// Inset full-frame quadrilateral used when detection fails and by the
    /// editor's reset action.
    pub const FULL_FRAME: CornerSet = CornerSet {
        top_left: Point::new(50.0, 50.0),
        top_right: Point::new(950.0, 50.0),
        bottom_right: Point::new(950.0, 950.0),
        bottom_left: Point::new(50.0, 950.0),
    };

    pub fn get(&self, corner: Corner) -> Point {
        match corner {
            Corner::TopLeft => self.top_left,
            Corner::TopRight => self.top_right,
            Corner::BottomRight => self.bottom_right,
            Corner::BottomLeft => self.bottom_left,
        }
    }

    pub fn set(&mut self, corner: Corner, point: Point) {
        match corner {
            Corner::TopLeft => self.top_left = point,
            Corner::TopRight => self.top_right = point,
            Corner::BottomRight => self.bottom_right = point,
            Corner::BottomLeft => self.bottom_left = point,
        }
    }

    /// Apply `f` to every corner.
    pub fn map(&self, mut f: impl FnMut(Point) -> Point) -> Self {
        Self {
            top_left: f(self.top_left),
            top_right: f(self.top_right),
            bottom_right: f(self.bottom_right),
            bottom_left: f(self.bottom_left),
        }
    }

    /// Clamp every coordinate into `[0, 1000]`. Non-finite values become 0.
    pub fn clamped(&self) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, Self::SCALE) } else { 0.0 };
        self.map(|p| Point::new(clamp(p.x), clamp(p.y)))
    }
}

impl Default for CornerSet {
    fn default() -> Self {
        Self::FULL_FRAME
    }
}

/// Bounds of a split section, in percent of the original image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBounds {
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
}

impl SectionBounds {
    pub fn width(&self) -> f64 {
        self.x_end - self.x_start
    }

    pub fn height(&self) -> f64 {
        self.y_end - self.y_start
    }
}

/// Units a remote model reported its rectangle in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordSpace {
    /// 0–100.
    Percent,
    /// 0–1000, i.e. analysis-frame pixels.
    Thousand,
    /// 0–1.
    Ratio,
    /// Pixels of the image the model was shown.
    Pixels,
}

impl CoordSpace {
    /// Parse the loose unit labels models emit ("%", "px", "1000", ...).
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "percent" | "percentage" | "pct" | "%" => Some(Self::Percent),
            "thousand" | "1000" | "permille" | "normalized" => Some(Self::Thousand),
            "ratio" | "fraction" | "unit" | "0-1" => Some(Self::Ratio),
            "pixels" | "pixel" | "px" => Some(Self::Pixels),
            _ => None,
        }
    }
}
