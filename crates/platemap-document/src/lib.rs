// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// platemap-document: raster pipeline for menu pages.
//
// Letterboxes pages into the square analysis frame, maps coordinates between
// frame and percent space, corrects page perspective, and splits pages whose
// dish boxes would render too small.

pub mod geometry;
pub mod image;
pub mod scan;
pub mod split;

pub use image::letterbox::{LetterboxFrame, compute_metrics, letterbox, letterbox_bytes};
pub use image::processor::ImageProcessor;
pub use scan::{CornerEditor, CornerEditorState, detect_page_corners, rectify};
pub use split::{
    BoxSizeReport, ColumnLayout, Section, analyze_box_sizes, detect_columns, split_into_sections,
    split_into_strips,
};
