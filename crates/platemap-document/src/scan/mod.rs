// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document corner correction: detection, interactive adjustment, and the
// perspective warp that produces a rectified page.

pub mod corners;
pub mod detect;
pub mod rectify;

pub use corners::{CornerEditor, CornerEditorState};
pub use detect::detect_page_corners;
pub use rectify::{destination_size, rectify};
