// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: decode/encode/crop of page rasters and letterboxing into the
// square analysis frame.

pub mod letterbox;
pub mod processor;

pub use letterbox::{LetterboxFrame, compute_metrics, letterbox, letterbox_bytes};
pub use processor::ImageProcessor;
