// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Box-size analysis and section splitting.

pub mod analyze;
pub mod sections;

pub use analyze::{
    BoxSizeReport, ColumnLayout, ColumnOptions, MAX_STRIPS, analyze_box_sizes,
    analyze_box_sizes_with_limit, detect_columns, detect_columns_with,
};
pub use sections::{
    Section, SectionDescriptor, sanitize_split_points, split_into_sections, split_into_strips,
};
