// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Section splitter: cuts a page into a grid of columns and horizontal strips.

use image::DynamicImage;
use platemap_core::error::PlatemapError;
use platemap_core::{PERCENT_MAX, SectionBounds};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::image::processor::encode_jpeg;

/// One cell of a split page.
#[derive(Debug, Clone)]
pub struct Section {
    /// Position in column-major order. Downstream page indices follow it.
    pub section_index: usize,
    pub col: usize,
    pub row: usize,
    /// Extent in percent of the original page.
    pub bounds: SectionBounds,
    pub image: DynamicImage,
}

/// Serializable description of a [`Section`] without its raster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDescriptor {
    pub section_index: usize,
    pub col: usize,
    pub row: usize,
    pub bounds: SectionBounds,
    pub width: u32,
    pub height: u32,
}

impl Section {
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, PlatemapError> {
        encode_jpeg(&self.image, quality)
    }

    pub fn descriptor(&self) -> SectionDescriptor {
        SectionDescriptor {
            section_index: self.section_index,
            col: self.col,
            row: self.row,
            bounds: self.bounds,
            width: self.image.width(),
            height: self.image.height(),
        }
    }
}

/// Keep split points that are finite and strictly inside the page, sorted
/// and without duplicates.
pub fn sanitize_split_points(points: &[f64]) -> Vec<f64> {
    let mut clean: Vec<f64> = points
        .iter()
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0 && *p < PERCENT_MAX)
        .collect();
    clean.sort_by(f64::total_cmp);
    clean.dedup();
    clean
}

/// Split `image` at the vertical `split_points` (percent) and cut every
/// column into `strips` equal bands.
///
/// Sections come out column-major: all rows of column 0, then column 1.
/// Cells that round to zero pixels are skipped without consuming an index.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn split_into_sections(
    image: &DynamicImage,
    split_points: &[f64],
    strips: u32,
) -> Result<Vec<Section>, PlatemapError> {
    let (img_w, img_h) = (image.width(), image.height());
    if img_w == 0 || img_h == 0 {
        return Err(PlatemapError::DegenerateGeometry("cannot split an empty image".into()));
    }
    let strips = strips.max(1);

    let clean = sanitize_split_points(split_points);
    if clean.len() != split_points.len() {
        warn!(given = ?split_points, kept = ?clean, "Dropped invalid split points");
    }
    let mut boundaries = Vec::with_capacity(clean.len() + 2);
    boundaries.push(0.0);
    boundaries.extend(clean);
    boundaries.push(PERCENT_MAX);

    let strip_height = img_h.div_ceil(strips);
    let to_px = |pct: f64| (pct / PERCENT_MAX * img_w as f64).floor() as u32;

    let mut sections = Vec::new();
    for (col, pair) in boundaries.windows(2).enumerate() {
        let (x_start, x_end) = (pair[0], pair[1]);
        let col_start = to_px(x_start).min(img_w);
        let col_end = to_px(x_end).min(img_w);
        let col_width = col_end.saturating_sub(col_start);
        if col_width == 0 {
            debug!(col, "Skipping zero-width column");
            continue;
        }

        for row in 0..strips as usize {
            let row_start = (row as u32).saturating_mul(strip_height);
            if row_start >= img_h {
                break;
            }
            let row_end = row_start.saturating_add(strip_height).min(img_h);
            let bounds = SectionBounds {
                x_start,
                x_end,
                y_start: row_start as f64 / img_h as f64 * PERCENT_MAX,
                y_end: row_end as f64 / img_h as f64 * PERCENT_MAX,
            };
            sections.push(Section {
                section_index: sections.len(),
                col,
                row,
                bounds,
                image: image.crop_imm(col_start, row_start, col_width, row_end - row_start),
            });
        }
    }

    info!(
        sections = sections.len(),
        columns = boundaries.len() - 1,
        strips,
        "Page split into sections"
    );
    Ok(sections)
}

/// Single-column special case: `count` horizontal strips.
pub fn split_into_strips(image: &DynamicImage, count: u32) -> Result<Vec<Section>, PlatemapError> {
    split_into_sections(image, &[], count)
}
