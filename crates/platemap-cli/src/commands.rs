// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command handlers. Each reads its inputs from disk, runs one engine stage
// and writes images next to a JSON description on stdout.

use std::path::{Path, PathBuf};

use platemap_bridge::LocalCornerDetector;
use platemap_core::error::Result;
use platemap_core::{CornerSet, LetterboxMetrics, PlatemapConfig, Rect};
use platemap_document::geometry::rect_from_frame;
use platemap_document::split::{ColumnOptions, analyze_box_sizes_with_limit, detect_columns_with};
use platemap_document::{
    BoxSizeReport, ColumnLayout, ImageProcessor, compute_metrics, letterbox, rectify,
    split_into_sections,
};
use platemap_editor::CaptureFlow;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument};

/// Letterbox `input` into the analysis frame and save it as `output`.
#[instrument(skip(config))]
pub fn normalize(config: &PlatemapConfig, input: &Path, output: &Path) -> Result<LetterboxMetrics> {
    let source = ImageProcessor::open(input)?;
    let frame = letterbox(source.as_dynamic(), config.frame_size, config.letterbox_background)?;
    std::fs::write(output, frame.to_jpeg_bytes(config.jpeg_quality)?)?;
    info!(output = %output.display(), "Frame written");
    Ok(frame.metrics())
}

/// Outcome of [`rectify_page`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RectifySummary {
    /// Corners used, or `None` when no outline was found and the photo was
    /// only downscaled.
    pub corners: Option<CornerSet>,
    pub width: u32,
    pub height: u32,
}

/// Flatten the page in `input`. Without `corners` the outline is detected
/// locally; when that finds nothing the upload is kept as is.
#[instrument(skip(config, corners))]
pub async fn rectify_page(
    config: &PlatemapConfig,
    input: &Path,
    output: &Path,
    corners: Option<CornerSet>,
) -> Result<RectifySummary> {
    let source = ImageProcessor::open(input)?.into_dynamic();

    let (image, used) = match corners {
        Some(corners) => {
            let corners = corners.clamped();
            (rectify(&source, &corners)?, Some(corners))
        }
        None => {
            let mut flow = CaptureFlow::new(source, config);
            flow.detect(&LocalCornerDetector).await?;
            let used = if flow.editor().detection_failed() {
                flow.skip()?;
                None
            } else {
                Some(flow.confirm()?)
            };
            (flow.finish().await?.image().clone(), used)
        }
    };

    let out = ImageProcessor::from_dynamic(image);
    out.save(output)?;
    Ok(RectifySummary {
        corners: used,
        width: out.width(),
        height: out.height(),
    })
}

/// Layout verdict for detected boxes on one page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSummary {
    pub metrics: LetterboxMetrics,
    pub box_sizes: BoxSizeReport,
    pub columns: ColumnLayout,
    /// Strips per column once the columns are cut apart.
    pub strips_per_column: u32,
}

/// Decide how a page letterboxed with `metrics` should be split, given the
/// frame-space `boxes` detected on it.
pub fn layout(config: &PlatemapConfig, metrics: LetterboxMetrics, boxes: &[Rect]) -> Result<LayoutSummary> {
    let box_sizes = analyze_box_sizes_with_limit(
        boxes,
        &metrics,
        config.min_box_pixel_height,
        config.reference_display_width,
        config.max_strips,
    );
    let percent = boxes
        .iter()
        .map(|b| rect_from_frame(b, &metrics))
        .collect::<Result<Vec<_>>>()?;
    let columns = detect_columns_with(&percent, ColumnOptions::from(config));
    let strips_per_column = if columns.column_count > 1 {
        box_sizes.strip_count.div_ceil(columns.column_count as u32).max(1)
    } else {
        box_sizes.strip_count
    };
    Ok(LayoutSummary {
        metrics,
        box_sizes,
        columns,
        strips_per_column,
    })
}

/// Read a JSON document such as a box list, metrics or a corner set.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// How `split` chooses its grid.
#[derive(Debug, Clone)]
pub enum SplitPlan {
    Manual { columns: Vec<f64>, strips: u32 },
    /// Derive columns and strips from detected boxes.
    FromBoxes(Vec<Rect>),
}

/// One written section.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenSection {
    pub file: PathBuf,
    #[serde(flatten)]
    pub section: platemap_document::split::SectionDescriptor,
}

/// Cut the page in `input` into sections and write them to `out_dir` with a
/// `sections.json` index.
#[instrument(skip(config, plan))]
pub fn split(
    config: &PlatemapConfig,
    input: &Path,
    out_dir: &Path,
    plan: SplitPlan,
) -> Result<Vec<WrittenSection>> {
    let source = ImageProcessor::open(input)?;
    let (columns, strips) = match plan {
        SplitPlan::Manual { columns, strips } => (columns, strips),
        SplitPlan::FromBoxes(boxes) => {
            let metrics = compute_metrics(source.width(), source.height(), config.frame_size)?;
            let summary = layout(config, metrics, &boxes)?;
            (summary.columns.split_points, summary.strips_per_column)
        }
    };

    let sections = split_into_sections(source.as_dynamic(), &columns, strips)?;
    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(sections.len());
    for section in &sections {
        let file = out_dir.join(format!("section-{}.jpg", section.section_index));
        std::fs::write(&file, section.to_jpeg_bytes(config.jpeg_quality)?)?;
        written.push(WrittenSection {
            file,
            section: section.descriptor(),
        });
    }
    std::fs::write(out_dir.join("sections.json"), serde_json::to_string_pretty(&written)?)?;
    info!(sections = written.len(), out_dir = %out_dir.display(), "Sections written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;

    fn write_page(dir: &Path, w: u32, h: u32) -> PathBuf {
        let path = dir.join("page.png");
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([240, 240, 240])))
            .save(&path)
            .expect("save");
        path
    }

    #[test]
    fn normalize_reports_letterbox_metrics() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_page(tmp.path(), 1200, 1600);
        let output = tmp.path().join("frame.jpg");
        let metrics = normalize(&PlatemapConfig::default(), &input, &output).expect("normalize");
        assert!((metrics.x - 125.0).abs() < 1e-9);
        assert!((metrics.w - 750.0).abs() < 1e-9);
        let frame = ImageProcessor::open(&output).expect("open");
        assert_eq!((frame.width(), frame.height()), (1000, 1000));
    }

    #[test]
    fn tiny_boxes_ask_for_strips() {
        // 100 x 1000 page: content is 100 frame px wide, boxes 10 px tall.
        let boxes = [Rect::new(460.0, 100.0, 80.0, 10.0), Rect::new(460.0, 600.0, 80.0, 10.0)];
        let metrics = compute_metrics(100, 1000, 1000).expect("metrics");
        let summary = layout(&PlatemapConfig::default(), metrics, &boxes).expect("layout");
        assert!(summary.box_sizes.needs_split);
        assert_eq!(summary.box_sizes.strip_count, 2);
        assert_eq!(summary.columns.column_count, 1);
        assert_eq!(summary.strips_per_column, 2);
    }

    #[test]
    fn manual_split_writes_sections_and_index() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_page(tmp.path(), 200, 100);
        let out_dir = tmp.path().join("sections");
        let plan = SplitPlan::Manual {
            columns: vec![50.0],
            strips: 2,
        };
        let written = split(&PlatemapConfig::default(), &input, &out_dir, plan).expect("split");

        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|w| w.file.exists()));
        assert_eq!(written[2].section.col, 1);
        assert_eq!(written[2].section.row, 0);
        let index = std::fs::read_to_string(out_dir.join("sections.json")).expect("index");
        let parsed: serde_json::Value = serde_json::from_str(&index).expect("json");
        assert_eq!(parsed.as_array().map(Vec::len), Some(4));
        assert_eq!(parsed[1]["sectionIndex"], 1);
    }

    #[test]
    fn metrics_written_by_normalize_read_back() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("metrics.json");
        let metrics = compute_metrics(1200, 1600, 1000).expect("metrics");
        std::fs::write(&path, serde_json::to_string(&metrics).expect("json")).expect("write");
        let back: LetterboxMetrics = read_json(&path).expect("read");
        assert_eq!(back, metrics);
    }

    #[tokio::test]
    async fn explicit_corners_rectify_without_detection() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_page(tmp.path(), 200, 200);
        let output = tmp.path().join("flat.png");
        let summary = rectify_page(
            &PlatemapConfig::default(),
            &input,
            &output,
            Some(CornerSet::FULL_FRAME),
        )
        .await
        .expect("rectify");
        assert_eq!((summary.width, summary.height), (180, 180));
        assert!(output.exists());
    }
}
