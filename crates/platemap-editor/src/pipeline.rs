// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page analysis: letterbox a page, ask the vision model for dish boxes,
// normalize the answer into percent space, and merge it into the session.
//
// A page with existing overlays and a previous photo is re-analysed in remap
// mode; a poor remap answer is retried in discovery mode. When the detected
// boxes would render too small, the page is split into sections and each
// section is analysed in order.

use std::collections::HashSet;

use platemap_bridge::{
    AnalysisMode, DetectedDish, OverlayHint, VisionAnalyzer, VisionRequest, VisionResponse,
};
use platemap_core::error::{PlatemapError, Result};
use platemap_core::{CoordSpace, LetterboxMetrics, Overlay, PlatemapConfig, Rect};
use platemap_document::geometry::{
    clamp_percent_rect, infer_coord_space, percent_hint, rect_from_frame, rect_to_thousand,
};
use platemap_document::split::{
    BoxSizeReport, ColumnOptions, Section, SectionDescriptor, analyze_box_sizes_with_limit,
    detect_columns_with, split_into_sections,
};
use platemap_document::{LetterboxFrame, letterbox};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cancel::AnalysisTicket;
use crate::pages::PageImage;
use crate::session::EditorSession;
use crate::store::OverlayStore;

/// Matching key for dish names: lowercase ASCII letters and digits only.
pub fn normalize_token(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// -- Remap quality ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemapQuality {
    pub dish_count: usize,
    pub suspicious_count: usize,
    pub suspicious_ratio: f64,
    pub is_low_quality: bool,
}

/// Pinned to an edge, too small to tap, or swallowing a large part of the
/// page.
fn is_suspicious(r: &Rect) -> bool {
    if !r.is_finite() {
        return true;
    }
    let edge_clamped = r.x <= 0.5 || r.y <= 0.5 || r.right() >= 99.5 || r.bottom() >= 99.5;
    let degenerate = r.w <= 1.2 || r.h <= 1.2 || r.area() <= 1.5;
    let oversized = r.area() >= 65.0;
    edge_clamped || degenerate || oversized
}

/// Score percent-space boxes from a remap answer. Four or more boxes with at
/// least 45% suspicious is low quality.
pub fn score_remap_quality(rects: &[Rect]) -> RemapQuality {
    let dish_count = rects.len();
    let suspicious_count = rects.iter().filter(|r| is_suspicious(r)).count();
    let suspicious_ratio = if dish_count == 0 {
        0.0
    } else {
        suspicious_count as f64 / dish_count as f64
    };
    RemapQuality {
        dish_count,
        suspicious_count,
        suspicious_ratio,
        is_low_quality: dish_count >= 4 && suspicious_ratio >= 0.45,
    }
}

// -- Normalized detections ----------------------------------------------------

/// How boxes without a `coordSpace` label are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnlabelledUnits {
    /// Analysis-frame units, the collaborator's contract.
    #[default]
    Frame,
    /// Guess per box. Only for models that mix units; small frame boxes
    /// come back as percentages.
    Infer,
}

/// Everything needed to read a box from a vision answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DishReading {
    /// Pixel size of the image the model was shown.
    pub frame_dims: Option<(f64, f64)>,
    pub units: UnlabelledUnits,
}

impl DishReading {
    pub fn new(frame_size: u32, units: UnlabelledUnits) -> Self {
        Self {
            frame_dims: Some((frame_size as f64, frame_size as f64)),
            units,
        }
    }

    fn space_of(&self, dish: &DetectedDish) -> Option<CoordSpace> {
        dish.space().or_else(|| match self.units {
            UnlabelledUnits::Frame => Some(CoordSpace::Thousand),
            UnlabelledUnits::Infer => infer_coord_space(&dish.rect(), self.frame_dims),
        })
    }
}

/// A detected dish mapped onto the page.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDish {
    pub name: String,
    pub token: String,
    /// Percent of the page content.
    pub rect: Rect,
    /// The same box in frame units; `None` when the reported geometry was
    /// unusable and `rect` is the placeholder.
    pub frame_rect: Option<Rect>,
}

impl NormalizedDish {
    fn project(dish: &DetectedDish, metrics: &LetterboxMetrics, reading: &DishReading) -> Option<Self> {
        let space = reading.space_of(dish)?;
        let frame = rect_to_thousand(&dish.rect(), space, reading.frame_dims).ok()?;
        let pct = rect_from_frame(&frame, metrics).ok()?;
        Some(Self {
            name: dish.id.trim().to_string(),
            token: normalize_token(&dish.id),
            rect: clamp_percent_rect(&pct),
            frame_rect: Some(frame),
        })
    }

    fn placeholder(dish: &DetectedDish) -> Self {
        Self {
            name: dish.id.trim().to_string(),
            token: normalize_token(&dish.id),
            rect: Rect::PLACEHOLDER,
            frame_rect: None,
        }
    }
}

/// Detections for one page, deduplicated by token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DishSet {
    /// Boxes the model matched to existing overlays.
    pub updated: Vec<NormalizedDish>,
    pub new: Vec<NormalizedDish>,
}

impl DishSet {
    /// Read a remap answer. Updated entries with unusable geometry keep
    /// their place with the placeholder box; new entries are dropped.
    pub fn from_remap(
        response: &VisionResponse,
        metrics: &LetterboxMetrics,
        reading: &DishReading,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut updated = Vec::new();
        for dish in &response.updated_overlays {
            let token = normalize_token(&dish.id);
            if token.is_empty() || !seen.insert(token) {
                continue;
            }
            updated.push(NormalizedDish::project(dish, metrics, reading).unwrap_or_else(|| {
                warn!(dish = %dish.id, "Updated dish has unusable geometry; using placeholder box");
                NormalizedDish::placeholder(dish)
            }));
        }
        let new = Self::collect_new(response.new_entries(), &seen, metrics, reading);
        Self { updated, new }
    }

    /// Read a discovery answer: every entry is new.
    pub fn from_discovery(
        response: &VisionResponse,
        metrics: &LetterboxMetrics,
        reading: &DishReading,
    ) -> Self {
        let entries: Vec<DetectedDish> = response
            .updated_overlays
            .iter()
            .chain(response.new_entries())
            .cloned()
            .collect();
        Self {
            updated: Vec::new(),
            new: Self::collect_new(&entries, &HashSet::new(), metrics, reading),
        }
    }

    fn collect_new(
        entries: &[DetectedDish],
        taken: &HashSet<String>,
        metrics: &LetterboxMetrics,
        reading: &DishReading,
    ) -> Vec<NormalizedDish> {
        let mut seen = HashSet::new();
        entries
            .iter()
            .filter_map(|dish| {
                let projected = NormalizedDish::project(dish, metrics, reading);
                if projected.is_none() {
                    warn!(dish = %dish.id, "Skipping detected dish with unusable geometry");
                }
                projected
            })
            .filter(|d| !d.token.is_empty() && !taken.contains(&d.token))
            .filter(|d| seen.insert(d.token.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.updated.len() + self.new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.new.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &NormalizedDish> {
        self.updated.iter().chain(&self.new)
    }

    /// Percent-space boxes.
    pub fn rects(&self) -> Vec<Rect> {
        self.iter().map(|d| d.rect).collect()
    }

    /// Frame-space boxes of entries with real geometry.
    pub fn frame_rects(&self) -> Vec<Rect> {
        self.iter().filter_map(|d| d.frame_rect).collect()
    }

    /// A remap that matched nothing but found dishes replaces the page.
    pub fn replaces_page(&self) -> bool {
        self.updated.is_empty() && !self.new.is_empty()
    }
}

// -- Merge --------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub updated: usize,
    pub added: usize,
    pub removed: usize,
}

impl MergeSummary {
    /// Change-log line for this merge.
    pub fn describe(&self, page_index: usize) -> String {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        if self.updated > 0 || self.added > 0 {
            format!(
                "Menu analysis: Updated {} overlay{}, added {} overlay{}, removed {} overlay{} on page {}",
                self.updated,
                plural(self.updated),
                self.added,
                plural(self.added),
                self.removed,
                plural(self.removed),
                page_index + 1
            )
        } else if self.removed > 0 {
            format!(
                "Menu analysis: Removed {} unmatched overlay{} on page {}",
                self.removed,
                plural(self.removed),
                page_index + 1
            )
        } else {
            format!("Menu analysis: No dishes detected on page {}", page_index + 1)
        }
    }
}

/// Merge `dishes` into the overlays of `page_index`.
///
/// Each dish updates the first not-yet-matched overlay on the page with the
/// same token, or becomes a new overlay. With `replace_page` the page is
/// cleared first; with `remove_unmatched` overlays whose token was not
/// detected are dropped afterwards.
pub fn merge_dishes(
    store: &mut OverlayStore,
    page_index: usize,
    dishes: &DishSet,
    replace_page: bool,
    remove_unmatched: bool,
) -> Result<MergeSummary> {
    store.transaction(|draft| {
        let mut summary = MergeSummary::default();
        if replace_page {
            let before = draft.len();
            draft.retain(|o| o.page_index != page_index);
            summary.removed += before - draft.len();
        }

        let mut matched = HashSet::new();
        for dish in dishes.iter() {
            let hit = draft.iter().enumerate().position(|(i, o)| {
                !matched.contains(&i)
                    && o.page_index == page_index
                    && normalize_token(&o.id) == dish.token
            });
            match hit {
                Some(i) => {
                    matched.insert(i);
                    draft[i].set_rect(dish.rect);
                    summary.updated += 1;
                }
                None => {
                    draft.push(Overlay::new(dish.name.clone(), dish.rect, page_index));
                    summary.added += 1;
                }
            }
        }

        if remove_unmatched {
            let detected: HashSet<&str> = dishes.iter().map(|d| d.token.as_str()).collect();
            let before = draft.len();
            draft.retain(|o| {
                o.page_index != page_index || detected.contains(normalize_token(&o.id).as_str())
            });
            summary.removed += before - draft.len();
        }
        Ok(summary)
    })
}

// -- Pipeline -----------------------------------------------------------------

/// Which path produced a page's detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisPath {
    Remap,
    DetectFallback,
    Detect,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Photo the page's overlays were placed on. Enables remap mode when the
    /// page already has overlays.
    pub previous_image: Option<PageImage>,
    /// Split the page when its boxes would render too small.
    pub auto_split: bool,
    /// Drop overlays on the page that the model no longer reports.
    pub remove_unmatched: bool,
    pub unlabelled_units: UnlabelledUnits,
}

/// Outcome of [`analyze_page`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysisReport {
    pub page_index: usize,
    pub analysis_mode: AnalysisPath,
    pub fallback_used: bool,
    pub raw_dish_count: usize,
    pub valid_dish_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<RemapQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_sizes: Option<BoxSizeReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SectionDescriptor>,
    pub merge: MergeSummary,
    /// Collaborator failure the run recovered from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageAnalysisReport {
    fn new(page_index: usize) -> Self {
        Self {
            page_index,
            analysis_mode: AnalysisPath::Detect,
            fallback_used: false,
            raw_dish_count: 0,
            valid_dish_count: 0,
            quality: None,
            box_sizes: None,
            sections: Vec::new(),
            merge: MergeSummary::default(),
            error: None,
        }
    }
}

/// Run CPU-bound raster work on the blocking pool.
pub(crate) async fn off_thread<T, F>(task: &'static str, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| PlatemapError::ImageEncode(format!("{task} task failed: {err}")))?
}

async fn letterbox_page(page: &PageImage, config: &PlatemapConfig) -> Result<LetterboxFrame> {
    let page = page.clone();
    let (size, background) = (config.frame_size, config.letterbox_background);
    off_thread("letterbox", move || letterbox(page.image(), size, background)).await
}

/// Ask the model, treating any failure other than cancellation as an empty
/// answer.
async fn request_dishes(
    ticket: &AnalysisTicket,
    analyzer: &dyn VisionAnalyzer,
    request: VisionRequest,
    report: &mut PageAnalysisReport,
) -> Result<VisionResponse> {
    match ticket.run(analyzer.analyze(request)).await {
        Ok(response) => Ok(response),
        Err(PlatemapError::Aborted) => Err(PlatemapError::Aborted),
        Err(err) => {
            warn!(page = report.page_index, error = %err, "Vision analysis failed; continuing with no detections");
            report.error = Some(err.to_string());
            Ok(VisionResponse::default())
        }
    }
}

/// Analyse page `page_index` and merge the detections into `session`.
///
/// Starting a run supersedes any run already in flight on the same page;
/// a superseded run returns `Err(Aborted)` without touching the session.
#[instrument(skip(session, analyzer, options), fields(page = page_index))]
pub async fn analyze_page(
    session: &mut EditorSession,
    page_index: usize,
    analyzer: &dyn VisionAnalyzer,
    options: AnalysisOptions,
) -> Result<PageAnalysisReport> {
    let ticket = session.analysis_gate().begin(page_index);
    let config = session.config().clone();
    let page = session.pages().get(page_index)?.clone();
    let frame_size = config.frame_size;
    let reading = DishReading::new(frame_size, options.unlabelled_units);

    let frame = letterbox_page(&page, &config).await?;
    let metrics = frame.metrics();
    let new_image = frame.to_jpeg_bytes(config.jpeg_quality)?;

    let has_overlays = session.overlays_on_page(page_index).next().is_some();
    let previous = match &options.previous_image {
        Some(previous) if has_overlays => Some(letterbox_page(previous, &config).await?),
        _ => None,
    };

    let mut report = PageAnalysisReport::new(page_index);
    let dishes = match previous {
        Some(old) => {
            let old_metrics = old.metrics();
            let hints: Vec<OverlayHint> = session
                .overlays_on_page(page_index)
                .filter_map(|o| {
                    percent_hint(&o.rect(), &old_metrics).map(|r| OverlayHint::new(o.id.clone(), r))
                })
                .collect();
            let request = VisionRequest {
                mode: AnalysisMode::Remap,
                old_image: Some(old.to_jpeg_bytes(config.jpeg_quality)?),
                new_image: new_image.clone(),
                overlays: hints,
                frame_width: frame_size,
                frame_height: frame_size,
                page_index,
            };
            let response = request_dishes(&ticket, analyzer, request, &mut report).await?;
            report.raw_dish_count = response.raw_count();
            report.analysis_mode = AnalysisPath::Remap;
            let remapped = DishSet::from_remap(&response, &metrics, &reading);
            let quality = score_remap_quality(&remapped.rects());
            report.quality = Some(quality);

            if quality.is_low_quality {
                warn!(
                    suspicious = quality.suspicious_count,
                    dishes = quality.dish_count,
                    "Low-quality remap; retrying in discovery mode"
                );
                report.analysis_mode = AnalysisPath::DetectFallback;
                report.fallback_used = true;
                let request = VisionRequest::discovery(new_image, frame_size, page_index);
                let response = request_dishes(&ticket, analyzer, request, &mut report).await?;
                report.raw_dish_count = response.raw_count();
                DishSet::from_discovery(&response, &metrics, &reading)
            } else {
                remapped
            }
        }
        None => {
            let request = VisionRequest::discovery(new_image, frame_size, page_index);
            let response = request_dishes(&ticket, analyzer, request, &mut report).await?;
            report.raw_dish_count = response.raw_count();
            DishSet::from_discovery(&response, &metrics, &reading)
        }
    };
    report.valid_dish_count = dishes.len();

    // Nothing below may run for a superseded request.
    ticket.ensure_current()?;

    let sizes = analyze_box_sizes_with_limit(
        &dishes.frame_rects(),
        &metrics,
        config.min_box_pixel_height,
        config.reference_display_width,
        config.max_strips,
    );
    report.box_sizes = Some(sizes);

    if options.auto_split && sizes.needs_split {
        let layout = detect_columns_with(&dishes.rects(), ColumnOptions::from(&config));
        let strips = if layout.column_count > 1 {
            sizes.strip_count.div_ceil(layout.column_count as u32).max(1)
        } else {
            sizes.strip_count
        };
        info!(columns = layout.column_count, strips, "Splitting page for legibility");
        let source = page.clone();
        let points = layout.split_points.clone();
        let sections = off_thread("section split", move || {
            split_into_sections(source.image(), &points, strips)
        })
        .await?;
        if sections.len() > 1 {
            ticket.ensure_current()?;
            split_and_detect(session, page_index, sections, analyzer, &ticket, &reading, &mut report)
                .await?;
            return Ok(report);
        }
        debug!("Split produced a single section; keeping the page whole");
    }

    let replace_page = report.analysis_mode == AnalysisPath::Remap && dishes.replaces_page();
    report.merge = merge_dishes(
        session.store_mut(),
        page_index,
        &dishes,
        replace_page,
        options.remove_unmatched,
    )?;
    info!(
        mode = ?report.analysis_mode,
        updated = report.merge.updated,
        added = report.merge.added,
        removed = report.merge.removed,
        "Page analysis merged"
    );
    session.checkpoint(report.merge.describe(page_index));
    Ok(report)
}

/// Replace the page by its sections, then run discovery on each section in
/// order. Section `s` becomes page `page_index + s`.
async fn split_and_detect(
    session: &mut EditorSession,
    page_index: usize,
    sections: Vec<Section>,
    analyzer: &dyn VisionAnalyzer,
    ticket: &AnalysisTicket,
    reading: &DishReading,
    report: &mut PageAnalysisReport,
) -> Result<()> {
    let removed = session.overlays_on_page(page_index).count();
    let parts: Vec<PageImage> = sections.iter().map(|s| PageImage::new(s.image.clone())).collect();
    session.edit_pages(None, |pages| pages.split(page_index, parts.clone()))?;
    report.sections = sections.iter().map(Section::descriptor).collect();

    let split_description = format!(
        "Menu pages: Split page {} into {} sections",
        page_index + 1,
        sections.len()
    );
    let detected =
        detect_sections(session, page_index, &sections, analyzer, ticket, reading, report).await;
    let added = match detected {
        Ok(added) => added,
        Err(err) => {
            // The split itself already happened.
            session.checkpoint(split_description);
            return Err(err);
        }
    };

    report.merge = MergeSummary {
        updated: 0,
        added,
        removed,
    };
    session.checkpoint(format!(
        "{split_description}; added {added} overlay{}",
        if added == 1 { "" } else { "s" }
    ));
    Ok(())
}

async fn detect_sections(
    session: &mut EditorSession,
    page_index: usize,
    sections: &[Section],
    analyzer: &dyn VisionAnalyzer,
    ticket: &AnalysisTicket,
    reading: &DishReading,
    report: &mut PageAnalysisReport,
) -> Result<usize> {
    let config = session.config().clone();
    let mut added = 0;
    for section in sections {
        let target_page = page_index + section.section_index;
        let part = session.pages().get(target_page)?.clone();
        let frame = letterbox_page(&part, &config).await?;
        let request = VisionRequest::discovery(
            frame.to_jpeg_bytes(config.jpeg_quality)?,
            config.frame_size,
            target_page,
        );
        let response = request_dishes(ticket, analyzer, request, report).await?;
        ticket.ensure_current()?;
        let dishes = DishSet::from_discovery(&response, &frame.metrics(), reading);
        debug!(section = section.section_index, target_page, dishes = dishes.len(), "Section analysed");
        for dish in dishes.new {
            session
                .store_mut()
                .add(Overlay::new(dish.name, dish.rect, target_page).with_origin_section(section.bounds));
            added += 1;
        }
    }
    Ok(added)
}
