// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page capture: detect the page outline in a new photo, let the operator
// adjust the corners, then rectify (or pass through) the upload.

use image::DynamicImage;
use platemap_bridge::{CornerDetector, CornerRequest};
use platemap_core::error::{PlatemapError, Result};
use platemap_core::{CornerSet, LetterboxMetrics, PlatemapConfig};
use platemap_document::geometry::{corners_from_frame, corners_to_frame};
use platemap_document::{CornerEditor, CornerEditorState, ImageProcessor, letterbox, rectify};
use tracing::{info, instrument};

use crate::pages::PageImage;
use crate::pipeline::off_thread;

/// Corner correction for one uploaded photo.
#[derive(Debug)]
pub struct CaptureFlow {
    source: PageImage,
    editor: CornerEditor,
    frame_size: u32,
    background: [u8; 3],
    jpeg_quality: u8,
    max_upload_width: u32,
}

impl CaptureFlow {
    pub fn new(image: DynamicImage, config: &PlatemapConfig) -> Self {
        Self {
            source: PageImage::new(image),
            editor: CornerEditor::new(config.corner_hit_radius),
            frame_size: config.frame_size,
            background: config.letterbox_background,
            jpeg_quality: config.jpeg_quality,
            max_upload_width: config.max_upload_width,
        }
    }

    pub fn editor(&self) -> &CornerEditor {
        &self.editor
    }

    /// Pointer handling goes straight to the corner editor.
    pub fn editor_mut(&mut self) -> &mut CornerEditor {
        &mut self.editor
    }

    pub fn source(&self) -> &DynamicImage {
        self.source.image()
    }

    /// Ask `detector` for the page outline. Detection failures are not
    /// errors: editing starts from the full-frame outline instead.
    #[instrument(skip(self, detector))]
    pub async fn detect(&mut self, detector: &dyn CornerDetector) -> Result<()> {
        self.editor.begin_detection()?;
        let outcome = self.request_corners(detector).await;
        self.editor.detection_finished(outcome)
    }

    async fn request_corners(&self, detector: &dyn CornerDetector) -> Result<CornerSet> {
        let source = self.source.clone();
        let (size, background) = (self.frame_size, self.background);
        let frame = off_thread("letterbox", move || letterbox(source.image(), size, background))
            .await?;
        let request = CornerRequest {
            image: frame.to_jpeg_bytes(self.jpeg_quality)?,
            width: size,
            height: size,
        };
        let framed = detector.detect_corners(request).await?;
        corners_from_frame(&framed, &frame.metrics())
    }

    /// Corners placed on a letterboxed display of the photo, for drawing the
    /// handles.
    pub fn display_handles(&self, display: &LetterboxMetrics) -> Result<CornerSet> {
        corners_to_frame(&self.editor.corners(), display)
    }

    pub fn confirm(&mut self) -> Result<CornerSet> {
        self.editor.confirm()
    }

    pub fn skip(&mut self) -> Result<()> {
        self.editor.skip()
    }

    /// Produce the page image: rectified when corners were confirmed,
    /// otherwise the upload capped at the configured width.
    #[instrument(skip(self), fields(state = ?self.editor.state()))]
    pub async fn finish(self) -> Result<PageImage> {
        let source = self.source;
        match self.editor.state() {
            CornerEditorState::Confirmed => {
                let corners = self.editor.corners();
                let flat = off_thread("rectify", move || rectify(source.image(), &corners)).await?;
                info!(width = flat.width(), height = flat.height(), "Page rectified");
                Ok(PageImage::new(flat))
            }
            CornerEditorState::Skipped => {
                let max_width = self.max_upload_width;
                let image = off_thread("downscale", move || {
                    Ok(ImageProcessor::from_dynamic(source.image().clone())
                        .downscale_to_width(max_width)
                        .into_dynamic())
                })
                .await?;
                Ok(PageImage::new(image))
            }
            state => Err(PlatemapError::InvalidTransition(format!(
                "cannot finish capture while {state:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use platemap_core::Point;

    use super::*;

    struct FixedCorners(Result<CornerSet>);

    #[async_trait]
    impl CornerDetector for FixedCorners {
        async fn detect_corners(&self, _request: CornerRequest) -> Result<CornerSet> {
            match &self.0 {
                Ok(c) => Ok(*c),
                Err(_) => Err(PlatemapError::Detection("no outline".into())),
            }
        }
    }

    fn photo(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 200, 200])))
    }

    #[tokio::test]
    async fn detected_corners_are_mapped_off_the_letterbox() {
        // 1200x1600 photo: frame content spans x 125..875.
        let mut flow = CaptureFlow::new(photo(1200, 1600), &PlatemapConfig::default());
        let framed = CornerSet {
            top_left: Point::new(125.0, 0.0),
            top_right: Point::new(875.0, 0.0),
            bottom_right: Point::new(875.0, 1000.0),
            bottom_left: Point::new(500.0, 500.0),
        };
        flow.detect(&FixedCorners(Ok(framed))).await.expect("detect");
        let c = flow.editor().corners();
        assert_eq!(flow.editor().state(), CornerEditorState::Editing);
        assert!(!flow.editor().detection_failed());
        assert!((c.top_left.x - 0.0).abs() < 1e-9);
        assert!((c.top_right.x - 1000.0).abs() < 1e-9);
        assert!((c.bottom_left.x - 500.0).abs() < 1e-9);
        assert!((c.bottom_left.y - 500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failed_detection_starts_from_full_frame() {
        let mut flow = CaptureFlow::new(photo(40, 40), &PlatemapConfig::default());
        flow.detect(&FixedCorners(Err(PlatemapError::CollaboratorUnavailable)))
            .await
            .expect("detect");
        assert!(flow.editor().detection_failed());
        assert_eq!(flow.editor().corners(), CornerSet::FULL_FRAME);
    }

    #[tokio::test]
    async fn skipped_capture_is_downscaled() {
        let mut flow = CaptureFlow::new(photo(2400, 600), &PlatemapConfig::default());
        flow.skip().expect("skip");
        let page = flow.finish().await.expect("finish");
        assert_eq!(page.dimensions(), (1200, 300));
    }

    #[tokio::test]
    async fn confirmed_capture_is_rectified() {
        let mut flow = CaptureFlow::new(photo(200, 200), &PlatemapConfig::default());
        flow.editor_mut().edit_manually().expect("edit");
        flow.confirm().expect("confirm");
        let page = flow.finish().await.expect("finish");
        assert_eq!(page.dimensions(), (180, 180));
    }

    #[tokio::test]
    async fn unfinished_capture_cannot_finish() {
        let flow = CaptureFlow::new(photo(20, 20), &PlatemapConfig::default());
        assert!(matches!(
            flow.finish().await,
            Err(PlatemapError::InvalidTransition(_))
        ));
    }

    #[test]
    fn handles_follow_display_letterbox() {
        let flow = CaptureFlow::new(photo(20, 20), &PlatemapConfig::default());
        let display = LetterboxMetrics { x: 100.0, y: 0.0, w: 800.0, h: 1000.0, scale: 1.0 };
        let handles = flow.display_handles(&display).expect("handles");
        assert!((handles.top_left.x - 140.0).abs() < 1e-9);
        assert!((handles.top_left.y - 50.0).abs() < 1e-9);
    }
}
