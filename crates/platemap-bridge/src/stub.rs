// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Offline collaborators for desktop/CI use where no model endpoint exists.
//
// The vision stub reports `CollaboratorUnavailable`; callers fall back to an
// empty discovery result. Corner detection runs locally on the frame.

use async_trait::async_trait;
use platemap_core::error::{PlatemapError, Result};
use platemap_core::CornerSet;
use platemap_document::{ImageProcessor, detect_page_corners};
use tracing::{debug, warn};

use crate::traits::*;

/// Vision analyzer used when no model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineVision;

#[async_trait]
impl VisionAnalyzer for OfflineVision {
    async fn analyze(&self, request: VisionRequest) -> Result<VisionResponse> {
        warn!(page = request.page_index, "VisionAnalyzer::analyze called on offline bridge");
        Err(PlatemapError::CollaboratorUnavailable)
    }
}

/// Hough-line corner detector running on the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCornerDetector;

#[async_trait]
impl CornerDetector for LocalCornerDetector {
    async fn detect_corners(&self, request: CornerRequest) -> Result<CornerSet> {
        // Edge detection is CPU-bound; keep it off the async workers.
        let found = tokio::task::spawn_blocking(move || {
            let frame = ImageProcessor::from_bytes(&request.image)?;
            Ok::<_, PlatemapError>(detect_page_corners(frame.as_dynamic()))
        })
        .await
        .map_err(|err| PlatemapError::Detection(format!("corner detection task failed: {err}")))??;

        match found {
            Some(corners) => {
                debug!(?corners, "Local corner detection succeeded");
                Ok(corners)
            }
            None => Err(PlatemapError::Detection("no page outline found".into())),
        }
    }
}

/// Both offline collaborators behind one value.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBridge {
    pub vision: OfflineVision,
    pub corners: LocalCornerDetector,
}

#[async_trait]
impl VisionAnalyzer for OfflineBridge {
    async fn analyze(&self, request: VisionRequest) -> Result<VisionResponse> {
        self.vision.analyze(request).await
    }
}

#[async_trait]
impl CornerDetector for OfflineBridge {
    async fn detect_corners(&self, request: CornerRequest) -> Result<CornerSet> {
        self.corners.detect_corners(request).await
    }
}
