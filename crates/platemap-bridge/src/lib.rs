// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// platemap-bridge: boundaries to the remote vision model and corner
// detector.
//
// The editor only talks to the `VisionAnalyzer` and `CornerDetector` traits.
// Hosted implementations live with the deployment; this crate ships the
// payload types and an offline implementation for desktop and CI.

pub mod stub;
pub mod traits;

pub use stub::{LocalCornerDetector, OfflineBridge, OfflineVision};
pub use traits::{
    AnalysisMode, CornerDetector, CornerRequest, DetectedDish, OverlayHint, VisionAnalyzer,
    VisionRequest, VisionResponse,
};

/// The collaborators available without network access.
pub fn offline_bridge() -> OfflineBridge {
    OfflineBridge::default()
}
