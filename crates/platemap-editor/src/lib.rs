// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// platemap-editor: the interactive side of Platemap.
//
// Keeps overlays consistent with an editable page list, drives move/resize
// with edge snapping, records undo history, and runs cancellable page
// analysis against the vision collaborator.

pub mod cancel;
pub mod capture;
pub mod history;
pub mod interact;
pub mod pages;
pub mod pipeline;
pub mod remap;
pub mod session;
pub mod store;

pub use cancel::{AnalysisGate, AnalysisTicket};
pub use capture::CaptureFlow;
pub use history::{ChangeEntry, ChangeLog, EditorSnapshot, History};
pub use interact::{DragKind, DragSession, ResizeCorner, ScrollLock, SnapTargets};
pub use pages::{MenuPages, PageImage};
pub use pipeline::{
    AnalysisOptions, AnalysisPath, DishReading, DishSet, MergeSummary, PageAnalysisReport,
    RemapQuality, UnlabelledUnits, analyze_page, normalize_token, score_remap_quality,
};
pub use remap::{PageIndexMap, RemapOutcome, remap_page_indices};
pub use session::EditorSession;
pub use store::OverlayStore;
