// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Platemap.

use thiserror::Error;

/// Top-level error type for all Platemap operations.
#[derive(Debug, Error)]
pub enum PlatemapError {
    // -- Raster errors --
    #[error("image failed to load: {0}")]
    ImageLoad(String),

    #[error("image encoding failed: {0}")]
    ImageEncode(String),

    // -- Geometry errors --
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("page index {index} out of range for {len} page(s)")]
    PageOutOfRange { index: usize, len: usize },

    #[error("invalid page index map: {0}")]
    InvalidIndexMap(String),

    #[error("unknown overlay: {0}")]
    UnknownOverlay(String),

    #[error("invalid editor transition: {0}")]
    InvalidTransition(String),

    // -- Remote collaborators --
    #[error("detection failed: {0}")]
    Detection(String),

    #[error("analysis superseded by a newer request")]
    Aborted,

    #[error("remote collaborator not configured")]
    CollaboratorUnavailable,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PlatemapError>;
