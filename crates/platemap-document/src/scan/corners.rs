// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner editor: the Idle -> Detecting -> Editing -> Confirmed | Skipped flow
// for the page quadrilateral, including handle hit-testing and dragging.

use platemap_core::error::PlatemapError;
use platemap_core::{Corner, CornerSet, Point};
use tracing::{debug, info, warn};

/// Where the corner flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerEditorState {
    Idle,
    Detecting,
    Editing,
    Confirmed,
    Skipped,
}

/// Interactive corner adjustment on the 0–1000 scale.
#[derive(Debug, Clone)]
pub struct CornerEditor {
    state: CornerEditorState,
    corners: CornerSet,
    active: Option<Corner>,
    hit_radius: f64,
    detection_failed: bool,
}

impl CornerEditor {
    pub fn new(hit_radius: f64) -> Self {
        Self {
            state: CornerEditorState::Idle,
            corners: CornerSet::FULL_FRAME,
            active: None,
            hit_radius,
            detection_failed: false,
        }
    }

    pub fn state(&self) -> CornerEditorState {
        self.state
    }

    pub fn corners(&self) -> CornerSet {
        self.corners
    }

    /// The handle currently being dragged.
    pub fn active_corner(&self) -> Option<Corner> {
        self.active
    }

    /// Whether the quadrilateral being edited is the full-frame fallback
    /// because detection failed.
    pub fn detection_failed(&self) -> bool {
        self.detection_failed
    }

    pub fn begin_detection(&mut self) -> Result<(), PlatemapError> {
        self.expect_state(CornerEditorState::Idle, "begin detection")?;
        self.state = CornerEditorState::Detecting;
        Ok(())
    }

    /// Apply the detector's answer. A failed detection is not an error for
    /// the flow: editing starts from the full-frame quadrilateral.
    pub fn detection_finished(
        &mut self,
        result: Result<CornerSet, PlatemapError>,
    ) -> Result<(), PlatemapError> {
        self.expect_state(CornerEditorState::Detecting, "finish detection")?;
        match result {
            Ok(corners) => {
                self.corners = corners.clamped();
                self.detection_failed = false;
                info!(corners = ?self.corners, "Corners detected");
            }
            Err(err) => {
                warn!(error = %err, "Corner detection failed; using full frame");
                self.corners = CornerSet::FULL_FRAME;
                self.detection_failed = true;
            }
        }
        self.state = CornerEditorState::Editing;
        Ok(())
    }

    /// Go straight to editing when there is no detector to ask.
    pub fn edit_manually(&mut self) -> Result<(), PlatemapError> {
        self.expect_state(CornerEditorState::Idle, "edit manually")?;
        self.corners = CornerSet::FULL_FRAME;
        self.state = CornerEditorState::Editing;
        Ok(())
    }

    /// Grab the nearest handle within the hit radius.
    pub fn pointer_down(&mut self, at: Point) -> Option<Corner> {
        if self.state != CornerEditorState::Editing {
            return None;
        }
        self.active = Corner::ALL
            .into_iter()
            .map(|corner| (corner, self.corners.get(corner).distance(&at)))
            .filter(|(_, d)| *d <= self.hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(corner, _)| corner);
        debug!(active = ?self.active, x = at.x, y = at.y, "Corner pointer down");
        self.active
    }

    /// Drag the active handle. Returns `true` when the outline must be
    /// redrawn.
    pub fn pointer_move(&mut self, to: Point) -> bool {
        let Some(corner) = self.active else {
            return false;
        };
        if !(to.x.is_finite() && to.y.is_finite()) {
            return false;
        }
        let clamped = Point::new(
            to.x.clamp(0.0, CornerSet::SCALE),
            to.y.clamp(0.0, CornerSet::SCALE),
        );
        self.corners.set(corner, clamped);
        true
    }

    /// Release the handle.
    pub fn pointer_up(&mut self) -> Option<Corner> {
        self.active.take()
    }

    /// Restore the full-frame quadrilateral.
    pub fn reset(&mut self) {
        self.corners = CornerSet::FULL_FRAME;
        self.active = None;
    }

    /// Closed outline in drawing order, for the live quadrilateral.
    pub fn outline(&self) -> [Point; 4] {
        Corner::ALL.map(|c| self.corners.get(c))
    }

    /// Lock in the corners for rectification.
    pub fn confirm(&mut self) -> Result<CornerSet, PlatemapError> {
        self.expect_state(CornerEditorState::Editing, "confirm corners")?;
        self.active = None;
        self.state = CornerEditorState::Confirmed;
        info!(corners = ?self.corners, "Corners confirmed");
        Ok(self.corners)
    }

    /// Opt out. The image passes through unchanged.
    pub fn skip(&mut self) -> Result<(), PlatemapError> {
        match self.state {
            CornerEditorState::Idle | CornerEditorState::Detecting | CornerEditorState::Editing => {
                self.active = None;
                self.state = CornerEditorState::Skipped;
                Ok(())
            }
            other => Err(PlatemapError::InvalidTransition(format!(
                "cannot skip corner correction from {other:?}"
            ))),
        }
    }

    fn expect_state(&self, want: CornerEditorState, action: &str) -> Result<(), PlatemapError> {
        if self.state != want {
            return Err(PlatemapError::InvalidTransition(format!(
                "cannot {action} from {:?}",
                self.state
            )));
        }
        Ok(())
    }
}

impl Default for CornerEditor {
    fn default() -> Self {
        Self::new(50.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editing() -> CornerEditor {
        let mut editor = CornerEditor::default();
        editor.begin_detection().expect("detect");
        editor
            .detection_finished(Ok(CornerSet {
                top_left: Point::new(-10.0, 40.0),
                top_right: Point::new(900.0, 60.0),
                bottom_right: Point::new(1100.0, 980.0),
                bottom_left: Point::new(80.0, 940.0),
            }))
            .expect("finish");
        editor
    }

    #[test]
    fn detected_corners_are_clamped() {
        let editor = editing();
        assert_eq!(editor.state(), CornerEditorState::Editing);
        assert_eq!(editor.corners().top_left, Point::new(0.0, 40.0));
        assert_eq!(editor.corners().bottom_right, Point::new(1000.0, 980.0));
    }

    #[test]
    fn detection_failure_falls_back_to_full_frame() {
        let mut editor = CornerEditor::default();
        editor.begin_detection().expect("detect");
        editor
            .detection_finished(Err(PlatemapError::Detection("timeout".into())))
            .expect("recoverable");
        assert_eq!(editor.state(), CornerEditorState::Editing);
        assert_eq!(editor.corners(), CornerSet::FULL_FRAME);
        assert!(editor.detection_failed());
    }

    #[test]
    fn pointer_picks_nearest_handle_within_radius() {
        let mut editor = CornerEditor::new(50.0);
        editor.edit_manually().expect("edit");
        assert_eq!(editor.pointer_down(Point::new(500.0, 500.0)), None);
        assert_eq!(
            editor.pointer_down(Point::new(940.0, 70.0)),
            Some(Corner::TopRight)
        );
        assert!(editor.pointer_move(Point::new(1200.0, -5.0)));
        assert_eq!(editor.corners().top_right, Point::new(1000.0, 0.0));
        assert_eq!(editor.pointer_up(), Some(Corner::TopRight));
        assert!(!editor.pointer_move(Point::new(1.0, 1.0)));
    }

    #[test]
    fn reset_restores_full_frame() {
        let mut editor = editing();
        editor.reset();
        assert_eq!(editor.corners(), CornerSet::FULL_FRAME);
    }

    #[test]
    fn confirm_and_skip_are_terminal() {
        let mut editor = editing();
        let corners = editor.confirm().expect("confirm");
        assert_eq!(corners, editor.corners());
        assert!(editor.skip().is_err());
        assert!(editor.confirm().is_err());

        let mut skipped = CornerEditor::default();
        skipped.skip().expect("skip");
        assert_eq!(skipped.state(), CornerEditorState::Skipped);
        assert!(skipped.begin_detection().is_err());
    }

    #[test]
    fn outline_runs_clockwise_from_top_left() {
        let mut editor = CornerEditor::default();
        editor.edit_manually().expect("edit");
        let outline = editor.outline();
        assert_eq!(outline[0], Point::new(50.0, 50.0));
        assert_eq!(outline[2], Point::new(950.0, 950.0));
    }
}
