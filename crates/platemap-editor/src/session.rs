// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editor session: the one context object every editing component is handed.
//
// Owns the overlay store, page list, history, change log, drag state and
// scroll lock. Committed edits mark the session dirty and push one history
// checkpoint; intermediate pointer frames do neither.

use platemap_core::error::{PlatemapError, Result};
use platemap_core::{Overlay, OverlayKey, PlatemapConfig, Point, Rect};
use tracing::{debug, info, instrument};

use crate::cancel::AnalysisGate;
use crate::history::{ChangeEntry, ChangeLog, EditorSnapshot, History};
use crate::interact::{DragKind, DragSession, ResizeCorner, ScrollLock, SnapTargets};
use crate::pages::{MenuPages, PageImage};
use crate::remap::PageIndexMap;
use crate::store::OverlayStore;

#[derive(Debug)]
pub struct EditorSession {
    config: PlatemapConfig,
    store: OverlayStore,
    pages: MenuPages,
    history: History,
    changes: ChangeLog,
    dirty: bool,
    scroll: ScrollLock,
    drag: Option<DragSession>,
    selected: Option<OverlayKey>,
    active_page: usize,
    analysis: AnalysisGate,
}

impl EditorSession {
    /// Open a session on a loaded menu. The loaded state is the first
    /// history entry.
    pub fn new(config: PlatemapConfig, pages: Vec<PageImage>, overlays: Vec<Overlay>) -> Self {
        let mut session = Self {
            history: History::new(config.history_limit),
            config,
            store: OverlayStore::new(overlays),
            pages: MenuPages::new(pages),
            changes: ChangeLog::default(),
            dirty: false,
            scroll: ScrollLock::default(),
            drag: None,
            selected: None,
            active_page: 0,
            analysis: AnalysisGate::default(),
        };
        let initial = session.snapshot();
        session.history.push(initial);
        session
    }

    // -- Accessors ------------------------------------------------------------

    pub fn config(&self) -> &PlatemapConfig {
        &self.config
    }

    pub fn overlays(&self) -> &[Overlay] {
        self.store.all()
    }

    pub fn overlay(&self, key: OverlayKey) -> Option<&Overlay> {
        self.store.get(key)
    }

    pub fn overlays_on_page(&self, page_index: usize) -> impl Iterator<Item = &Overlay> {
        self.store.on_page(page_index)
    }

    pub fn store_version(&self) -> u64 {
        self.store.version()
    }

    pub fn pages(&self) -> &MenuPages {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn changes(&self) -> &[ChangeEntry] {
        self.changes.entries()
    }

    /// Hand the pending change log to the save step and mark the session
    /// clean.
    pub fn take_changes(&mut self) -> Vec<ChangeEntry> {
        self.dirty = false;
        self.changes.take()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn scroll_lock(&self) -> &ScrollLock {
        &self.scroll
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn selected(&self) -> Option<OverlayKey> {
        self.selected
    }

    pub fn select(&mut self, key: Option<OverlayKey>) -> Result<()> {
        if let Some(key) = key {
            self.require(key)?;
        }
        self.selected = key;
        Ok(())
    }

    pub fn active_page(&self) -> usize {
        self.active_page
    }

    pub fn set_active_page(&mut self, page_index: usize) -> Result<()> {
        self.pages.get(page_index)?;
        self.active_page = page_index;
        Ok(())
    }

    /// Shared handle for cancelling analysis runs from outside the session.
    pub fn analysis_gate(&self) -> AnalysisGate {
        self.analysis.clone()
    }

    // -- Overlay edits --------------------------------------------------------

    /// Add a manually placed overlay at the default box.
    pub fn add_overlay(&mut self, id: impl Into<String>, page_index: usize) -> Result<OverlayKey> {
        self.pages.get(page_index)?;
        let overlay = Overlay::new(id, Rect::PLACEHOLDER, page_index);
        let description = format!("Added overlay \"{}\"", overlay.id);
        let key = self.store.add(overlay);
        self.selected = Some(key);
        self.checkpoint(description);
        Ok(key)
    }

    pub fn remove_overlay(&mut self, key: OverlayKey) -> Result<Overlay> {
        if self.drag.as_ref().is_some_and(|d| d.key() == key) {
            self.drag = None;
        }
        let removed = self.store.remove(key)?;
        if self.selected == Some(key) {
            self.selected = None;
        }
        self.checkpoint(format!("Removed overlay \"{}\"", removed.id));
        Ok(removed)
    }

    // -- Drag and resize ------------------------------------------------------

    /// Start dragging `key` from `pointer`. `rendered` is the on-screen page
    /// size in device pixels.
    pub fn begin_move(
        &mut self,
        key: OverlayKey,
        pointer: Point,
        rendered: (f64, f64),
    ) -> Result<()> {
        self.begin_drag(key, DragKind::Move, pointer, rendered)
    }

    pub fn begin_resize(
        &mut self,
        key: OverlayKey,
        corner: ResizeCorner,
        pointer: Point,
        rendered: (f64, f64),
    ) -> Result<()> {
        self.begin_drag(key, DragKind::Resize(corner), pointer, rendered)
    }

    fn begin_drag(
        &mut self,
        key: OverlayKey,
        kind: DragKind,
        pointer: Point,
        rendered: (f64, f64),
    ) -> Result<()> {
        if self.drag.is_some() {
            return Err(PlatemapError::InvalidTransition(
                "another overlay is already being dragged".into(),
            ));
        }
        let overlay = self.require(key)?;
        let targets = SnapTargets::collect(self.store.all(), overlay.page_index, key);
        let drag = DragSession::new(
            overlay,
            kind,
            pointer,
            rendered,
            targets,
            self.config.snap_threshold,
            self.scroll.acquire(),
        );
        debug!(%key, ?kind, "Drag started");
        self.drag = Some(drag);
        self.selected = Some(key);
        Ok(())
    }

    /// Follow the pointer. The store is updated live; nothing is recorded.
    pub fn pointer_move(&mut self, pointer: Point) -> Result<Option<Rect>> {
        let Some(drag) = self.drag.as_mut() else {
            return Ok(None);
        };
        let rect = drag.update(pointer);
        let key = drag.key();
        self.store.set_rect(key, rect)?;
        Ok(Some(rect))
    }

    /// Commit the drag. Returns the final box, or `None` when nothing was
    /// being dragged.
    pub fn pointer_up(&mut self) -> Result<Option<Rect>> {
        let Some(drag) = self.drag.take() else {
            return Ok(None);
        };
        let rect = drag.current();
        if rect != drag.start() {
            self.store.set_rect(drag.key(), rect)?;
            self.checkpoint("Adjusted overlay position".to_string());
        }
        Ok(Some(rect))
    }

    /// Abandon the drag and put the box back where it started.
    pub fn cancel_drag(&mut self) -> Result<()> {
        if let Some(drag) = self.drag.take() {
            self.store.set_rect(drag.key(), drag.start())?;
        }
        Ok(())
    }

    // -- Page list edits ------------------------------------------------------

    pub fn add_page(&mut self, page: PageImage) -> Result<PageIndexMap> {
        let description = format!("Menu pages: Added page {}", self.pages.len() + 1);
        self.edit_pages(Some(description), |pages| Ok(pages.add(page)))
    }

    pub fn insert_page(&mut self, at: usize, page: PageImage) -> Result<PageIndexMap> {
        self.edit_pages(Some(format!("Menu pages: Inserted page {}", at + 1)), |pages| {
            pages.insert(at, page)
        })
    }

    /// Swap in a new photo of a page; its overlays stay.
    pub fn replace_page(&mut self, index: usize, page: PageImage) -> Result<PageIndexMap> {
        self.edit_pages(Some(format!("Menu pages: Replaced page {}", index + 1)), |pages| {
            pages.replace(index, page)
        })
    }

    pub fn remove_page(&mut self, index: usize) -> Result<PageIndexMap> {
        self.edit_pages(Some(format!("Menu pages: Removed page {}", index + 1)), |pages| {
            pages.remove(index)
        })
    }

    pub fn move_page(&mut self, from: usize, to: usize) -> Result<PageIndexMap> {
        let description = format!("Menu pages: Moved page {} to {}", from + 1, to + 1);
        self.edit_pages(Some(description), |pages| pages.move_page(from, to))
    }

    /// Replace a page by its sections. Overlays on the page are dropped.
    pub fn split_page(&mut self, index: usize, parts: Vec<PageImage>) -> Result<PageIndexMap> {
        let description =
            format!("Menu pages: Split page {} into {} sections", index + 1, parts.len());
        self.edit_pages(Some(description), |pages| pages.split(index, parts))
    }

    /// Apply a page-list edit and remap overlays through its index map. The
    /// page list is rolled back if the remap fails.
    pub(crate) fn edit_pages(
        &mut self,
        description: Option<String>,
        edit: impl FnOnce(&mut MenuPages) -> Result<PageIndexMap>,
    ) -> Result<PageIndexMap> {
        let before = self.pages.clone();
        let old_len = before.len();
        let map = edit(&mut self.pages)?;
        if let Err(err) = self.store.remap(old_len, &map) {
            self.pages = before;
            return Err(err);
        }
        if self.selected.is_some_and(|key| self.store.get(key).is_none()) {
            self.selected = None;
        }
        self.active_page = self.active_page.min(self.pages.len().saturating_sub(1));
        info!(old_len, new_len = self.pages.len(), "Page list edited");
        if let Some(description) = description {
            self.checkpoint(description);
        }
        Ok(map)
    }

    // -- History --------------------------------------------------------------

    #[instrument(skip(self))]
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    #[instrument(skip(self))]
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    fn restore(&mut self, snapshot: EditorSnapshot) {
        self.drag = None;
        self.store.restore(snapshot.overlays);
        self.pages.restore(snapshot.pages);
        self.changes.restore(snapshot.changes);
        if self.selected.is_some_and(|key| self.store.get(key).is_none()) {
            self.selected = None;
        }
        self.active_page = self.active_page.min(self.pages.len().saturating_sub(1));
        self.dirty = true;
    }

    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            overlays: self.store.all().to_vec(),
            pages: self.pages.as_slice().to_vec(),
            changes: self.changes.entries().to_vec(),
        }
    }

    /// Record a committed edit.
    pub(crate) fn checkpoint(&mut self, description: String) {
        self.changes.record(description);
        self.dirty = true;
        let snapshot = self.snapshot();
        self.history.push(snapshot);
    }

    // -- Crate-internal access for the analysis pipeline -----------------------

    pub(crate) fn store_mut(&mut self) -> &mut OverlayStore {
        &mut self.store
    }

    fn require(&self, key: OverlayKey) -> Result<&Overlay> {
        self.store
            .get(key)
            .ok_or_else(|| PlatemapError::UnknownOverlay(key.to_string()))
    }
}

impl Drop for EditorSession {
    /// Runs started through a shared gate must not outlive the menu they
    /// would write into.
    fn drop(&mut self) {
        self.analysis.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn page() -> PageImage {
        PageImage::new(DynamicImage::ImageRgb8(RgbImage::new(4, 4)))
    }

    fn session(pages: usize, overlays: Vec<Overlay>) -> EditorSession {
        EditorSession::new(
            PlatemapConfig::default(),
            (0..pages).map(|_| page()).collect(),
            overlays,
        )
    }

    #[test]
    fn committed_drag_marks_dirty_and_checkpoints() {
        let mut s = session(1, Vec::new());
        let key = s.add_overlay("Soup", 0).expect("add");
        s.begin_move(key, Point::new(0.0, 0.0), (200.0, 400.0)).expect("begin");
        assert!(s.scroll_lock().is_locked());
        s.pointer_move(Point::new(10.0, 0.0)).expect("move");
        s.pointer_move(Point::new(20.0, 40.0)).expect("move");
        let rect = s.pointer_up().expect("up").expect("rect");
        assert_eq!(rect, Rect::new(20.0, 20.0, 20.0, 8.0));
        assert!(!s.scroll_lock().is_locked());
        assert!(s.is_dirty());
        assert_eq!(s.changes().last().map(|c| c.description.as_str()), Some("Adjusted overlay position"));

        assert!(s.undo());
        assert_eq!(s.overlay(key).map(Overlay::rect), Some(Rect::PLACEHOLDER));
        assert!(s.redo());
        assert_eq!(s.overlay(key).map(Overlay::rect), Some(rect));
    }

    #[test]
    fn only_one_drag_at_a_time() {
        let mut s = session(1, Vec::new());
        let a = s.add_overlay("a", 0).expect("add");
        let b = s.add_overlay("b", 0).expect("add");
        s.begin_move(a, Point::default(), (100.0, 100.0)).expect("begin");
        assert!(matches!(
            s.begin_resize(b, ResizeCorner::Se, Point::default(), (100.0, 100.0)),
            Err(PlatemapError::InvalidTransition(_))
        ));
    }

    #[test]
    fn click_without_motion_records_nothing() {
        let mut s = session(1, Vec::new());
        let key = s.add_overlay("a", 0).expect("add");
        let before = s.changes().len();
        s.begin_move(key, Point::default(), (100.0, 100.0)).expect("begin");
        s.pointer_up().expect("up");
        assert_eq!(s.changes().len(), before);
    }

    #[test]
    fn cancel_drag_restores_start() {
        let mut s = session(1, Vec::new());
        let key = s.add_overlay("a", 0).expect("add");
        s.begin_move(key, Point::default(), (100.0, 100.0)).expect("begin");
        s.pointer_move(Point::new(30.0, 30.0)).expect("move");
        s.cancel_drag().expect("cancel");
        assert_eq!(s.overlay(key).map(Overlay::rect), Some(Rect::PLACEHOLDER));
        assert!(!s.is_dragging());
    }

    #[test]
    fn removing_a_page_remaps_overlays_and_logs() {
        let overlays = vec![
            Overlay::new("a", Rect::PLACEHOLDER, 0),
            Overlay::new("b", Rect::PLACEHOLDER, 1),
            Overlay::new("c", Rect::PLACEHOLDER, 2),
        ];
        let mut s = session(3, overlays);
        s.remove_page(1).expect("remove");
        let pages: Vec<(&str, usize)> =
            s.overlays().iter().map(|o| (o.id.as_str(), o.page_index)).collect();
        assert_eq!(pages, vec![("a", 0), ("c", 1)]);
        assert_eq!(
            s.changes().last().map(|c| c.description.as_str()),
            Some("Menu pages: Removed page 2")
        );

        assert!(s.undo());
        assert_eq!(s.page_count(), 3);
        assert_eq!(s.overlays().len(), 3);
        assert!(s.changes().is_empty());
    }

    #[test]
    fn moving_a_page_carries_its_overlays() {
        let overlays = vec![
            Overlay::new("first", Rect::PLACEHOLDER, 0),
            Overlay::new("last", Rect::PLACEHOLDER, 2),
        ];
        let mut s = session(3, overlays);
        s.move_page(0, 2).expect("move");
        let pages: Vec<(&str, usize)> =
            s.overlays().iter().map(|o| (o.id.as_str(), o.page_index)).collect();
        assert_eq!(pages, vec![("first", 2), ("last", 1)]);
    }

    #[test]
    fn edits_against_missing_pages_fail_cleanly() {
        let mut s = session(1, Vec::new());
        assert!(matches!(
            s.add_overlay("x", 4),
            Err(PlatemapError::PageOutOfRange { index: 4, len: 1 })
        ));
        assert!(s.remove_page(2).is_err());
        assert!(!s.is_dirty());
        assert!(!s.can_undo());
    }

    #[test]
    fn take_changes_marks_clean() {
        let mut s = session(2, Vec::new());
        s.add_page(page()).expect("add");
        let changes = s.take_changes();
        assert_eq!(changes.len(), 1);
        assert!(!s.is_dirty());
        assert!(s.changes().is_empty());
    }

    #[test]
    fn closing_the_session_cancels_outstanding_runs() {
        let s = session(2, Vec::new());
        let gate = s.analysis_gate();
        let first = gate.begin(0);
        let second = gate.begin(1);
        drop(s);
        assert!(!first.is_current());
        assert!(!second.is_current());
    }
}
