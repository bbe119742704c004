// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Versioned overlay store.
//
// The store owns the overlay list. All writes go through it, and multi-step
// writes run as transactions on a draft that is only committed on success.

use platemap_core::error::PlatemapError;
use platemap_core::{Overlay, OverlayKey, Rect};
use tracing::debug;

use crate::remap::{PageIndexMap, RemapOutcome, remap_page_indices};

#[derive(Debug, Clone, Default)]
pub struct OverlayStore {
    overlays: Vec<Overlay>,
    version: u64,
}

impl OverlayStore {
    pub fn new(overlays: Vec<Overlay>) -> Self {
        Self {
            overlays,
            version: 0,
        }
    }

    /// Bumped on every committed write.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn all(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn get(&self, key: OverlayKey) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.key == key)
    }

    pub fn on_page(&self, page_index: usize) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter().filter(move |o| o.page_index == page_index)
    }

    /// Run `f` against a draft copy; commit only if it succeeds.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Vec<Overlay>) -> Result<T, PlatemapError>,
    ) -> Result<T, PlatemapError> {
        let mut draft = self.overlays.clone();
        let out = f(&mut draft)?;
        self.overlays = draft;
        self.version += 1;
        Ok(out)
    }

    pub fn add(&mut self, overlay: Overlay) -> OverlayKey {
        let key = overlay.key;
        self.overlays.push(overlay);
        self.version += 1;
        key
    }

    pub fn remove(&mut self, key: OverlayKey) -> Result<Overlay, PlatemapError> {
        let pos = self.position(key)?;
        self.version += 1;
        Ok(self.overlays.remove(pos))
    }

    pub fn update(
        &mut self,
        key: OverlayKey,
        f: impl FnOnce(&mut Overlay),
    ) -> Result<(), PlatemapError> {
        let pos = self.position(key)?;
        f(&mut self.overlays[pos]);
        self.version += 1;
        Ok(())
    }

    pub fn set_rect(&mut self, key: OverlayKey, rect: Rect) -> Result<(), PlatemapError> {
        self.update(key, |o| o.set_rect(rect))
    }

    /// Apply a page-list edit to every overlay.
    pub fn remap(
        &mut self,
        old_page_count: usize,
        map: &PageIndexMap,
    ) -> Result<RemapOutcome, PlatemapError> {
        let outcome = self.transaction(|draft| remap_page_indices(draft, old_page_count, map))?;
        debug!(version = self.version, ?outcome, "Store remapped");
        Ok(outcome)
    }

    /// Drop every overlay on `page_index` and add `replacements` in their
    /// place.
    pub fn replace_page(&mut self, page_index: usize, replacements: Vec<Overlay>) -> usize {
        let before = self.overlays.len();
        self.overlays.retain(|o| o.page_index != page_index);
        let dropped = before - self.overlays.len();
        self.overlays.extend(replacements.into_iter().map(|mut o| {
            o.page_index = page_index;
            o
        }));
        self.version += 1;
        dropped
    }

    /// Replace the whole list, e.g. when restoring a history snapshot.
    pub fn restore(&mut self, overlays: Vec<Overlay>) {
        self.overlays = overlays;
        self.version += 1;
    }

    fn position(&self, key: OverlayKey) -> Result<usize, PlatemapError> {
        self.overlays
            .iter()
            .position(|o| o.key == key)
            .ok_or_else(|| PlatemapError::UnknownOverlay(key.to_string()))
    }
}
