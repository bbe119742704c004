// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-index remapping.
//
// Pages have no stable identity, only a position. Every edit to the page list
// produces a `PageIndexMap` (`map[new] = old`, `None` for pages that did not
// exist before) and every overlay is rewritten through it.

use platemap_core::error::PlatemapError;
use platemap_core::Overlay;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// `entries[new_index] = Some(old_index)`, or `None` for a fresh page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIndexMap {
    entries: Vec<Option<usize>>,
}

impl PageIndexMap {
    pub fn new(entries: Vec<Option<usize>>) -> Self {
        Self { entries }
    }

    /// Every page stays where it is.
    pub fn identity(len: usize) -> Self {
        Self::new((0..len).map(Some).collect())
    }

    /// `count` fresh pages inserted before `at`.
    pub fn for_insert(old_len: usize, at: usize, count: usize) -> Self {
        let at = at.min(old_len);
        let entries = (0..at)
            .map(Some)
            .chain(std::iter::repeat_n(None, count))
            .chain((at..old_len).map(Some))
            .collect();
        Self::new(entries)
    }

    /// Page `index` dropped; later pages shift up.
    pub fn for_removal(old_len: usize, index: usize) -> Self {
        Self::new((0..old_len).filter(|i| *i != index).map(Some).collect())
    }

    /// Page `from` taken out and reinserted at `to`. Pages in between shift
    /// by one towards `from`.
    pub fn for_move(len: usize, from: usize, to: usize) -> Self {
        let mut order: Vec<usize> = (0..len).collect();
        if from < len && to < len && from != to {
            let page = order.remove(from);
            order.insert(to, page);
        }
        Self::new(order.into_iter().map(Some).collect())
    }

    /// Page `index` replaced by `parts` fresh pages.
    pub fn for_split(old_len: usize, index: usize, parts: usize) -> Self {
        let entries = (0..index.min(old_len))
            .map(Some)
            .chain(std::iter::repeat_n(None, parts))
            .chain((index.saturating_add(1)..old_len).map(Some))
            .collect();
        Self::new(entries)
    }

    /// Number of pages after the edit.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Old index of the page now at `new_index`.
    pub fn source_of(&self, new_index: usize) -> Option<usize> {
        self.entries.get(new_index).copied().flatten()
    }

    pub fn entries(&self) -> &[Option<usize>] {
        &self.entries
    }

    /// Every old index referenced must exist and appear at most once.
    pub fn validate(&self, old_len: usize) -> Result<(), PlatemapError> {
        let mut seen = vec![false; old_len];
        for (new_index, old) in self.entries.iter().enumerate() {
            let Some(old) = *old else { continue };
            if old >= old_len {
                return Err(PlatemapError::InvalidIndexMap(format!(
                    "page {new_index} maps to old page {old}, but only {old_len} existed"
                )));
            }
            if std::mem::replace(&mut seen[old], true) {
                return Err(PlatemapError::InvalidIndexMap(format!(
                    "old page {old} appears more than once"
                )));
            }
        }
        Ok(())
    }

    /// `old -> new`, `None` for removed pages.
    pub fn invert(&self, old_len: usize) -> Vec<Option<usize>> {
        let mut inverted = vec![None; old_len];
        for (new_index, old) in self.entries.iter().enumerate() {
            if let Some(slot) = old.and_then(|o| inverted.get_mut(o)) {
                *slot = Some(new_index);
            }
        }
        inverted
    }
}

/// What [`remap_page_indices`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemapOutcome {
    /// Overlays deleted because their page was removed.
    pub removed: usize,
    /// Overlays whose page index changed.
    pub moved: usize,
}

/// Rewrite overlay page indices after the page list changed from
/// `old_page_count` pages to `map.len()` pages.
///
/// Overlays on removed pages are deleted. Overlays on pages that did not
/// exist before (`page_index >= old_page_count`) are left alone. The map is
/// validated first, so on error `overlays` is untouched.
pub fn remap_page_indices(
    overlays: &mut Vec<Overlay>,
    old_page_count: usize,
    map: &PageIndexMap,
) -> Result<RemapOutcome, PlatemapError> {
    map.validate(old_page_count)?;
    let old_to_new = map.invert(old_page_count);
    if old_page_count > 0 && old_to_new.iter().all(Option::is_none) {
        warn!(old_page_count, "Every previous page was removed");
    }

    let before = overlays.len();
    overlays.retain(|o| o.page_index >= old_page_count || old_to_new[o.page_index].is_some());
    let removed = before - overlays.len();

    let mut moved = 0;
    for overlay in overlays.iter_mut() {
        if let Some(Some(new_index)) = old_to_new.get(overlay.page_index) {
            if *new_index != overlay.page_index {
                overlay.page_index = *new_index;
                moved += 1;
            }
        }
    }

    debug!(removed, moved, new_page_count = map.len(), "Overlay page indices remapped");
    Ok(RemapOutcome { removed, moved })
}
