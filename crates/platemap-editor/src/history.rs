// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Undo/redo history and the pending change log.

use chrono::{DateTime, Utc};
use platemap_core::Overlay;
use serde::Serialize;

use crate::pages::PageImage;

/// A restorable editor state.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub overlays: Vec<Overlay>,
    pub pages: Vec<PageImage>,
    pub changes: Vec<ChangeEntry>,
}

impl EditorSnapshot {
    /// Snapshots that differ only in their change log are the same state.
    fn same_state(&self, other: &EditorSnapshot) -> bool {
        self.overlays == other.overlays && self.pages == other.pages
    }
}

/// Linear history with a cursor. Pushing after an undo discards the redo
/// branch.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<EditorSnapshot>,
    cursor: usize,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record `snapshot` unless it matches the current entry. Returns whether
    /// it was recorded.
    pub fn push(&mut self, snapshot: EditorSnapshot) -> bool {
        self.entries.truncate(self.cursor + 1);
        if self.entries.last().is_some_and(|last| last.same_state(&snapshot)) {
            return false;
        }
        self.entries.push(snapshot);
        let overflow = self.entries.len().saturating_sub(self.limit);
        self.entries.drain(..overflow);
        self.cursor = self.entries.len() - 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn undo(&mut self) -> Option<&EditorSnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    pub fn redo(&mut self) -> Option<&EditorSnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One line of the pending change log shown at save time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    pub at: DateTime<Utc>,
    pub description: String,
}

/// Human-readable list of unsaved edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeLog {
    entries: Vec<ChangeEntry>,
}

impl ChangeLog {
    /// Append `description`. A repeat of the latest entry is collapsed.
    pub fn record(&mut self, description: impl Into<String>) {
        let description = description.into();
        if self.entries.last().is_some_and(|e| e.description == description) {
            return;
        }
        self.entries.push(ChangeEntry {
            at: Utc::now(),
            description,
        });
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.description.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hand the log to the save step and start afresh.
    pub fn take(&mut self) -> Vec<ChangeEntry> {
        std::mem::take(&mut self.entries)
    }

    pub fn restore(&mut self, entries: Vec<ChangeEntry>) {
        self.entries = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platemap_core::Rect;

    fn snap(n: usize) -> EditorSnapshot {
        EditorSnapshot {
            overlays: (0..n).map(|i| Overlay::new(format!("d{i}"), Rect::PLACEHOLDER, 0)).collect(),
            pages: Vec::new(),
            changes: Vec::new(),
        }
    }

    #[test]
    fn duplicate_pushes_are_ignored() {
        let mut history = History::new(50);
        let s = snap(1);
        assert!(history.push(s.clone()));
        assert!(!history.push(s));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn undo_redo_walk_the_cursor() {
        let mut history = History::new(50);
        history.push(snap(0));
        history.push(snap(1));
        history.push(snap(2));
        assert_eq!(history.undo().map(|s| s.overlays.len()), Some(1));
        assert_eq!(history.undo().map(|s| s.overlays.len()), Some(0));
        assert!(history.undo().is_none());
        assert_eq!(history.redo().map(|s| s.overlays.len()), Some(1));

        // New edit drops the redo branch.
        history.push(snap(5));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn oldest_entries_fall_off() {
        let mut history = History::new(3);
        for n in 0..5 {
            history.push(snap(n));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.undo().map(|s| s.overlays.len()), Some(3));
        assert_eq!(history.undo().map(|s| s.overlays.len()), Some(2));
        assert!(!history.can_undo());
    }

    #[test]
    fn change_log_collapses_repeats() {
        let mut log = ChangeLog::default();
        log.record("Adjusted overlay position");
        log.record("Adjusted overlay position");
        log.record("Menu pages: Removed page 2");
        assert_eq!(log.descriptions().collect::<Vec<_>>().len(), 2);
        assert_eq!(log.take().len(), 2);
        assert!(log.is_empty());
    }
}
