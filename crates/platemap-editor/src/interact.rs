// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drag-to-move and corner-drag-to-resize of overlays in percent space, with
// edge snapping to the other overlays on the page.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use platemap_core::{Overlay, OverlayKey, PERCENT_MAX, Point, Rect};

/// Smallest overlay width, in percent.
pub const MIN_WIDTH: f64 = 1.0;
/// Smallest overlay height, in percent.
pub const MIN_HEIGHT: f64 = 0.5;

/// Resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeCorner {
    Nw,
    Ne,
    Sw,
    Se,
}

impl ResizeCorner {
    fn moves_left(self) -> bool {
        matches!(self, Self::Nw | Self::Sw)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::Nw | Self::Ne)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize(ResizeCorner),
}

/// Edges of the other overlays on a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapTargets {
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
}

impl SnapTargets {
    /// Left/right and top/bottom edges of every overlay on `page_index`
    /// except `exclude`.
    pub fn collect<'a>(
        overlays: impl IntoIterator<Item = &'a Overlay>,
        page_index: usize,
        exclude: OverlayKey,
    ) -> Self {
        let mut targets = Self::default();
        for o in overlays {
            if o.page_index != page_index || o.key == exclude || !o.rect().is_finite() {
                continue;
            }
            targets.x_edges.extend([o.x, o.x + o.w]);
            targets.y_edges.extend([o.y, o.y + o.h]);
        }
        targets
    }
}

/// Snap `value` to the nearest target strictly closer than `threshold`.
pub fn snap_value(value: f64, targets: &[f64], threshold: f64) -> f64 {
    targets
        .iter()
        .copied()
        .map(|t| (t, (value - t).abs()))
        .filter(|(_, d)| *d < threshold)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(value, |(t, _)| t)
}

fn clamp_to_page(mut r: Rect) -> Rect {
    r.w = r.w.clamp(MIN_WIDTH, PERCENT_MAX);
    r.h = r.h.clamp(MIN_HEIGHT, PERCENT_MAX);
    r.x = r.x.clamp(0.0, PERCENT_MAX - r.w);
    r.y = r.y.clamp(0.0, PERCENT_MAX - r.h);
    r
}

/// Translate `start` by a percent delta, keeping it on the page.
pub fn move_rect(start: Rect, dx: f64, dy: f64) -> Rect {
    Rect::new(
        (start.x + dx).clamp(0.0, (PERCENT_MAX - start.w).max(0.0)),
        (start.y + dy).clamp(0.0, (PERCENT_MAX - start.h).max(0.0)),
        start.w,
        start.h,
    )
}

/// Drag `corner` of `start` by a percent delta, then snap the moving edges.
///
/// Only the edges the corner touches may snap; when a left or top edge snaps
/// the opposite edge stays where it was.
pub fn resize_rect(
    start: Rect,
    corner: ResizeCorner,
    dx: f64,
    dy: f64,
    targets: &SnapTargets,
    threshold: f64,
) -> Rect {
    let mut r = start;
    if corner.moves_left() {
        r.x += dx;
        r.w -= dx;
    } else {
        r.w += dx;
    }
    if corner.moves_top() {
        r.y += dy;
        r.h -= dy;
    } else {
        r.h += dy;
    }
    let mut r = clamp_to_page(r);

    if corner.moves_left() {
        let snapped = snap_value(r.x, &targets.x_edges, threshold);
        if snapped != r.x {
            let right = r.right();
            r.x = snapped;
            r.w = (right - snapped).clamp(MIN_WIDTH, PERCENT_MAX);
        }
    } else {
        let right = r.right();
        let snapped = snap_value(right, &targets.x_edges, threshold);
        if snapped != right {
            r.w = (snapped - r.x).clamp(MIN_WIDTH, PERCENT_MAX);
        }
    }
    if corner.moves_top() {
        let snapped = snap_value(r.y, &targets.y_edges, threshold);
        if snapped != r.y {
            let bottom = r.bottom();
            r.y = snapped;
            r.h = (bottom - snapped).clamp(MIN_HEIGHT, PERCENT_MAX);
        }
    } else {
        let bottom = r.bottom();
        let snapped = snap_value(bottom, &targets.y_edges, threshold);
        if snapped != bottom {
            r.h = (snapped - r.y).clamp(MIN_HEIGHT, PERCENT_MAX);
        }
    }

    clamp_to_page(r)
}

/// Reference-counted page scroll lock. Scrolling is locked while any guard
/// is alive.
#[derive(Debug, Clone, Default)]
pub struct ScrollLock {
    holders: Arc<AtomicUsize>,
}

impl ScrollLock {
    pub fn acquire(&self) -> ScrollGuard {
        self.holders.fetch_add(1, Ordering::SeqCst);
        ScrollGuard {
            holders: Arc::clone(&self.holders),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }
}

#[derive(Debug)]
pub struct ScrollGuard {
    holders: Arc<AtomicUsize>,
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An in-progress move or resize of one overlay.
#[derive(Debug)]
pub struct DragSession {
    key: OverlayKey,
    kind: DragKind,
    origin: Point,
    start: Rect,
    rendered: (f64, f64),
    targets: SnapTargets,
    threshold: f64,
    current: Rect,
    _scroll: ScrollGuard,
}

impl DragSession {
    /// `rendered` is the on-screen size of the page, in device pixels.
    pub fn new(
        overlay: &Overlay,
        kind: DragKind,
        origin: Point,
        rendered: (f64, f64),
        targets: SnapTargets,
        threshold: f64,
        scroll: ScrollGuard,
    ) -> Self {
        Self {
            key: overlay.key,
            kind,
            origin,
            start: overlay.rect(),
            rendered,
            targets,
            threshold,
            current: overlay.rect(),
            _scroll: scroll,
        }
    }

    pub fn key(&self) -> OverlayKey {
        self.key
    }

    pub fn kind(&self) -> DragKind {
        self.kind
    }

    pub fn start(&self) -> Rect {
        self.start
    }

    pub fn current(&self) -> Rect {
        self.current
    }

    /// Recompute the box for the pointer at `pointer` (device pixels).
    pub fn update(&mut self, pointer: Point) -> Rect {
        let dx = (pointer.x - self.origin.x) / self.rendered.0.max(1.0) * PERCENT_MAX;
        let dy = (pointer.y - self.origin.y) / self.rendered.1.max(1.0) * PERCENT_MAX;
        if !(dx.is_finite() && dy.is_finite()) {
            return self.current;
        }
        self.current = match self.kind {
            DragKind::Move => move_rect(self.start, dx, dy),
            DragKind::Resize(corner) => {
                resize_rect(self.start, corner, dx, dy, &self.targets, self.threshold)
            }
        };
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(x: &[f64], y: &[f64]) -> SnapTargets {
        SnapTargets {
            x_edges: x.to_vec(),
            y_edges: y.to_vec(),
        }
    }

    #[test]
    fn se_resize_snaps_right_edge_exactly() {
        // Right edge at 49.8, neighbour's right edge at 50.0.
        let start = Rect::new(40.0, 10.0, 9.8, 5.0);
        let neighbour = targets(&[30.0, 50.0], &[40.0, 45.0]);
        let r = resize_rect(start, ResizeCorner::Se, 0.1, 0.0, &neighbour, 0.3);
        assert_eq!(r.right(), 50.0);
        assert_eq!(r.x, 40.0);
        assert_eq!(r.y, 10.0);
    }

    #[test]
    fn snap_threshold_is_strict_and_prefers_nearest() {
        assert_eq!(snap_value(10.0, &[10.3], 0.3), 10.0);
        assert_eq!(snap_value(10.0, &[10.25, 9.9], 0.3), 9.9);
    }

    #[test]
    fn nw_snap_keeps_opposite_edges() {
        let start = Rect::new(20.0, 20.0, 10.0, 10.0);
        let r = resize_rect(start, ResizeCorner::Nw, -0.1, -0.1, &targets(&[19.8], &[19.75]), 0.3);
        assert_eq!(r.x, 19.8);
        assert_eq!(r.y, 19.75);
        assert!((r.right() - 30.0).abs() < 1e-9);
        assert!((r.bottom() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn resize_respects_minimum_size_and_page() {
        let start = Rect::new(90.0, 90.0, 5.0, 5.0);
        let r = resize_rect(start, ResizeCorner::Se, -20.0, 50.0, &SnapTargets::default(), 0.3);
        assert_eq!(r.w, MIN_WIDTH);
        assert!(r.bottom() <= 100.0);
        assert!(r.y >= 0.0);
    }

    #[test]
    fn move_is_clamped_to_page() {
        let r = move_rect(Rect::new(10.0, 10.0, 20.0, 8.0), 200.0, -50.0);
        assert_eq!(r, Rect::new(80.0, 0.0, 20.0, 8.0));
    }

    #[test]
    fn scroll_lock_counts_holders() {
        let lock = ScrollLock::default();
        let a = lock.acquire();
        let b = lock.acquire();
        drop(a);
        assert!(lock.is_locked());
        drop(b);
        assert!(!lock.is_locked());
    }

    #[test]
    fn drag_converts_device_pixels_to_percent() {
        let lock = ScrollLock::default();
        let overlay = Overlay::new("Soup", Rect::new(10.0, 10.0, 20.0, 8.0), 0);
        let mut drag = DragSession::new(
            &overlay,
            DragKind::Move,
            Point::new(100.0, 100.0),
            (400.0, 800.0),
            SnapTargets::default(),
            0.3,
            lock.acquire(),
        );
        assert!(lock.is_locked());
        let r = drag.update(Point::new(140.0, 180.0));
        assert_eq!(r, Rect::new(20.0, 20.0, 20.0, 8.0));
        drop(drag);
        assert!(!lock.is_locked());
    }

    #[test]
    fn targets_skip_self_and_other_pages() {
        let me = Overlay::new("a", Rect::new(0.0, 0.0, 10.0, 10.0), 0);
        let other = Overlay::new("b", Rect::new(20.0, 30.0, 5.0, 5.0), 0);
        let elsewhere = Overlay::new("c", Rect::new(60.0, 60.0, 5.0, 5.0), 1);
        let t = SnapTargets::collect([&me, &other, &elsewhere], 0, me.key);
        assert_eq!(t.x_edges, vec![20.0, 25.0]);
        assert_eq!(t.y_edges, vec![30.0, 35.0]);
    }
}
