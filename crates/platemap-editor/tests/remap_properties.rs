// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Property tests for page-index remapping.

use platemap_core::{Overlay, Rect};
use platemap_editor::{PageIndexMap, remap_page_indices};
use proptest::prelude::*;

fn overlays(pages: usize) -> impl Strategy<Value = Vec<Overlay>> {
    prop::collection::vec(
        (0..pages, 0.0f64..90.0, 0.0f64..90.0, 0.5f64..10.0, 0.5f64..10.0),
        0..40,
    )
    .prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (page, x, y, w, h))| Overlay::new(format!("dish {i}"), Rect::new(x, y, w, h), page))
            .collect()
    })
}

proptest! {
    #[test]
    fn identity_map_changes_nothing(
        (pages, input) in (1usize..8).prop_flat_map(|n| (Just(n), overlays(n)))
    ) {
        let mut remapped = input.clone();
        let outcome = remap_page_indices(&mut remapped, pages, &PageIndexMap::identity(pages))
            .expect("identity is valid");
        prop_assert_eq!(outcome.removed, 0);
        prop_assert_eq!(outcome.moved, 0);
        prop_assert_eq!(remapped, input);
    }

    #[test]
    fn removal_drops_that_page_and_shifts_the_rest(
        (pages, removed, input) in (1usize..8)
            .prop_flat_map(|n| (Just(n), 0..n, overlays(n)))
    ) {
        let mut remapped = input.clone();
        remap_page_indices(&mut remapped, pages, &PageIndexMap::for_removal(pages, removed))
            .expect("removal map is valid");

        let expected: Vec<(String, usize)> = input
            .iter()
            .filter(|o| o.page_index != removed)
            .map(|o| {
                let page = if o.page_index > removed { o.page_index - 1 } else { o.page_index };
                (o.id.clone(), page)
            })
            .collect();
        let actual: Vec<(String, usize)> =
            remapped.iter().map(|o| (o.id.clone(), o.page_index)).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn every_edit_leaves_valid_page_indices(
        (pages, from, to, input) in (1usize..8)
            .prop_flat_map(|n| (Just(n), 0..n, 0..n, overlays(n)))
    ) {
        let map = PageIndexMap::for_move(pages, from, to);
        let mut remapped = input.clone();
        remap_page_indices(&mut remapped, pages, &map).expect("move map is valid");
        prop_assert_eq!(remapped.len(), input.len());
        prop_assert!(remapped.iter().all(|o| o.page_index < map.len()));
        // The moved page's overlays follow it.
        for (before, after) in input.iter().zip(&remapped) {
            if before.page_index == from {
                prop_assert_eq!(after.page_index, to);
            }
        }
    }
}

#[test]
fn deleting_the_middle_page() {
    let mut overlays = vec![
        Overlay::new("a", Rect::PLACEHOLDER, 0),
        Overlay::new("b", Rect::PLACEHOLDER, 1),
        Overlay::new("c", Rect::PLACEHOLDER, 2),
    ];
    remap_page_indices(&mut overlays, 3, &PageIndexMap::new(vec![Some(0), Some(2)]))
        .expect("remap");
    assert!(overlays.iter().all(|o| o.id != "b"));
    assert_eq!(overlays.iter().find(|o| o.id == "c").map(|o| o.page_index), Some(1));
}
