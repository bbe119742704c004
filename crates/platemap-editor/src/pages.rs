// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ordered list of menu page images. Every edit returns the `PageIndexMap`
// the overlay store must be remapped with.

use std::sync::Arc;

use image::DynamicImage;
use platemap_core::error::PlatemapError;
use tracing::info;

use crate::remap::PageIndexMap;

/// One page raster. Cloning shares the pixels.
#[derive(Debug, Clone)]
pub struct PageImage {
    image: Arc<DynamicImage>,
}

impl PageImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Same raster, not merely equal pixels.
impl PartialEq for PageImage {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuPages {
    pages: Vec<PageImage>,
}

impl MenuPages {
    pub fn new(pages: Vec<PageImage>) -> Self {
        Self { pages }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&PageImage, PlatemapError> {
        self.pages.get(index).ok_or(PlatemapError::PageOutOfRange {
            index,
            len: self.pages.len(),
        })
    }

    pub fn as_slice(&self) -> &[PageImage] {
        &self.pages
    }

    /// Append a page.
    pub fn add(&mut self, page: PageImage) -> PageIndexMap {
        let old_len = self.pages.len();
        self.pages.push(page);
        PageIndexMap::for_insert(old_len, old_len, 1)
    }

    /// Insert a page before `at` (`at == len` appends).
    pub fn insert(&mut self, at: usize, page: PageImage) -> Result<PageIndexMap, PlatemapError> {
        let old_len = self.pages.len();
        if at > old_len {
            return Err(PlatemapError::PageOutOfRange { index: at, len: old_len });
        }
        self.pages.insert(at, page);
        Ok(PageIndexMap::for_insert(old_len, at, 1))
    }

    /// Swap in a new photo of the same page. Overlays stay on it.
    pub fn replace(&mut self, index: usize, page: PageImage) -> Result<PageIndexMap, PlatemapError> {
        let len = self.pages.len();
        let slot = self
            .pages
            .get_mut(index)
            .ok_or(PlatemapError::PageOutOfRange { index, len })?;
        *slot = page;
        Ok(PageIndexMap::identity(len))
    }

    pub fn remove(&mut self, index: usize) -> Result<PageIndexMap, PlatemapError> {
        let old_len = self.pages.len();
        if index >= old_len {
            return Err(PlatemapError::PageOutOfRange { index, len: old_len });
        }
        self.pages.remove(index);
        info!(index, remaining = self.pages.len(), "Page removed");
        Ok(PageIndexMap::for_removal(old_len, index))
    }

    pub fn move_page(&mut self, from: usize, to: usize) -> Result<PageIndexMap, PlatemapError> {
        let len = self.pages.len();
        for index in [from, to] {
            if index >= len {
                return Err(PlatemapError::PageOutOfRange { index, len });
            }
        }
        let page = self.pages.remove(from);
        self.pages.insert(to, page);
        Ok(PageIndexMap::for_move(len, from, to))
    }

    /// Replace page `index` by its sections, in section order.
    pub fn split(
        &mut self,
        index: usize,
        parts: Vec<PageImage>,
    ) -> Result<PageIndexMap, PlatemapError> {
        let old_len = self.pages.len();
        if index >= old_len {
            return Err(PlatemapError::PageOutOfRange { index, len: old_len });
        }
        if parts.is_empty() {
            return Err(PlatemapError::DegenerateGeometry(format!(
                "split of page {index} produced no sections"
            )));
        }
        let count = parts.len();
        self.pages.splice(index..=index, parts);
        info!(index, sections = count, pages = self.pages.len(), "Page split");
        Ok(PageIndexMap::for_split(old_len, index, count))
    }

    pub fn restore(&mut self, pages: Vec<PageImage>) {
        self.pages = pages;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn page(w: u32) -> PageImage {
        PageImage::new(DynamicImage::ImageRgb8(RgbImage::new(w, 10)))
    }

    fn widths(pages: &MenuPages) -> Vec<u32> {
        pages.as_slice().iter().map(|p| p.dimensions().0).collect()
    }

    #[test]
    fn move_reorders_and_reports_map() {
        let mut pages = MenuPages::new(vec![page(1), page(2), page(3)]);
        let map = pages.move_page(2, 0).expect("move");
        assert_eq!(widths(&pages), vec![3, 1, 2]);
        assert_eq!(map.entries(), &[Some(2), Some(0), Some(1)]);
    }

    #[test]
    fn split_splices_sections_in_place() {
        let mut pages = MenuPages::new(vec![page(1), page(2), page(3)]);
        let map = pages.split(1, vec![page(20), page(21)]).expect("split");
        assert_eq!(widths(&pages), vec![1, 20, 21, 3]);
        assert_eq!(map.entries(), &[Some(0), None, None, Some(2)]);
        assert!(pages.split(0, Vec::new()).is_err());
    }

    #[test]
    fn out_of_range_edits_fail() {
        let mut pages = MenuPages::new(vec![page(1)]);
        assert!(matches!(
            pages.remove(3),
            Err(PlatemapError::PageOutOfRange { index: 3, len: 1 })
        ));
        assert!(pages.move_page(0, 1).is_err());
        assert!(pages.replace(1, page(2)).is_err());
        assert!(pages.insert(2, page(2)).is_err());
    }

    #[test]
    fn replace_keeps_indices() {
        let mut pages = MenuPages::new(vec![page(1), page(2)]);
        let map = pages.replace(1, page(9)).expect("replace");
        assert_eq!(map, PageIndexMap::identity(2));
        assert_eq!(widths(&pages), vec![1, 9]);
    }

    #[test]
    fn clones_compare_by_identity() {
        let a = page(5);
        assert_eq!(a, a.clone());
        assert_ne!(a, page(5));
    }
}
