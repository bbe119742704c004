// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the menu page raster pipeline: letterboxing,
// perspective rectification, and section splitting on synthetic pages.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use platemap_core::CornerSet;
use platemap_document::{letterbox, rectify, split_into_sections};

/// A 1200x1600 phone photo, the common upload shape.
fn portrait_page() -> DynamicImage {
    let mut img = RgbImage::from_pixel(1200, 1600, Rgb([245, 240, 230]));
    for y in (100..1500).step_by(80) {
        for x in 100..1100 {
            img.put_pixel(x, y, Rgb([20, 20, 20]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

fn bench_letterbox(c: &mut Criterion) {
    let page = portrait_page();
    c.bench_function("letterbox (1200x1600 -> 1000)", |b| {
        b.iter(|| black_box(letterbox(black_box(&page), 1000, [0, 0, 0])));
    });
}

fn bench_rectify(c: &mut Criterion) {
    let page = portrait_page();
    c.bench_function("rectify full-frame corners (1200x1600)", |b| {
        b.iter(|| black_box(rectify(black_box(&page), &CornerSet::FULL_FRAME)));
    });
}

fn bench_split(c: &mut Criterion) {
    let page = portrait_page();
    c.bench_function("split 2 columns x 3 strips (1200x1600)", |b| {
        b.iter(|| black_box(split_into_sections(black_box(&page), &[50.0], 3)));
    });
}

criterion_group!(benches, bench_letterbox, bench_rectify, bench_split);
criterion_main!(benches);
