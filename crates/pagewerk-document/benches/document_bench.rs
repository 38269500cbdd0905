// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the pagewerk-document crate: OCR preprocessing on a
// synthetic scan and an image-only conversion of a small batch.

use std::io::Cursor;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use pagewerk_core::{ConversionConfig, InputImage};
use pagewerk_document::SkewDetector;
use pagewerk_document::image::preprocess::{gray_from_fn, normalize};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Reports a fixed small skew so the rotation path is exercised.
struct FixedSkew;

impl SkewDetector for FixedSkew {
    fn detect_skew_angle(&self, _image: &DynamicImage) -> Option<f32> {
        Some(3.5)
    }
}

/// A 300x200 page: light paper with dark horizontal "text" bands.
fn synthetic_scan() -> DynamicImage {
    DynamicImage::ImageLuma8(gray_from_fn(300, 200, |x, y| {
        if (y / 12) % 2 == 1 && x > 20 && x < 280 { 40 } else { 225 }
    }))
}

fn png_input(width: u32, height: u32) -> InputImage {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 90, 60])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode fixture");
    InputImage::new("fixture.png", bytes)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Otsu binarization plus bicubic rotation of a 300x200 scan.
fn bench_normalize(c: &mut Criterion) {
    let scan = synthetic_scan();
    c.bench_function("normalize (300x200, 3.5deg)", |b| {
        b.iter(|| black_box(normalize(black_box(&scan), &FixedSkew)));
    });
}

/// Decode, synthesize and assemble three 200x150 images.
fn bench_convert_images(c: &mut Criterion) {
    let inputs = vec![png_input(200, 150), png_input(200, 150), png_input(200, 150)];
    c.bench_function("convert 3 images (no OCR)", |b| {
        b.iter(|| {
            let artifact = pagewerk_document::convert(black_box(&inputs), ConversionConfig::default())
                .expect("conversion failed");
            black_box(artifact.sha256);
        });
    });
}

criterion_group!(benches, bench_normalize, bench_convert_images);
criterion_main!(benches);
