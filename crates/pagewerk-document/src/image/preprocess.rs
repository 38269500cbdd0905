// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR preprocessing: Otsu binarization of the luma channel, then orientation
// correction driven by an external skew detector.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Pixel};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use tracing::{debug, info, instrument};

use crate::ocr::engine::SkewDetector;

/// An image ready for OCR: binarized and rotated upright.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    image: DynamicImage,
    /// Rotation applied, in degrees counter-clockwise. Zero for pass-through.
    rotation_degrees: f32,
}

impl NormalizedImage {
    /// Borrow the normalized image.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the wrapper and return the underlying image.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Degrees of counter-clockwise rotation that were applied.
    pub fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    /// Whether the image was rotated at all.
    pub fn was_rotated(&self) -> bool {
        self.rotation_degrees != 0.0
    }
}

/// Normalizes raw images for text recognition.
///
/// Only used on the OCR path: the image-embedding path keeps the original
/// pixels so the page looks exactly like the upload.
pub struct ImagePreprocessor<'a> {
    detector: &'a dyn SkewDetector,
}

impl<'a> ImagePreprocessor<'a> {
    pub fn new(detector: &'a dyn SkewDetector) -> Self {
        Self { detector }
    }

    pub fn normalize(&self, image: &DynamicImage) -> NormalizedImage {
        normalize(image, self.detector)
    }
}

/// Grayscale, binarize with an Otsu threshold, then correct orientation.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn normalize(image: &DynamicImage, detector: &dyn SkewDetector) -> NormalizedImage {
    let binary = binarize_otsu(&image.to_luma8());
    correct_orientation(DynamicImage::ImageLuma8(binary), detector)
}

/// Threshold maximising between-class variance of the luma histogram.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    otsu_level(gray)
}

/// Global Otsu binarization: pixels brighter than the histogram-derived
/// threshold become white, everything else black.
pub fn binarize_otsu(gray: &GrayImage) -> GrayImage {
    let level = otsu_threshold(gray);
    debug!(level, "Otsu threshold computed");
    threshold(gray, level, ThresholdType::Binary)
}

/// Rotate `image` upright using the angle reported by `detector`.
///
/// The detector reports how far the content is rotated; the image is turned
/// by the negative of that angle. No angle, or an angle of zero, returns the
/// image untouched.
pub fn correct_orientation(image: DynamicImage, detector: &dyn SkewDetector) -> NormalizedImage {
    let angle = match detector.detect_skew_angle(&image) {
        Some(angle) if angle != 0.0 && angle.is_finite() => angle,
        Some(_) => {
            debug!("No skew detected; image passes through");
            return NormalizedImage {
                image,
                rotation_degrees: 0.0,
            };
        }
        None => {
            debug!("Skew detection produced no result; treating as zero rotation");
            return NormalizedImage {
                image,
                rotation_degrees: 0.0,
            };
        }
    };

    info!(detected = angle, "Correcting page orientation");
    NormalizedImage {
        image: rotate_replicate(&image, -angle),
        rotation_degrees: -angle,
    }
}

/// Rotate an image about its centre by `degrees` counter-clockwise, keeping
/// the canvas size.
///
/// Uses bicubic interpolation; samples that fall outside the source repeat
/// the nearest edge pixel, so no foreign border colour is introduced.
#[instrument(skip(image))]
pub fn rotate_replicate(image: &DynamicImage, degrees: f32) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(rotate_buffer(gray, degrees)),
        DynamicImage::ImageRgb8(rgb) => DynamicImage::ImageRgb8(rotate_buffer(rgb, degrees)),
        other => DynamicImage::ImageRgba8(rotate_buffer(&other.to_rgba8(), degrees)),
    }
}

fn rotate_buffer<P>(src: &ImageBuffer<P, Vec<u8>>, degrees: f32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = src.dimensions();
    let mut output = ImageBuffer::new(width, height);
    if width == 0 || height == 0 {
        return output;
    }

    // Integer centre, as the rotation matrix is conventionally built.
    let cx = (width / 2) as f32;
    let cy = (height / 2) as f32;
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let channels = P::CHANNEL_COUNT as usize;

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            // Inverse mapping: destination pixel -> source coordinate.
            let sx = cos * dx - sin * dy + cx;
            let sy = sin * dx + cos * dy + cy;

            let mut acc = [0f32; 4];
            let x0 = sx.floor();
            let y0 = sy.floor();
            let fx = sx - x0;
            let fy = sy - y0;

            for j in -1i32..=2 {
                let wy = cubic_weight(fy - j as f32);
                if wy == 0.0 {
                    continue;
                }
                let py = clamp_coord(y0 as i64 + j as i64, height);
                for i in -1i32..=2 {
                    let wx = cubic_weight(fx - i as f32);
                    if wx == 0.0 {
                        continue;
                    }
                    let px = clamp_coord(x0 as i64 + i as i64, width);
                    let sample = src.get_pixel(px, py).channels();
                    for (c, value) in sample.iter().enumerate().take(channels) {
                        acc[c] += wx * wy * *value as f32;
                    }
                }
            }

            let out = output.get_pixel_mut(x, y).channels_mut();
            for (c, value) in out.iter_mut().enumerate().take(channels) {
                *value = acc[c].round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    output
}

/// Edge replication: out-of-range coordinates snap to the nearest border.
fn clamp_coord(v: i64, len: u32) -> u32 {
    v.clamp(0, len as i64 - 1) as u32
}

/// Bicubic convolution kernel (a = -0.75).
fn cubic_weight(x: f32) -> f32 {
    const A: f32 = -0.75;
    let x = x.abs();
    if x <= 1.0 {
        ((A + 2.0) * x - (A + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((A * x - 5.0 * A) * x + 8.0 * A) * x - 4.0 * A
    } else {
        0.0
    }
}

/// Build a grayscale image from a closure, for tests and benches.
#[doc(hidden)]
pub fn gray_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)]))
}
