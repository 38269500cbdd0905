// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input decoding: turns uploaded byte streams into in-memory bitmaps, rejecting
// anything outside the supported raster formats.

use image::{DynamicImage, ImageFormat};
use pagewerk_core::error::ConvertError;
use pagewerk_core::types::InputImage;
use tracing::{debug, instrument};

/// Formats the pipeline accepts, as detected from the file contents.
const SUPPORTED_FORMATS: [ImageFormat; 6] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Bmp,
    ImageFormat::Gif,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// Decode one input image.
///
/// `index` is the input's position in the batch and is carried into the error
/// so callers can tell which file aborted the conversion.
#[instrument(skip(input), fields(name = %input.name, bytes_len = input.bytes.len()))]
pub fn decode_input(index: usize, input: &InputImage) -> Result<DynamicImage, ConvertError> {
    let unsupported = |reason: String| ConvertError::UnsupportedFormat {
        index,
        name: input.name.clone(),
        reason,
    };

    let format = image::guess_format(&input.bytes)
        .map_err(|err| unsupported(format!("unrecognised image data: {err}")))?;

    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(unsupported(format!("{format:?} images are not accepted")));
    }

    let img = image::load_from_memory_with_format(&input.bytes, format)
        .map_err(|err| unsupported(format!("failed to decode {format:?}: {err}")))?;

    debug!(
        width = img.width(),
        height = img.height(),
        ?format,
        "Input image decoded"
    );
    Ok(img)
}

/// Decode a whole batch, stopping at the first input that cannot be read.
pub fn decode_batch(inputs: &[InputImage]) -> Result<Vec<DynamicImage>, ConvertError> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| decode_input(index, input))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([10, 20, 30])));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    #[test]
    fn decodes_png_and_bmp() {
        for format in [ImageFormat::Png, ImageFormat::Bmp] {
            let input = InputImage::new("page", encoded(format));
            let img = decode_input(0, &input).unwrap();
            assert_eq!((img.width(), img.height()), (6, 4));
        }
    }

    #[test]
    fn garbage_is_unsupported_format() {
        let input = InputImage::new("notes.txt", b"just some text".to_vec());
        match decode_input(3, &input) {
            Err(ConvertError::UnsupportedFormat { index, name, .. }) => {
                assert_eq!(index, 3);
                assert_eq!(name, "notes.txt");
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn truncated_png_is_unsupported_format() {
        let mut bytes = encoded(ImageFormat::Png);
        bytes.truncate(bytes.len() / 2);
        let input = InputImage::new("broken.png", bytes);
        assert!(matches!(
            decode_input(0, &input),
            Err(ConvertError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn batch_stops_at_first_bad_input() {
        let inputs = vec![
            InputImage::new("a.png", encoded(ImageFormat::Png)),
            InputImage::new("b.bin", vec![0u8; 16]),
            InputImage::new("c.png", encoded(ImageFormat::Png)),
        ];
        match decode_batch(&inputs) {
            Err(ConvertError::UnsupportedFormat { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }
}
