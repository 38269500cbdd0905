// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page synthesis: one standalone single-page PDF per input image, built with
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: pages are `PdfPage` structs holding
// `Vec<Op>` operation lists, serialised via `PdfDocument::save()`.

use image::DynamicImage;
use pagewerk_core::types::PageSize;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, instrument, warn};

use crate::ocr::ExtractedText;

/// Resolution at which images are embedded; one pixel maps to 1/96 inch.
pub const IMAGE_DPI: f32 = 96.0;

const FONT_SIZE_PT: f32 = 12.0;
const LINE_HEIGHT_PT: f32 = 14.0;
const MARGIN_MM: f32 = 20.0;

/// What a synthesized page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// The source image at native resolution.
    Image { width_px: u32, height_px: u32 },
    /// Recognized text only; `chars` is the length of the rendered text.
    Text { chars: usize },
}

/// A single-page PDF staged in memory.
#[derive(Debug, Clone)]
pub struct SynthesizedPage {
    pub kind: PageKind,
    pub pdf: Vec<u8>,
}

/// Builds per-image pages.
#[derive(Debug, Clone)]
pub struct PageSynthesizer {
    page_size: PageSize,
    title: String,
}

impl PageSynthesizer {
    /// `page_size` applies to text pages; image pages take the image's size.
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            title: "Pagewerk Page".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Build the page for one image. With `extracted` the page carries only
    /// the recognized text; without it the page embeds the image.
    pub fn synthesize(
        &self,
        image: &DynamicImage,
        extracted: Option<&ExtractedText>,
    ) -> SynthesizedPage {
        match extracted {
            Some(extracted) => self.text_page(&extracted.text),
            None => self.image_page(image),
        }
    }

    // -- Image pages ----------------------------------------------------------

    /// Embed the image at [`IMAGE_DPI`] on a page of exactly its physical size.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn image_page(&self, image: &DynamicImage) -> SynthesizedPage {
        let (width_px, height_px) = (image.width(), image.height());

        let rgb = image.to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: width_px as usize,
            height: height_px as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(&self.title);
        let xobject_id = doc.add_image(&raw);

        let page_w = Mm(px_to_mm(width_px));
        let page_h = Mm(px_to_mm(height_px));

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: None,
                scale_y: None,
                dpi: Some(IMAGE_DPI),
                rotate: None,
            },
        }];

        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);
        debug!(page_w_mm = page_w.0, page_h_mm = page_h.0, "Image page laid out");

        SynthesizedPage {
            kind: PageKind::Image {
                width_px,
                height_px,
            },
            pdf: save(&doc),
        }
    }

    // -- Text pages -----------------------------------------------------------

    /// Lay `text` out top to bottom in Helvetica on one page of the configured
    /// size. Lines that do not fit are dropped.
    #[instrument(skip_all, fields(text_len = text.len(), page_size = %self.page_size))]
    pub fn text_page(&self, text: &str) -> SynthesizedPage {
        let (w_mm, h_mm) = self.page_size.dimensions_mm();
        let page_w = Mm(w_mm);
        let page_h = Mm(h_mm);

        let margin_pt = Mm(MARGIN_MM).into_pt().0;
        let page_h_pt = page_h.into_pt().0;
        let lines_per_page = ((page_h_pt - 2.0 * margin_pt) / LINE_HEIGHT_PT) as usize;

        // Average Helvetica glyph width is roughly half the font size.
        let usable_width_mm = w_mm - 2.0 * MARGIN_MM;
        let avg_char_width_mm = 0.50 * FONT_SIZE_PT * 0.3528;
        let max_chars_per_line = ((usable_width_mm / avg_char_width_mm) as usize).max(1);

        let mut lines = wrap_text(text, max_chars_per_line);
        if lines.len() > lines_per_page {
            warn!(
                dropped = lines.len() - lines_per_page,
                kept = lines_per_page,
                "Recognized text exceeds one page; overflow lines dropped"
            );
            lines.truncate(lines_per_page);
        }

        let mut ops: Vec<Op> = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let y_pt = page_h_pt - margin_pt - (idx as f32 * LINE_HEIGHT_PT);

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(margin_pt),
                    y: Pt(y_pt),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(FONT_SIZE_PT),
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line.clone())],
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::EndTextSection);
        }

        let mut doc = PdfDocument::new(&self.title);
        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

        let chars = text.chars().count();
        debug!(lines = lines.len(), chars, "Text page laid out");

        SynthesizedPage {
            kind: PageKind::Text { chars },
            pdf: save(&doc),
        }
    }
}

fn px_to_mm(px: u32) -> f32 {
    px as f32 / IMAGE_DPI * 25.4
}

fn save(doc: &PdfDocument) -> Vec<u8> {
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(count = warnings.len(), "printpdf reported warnings");
    }
    bytes
}

// -- Text wrapping helper -----------------------------------------------------

/// Wrap a multi-line string so that no line exceeds `max_width` characters.
///
/// Splits on existing newlines first, then word-wraps each paragraph. Words
/// longer than `max_width` are force-broken on character boundaries.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut result = Vec::new();

    for paragraph in text.lines() {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0usize;

        for word in words {
            let word_len = word.chars().count();
            if word_len > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(max_width).peekable();
                while let Some(chunk) = chunks.next() {
                    if chunks.peek().is_some() {
                        result.push(chunk.iter().collect());
                    } else {
                        current = chunk.iter().collect();
                        current_len = chunk.len();
                    }
                }
            } else if current.is_empty() {
                current.push_str(word);
                current_len = word_len;
            } else if current_len + 1 + word_len <= max_width {
                current.push(' ');
                current.push_str(word);
                current_len += 1 + word_len;
            } else {
                result.push(std::mem::replace(&mut current, word.to_string()));
                current_len = word_len;
            }
        }

        if !current.is_empty() {
            result.push(current);
        }
    }

    result
}
