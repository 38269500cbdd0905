// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark stage: stamps a line of text over every page. The existing page
// content is wrapped in `q`/`Q` so its graphics state cannot leak into the
// overlay, and stays beneath it.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, StringFormat, Stream, dictionary};
use pagewerk_core::error::ConvertError;
use tracing::{debug, info, instrument};

use crate::pdf::Document;
use crate::pdf::reader::{as_dict, inherited};

/// Resource name under which the watermark font is registered.
pub const WATERMARK_FONT_KEY: &str = "FWm";
/// Baseline origin of the watermark, in points from the bottom-left corner.
pub const WATERMARK_ORIGIN_PT: (i64, i64) = (200, 500);
pub const WATERMARK_FONT_SIZE_PT: i64 = 20;

/// Draw `text` on every page of `document`. Empty text returns the document
/// untouched.
#[instrument(skip(document), fields(pages = document.page_count()))]
pub fn apply_watermark(mut document: Document, text: &str) -> Result<Document, ConvertError> {
    if text.is_empty() {
        debug!("Empty watermark text; stage skipped");
        return Ok(document);
    }

    let page_ids = document.page_ids();
    let doc = document.as_lopdf_mut();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let overlay = overlay_content(text)?;
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    for page_id in &page_ids {
        let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay.clone()));
        register_font(doc, *page_id, font_id)?;
        wrap_contents(doc, *page_id, save_id, restore_id, overlay_id)?;
    }

    info!(pages = page_ids.len(), "Watermark applied");
    Ok(document)
}

/// Content stream drawing the watermark text in black Helvetica.
fn overlay_content(text: &str) -> Result<Vec<u8>, ConvertError> {
    let (x, y) = WATERMARK_ORIGIN_PT;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("g", vec![Object::Integer(0)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(WATERMARK_FONT_KEY.as_bytes().to_vec()),
                    WATERMARK_FONT_SIZE_PT.into(),
                ],
            ),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(win_ansi_bytes(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };
    content
        .encode()
        .map_err(|err| ConvertError::Pdf(format!("failed to encode watermark content: {err}")))
}

/// Encode for WinAnsiEncoding. Characters outside Latin-1 become `?`.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

enum ResourcesAt {
    Shared(ObjectId),
    Inline,
    Missing,
}

/// Make `/FWm` resolvable from the page's resources.
fn register_font(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), ConvertError> {
    let pdf_err = |err: lopdf::Error| ConvertError::Pdf(format!("page {page_id:?}: {err}"));

    let location = match doc.get_dictionary(page_id).map_err(pdf_err)?.get(b"Resources") {
        Ok(Object::Reference(id)) => ResourcesAt::Shared(*id),
        Ok(Object::Dictionary(_)) => ResourcesAt::Inline,
        _ => ResourcesAt::Missing,
    };

    let resources_ref = match location {
        ResourcesAt::Shared(id) => Some(id),
        ResourcesAt::Inline => None,
        ResourcesAt::Missing => {
            // Inherited or absent: give the page its own copy.
            let own = inherited(doc, page_id, b"Resources")
                .and_then(|obj| as_dict(doc, obj))
                .cloned()
                .unwrap_or_else(Dictionary::new);
            doc.get_dictionary_mut(page_id)
                .map_err(pdf_err)?
                .set("Resources", Object::Dictionary(own));
            None
        }
    };

    let resources = match resources_ref {
        Some(id) => doc.get_dictionary_mut(id).map_err(pdf_err)?,
        None => match doc.get_dictionary_mut(page_id).map_err(pdf_err)?.get_mut(b"Resources") {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return Err(ConvertError::Pdf(format!("page {page_id:?} has no /Resources"))),
        },
    };

    let font_ref = match resources.get(b"Font") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    match font_ref {
        Some(id) => {
            doc.get_dictionary_mut(id)
                .map_err(pdf_err)?
                .set(WATERMARK_FONT_KEY, Object::Reference(font_id));
        }
        None => match resources.get_mut(b"Font") {
            Ok(Object::Dictionary(fonts)) => fonts.set(WATERMARK_FONT_KEY, Object::Reference(font_id)),
            _ => {
                let mut fonts = Dictionary::new();
                fonts.set(WATERMARK_FONT_KEY, Object::Reference(font_id));
                resources.set("Font", Object::Dictionary(fonts));
            }
        },
    }
    Ok(())
}

/// Rewrite /Contents as `[q, existing.., Q, overlay]`.
fn wrap_contents(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    save_id: ObjectId,
    restore_id: ObjectId,
    overlay_id: ObjectId,
) -> Result<(), ConvertError> {
    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|err| ConvertError::Pdf(format!("page {page_id:?}: {err}")))?;

    let existing: Vec<Object> = match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
        contents.push(Object::Reference(restore_id));
    }
    contents.push(Object::Reference(overlay_id));

    page.set("Contents", Object::Array(contents));
    Ok(())
}
