// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembly: merges the synthesized single-page PDFs, in input order,
// into one page tree using `lopdf`.

use std::collections::HashMap;

use chrono::Utc;
use lopdf::{Dictionary, Object, ObjectId, Stream, dictionary};
use pagewerk_core::error::ConvertError;
use tracing::{debug, info, instrument, warn};

use super::document::Document;
use super::reader::inherited;
use super::synth::SynthesizedPage;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Concatenate `pages` into one document titled `title`.
///
/// Page order equals the order of `pages`. An empty list is `EmptyInput`.
#[instrument(skip(pages), fields(page_count = pages.len()))]
pub fn assemble(pages: &[SynthesizedPage], title: &str) -> Result<Document, ConvertError> {
    if pages.is_empty() {
        return Err(ConvertError::EmptyInput);
    }

    let (mut target, pages_id) = skeleton(title);

    for (index, page) in pages.iter().enumerate() {
        let source = lopdf::Document::load_mem(&page.pdf).map_err(|err| {
            ConvertError::Pdf(format!("failed to load synthesized page #{}: {err}", index + 1))
        })?;

        let source_pages = source.get_pages();
        if source_pages.len() != 1 {
            warn!(index, found = source_pages.len(), "Synthesized PDF is not single-page");
        }
        for page_id in source_pages.into_values() {
            clone_page_into(&source, &mut target, pages_id, page_id)?;
        }
    }

    let document = Document::new(target);
    info!(pages = document.page_count(), title, "Document assembled");
    Ok(document)
}

/// An empty document with a catalog, an empty page tree and an /Info entry.
fn skeleton(title: &str) -> (lopdf::Document, ObjectId) {
    let mut doc = lopdf::Document::with_version("1.5");

    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<Object>::new(),
        "Count" => 0i64,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Producer" => Object::string_literal(concat!("pagewerk ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
    });

    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    (doc, pages_id)
}

/// Deep-clone one page and everything it references from `source` into
/// `target`, appending it as the last kid of `pages_id`.
fn clone_page_into(
    source: &lopdf::Document,
    target: &mut lopdf::Document,
    pages_id: ObjectId,
    page_id: ObjectId,
) -> Result<(), ConvertError> {
    let page = source.get_dictionary(page_id).map_err(|err| {
        ConvertError::Pdf(format!("cannot read page object {page_id:?}: {err}"))
    })?;

    let mut memo = HashMap::new();
    let mut cloned = clone_dictionary(source, target, page, &mut memo);

    // The page is re-parented, so attributes it inherited must travel with it.
    for key in INHERITABLE_KEYS {
        if !cloned.has(key)
            && let Some(value) = inherited(source, page_id, key)
        {
            let value = deep_clone_object(source, target, value, &mut memo);
            cloned.set(key.to_vec(), value);
        }
    }
    cloned.set("Parent", Object::Reference(pages_id));
    let cloned_id = target.add_object(Object::Dictionary(cloned));

    let pages_dict = target
        .get_dictionary_mut(pages_id)
        .map_err(|err| ConvertError::Pdf(format!("no page tree root: {err}")))?;
    match pages_dict.get_mut(b"Kids") {
        Ok(Object::Array(kids)) => kids.push(Object::Reference(cloned_id)),
        _ => return Err(ConvertError::Pdf("page tree root has no /Kids array".into())),
    }
    let count = pages_dict.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    pages_dict.set("Count", count + 1);

    debug!(?page_id, ?cloned_id, "Page cloned");
    Ok(())
}

/// Deep-clone an object, resolving references (except /Parent, which the
/// caller patches). `memo` maps source ids to target ids so shared resources
/// are copied once and reference cycles terminate.
fn deep_clone_object(
    source: &lopdf::Document,
    target: &mut lopdf::Document,
    object: &Object,
    memo: &mut HashMap<ObjectId, ObjectId>,
) -> Object {
    match object {
        Object::Dictionary(dict) => Object::Dictionary(clone_dictionary(source, target, dict, memo)),
        Object::Array(items) => Object::Array(
            items
                .iter()
                .map(|item| deep_clone_object(source, target, item, memo))
                .collect(),
        ),
        Object::Reference(ref_id) => {
            if let Some(existing) = memo.get(ref_id) {
                return Object::Reference(*existing);
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let new_id = target.new_object_id();
                    memo.insert(*ref_id, new_id);
                    let cloned = deep_clone_object(source, target, referenced, memo);
                    target.objects.insert(new_id, cloned);
                    Object::Reference(new_id)
                }
                Err(err) => {
                    warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                    Object::Null
                }
            }
        }
        Object::Stream(stream) => {
            let dict = clone_dictionary(source, target, &stream.dict, memo);
            Object::Stream(Stream::new(dict, stream.content.clone()))
        }
        other => other.clone(),
    }
}

fn clone_dictionary(
    source: &lopdf::Document,
    target: &mut lopdf::Document,
    dict: &Dictionary,
    memo: &mut HashMap<ObjectId, ObjectId>,
) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        if key.as_slice() == b"Parent" {
            continue;
        }
        new_dict.set(key.clone(), deep_clone_object(source, target, value, memo));
    }
    new_dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::PdfInspector;
    use crate::pdf::synth::PageSynthesizer;
    use image::{DynamicImage, Rgb, RgbImage};
    use pagewerk_core::types::PageSize;

    fn image_page(width: u32, height: u32) -> SynthesizedPage {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([1, 2, 3])));
        PageSynthesizer::new(PageSize::A4).image_page(&img)
    }

    #[test]
    fn zero_pages_is_empty_input() {
        assert!(matches!(assemble(&[], "t"), Err(ConvertError::EmptyInput)));
    }

    #[test]
    fn pages_keep_input_order() {
        let pages = vec![image_page(10, 20), image_page(30, 40), image_page(50, 60)];
        let mut doc = assemble(&pages, "Ordered").unwrap();
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.title().as_deref(), Some("Ordered"));

        let inspector = PdfInspector::from_bytes(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(inspector.page_count(), 3);
        for (number, expected) in [(1, (10, 20)), (2, (30, 40)), (3, (50, 60))] {
            assert_eq!(inspector.page_image_sizes(number).unwrap(), vec![expected]);
        }
    }

    #[test]
    fn mixed_page_sizes_survive_assembly() {
        let text = PageSynthesizer::new(PageSize::Legal).text_page("hello");
        let pages = vec![image_page(96, 96), text];
        let mut doc = assemble(&pages, "Mixed").unwrap();
        let inspector = PdfInspector::from_bytes(&doc.to_bytes().unwrap()).unwrap();

        let (w, h) = inspector.page_size_pt(1).unwrap();
        assert!((w - 72.0).abs() < 0.5 && (h - 72.0).abs() < 0.5);
        let (w, h) = inspector.page_size_pt(2).unwrap();
        assert!((w - 612.0).abs() < 0.5 && (h - 1008.0).abs() < 0.5);
        assert!(inspector.page_text(2).unwrap().contains("hello"));
    }
}
