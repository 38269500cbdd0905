// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF inspection: open produced documents (decrypting when a password is
// given) and report pages, embedded images, sizes and text runs.

use std::path::Path;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use pagewerk_core::error::ConvertError;
use tracing::{debug, info, instrument};

/// Maximum /Parent hops followed when resolving inherited page attributes.
const MAX_TREE_DEPTH: usize = 32;

/// Same-length stand-in for the trailer's /Encrypt key while a sealed file is
/// parsed.
const HIDDEN_ENCRYPT_KEY: &[u8] = b"Xncrypt";

/// Read-only view over a PDF.
pub struct PdfInspector {
    document: Document,
    encrypted: bool,
}

impl PdfInspector {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Load a PDF from memory without decrypting it.
    ///
    /// For an encrypted file the page tree is still readable; strings and
    /// streams stay as ciphertext.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ConvertError> {
        let document = load_document(data)?;
        let encrypted = document.is_encrypted();
        debug!(pages = document.get_pages().len(), encrypted, "PDF loaded");
        Ok(Self {
            document,
            encrypted,
        })
    }

    /// Load an encrypted PDF and decrypt it with `password`.
    ///
    /// A wrong password, or a document that is not encrypted at all, is an
    /// `Encryption` error.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes_with_password(data: &[u8], password: &str) -> Result<Self, ConvertError> {
        let mut inspector = Self::from_bytes(data)?;
        if !inspector.encrypted {
            return Err(ConvertError::Encryption(
                "document is not password protected".into(),
            ));
        }
        inspector
            .document
            .decrypt(password)
            .map_err(|err| ConvertError::Encryption(format!("failed to decrypt PDF: {err}")))?;
        if inspector.page_count() == 0 {
            return Err(ConvertError::Encryption(
                "decrypted document has no pages".into(),
            ));
        }
        info!(pages = inspector.page_count(), "PDF decrypted");
        Ok(inspector)
    }

    /// Open and decrypt a PDF from the filesystem.
    pub fn open_with_password(path: impl AsRef<Path>, password: &str) -> Result<Self, ConvertError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes_with_password(&data, password)
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Whether the loaded file carried an /Encrypt dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Page size (width, height) in points for a 1-indexed page.
    pub fn page_size_pt(&self, page_number: u32) -> Result<(f32, f32), ConvertError> {
        let page_id = self.page_id(page_number)?;
        let media_box = inherited(&self.document, page_id, b"MediaBox")
            .and_then(|obj| match resolve(&self.document, obj) {
                Object::Array(values) => Some(values),
                _ => None,
            })
            .ok_or_else(|| ConvertError::Pdf(format!("page {page_number} has no /MediaBox")))?;

        let numbers: Vec<f32> = media_box.iter().filter_map(number).collect();
        match numbers.as_slice() {
            [x0, y0, x1, y1] => Ok(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => Err(ConvertError::Pdf(format!(
                "page {page_number} has a malformed /MediaBox"
            ))),
        }
    }

    /// Pixel sizes of every image XObject drawn by a 1-indexed page,
    /// including images nested inside form XObjects.
    pub fn page_image_sizes(&self, page_number: u32) -> Result<Vec<(u32, u32)>, ConvertError> {
        let page_id = self.page_id(page_number)?;
        let mut sizes = Vec::new();
        if let Some(resources) = inherited(&self.document, page_id, b"Resources")
            .and_then(|obj| as_dict(&self.document, obj))
        {
            collect_images(&self.document, resources, &mut sizes, 0);
        }
        Ok(sizes)
    }

    /// String operands of every text-showing operator on a page, in content
    /// order. Each run is decoded as UTF-8 with lossy replacement.
    pub fn page_text_runs(&self, page_number: u32) -> Result<Vec<String>, ConvertError> {
        let page_id = self.page_id(page_number)?;
        let raw = self
            .document
            .get_page_content(page_id)
            .map_err(|err| ConvertError::Pdf(format!("cannot read page {page_number}: {err}")))?;
        let content = Content::decode(&raw).map_err(|err| {
            ConvertError::Pdf(format!("cannot parse page {page_number} content: {err}"))
        })?;

        let mut runs = Vec::new();
        for op in &content.operations {
            if matches!(op.operator.as_str(), "Tj" | "TJ" | "'" | "\"") {
                let mut run = String::new();
                for operand in &op.operands {
                    push_strings(operand, &mut run);
                }
                if !run.is_empty() {
                    runs.push(run);
                }
            }
        }
        Ok(runs)
    }

    /// All text runs of a page joined with newlines.
    pub fn page_text(&self, page_number: u32) -> Result<String, ConvertError> {
        Ok(self.page_text_runs(page_number)?.join("\n"))
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_number: u32) -> Result<ObjectId, ConvertError> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            ConvertError::Pdf(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }
}

fn push_strings(object: &Object, out: &mut String) {
    match object {
        Object::String(bytes, _) => out.push_str(&String::from_utf8_lossy(bytes)),
        Object::Array(items) => items.iter().for_each(|item| push_strings(item, out)),
        _ => {}
    }
}

fn collect_images(doc: &Document, resources: &Dictionary, sizes: &mut Vec<(u32, u32)>, depth: usize) {
    if depth > MAX_TREE_DEPTH {
        return;
    }
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| as_dict(doc, obj))
    else {
        return;
    };

    for (_, value) in xobjects.iter() {
        let Object::Stream(stream) = resolve(doc, value) else {
            continue;
        };
        match stream.dict.get(b"Subtype") {
            Ok(Object::Name(name)) if name.as_slice() == b"Image" => {
                let dim = |key: &[u8]| {
                    stream
                        .dict
                        .get(key)
                        .ok()
                        .and_then(|obj| resolve(doc, obj).as_i64().ok())
                        .unwrap_or(0) as u32
                };
                sizes.push((dim(b"Width"), dim(b"Height")));
            }
            Ok(Object::Name(name)) if name.as_slice() == b"Form" => {
                if let Some(inner) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|obj| as_dict(doc, obj))
                {
                    collect_images(doc, inner, sizes, depth + 1);
                }
            }
            _ => {}
        }
    }
}

/// Parse PDF bytes, keeping every object of an encrypted file.
///
/// lopdf only parses the objects of an encrypted file when its user password
/// is empty; otherwise it keeps just the /Encrypt dictionary. The trailer
/// entry is renamed in a copy of the bytes so the file loads as stored, then
/// put back so the document still reports as encrypted and can be decrypted.
pub(crate) fn load_document(data: &[u8]) -> Result<Document, ConvertError> {
    let load = |bytes: &[u8]| {
        Document::load_mem(bytes)
            .map_err(|err| ConvertError::Pdf(format!("failed to load PDF from memory: {err}")))
    };

    let document = load(data)?;
    if !document.is_encrypted() {
        return Ok(document);
    }
    let Some(masked) = hide_encrypt_entry(data) else {
        return Ok(document);
    };

    let mut document = load(&masked)?;
    if let Some(encrypt) = document.trailer.remove(HIDDEN_ENCRYPT_KEY) {
        document.trailer.set("Encrypt", encrypt);
    }
    debug!(objects = document.objects.len(), "Encrypted PDF parsed as stored");
    Ok(document)
}

/// Copy of `data` with the last trailer's /Encrypt key renamed, or `None` if
/// the trailer has no such key.
fn hide_encrypt_entry(data: &[u8]) -> Option<Vec<u8>> {
    const KEY: &[u8] = b"/Encrypt";

    let start = last_xref_offset(data)?;
    // An xref stream's dictionary ends where its binary data begins.
    let end = find(&data[start..], b"stream").map_or(data.len(), |pos| start + pos);

    let mut masked = data.to_vec();
    let mut hidden = false;
    let mut pos = start;
    while let Some(found) = find(&masked[pos..end], KEY) {
        let at = pos + found;
        let after = at + KEY.len();
        // Longer names such as /EncryptMetadata are left alone.
        if masked.get(after).is_none_or(|b| !b.is_ascii_alphanumeric()) {
            masked[at + 1..after].copy_from_slice(HIDDEN_ENCRYPT_KEY);
            hidden = true;
        }
        pos = after;
    }
    hidden.then_some(masked)
}

/// Offset named by the final `startxref`.
fn last_xref_offset(data: &[u8]) -> Option<usize> {
    const MARKER: &[u8] = b"startxref";
    let at = data.windows(MARKER.len()).rposition(|w| w == MARKER)?;
    let digits: String = data[at + MARKER.len()..]
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take_while(|b| b.is_ascii_digit())
        .map(|&b| b as char)
        .collect();
    let offset: usize = digits.parse().ok()?;
    (offset < data.len()).then_some(offset)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Follow a reference to its target; other objects are returned as-is.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

pub(crate) fn as_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object) {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Look up a page attribute, walking up /Parent for inheritable keys.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        current = match current.get(b"Parent") {
            Ok(Object::Reference(parent)) => doc.get_dictionary(*parent).ok()?,
            _ => return None,
        };
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{PageSynthesizer, assemble};
    use crate::postprocess::encrypt::encrypt;
    use pagewerk_core::types::PageSize;

    fn sealed(pages: &[&str], password: &str) -> Vec<u8> {
        let synth = PageSynthesizer::new(PageSize::A4);
        let pages: Vec<_> = pages.iter().map(|text| synth.text_page(text)).collect();
        let document = assemble(&pages, "Sealed").unwrap();
        encrypt(document, password).unwrap().to_bytes().unwrap()
    }

    #[test]
    fn sealed_page_tree_is_readable_without_password() {
        let bytes = sealed(&["one", "two"], "hunter2");
        let inspector = PdfInspector::from_bytes(&bytes).unwrap();
        assert!(inspector.is_encrypted());
        assert_eq!(inspector.page_count(), 2);
        assert!(!inspector.page_text(1).unwrap_or_default().contains("one"));
    }

    #[test]
    fn password_reveals_every_page() {
        let bytes = sealed(&["first page", "second page"], "hunter2");
        let opened = PdfInspector::from_bytes_with_password(&bytes, "hunter2").unwrap();
        assert_eq!(opened.page_count(), 2);
        assert!(opened.page_text(1).unwrap().contains("first page"));
        assert!(opened.page_text(2).unwrap().contains("second page"));
    }

    #[test]
    fn plain_document_rejects_password() {
        let page = PageSynthesizer::new(PageSize::A4).text_page("open");
        let bytes = assemble(&[page], "Plain").unwrap().to_bytes().unwrap();
        assert!(matches!(
            PdfInspector::from_bytes_with_password(&bytes, "anything"),
            Err(ConvertError::Encryption(_))
        ));
    }

    #[test]
    fn hides_only_the_trailer_encrypt_key() {
        let data = b"%PDF-1.7\n1 0 obj\n<</EncryptMetadata false>>\nendobj\n\
            xref\ntrailer\n<</Encrypt 1 0 R/Root 2 0 R>>\nstartxref\n51\n%%EOF";
        let masked = hide_encrypt_entry(data).unwrap();
        let text = String::from_utf8(masked).unwrap();
        assert!(text.contains("/EncryptMetadata false"));
        assert!(text.contains("<</Xncrypt 1 0 R/Root 2 0 R>>"));
        assert_eq!(text.len(), data.len());
    }

    #[test]
    fn no_trailer_key_means_nothing_to_hide() {
        let data = b"%PDF-1.7\nxref\ntrailer\n<</Root 2 0 R>>\nstartxref\n9\n%%EOF";
        assert!(hide_encrypt_entry(data).is_none());
    }
}
