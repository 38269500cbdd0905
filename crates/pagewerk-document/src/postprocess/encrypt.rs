// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encryption stage: seals the document with the PDF standard security
// handler (RC4, 128-bit key, revision 3). The same password opens the file
// and owns it.

use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Object, StringFormat};
use pagewerk_core::error::ConvertError;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::pdf::Document;

/// Key length in bits.
pub const KEY_LENGTH_BITS: usize = 128;

/// Encrypt `document` with `password`. An empty password returns the
/// document untouched. On failure the document is dropped, never returned
/// unprotected.
#[instrument(skip_all, fields(pages = document.page_count()))]
pub fn encrypt(mut document: Document, password: &str) -> Result<Document, ConvertError> {
    if password.is_empty() {
        debug!("Empty password; stage skipped");
        return Ok(document);
    }
    if document.is_encrypted() {
        return Err(ConvertError::Encryption("document is already encrypted".into()));
    }

    // The key derivation mixes in the first /ID entry.
    let plaintext = document.to_bytes()?;
    let file_id = Sha256::digest(&plaintext)[..16].to_vec();
    debug!(file_id = %hex::encode(&file_id), "File identifier derived");

    let doc = document.as_lopdf_mut();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(file_id.clone(), StringFormat::Hexadecimal),
            Object::String(file_id, StringFormat::Hexadecimal),
        ]),
    );

    let version = EncryptionVersion::V2 {
        document: &*doc,
        owner_password: password,
        user_password: password,
        key_length: KEY_LENGTH_BITS,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version)
        .map_err(|err| ConvertError::Encryption(format!("failed to derive encryption key: {err}")))?;

    doc.encrypt(&state)
        .map_err(|err| ConvertError::Encryption(format!("failed to encrypt document: {err}")))?;

    document.mark_encrypted();
    info!("Document encrypted");
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::PdfInspector;
    use crate::pdf::{PageSynthesizer, assemble};
    use pagewerk_core::types::PageSize;

    fn text_document(text: &str) -> Document {
        let page = PageSynthesizer::new(PageSize::A4).text_page(text);
        assemble(&[page], "Encryption test").unwrap()
    }

    #[test]
    fn empty_password_is_pass_through() {
        let mut result = encrypt(text_document("open"), "").unwrap();
        assert!(!result.is_encrypted());
        let inspector = PdfInspector::from_bytes(&result.to_bytes().unwrap()).unwrap();
        assert!(!inspector.is_encrypted());
    }

    #[test]
    fn encrypted_document_opens_only_with_its_password() {
        let mut sealed = encrypt(text_document("top secret memo"), "secret").unwrap();
        assert!(sealed.is_encrypted());
        let bytes = sealed.to_bytes().unwrap();

        assert!(PdfInspector::from_bytes(&bytes).unwrap().is_encrypted());
        assert!(matches!(
            PdfInspector::from_bytes_with_password(&bytes, "wrong"),
            Err(ConvertError::Encryption(_))
        ));

        let opened = PdfInspector::from_bytes_with_password(&bytes, "secret").unwrap();
        assert_eq!(opened.page_count(), 1);
        assert!(opened.page_text(1).unwrap().contains("top secret memo"));
    }

    #[test]
    fn double_encryption_is_rejected() {
        let sealed = encrypt(text_document("x"), "one").unwrap();
        assert!(matches!(encrypt(sealed, "two"), Err(ConvertError::Encryption(_))));
    }
}
