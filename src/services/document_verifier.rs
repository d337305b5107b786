//! Document verification - capability layer
//!
//! Tells a real, complete PDF apart from browser artifacts (partial
//! `.crdownload` files, HTML error pages, empty files).

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::WorkspaceError;

const PDF_HEADER: &[u8] = b"%PDF-";
const PDF_EOF: &[u8] = b"%%EOF";
/// Header and trailer markers may sit this far from the file edges
const MARKER_WINDOW: usize = 1024;

/// `true` only for a structurally valid PDF.
///
/// Encrypted documents go through the same parse: the cross reference table
/// and page tree stay readable without the password.
pub fn is_valid_document(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(MARKER_WINDOW)];
    let tail = &bytes[bytes.len().saturating_sub(MARKER_WINDOW)..];

    if !contains(head, PDF_HEADER) || !contains(tail, PDF_EOF) {
        return false;
    }

    match lopdf::Document::load_mem(bytes) {
        Ok(document) => !document.get_pages().is_empty(),
        Err(e) => {
            debug!("pdf parse failed: {}", e);
            false
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// First regular file in `dir`, in name order, that passes
/// [`is_valid_document`]
pub async fn find_verified_document(dir: &Path) -> Result<Option<PathBuf>, WorkspaceError> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| WorkspaceError::io("listing", dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| WorkspaceError::io("listing", dir, e))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort();

    for path in files {
        let bytes = fs::read(&path)
            .await
            .map_err(|e| WorkspaceError::io("reading", &path, e))?;
        if is_valid_document(&bytes) {
            return Ok(Some(path));
        }
        warn!("⚠️ Ignoring invalid document {}", path.display());
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    /// A minimal one-page document
    fn sample_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let content = Stream::new(dictionary! {}, b"BT /F1 12 Tf 72 720 Td (paycheck) Tj ET".to_vec());
        let content_id = doc.add_object(content);

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn to_bytes(mut doc: Document) -> Vec<u8> {
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize pdf");
        bytes
    }

    fn sample_pdf() -> Vec<u8> {
        to_bytes(sample_document())
    }

    /// Same document with a standard security handler in the trailer
    fn encrypted_pdf() -> Vec<u8> {
        let mut doc = sample_document();
        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => 2,
            "R" => 3,
            "Length" => 128,
            "P" => -3904,
            "O" => Object::string_literal(vec![0x4f_u8; 32]),
            "U" => Object::string_literal(vec![0x55_u8; 32]),
        });
        doc.trailer.set("Encrypt", encrypt_id);
        to_bytes(doc)
    }

    #[test]
    fn test_accepts_generated_pdf() {
        assert!(is_valid_document(&sample_pdf()));
    }

    #[test]
    fn test_rejects_empty_and_html() {
        assert!(!is_valid_document(b""));
        assert!(!is_valid_document(b"<!DOCTYPE html><html><body>Session expired</body></html>"));
    }

    #[test]
    fn test_rejects_truncated_download() {
        let pdf = sample_pdf();
        assert!(!is_valid_document(&pdf[..pdf.len() / 2]));
    }

    #[test]
    fn test_rejects_markers_without_structure() {
        assert!(!is_valid_document(b"%PDF-1.4\nnot really a pdf\n%%EOF"));
    }

    #[test]
    fn test_accepts_encrypted_pdf_on_structure() {
        let bytes = encrypted_pdf();
        assert!(contains(&bytes, b"/Encrypt"));
        assert!(is_valid_document(&bytes));
    }

    #[test]
    fn test_encrypt_marker_does_not_replace_structure() {
        let page = b"%PDF-1.7\n<html>502 Bad Gateway</html> /Encrypt\n%%EOF";
        assert!(!is_valid_document(page));

        let pdf = encrypted_pdf();
        assert!(!is_valid_document(&pdf[..pdf.len() / 2]));
    }

    #[tokio::test]
    async fn test_find_skips_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf.crdownload"), b"%PDF-1.5 partial").unwrap();
        std::fs::write(dir.path().join("b.pdf"), sample_pdf()).unwrap();
        std::fs::create_dir(dir.path().join("c-subdir")).unwrap();

        let found = find_verified_document(dir.path()).await.unwrap();
        assert_eq!(found, Some(dir.path().join("b.pdf")));
    }

    #[tokio::test]
    async fn test_find_returns_none_without_valid_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("error.html"), b"<html></html>").unwrap();

        assert_eq!(find_verified_document(dir.path()).await.unwrap(), None);
    }
}
