//! Text extraction from uploaded documents.

use lopdf::Document as PdfDocument;
use tracing::debug;

use crate::error::{RagError, Result};

/// Extracts plain text from raw uploaded bytes.
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the document identified by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Extraction`] if the bytes are unreadable or
    /// malformed, or if no text could be recovered. An empty extraction
    /// is an error: there is nothing to embed.
    fn extract(&self, id: &str, bytes: &[u8]) -> Result<String>;
}

/// Extracts text from page-based PDF documents via `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, id: &str, bytes: &[u8]) -> Result<String> {
        let doc = PdfDocument::load_mem(bytes)
            .map_err(|e| RagError::Extraction(format!("'{id}' is not a valid PDF: {e}")))?;

        let mut text = String::new();
        for (page_number, _) in doc.get_pages() {
            let page_text = doc.extract_text(&[page_number]).map_err(|e| {
                RagError::Extraction(format!("failed to read page {page_number} of '{id}': {e}"))
            })?;
            text.push_str(&page_text);
        }

        if text.trim().is_empty() {
            return Err(RagError::Extraction(format!("no text could be extracted from '{id}'")));
        }

        debug!(document.id = id, chars = text.len(), "extracted pdf text");
        Ok(text)
    }
}

/// Passes through UTF-8 text uploads (.txt, .md and similar).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, id: &str, bytes: &[u8]) -> Result<String> {
        let text = String::from_utf8_lossy(bytes).into_owned();
        if text.trim().is_empty() {
            return Err(RagError::Extraction(format!("'{id}' contains no text")));
        }
        Ok(text)
    }
}

/// Dispatches to an extractor based on the document's file extension.
///
/// `.pdf` goes through [`PdfExtractor`]; everything else is treated as
/// plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor {
    pdf: PdfExtractor,
    plain: PlainTextExtractor,
}

impl TextExtractor for DefaultExtractor {
    fn extract(&self, id: &str, bytes: &[u8]) -> Result<String> {
        let is_pdf = std::path::Path::new(id)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            self.pdf.extract(id, bytes)
        } else {
            self.plain.extract(id, bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_pdf_is_an_extraction_error() {
        let result = PdfExtractor.extract("broken.pdf", b"not a pdf at all");
        assert!(matches!(result, Err(RagError::Extraction(_))));
    }

    #[test]
    fn plain_text_passes_through() {
        let text = PlainTextExtractor.extract("notes.txt", b"Quarterly revenue rose 12%.").unwrap();
        assert_eq!(text, "Quarterly revenue rose 12%.");
    }

    #[test]
    fn empty_upload_is_an_extraction_error() {
        let result = PlainTextExtractor.extract("empty.txt", b"   \n");
        assert!(matches!(result, Err(RagError::Extraction(_))));
    }

    #[test]
    fn default_extractor_dispatches_on_extension() {
        // A .pdf extension must hit the PDF parser, which rejects this body.
        let result = DefaultExtractor::default().extract("report.PDF", b"plain text");
        assert!(matches!(result, Err(RagError::Extraction(_))));

        let text = DefaultExtractor::default().extract("report.txt", b"plain text").unwrap();
        assert_eq!(text, "plain text");
    }
}
