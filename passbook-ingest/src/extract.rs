//! Text extraction collaborators.
//!
//! PDF layout analysis belongs to `pdf-extract`; this module only adapts its
//! output into pages of text and maps its failures onto `StatementError`.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use passbook_core::{RawLine, StatementError, StatementResult};
use tracing::{debug, info};

use crate::lines::{lines_from_pages, split_pages};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// "Given a document, return its text, one string per page."
pub trait TextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> StatementResult<Vec<String>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> StatementResult<Vec<String>> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(StatementError::extraction("not a PDF file"));
        }

        // pdf-extract panics on some malformed inputs instead of returning Err
        let result = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));
        let text = match result {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(StatementError::extraction(format!("PDF text extraction failed: {e}"))),
            Err(_) => return Err(StatementError::extraction("PDF text extraction aborted on a malformed document")),
        };

        let pages = split_pages(&text);
        if pages.is_empty() {
            return Err(StatementError::extraction(
                "PDF has no text layer (scanned statements are not supported)",
            ));
        }
        debug!(pages = pages.len(), chars = text.len(), "pdf text extracted");
        Ok(pages)
    }
}

/// Pre-extracted UTF-8 text, pages separated by form feeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> StatementResult<Vec<String>> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| StatementError::extraction(format!("text input is not UTF-8: {e}")))?;
        let pages = split_pages(text);
        if pages.is_empty() {
            return Err(StatementError::extraction("text input is empty"));
        }
        Ok(pages)
    }
}

fn extractor_for(name: &str) -> &'static dyn TextExtractor {
    let is_text = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    if is_text {
        &PlainTextExtractor
    } else {
        &PdfTextExtractor
    }
}

/// Extract lines from an uploaded document; `.txt` names are read as text,
/// everything else as PDF.
pub fn extract_lines(bytes: &[u8], name: &str) -> StatementResult<Vec<RawLine>> {
    let pages = extractor_for(name).extract_pages(bytes)?;
    let lines = lines_from_pages(&pages);
    info!(source = name, pages = pages.len(), lines = lines.len(), "document extracted");
    Ok(lines)
}

pub fn load_statement(path: &Path) -> StatementResult<Vec<RawLine>> {
    let bytes = std::fs::read(path)
        .map_err(|e| StatementError::extraction(format!("read {}: {e}", path.display())))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    extract_lines(&bytes, &name)
}
