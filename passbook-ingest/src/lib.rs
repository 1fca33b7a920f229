//! passbook-ingest: statement files → page text → `RawLine`s.

pub mod extract;
pub mod lines;

pub use extract::{extract_lines, load_statement, PdfTextExtractor, PlainTextExtractor, TextExtractor};
pub use lines::{lines_from_pages, lines_from_text};
