use passbook_core::RawLine;

/// Page separator emitted by PDF text extraction.
pub const FORM_FEED: char = '\u{000C}';

fn clean_line(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    // spreadsheet-style text cells sometimes arrive as '01/02/2023
    collapsed.trim_start_matches('\'').trim().to_string()
}

/// One `RawLine` per physical line, pages numbered from 1.
///
/// Blank lines are kept so row numbers match the page; the classifier
/// labels them as noise.
pub fn lines_from_pages<S: AsRef<str>>(pages: &[S]) -> Vec<RawLine> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(page_idx, page)| {
            page.as_ref()
                .lines()
                .enumerate()
                .map(move |(row, raw)| RawLine::new(clean_line(raw), page_idx + 1, row))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Split a whole-document dump on form feeds, dropping empty pages.
pub fn split_pages(text: &str) -> Vec<String> {
    text.split(FORM_FEED)
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.to_string())
        .collect()
}

pub fn lines_from_text(text: &str) -> Vec<RawLine> {
    lines_from_pages(&split_pages(text))
}
