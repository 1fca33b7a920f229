//! Statement header details (account number, statement period).

use std::sync::OnceLock;

use regex::Regex;

use crate::classifier::normalize_whitespace;
use crate::normalize::FieldNormalizer;
use crate::types::{RawLine, StatementMeta};

fn account_no_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:account|a/c|acct)\.?\s*(?:no\.?|number|num|#)\s*[:：]?\s*([0-9x*][0-9x*-]{5,})")
            .expect("account regex")
    })
}

fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let date = r"(?:\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}|\d{1,2}[\s-][a-z]{3,9}[\s-]\d{2,4})";
        Regex::new(&format!(
            r"(?i)\b(?:period|from)\b\D*?(?P<from>{date})\s*(?:to|--?|–)\s*(?P<to>{date})"
        ))
        .expect("period regex")
    })
}

/// Scan raw lines for header details. First match wins for each field.
pub fn scan_meta(lines: &[RawLine], source_name: &str, normalizer: &FieldNormalizer) -> StatementMeta {
    let mut meta = StatementMeta {
        source_name: source_name.to_string(),
        page_count: lines.iter().map(|l| l.position.page).max().unwrap_or(0),
        ..Default::default()
    };

    for line in lines {
        let text = normalize_whitespace(&line.text);
        if meta.account_number.is_none() {
            if let Some(caps) = account_no_re().captures(&text) {
                meta.account_number = Some(caps[1].trim_end_matches('-').to_string());
            }
        }
        if meta.period.is_none() {
            if let Some(caps) = period_re().captures(&text) {
                let from = normalizer.parse_date(&caps["from"]);
                let to = normalizer.parse_date(&caps["to"]);
                if let (Ok(from), Ok(to)) = (from, to) {
                    meta.period = Some((from, to));
                }
            }
        }
        if meta.account_number.is_some() && meta.period.is_some() {
            break;
        }
    }

    meta
}
