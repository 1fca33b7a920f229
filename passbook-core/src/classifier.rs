//! Line classification: transaction start, continuation, or noise.
//!
//! Noise detection is table-driven. Each `NoisePattern` has a name and a
//! case-insensitive regex; patterns are evaluated in table order and the
//! first match wins. User patterns are appended after the built-ins.

use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use crate::error::{StatementError, StatementResult};
use crate::normalize::split_trailing_amounts;
use crate::types::{LineLabel, RawLine};

/// Built-in boilerplate, in evaluation order.
pub const BUILTIN_NOISE: &[(&str, &str)] = &[
    ("statement_header", r"^statement\s+of\s+account"),
    ("page_footer", r"\bpage\s*\d+\s*(?:of|/)\s*\d+\b"),
    ("page_fraction", r"^\d+\s*/\s*\d+$"),
    ("printed_on", r"^printed\s+on\b"),
    (
        "column_header",
        r"^(?:txn\s+|transaction\s+|value\s+|posting\s+)?date\s+(?:description|particulars|narration|details|transaction|remarks)\b",
    ),
    (
        "balance_forward",
        r"\b(?:opening|closing)\s+balance\b|\bbalance\s+(?:brought|carried)\s+forward\b|\b[bc]/f\b",
    ),
    (
        "generated_notice",
        r"\bcomputer[\s-]+generated\b|\bdoes\s+not\s+require\s+(?:a\s+)?signature\b",
    ),
];

const MONTH_NAME: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

fn month_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"(?i)^{MONTH_NAME}$")).expect("month name regex"))
}

/// A token made only of digits and separators, or one naming a month, reads
/// as a date on its own. Anything else (`XX/YY/ZZZZ`, `TO/ATM/CASH`) only
/// counts when the rest of the line ends in an amount.
fn is_recognizable_date(token: &str) -> bool {
    !token.chars().any(|c| c.is_ascii_alphabetic())
        || token
            .split(['/', '-', '.', ' ', ','])
            .any(|part| month_name_re().is_match(part))
}

fn date_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternatives = [
            r"\d{4}[-/.]\d{1,2}[-/.]\d{1,2}".to_string(),
            r"[a-z0-9]{1,2}/[a-z0-9]{1,3}/(?:[a-z0-9]{4}|[a-z0-9]{2})".to_string(),
            r"[a-z0-9]{1,2}-[a-z0-9]{1,3}-(?:[a-z0-9]{4}|[a-z0-9]{2})".to_string(),
            r"[a-z0-9]{1,2}\.[a-z0-9]{1,3}\.(?:[a-z0-9]{4}|[a-z0-9]{2})".to_string(),
            format!(r"\d{{1,2}}\s+{MONTH_NAME}\.?,?\s+\d{{2,4}}"),
            format!(r"{MONTH_NAME}\.?\s+\d{{1,2}},?\s+\d{{4}}"),
        ];
        Regex::new(&format!(
            r"(?i)^(?P<date>{})\s+(?P<rest>\S.*)$",
            alternatives.join("|")
        ))
        .expect("date start regex")
    })
}

/// Split a line into its leading date-shaped token and the remaining text.
///
/// The token only has to look like a date; `XX/YY/ZZZZ SHOP -10.00`
/// qualifies and is rejected later by the normalizer.
pub fn split_date_token(text: &str) -> Option<(&str, &str)> {
    let caps = date_start_re().captures(text)?;
    let date = caps.name("date")?.as_str();
    let rest = caps.name("rest")?.as_str();
    if !is_recognizable_date(date) && split_trailing_amounts(rest).1.is_empty() {
        return None;
    }
    Some((date, rest))
}

/// Collapse runs of whitespace and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
pub struct NoisePattern {
    pub name: String,
    regex: Regex,
}

impl NoisePattern {
    pub fn new(name: impl Into<String>, pattern: &str) -> StatementResult<Self> {
        let name = name.into();
        let regex = Regex::new(&format!("(?i){pattern}")).map_err(|e| StatementError::Config {
            name: name.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { name, regex })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    noise: Vec<NoisePattern>,
}

impl Default for Classifier {
    fn default() -> Self {
        let noise = BUILTIN_NOISE
            .iter()
            .map(|(name, pattern)| NoisePattern::new(*name, pattern).expect("builtin noise pattern"))
            .collect();
        Self { noise }
    }
}

impl Classifier {
    /// Built-in patterns followed by `extra` (name, regex) pairs.
    pub fn with_extra_patterns<N, P>(extra: &[(N, P)]) -> StatementResult<Self>
    where
        N: AsRef<str>,
        P: AsRef<str>,
    {
        let mut classifier = Self::default();
        for (name, pattern) in extra {
            classifier
                .noise
                .push(NoisePattern::new(name.as_ref(), pattern.as_ref())?);
        }
        Ok(classifier)
    }

    pub fn patterns(&self) -> &[NoisePattern] {
        &self.noise
    }

    /// Name of the first noise pattern matching `text`, if any.
    pub fn matched_pattern(&self, text: &str) -> Option<&str> {
        let text = normalize_whitespace(text);
        self.noise
            .iter()
            .find(|p| p.is_match(&text))
            .map(|p| p.name.as_str())
    }

    /// Context-free label. A continuation with nothing to attach to is
    /// handled by the caller (`label_all`, or the assembler's idle state).
    pub fn classify(&self, line: &RawLine) -> LineLabel {
        let text = normalize_whitespace(&line.text);
        if text.is_empty() {
            return LineLabel::Noise;
        }
        if let Some(p) = self.noise.iter().find(|p| p.is_match(&text)) {
            trace!(pattern = %p.name, position = %line.position, "noise line");
            return LineLabel::Noise;
        }
        if split_date_token(&text).is_some() {
            LineLabel::Transaction
        } else {
            LineLabel::Continuation
        }
    }

    /// Label a whole document; continuations before the first transaction become noise.
    pub fn label_all(&self, lines: &[RawLine]) -> Vec<LineLabel> {
        let mut seen_transaction = false;
        lines
            .iter()
            .map(|line| match self.classify(line) {
                LineLabel::Transaction => {
                    seen_transaction = true;
                    LineLabel::Transaction
                }
                LineLabel::Continuation if !seen_transaction => LineLabel::Noise,
                label => label,
            })
            .collect()
    }
}
