//! Field normalization: dates, signed amounts and running balances.
//!
//! Statements disagree on nearly everything here. Dates come as `01/02/2023`,
//! `2023-02-01`, `01-Feb-23` or `Feb 1, 2023`; debits show up as `-45.20`,
//! `45.20-`, `(45.20)` or `45.20 Dr`. Every variant ends up as a `NaiveDate`
//! or a `Decimal` with exactly two fractional digits.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// How to read an ambiguous numeric date such as `01/02/2023`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateOrder {
    /// `01/02/2023` is 1 February
    #[default]
    DayFirst,
    /// `01/02/2023` is 2 January
    MonthFirst,
}

/// Formats tried for dates with a month name, after `,` `.` `-` `/` are
/// folded to spaces. Two-digit year variants go first so `23` never parses
/// as the year 23.
const TEXTUAL_FORMATS: &[&str] = &[
    "%d %b %y", "%d %B %y", "%b %d %y", "%B %d %y",
    "%d %b %Y", "%d %B %Y", "%b %d %Y", "%B %d %Y",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '₹', '¥'];
const CURRENCY_CODES: &[&str] = &["rs.", "rs", "inr", "usd", "eur", "gbp"];
const BALANCE_PLACEHOLDERS: &[&str] = &["", "-", "–", "—", "n/a", "na"];

fn money_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\(?[-+]?(?:[$€£₹¥]|rs\.?)?[-+]?(?:\d{1,3}(?:,\d{2,3})+|\d+)\.\d{2}\)?-?(?:dr|cr)?$")
            .expect("money token regex")
    })
}

fn is_sign_marker(tok: &str) -> bool {
    tok.eq_ignore_ascii_case("dr") || tok.eq_ignore_ascii_case("cr")
}

/// True when `tok` looks like a monetary amount (two decimals required, so
/// reference numbers such as `#4471` or `4471` are never taken as money).
pub fn is_money_token(tok: &str) -> bool {
    money_token_re().is_match(tok)
}

fn is_currency_marker(tok: &str) -> bool {
    let mut chars = tok.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return CURRENCY_SYMBOLS.contains(&c);
    }
    CURRENCY_CODES.iter().any(|code| tok.eq_ignore_ascii_case(code))
}

/// Split the trailing run of monetary tokens off a line.
///
/// A standalone `Dr`/`Cr` binds to the amount before it, and a standalone
/// currency marker (`$`, `Rs.`, `INR`) to the amount after it.
pub fn split_trailing_amounts(text: &str) -> (String, Vec<String>) {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut end = tokens.len();
    let mut amounts = Vec::new();

    while end > 0 {
        let tok = tokens[end - 1];
        let mut amount = if is_sign_marker(tok) && end >= 2 && is_money_token(tokens[end - 2]) {
            end -= 2;
            format!("{} {}", tokens[end], tok)
        } else if is_money_token(tok) {
            end -= 1;
            tok.to_string()
        } else {
            break;
        };
        if end > 0 && is_currency_marker(tokens[end - 1]) {
            end -= 1;
            amount = format!("{} {}", tokens[end], amount);
        }
        amounts.push(amount);
    }

    amounts.reverse();
    (tokens[..end].join(" "), amounts)
}

fn strip_currency_prefix(s: &str) -> Option<&str> {
    if let Some(rest) = s.strip_prefix(CURRENCY_SYMBOLS) {
        return Some(rest);
    }
    let lower = s.to_ascii_lowercase();
    CURRENCY_CODES
        .iter()
        .find(|code| lower.starts_with(*code))
        .map(|code| &s[code.len()..])
}

fn parse_money(raw: &str) -> Option<Decimal> {
    let mut body = raw.trim().trim_matches(|c| c == '\'' || c == '"').trim();
    let mut negative = false;

    let lower = body.to_ascii_lowercase();
    if lower.ends_with("dr") {
        negative = true;
        body = body[..body.len() - 2].trim_end();
    } else if lower.ends_with("cr") {
        body = body[..body.len() - 2].trim_end();
    }

    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = inner.trim();
    }

    if let Some(rest) = body.strip_suffix('-') {
        negative = true;
        body = rest.trim_end();
    }
    body = body.trim_end_matches(CURRENCY_SYMBOLS).trim_end();

    loop {
        let before = body.len();
        if let Some(rest) = body.strip_prefix('-') {
            negative = true;
            body = rest.trim_start();
        } else if let Some(rest) = body.strip_prefix('+') {
            body = rest.trim_start();
        } else if let Some(rest) = strip_currency_prefix(body) {
            body = rest.trim_start();
        }
        if body.len() == before {
            break;
        }
    }

    let digits: String = body
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}'))
        .collect();
    let dots = digits.chars().filter(|c| *c == '.').count();
    if dots > 1
        || !digits.chars().any(|c| c.is_ascii_digit())
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }

    let mut value = Decimal::from_str(&digits)
        .ok()?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);
    if negative && !value.is_zero() {
        value = -value;
    }
    Some(value)
}

/// Parse a transaction amount into a signed, two-decimal value.
pub fn parse_amount(raw: &str) -> Result<Decimal, ParseError> {
    parse_money(raw).ok_or_else(|| ParseError::amount(raw))
}

/// Parse a running balance. Blank cells and dash placeholders mean "no balance".
pub fn parse_balance(raw: &str) -> Result<Option<Decimal>, ParseError> {
    let trimmed = raw.trim();
    if BALANCE_PLACEHOLDERS
        .iter()
        .any(|p| trimmed.eq_ignore_ascii_case(p))
    {
        return Ok(None);
    }
    parse_money(trimmed)
        .map(Some)
        .ok_or_else(|| ParseError::amount(raw))
}

fn expand_year(s: &str) -> Option<i32> {
    let y: i32 = s.parse().ok()?;
    match s.len() {
        // chrono's %y pivot: 00-69 → 20xx, 70-99 → 19xx
        2 if y < 70 => Some(2000 + y),
        2 => Some(1900 + y),
        4 => Some(y),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldNormalizer {
    pub date_order: DateOrder,
}

impl FieldNormalizer {
    pub fn new(date_order: DateOrder) -> Self {
        Self { date_order }
    }

    pub fn parse_date(&self, raw: &str) -> Result<NaiveDate, ParseError> {
        let s = raw.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        let parsed = if s.chars().any(|c| c.is_ascii_alphabetic()) {
            parse_textual(s)
        } else {
            self.parse_numeric(s)
        };
        parsed.ok_or_else(|| ParseError::date(raw))
    }

    pub fn parse_amount(&self, raw: &str) -> Result<Decimal, ParseError> {
        parse_amount(raw)
    }

    pub fn parse_balance(&self, raw: &str) -> Result<Option<Decimal>, ParseError> {
        parse_balance(raw)
    }

    fn parse_numeric(&self, s: &str) -> Option<NaiveDate> {
        let parts: Vec<&str> = s.split(['/', '-', '.']).collect();
        if parts.len() != 3
            || parts
                .iter()
                .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
        {
            return None;
        }

        if parts[0].len() == 4 {
            let year: i32 = parts[0].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, parts[1].parse().ok()?, parts[2].parse().ok()?);
        }

        let year = expand_year(parts[2])?;
        let a: u32 = parts[0].parse().ok()?;
        let b: u32 = parts[1].parse().ok()?;
        // preferred reading first, then the other one for dates like 25/12 vs 12/25
        let (preferred, alternate) = match self.date_order {
            DateOrder::DayFirst => ((b, a), (a, b)),
            DateOrder::MonthFirst => ((a, b), (b, a)),
        };
        NaiveDate::from_ymd_opt(year, preferred.0, preferred.1)
            .or_else(|| NaiveDate::from_ymd_opt(year, alternate.0, alternate.1))
    }
}

fn parse_textual(s: &str) -> Option<NaiveDate> {
    let folded: String = s
        .chars()
        .map(|c| if matches!(c, ',' | '.' | '-' | '/') { ' ' } else { c })
        .collect();
    // chrono's %b knows "Sep" but not "Sept"
    let folded = folded
        .split_whitespace()
        .map(|word| if word.eq_ignore_ascii_case("sept") { "Sep" } else { word })
        .collect::<Vec<_>>()
        .join(" ");
    TEXTUAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&folded, fmt).ok())
}
