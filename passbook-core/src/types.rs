use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Where a line came from in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinePosition {
    /// 1-based page number
    pub page: usize,
    /// 0-based row within the page
    pub row: usize,
}

impl std::fmt::Display for LinePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {} row {}", self.page, self.row)
    }
}

/// One line of extracted text, consumed once by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    pub position: LinePosition,
}

impl RawLine {
    pub fn new(text: impl Into<String>, page: usize, row: usize) -> Self {
        Self {
            text: text.into(),
            position: LinePosition { page, row },
        }
    }

    /// Build lines for a single page from plain strings (row = index).
    pub fn from_strs<S: AsRef<str>>(lines: &[S]) -> Vec<RawLine> {
        lines
            .iter()
            .enumerate()
            .map(|(row, s)| RawLine::new(s.as_ref(), 1, row))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineLabel {
    Transaction,
    Continuation,
    Noise,
}

/// Normalized statement transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    /// Negative means debit/withdrawal; positive means credit/deposit.
    pub amount: Decimal,
    /// Running balance after this transaction, when the statement prints one
    pub balance: Option<Decimal>,
    pub position: LinePosition,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchTotals {
    pub debits: Decimal,
    pub credits: Decimal,
    pub net: Decimal,
}

/// Transactions of one statement, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionBatch {
    transactions: Vec<Transaction>,
}

impl TransactionBatch {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn push(&mut self, txn: Transaction) {
        self.transactions.push(txn);
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    pub fn as_slice(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_inner(self) -> Vec<Transaction> {
        self.transactions
    }

    pub fn totals(&self) -> BatchTotals {
        let mut totals = BatchTotals::default();
        for t in &self.transactions {
            if t.is_debit() {
                totals.debits += t.amount;
            } else {
                totals.credits += t.amount;
            }
        }
        totals.net = totals.debits + totals.credits;
        totals
    }

    /// Earliest and latest transaction date (statement order is not assumed sorted).
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.transactions.iter().map(|t| t.date).min()?;
        let max = self.transactions.iter().map(|t| t.date).max()?;
        Some((min, max))
    }
}

impl<'a> IntoIterator for &'a TransactionBatch {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}

/// Statement-level details picked up from header lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatementMeta {
    pub source_name: String,
    pub page_count: usize,
    pub account_number: Option<String>,
    pub period: Option<(NaiveDate, NaiveDate)>,
}

/// A record dropped by the skip-and-continue policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub position: LinePosition,
    pub raw: String,
    pub error: ParseError,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessingReport {
    pub lines_seen: usize,
    pub noise_lines: usize,
    pub orphan_continuations: usize,
    pub emitted: usize,
    pub skipped: Vec<SkippedRecord>,
    pub logs: Vec<String>,
}

impl ProcessingReport {
    pub fn log(&mut self, msg: impl Into<String>) {
        self.logs.push(msg.into());
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct Statement {
    pub meta: StatementMeta,
    pub batch: TransactionBatch,
    pub report: ProcessingReport,
}
