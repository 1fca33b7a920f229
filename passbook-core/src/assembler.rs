//! Transaction assembly: merge classified lines into records.
//!
//! The state machine is a pure function: `step` takes the current
//! `AssemblerState` and one labelled line, and returns the next state plus
//! the record it finalized, if any. `assemble` drives it over a document and
//! applies the skip-and-continue policy to records that fail normalization.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::classifier::{normalize_whitespace, split_date_token, Classifier};
use crate::error::ParseError;
use crate::normalize::{split_trailing_amounts, FieldNormalizer};
use crate::types::{
    LineLabel, LinePosition, ProcessingReport, RawLine, SkippedRecord, Transaction,
    TransactionBatch,
};

/// A transaction being accumulated from one opening line and its continuations.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub position: LinePosition,
    /// Parsed when the record opens; a failure is kept so the record still
    /// swallows its continuation lines before being dropped.
    pub date: Result<NaiveDate, ParseError>,
    pub parts: Vec<String>,
    pub amounts: Vec<String>,
    pub raw_lines: Vec<String>,
}

impl PendingRecord {
    pub fn open(line: &RawLine, normalizer: &FieldNormalizer) -> Self {
        let text = normalize_whitespace(&line.text);
        let (date, rest) = match split_date_token(&text) {
            Some((token, rest)) => (normalizer.parse_date(token), rest.to_string()),
            None => (Err(ParseError::date(text.clone())), String::new()),
        };
        let (desc, amounts) = split_trailing_amounts(&rest);

        let mut parts = Vec::new();
        if !desc.is_empty() {
            parts.push(desc);
        }
        Self {
            position: line.position,
            date,
            parts,
            amounts,
            raw_lines: vec![text],
        }
    }

    /// Fold a continuation line into this record.
    ///
    /// Amounts are taken from the first line that carries them; once the
    /// record has amounts, later numeric text stays in the description.
    pub fn absorb(&mut self, line: &RawLine) {
        let text = normalize_whitespace(&line.text);
        if text.is_empty() {
            return;
        }
        if self.amounts.is_empty() {
            let (desc, amounts) = split_trailing_amounts(&text);
            if !desc.is_empty() {
                self.parts.push(desc);
            }
            self.amounts = amounts;
        } else {
            self.parts.push(text.clone());
        }
        self.raw_lines.push(text);
    }

    pub fn description(&self) -> String {
        self.parts.join(" ")
    }

    pub fn raw_text(&self) -> String {
        self.raw_lines.join(" | ")
    }

    fn amount_token(&self) -> Option<&str> {
        match self.amounts.as_slice() {
            [] => None,
            [amount] => Some(amount.as_str()),
            [.., amount, _balance] => Some(amount.as_str()),
        }
    }

    /// Whether the amount carries its own sign (`-`, parentheses, `Dr`/`Cr`).
    pub fn amount_is_signed(&self) -> bool {
        self.amount_token().is_some_and(|tok| {
            let lower = tok.to_ascii_lowercase();
            lower.contains('-')
                || lower.contains('(')
                || lower.contains('+')
                || lower.ends_with("dr")
                || lower.ends_with("cr")
        })
    }

    pub fn finalize(self, normalizer: &FieldNormalizer) -> Result<Transaction, ParseError> {
        let description = self.description();
        let raw = self.raw_text();
        let PendingRecord {
            position,
            date,
            amounts,
            ..
        } = self;

        let date = date?;
        let (amount_raw, balance_raw) = match amounts.as_slice() {
            [] => return Err(ParseError::amount(raw)),
            [amount] => (amount, None),
            [.., amount, balance] => (amount, Some(balance)),
        };
        let amount = normalizer.parse_amount(amount_raw)?;
        let balance = match balance_raw {
            Some(b) => normalizer.parse_balance(b)?,
            None => None,
        };

        Ok(Transaction {
            date,
            description,
            amount,
            balance,
            position,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AssemblerState {
    #[default]
    Idle,
    Open(PendingRecord),
}

/// One transition of the assembler.
pub fn step(
    state: AssemblerState,
    line: &RawLine,
    label: LineLabel,
    normalizer: &FieldNormalizer,
) -> (AssemblerState, Option<PendingRecord>) {
    match (label, state) {
        (LineLabel::Noise, state) => (state, None),
        (LineLabel::Continuation, AssemblerState::Idle) => (AssemblerState::Idle, None),
        (LineLabel::Continuation, AssemblerState::Open(mut record)) => {
            record.absorb(line);
            (AssemblerState::Open(record), None)
        }
        (LineLabel::Transaction, state) => {
            let emitted = match state {
                AssemblerState::Open(record) => Some(record),
                AssemblerState::Idle => None,
            };
            (
                AssemblerState::Open(PendingRecord::open(line, normalizer)),
                emitted,
            )
        }
    }
}

/// End of input: emit whatever is still open.
pub fn finish(state: AssemblerState) -> Option<PendingRecord> {
    match state {
        AssemblerState::Open(record) => Some(record),
        AssemblerState::Idle => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub batch: TransactionBatch,
    pub report: ProcessingReport,
}

struct Sink<'a> {
    normalizer: &'a FieldNormalizer,
    assembly: Assembly,
    last_balance: Option<Decimal>,
}

impl Sink<'_> {
    fn accept(&mut self, record: PendingRecord) {
        let signed = record.amount_is_signed();
        let position = record.position;
        let raw = record.raw_text();

        match record.finalize(self.normalizer) {
            Ok(mut txn) => {
                if !signed {
                    reconcile_sign(&mut txn, self.last_balance);
                }
                if txn.balance.is_some() {
                    self.last_balance = txn.balance;
                }
                self.assembly.report.emitted += 1;
                self.assembly.batch.push(txn);
            }
            Err(error) => {
                warn!(%position, %error, "skipping transaction");
                self.assembly
                    .report
                    .log(format!("skipped {position}: {error}"));
                self.assembly.report.skipped.push(SkippedRecord {
                    position,
                    raw,
                    error,
                });
            }
        }
    }
}

/// Unsigned amounts (separate debit/credit columns flattened by extraction)
/// take their sign from the running balance when both balances are known.
fn reconcile_sign(txn: &mut Transaction, previous: Option<Decimal>) {
    let (Some(prev), Some(bal)) = (previous, txn.balance) else {
        return;
    };
    if prev + txn.amount != bal && prev - txn.amount == bal {
        debug!(position = %txn.position, "amount sign taken from balance movement");
        txn.amount = -txn.amount;
    }
}

/// Run the assembler over a document.
pub fn assemble(
    lines: &[RawLine],
    classifier: &Classifier,
    normalizer: &FieldNormalizer,
) -> Assembly {
    let mut sink = Sink {
        normalizer,
        assembly: Assembly::default(),
        last_balance: None,
    };
    let mut state = AssemblerState::Idle;

    for line in lines {
        sink.assembly.report.lines_seen += 1;
        let label = classifier.classify(line);
        match (label, &state) {
            (LineLabel::Noise, _) => sink.assembly.report.noise_lines += 1,
            (LineLabel::Continuation, AssemblerState::Idle) => {
                sink.assembly.report.orphan_continuations += 1;
                debug!(position = %line.position, "continuation before any transaction, dropped");
            }
            _ => debug!(?label, position = %line.position, "classified"),
        }

        let (next, emitted) = step(state, line, label, normalizer);
        state = next;
        if let Some(record) = emitted {
            sink.accept(record);
        }
    }
    if let Some(record) = finish(state) {
        sink.accept(record);
    }

    sink.assembly
}
