use std::fmt;

use thiserror::Error;

/// Which field of a transaction failed to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Amount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Date => f.write_str("date"),
            Field::Amount => f.write_str("amount"),
        }
    }
}

/// A single field could not be normalized. Non-fatal: the record carrying it
/// is dropped and the rest of the batch proceeds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not parse {field} from {raw:?}")]
pub struct ParseError {
    pub field: Field,
    pub raw: String,
}

impl ParseError {
    pub fn date(raw: impl Into<String>) -> Self {
        Self {
            field: Field::Date,
            raw: raw.into(),
        }
    }

    pub fn amount(raw: impl Into<String>) -> Self {
        Self {
            field: Field::Amount,
            raw: raw.into(),
        }
    }
}

/// Run-level failures. Any of these aborts the run before export.
#[derive(Error, Debug)]
pub enum StatementError {
    #[error("could not read statement: {message}")]
    Extraction { message: String },

    #[error("no transactions found ({skipped} lines skipped)")]
    EmptyResult { skipped: usize },

    #[error("invalid noise pattern {name:?}: {message}")]
    Config { name: String, message: String },
}

impl StatementError {
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }
}

pub type StatementResult<T> = std::result::Result<T, StatementError>;
