//! passbook-core: bank statement lines → normalized transactions.
//!
//! Pipeline: `RawLine`s → `Classifier` (per line) → assembler state machine
//! (merges continuations) → `FieldNormalizer` (per field) → `TransactionBatch`.

pub mod assembler;
pub mod classifier;
pub mod error;
pub mod meta;
pub mod normalize;
pub mod pipeline;
pub mod types;

pub use assembler::{assemble, finish, step, AssemblerState, Assembly, PendingRecord};
pub use classifier::{Classifier, NoisePattern, BUILTIN_NOISE};
pub use error::{Field, ParseError, StatementError, StatementResult};
pub use meta::scan_meta;
pub use normalize::{parse_amount, parse_balance, DateOrder, FieldNormalizer};
pub use pipeline::{process, NoiseRule, PipelineConfig};
pub use types::{
    BatchTotals, LineLabel, LinePosition, ProcessingReport, RawLine, SkippedRecord, Statement,
    StatementMeta, Transaction, TransactionBatch,
};
