use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assembler::assemble;
use crate::classifier::Classifier;
use crate::error::{StatementError, StatementResult};
use crate::meta::scan_meta;
use crate::normalize::{DateOrder, FieldNormalizer};
use crate::types::{RawLine, Statement};

/// A user-supplied noise pattern, appended after the built-in table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseRule {
    pub name: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub date_order: DateOrder,
    pub extra_noise: Vec<NoiseRule>,
}

impl PipelineConfig {
    pub fn classifier(&self) -> StatementResult<Classifier> {
        let extra: Vec<(&str, &str)> = self
            .extra_noise
            .iter()
            .map(|r| (r.name.as_str(), r.pattern.as_str()))
            .collect();
        Classifier::with_extra_patterns(&extra)
    }

    pub fn normalizer(&self) -> FieldNormalizer {
        FieldNormalizer::new(self.date_order)
    }
}

/// Turn the extracted lines of one document into a statement.
///
/// Fails with `EmptyResult` when nothing survives filtering; per-record parse
/// failures only show up in the report.
pub fn process(lines: &[RawLine], source_name: &str, config: &PipelineConfig) -> StatementResult<Statement> {
    let classifier = config.classifier()?;
    let normalizer = config.normalizer();

    let meta = scan_meta(lines, source_name, &normalizer);
    let assembly = assemble(lines, &classifier, &normalizer);
    let mut report = assembly.report;
    let batch = assembly.batch;

    if batch.is_empty() {
        return Err(StatementError::EmptyResult {
            skipped: report.skipped.len(),
        });
    }

    let summary = format!(
        "extracted {} transactions from {} ({} lines, {} noise, {} skipped)",
        batch.len(),
        source_name,
        report.lines_seen,
        report.noise_lines + report.orphan_continuations,
        report.skipped.len()
    );
    info!(
        source = source_name,
        transactions = batch.len(),
        skipped = report.skipped.len(),
        "statement processed"
    );
    report.log(summary);

    Ok(Statement {
        meta,
        batch,
        report,
    })
}
