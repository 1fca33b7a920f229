//! passbook-export: render a `TransactionBatch` as CSV, XLSX or PDF.
//!
//! All three formats share one column layout (`COLUMNS`) and one cell
//! formatting routine, so rows look the same whichever file is downloaded.

pub mod csv_writer;
pub mod pdf_writer;
pub mod xlsx_writer;

use std::fmt::{self, Write as _};
use std::path::Path;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use passbook_core::{Transaction, TransactionBatch};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const COLUMNS: [&str; 4] = ["Date", "Description", "Amount", "Balance"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("PDF export failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("date format {0:?} cannot render a calendar date")]
    DateFormat(String),

    #[error("no transactions to export")]
    EmptyBatch,

    #[error("unknown export format {0:?} (expected csv, xlsx or pdf)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Pdf];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// chrono format string for the Date column
    pub date_format: String,
    /// Heading printed at the top of PDF pages
    pub title: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            date_format: "%d/%m/%Y".to_string(),
            title: None,
        }
    }
}

impl ExportOptions {
    /// Render `date` with `date_format`. Specifiers chrono rejects, or that
    /// need a time or zone (`%H`, `%z`), are an error rather than a panic.
    pub fn format_date(&self, date: NaiveDate) -> Result<String, ExportError> {
        let items = StrftimeItems::new(&self.date_format);
        if items.clone().any(|item| matches!(item, Item::Error)) {
            return Err(ExportError::DateFormat(self.date_format.clone()));
        }
        let mut out = String::new();
        write!(out, "{}", date.format_with_items(items))
            .map_err(|_| ExportError::DateFormat(self.date_format.clone()))?;
        Ok(out)
    }

    /// Check the date format once, before any rows are rendered.
    pub fn validate(&self) -> Result<(), ExportError> {
        let probe = NaiveDate::from_ymd_opt(2000, 1, 31).unwrap_or_default();
        self.format_date(probe).map(|_| ())
    }
}

/// The four display cells of one row, in `COLUMNS` order.
pub fn row_cells(txn: &Transaction, options: &ExportOptions) -> Result<[String; 4], ExportError> {
    Ok([
        options.format_date(txn.date)?,
        txn.description.clone(),
        txn.amount.to_string(),
        txn.balance.map(|b| b.to_string()).unwrap_or_default(),
    ])
}

/// Render the batch in the requested format.
pub fn render(batch: &TransactionBatch, format: ExportFormat, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    if batch.is_empty() {
        return Err(ExportError::EmptyBatch);
    }
    options.validate()?;
    let bytes = match format {
        ExportFormat::Csv => csv_writer::write_csv(batch, options)?,
        ExportFormat::Xlsx => xlsx_writer::write_xlsx(batch, options)?,
        ExportFormat::Pdf => pdf_writer::write_pdf(batch, options)?,
    };
    info!(%format, rows = batch.len(), bytes = bytes.len(), "batch exported");
    Ok(bytes)
}

/// Export file name: the uploaded file's name with the extension swapped.
pub fn output_file_name(source_name: &str, format: ExportFormat) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "transactions".to_string());
    format!("{stem}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use passbook_core::LinePosition;
    use rust_decimal::Decimal;

    #[test]
    fn test_output_file_name_swaps_extension() {
        assert_eq!(output_file_name("March Statement.pdf", ExportFormat::Csv), "March Statement.csv");
        assert_eq!(output_file_name("/tmp/stmt.PDF", ExportFormat::Xlsx), "stmt.xlsx");
        assert_eq!(output_file_name("dump.txt", ExportFormat::Pdf), "dump.pdf");
        assert_eq!(output_file_name("", ExportFormat::Csv), "transactions.csv");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!(matches!("doc".parse::<ExportFormat>(), Err(ExportError::UnknownFormat(_))));
    }

    #[test]
    fn test_row_cells_formatting() {
        let txn = Transaction {
            date: NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
            description: "GROCERY".into(),
            amount: Decimal::new(-4520, 2),
            balance: None,
            position: LinePosition::default(),
        };
        let cells = row_cells(&txn, &ExportOptions::default()).unwrap();
        assert_eq!(cells, ["01/02/2023", "GROCERY", "-45.20", ""].map(String::from));
    }

    #[test]
    fn test_unrenderable_date_format_is_an_error() {
        let batch = TransactionBatch::new(vec![Transaction {
            date: NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
            description: "GROCERY".into(),
            amount: Decimal::new(-4520, 2),
            balance: None,
            position: LinePosition::default(),
        }]);
        for bad in ["%H:%M", "%d/%Q/%Y", "%z"] {
            let options = ExportOptions {
                date_format: bad.into(),
                ..Default::default()
            };
            assert!(matches!(options.validate(), Err(ExportError::DateFormat(_))), "{bad}");
            for format in ExportFormat::ALL {
                let err = render(&batch, format, &options).unwrap_err();
                assert!(matches!(err, ExportError::DateFormat(ref f) if f == bad));
            }
        }
        let iso = ExportOptions {
            date_format: "%Y-%m-%d".into(),
            ..Default::default()
        };
        assert_eq!(iso.format_date(batch.as_slice()[0].date).unwrap(), "2023-02-01");
    }

    #[test]
    fn test_empty_batch_is_not_exported() {
        for format in ExportFormat::ALL {
            let err = render(&TransactionBatch::default(), format, &ExportOptions::default()).unwrap_err();
            assert!(matches!(err, ExportError::EmptyBatch));
        }
    }
}
