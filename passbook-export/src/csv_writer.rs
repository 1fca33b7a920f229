use passbook_core::TransactionBatch;

use crate::{row_cells, ExportError, ExportOptions, COLUMNS};

/// Header row plus one record per transaction.
pub fn write_csv(batch: &TransactionBatch, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(COLUMNS)?;
    for txn in batch {
        wtr.write_record(row_cells(txn, options)?)?;
    }
    wtr.flush()?;
    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use passbook_core::{LinePosition, Transaction};
    use rust_decimal::Decimal;

    #[test]
    fn test_descriptions_with_commas_are_quoted() {
        let batch = TransactionBatch::new(vec![Transaction {
            date: NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
            description: "SHOP, \"MAIN\" ST".into(),
            amount: Decimal::new(-100, 2),
            balance: Some(Decimal::new(99900, 2)),
            position: LinePosition::default(),
        }]);
        let out = String::from_utf8(write_csv(&batch, &ExportOptions::default()).unwrap()).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("Date,Description,Amount,Balance"));
        assert_eq!(lines.next(), Some(r#"01/02/2023,"SHOP, ""MAIN"" ST",-1.00,999.00"#));
    }
}
