use passbook_core::TransactionBatch;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook};

use crate::{ExportError, ExportOptions, COLUMNS};

pub const SHEET_NAME: &str = "Transactions";

/// Amounts and balances are written as numbers so spreadsheet formulas work
/// on them; dates are written as display strings.
pub fn write_xlsx(batch: &TransactionBatch, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (idx, txn) in batch.iter().enumerate() {
        let row = (idx + 1) as u32;
        sheet.write_string(row, 0, options.format_date(txn.date)?)?;
        sheet.write_string(row, 1, txn.description.as_str())?;
        sheet.write_number_with_format(row, 2, txn.amount.to_f64().unwrap_or_default(), &money)?;
        if let Some(balance) = txn.balance {
            sheet.write_number_with_format(row, 3, balance.to_f64().unwrap_or_default(), &money)?;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(1, 48)?;
    sheet.set_column_width(2, 14)?;
    sheet.set_column_width(3, 14)?;

    Ok(workbook.save_to_buffer()?)
}
