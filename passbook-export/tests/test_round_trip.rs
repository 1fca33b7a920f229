use std::io::Cursor;
use std::str::FromStr;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::NaiveDate;
use passbook_core::{process, PipelineConfig, RawLine, TransactionBatch};
use passbook_export::{render, ExportFormat, ExportOptions, COLUMNS};
use rust_decimal::Decimal;

fn sample_batch() -> TransactionBatch {
    let lines = RawLine::from_strs(&[
        "STATEMENT OF ACCOUNT FOR JOHN DOE",
        "01/02/2023 GROCERY STORE PURCHASE -45.20 1000.00",
        "03/02/2023 SALARY ACME, INC 2,500.00 3,500.00",
        "04/02/2023 COFFEE -3.50",
        "02/02/2023 LATE POSTED REFUND 10.00 3,510.00",
        "Page 1 of 1",
    ]);
    process(&lines, "feb.pdf", &PipelineConfig::default())
        .unwrap()
        .batch
}

#[test]
fn test_csv_round_trip() {
    let batch = sample_batch();
    let options = ExportOptions::default();
    let bytes = render(&batch, ExportFormat::Csv, &options).unwrap();

    let mut rdr = csv::Reader::from_reader(bytes.as_slice());
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, COLUMNS.map(String::from).to_vec());

    let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), batch.len());
    for (record, txn) in records.iter().zip(batch.iter()) {
        let date = NaiveDate::parse_from_str(&record[0], &options.date_format).unwrap();
        assert_eq!(date, txn.date);
        assert_eq!(&record[1], txn.description);
        assert_eq!(Decimal::from_str(&record[2]).unwrap(), txn.amount);
        let balance = if record[3].is_empty() {
            None
        } else {
            Some(Decimal::from_str(&record[3]).unwrap())
        };
        assert_eq!(balance, txn.balance);
    }
}

#[test]
fn test_csv_custom_date_format() {
    let batch = sample_batch();
    let options = ExportOptions {
        date_format: "%Y-%m-%d".into(),
        ..Default::default()
    };
    let bytes = render(&batch, ExportFormat::Csv, &options).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.lines().nth(1).unwrap().starts_with("2023-02-01,"));
}

#[test]
fn test_xlsx_round_trip() {
    let batch = sample_batch();
    let options = ExportOptions::default();
    let bytes = render(&batch, ExportFormat::Xlsx, &options).unwrap();

    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range("Transactions").unwrap();
    let rows: Vec<&[Data]> = range.rows().collect();
    assert_eq!(rows.len(), batch.len() + 1);

    let header: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
    assert_eq!(header, COLUMNS.map(String::from).to_vec());

    for (row, txn) in rows[1..].iter().zip(batch.iter()) {
        assert_eq!(row[0], Data::String(txn.date.format("%d/%m/%Y").to_string()));
        assert_eq!(row[1], Data::String(txn.description.clone()));
        match &row[2] {
            Data::Float(f) => assert_eq!(format!("{f:.2}"), txn.amount.to_string()),
            other => panic!("amount cell should be numeric, got {other:?}"),
        }
        match (row.get(3), txn.balance) {
            (Some(Data::Float(f)), Some(b)) => assert_eq!(format!("{f:.2}"), b.to_string()),
            (None | Some(Data::Empty), None) => {}
            (cell, balance) => panic!("balance mismatch: {cell:?} vs {balance:?}"),
        }
    }
}

#[test]
fn test_pdf_contains_rows_in_order() {
    let batch = sample_batch();
    let options = ExportOptions {
        title: Some("feb.pdf".into()),
        ..Default::default()
    };
    let bytes = render(&batch, ExportFormat::Pdf, &options).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.5"));

    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    let text = String::from_utf8_lossy(&bytes);
    let positions: Vec<usize> = batch
        .iter()
        .map(|t| text.find(t.description.as_str()).expect("description rendered"))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "rows must follow batch order");
    assert!(text.contains("Page 1 of 1"));
}

#[test]
fn test_pdf_paginates_long_batches() {
    let lines: Vec<RawLine> = (0..80)
        .map(|i| RawLine::new(format!("01/02/2023 ITEM{i:03} -1.00"), 1, i))
        .collect();
    let batch = process(&lines, "long.pdf", &PipelineConfig::default())
        .unwrap()
        .batch;
    assert_eq!(batch.len(), 80);

    let bytes = render(&batch, ExportFormat::Pdf, &ExportOptions::default()).unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    let expected_pages = 80usize.div_ceil(passbook_export::pdf_writer::ROWS_PER_PAGE);
    assert_eq!(doc.get_pages().len(), expected_pages);

    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains(&format!("Page {expected_pages} of {expected_pages}")));
}
