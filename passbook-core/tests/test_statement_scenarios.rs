use chrono::NaiveDate;
use passbook_core::{
    process, step, AssemblerState, Classifier, FieldNormalizer, LineLabel, PipelineConfig,
    RawLine, StatementError,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn run(lines: &[&str]) -> Result<passbook_core::Statement, StatementError> {
    process(&RawLine::from_strs(lines), "statement.pdf", &PipelineConfig::default())
}

#[test]
fn test_header_and_footer_are_filtered() {
    let st = run(&[
        "STATEMENT OF ACCOUNT FOR JOHN DOE",
        "01/02/2023 GROCERY STORE PURCHASE -45.20 1000.00",
        "Page 1 of 3",
    ])
    .unwrap();

    assert_eq!(st.batch.len(), 1);
    let t = &st.batch.as_slice()[0];
    assert_eq!(t.date, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
    assert_eq!(t.description, "GROCERY STORE PURCHASE");
    assert_eq!(t.amount, dec("-45.20"));
    assert_eq!(t.balance, Some(dec("1000.00")));
}

#[test]
fn test_wrapped_description_is_merged() {
    let lines = RawLine::from_strs(&["01/02/2023 GROCERY STORE", "PURCHASE #4471 -45.20 1000.00"]);
    assert_eq!(
        Classifier::default().label_all(&lines),
        vec![LineLabel::Transaction, LineLabel::Continuation]
    );

    let st = run(&["01/02/2023 GROCERY STORE", "PURCHASE #4471 -45.20 1000.00"]).unwrap();
    assert_eq!(st.batch.len(), 1);
    let t = &st.batch.as_slice()[0];
    assert_eq!(t.description, "GROCERY STORE PURCHASE #4471");
    assert_eq!(t.amount, dec("-45.20"));
    assert_eq!(t.balance, Some(dec("1000.00")));
}

#[test]
fn test_only_noise_is_empty_result() {
    let err = run(&["STATEMENT OF ACCOUNT", "Printed On 01/03/2023", "Page 1 of 1", "   "]).unwrap_err();
    assert!(matches!(err, StatementError::EmptyResult { skipped: 0 }));
}

#[test]
fn test_unparseable_date_is_dropped_but_neighbours_kept() {
    let st = run(&[
        "01/02/2023 COFFEE -3.50 996.50",
        "XX/YY/ZZZZ SHOP -10.00",
        "03/02/2023 SALARY 2,000.00 2,996.50",
    ])
    .unwrap();

    let descriptions: Vec<_> = st.batch.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(descriptions, vec!["COFFEE", "SALARY"]);
    assert_eq!(st.report.skipped.len(), 1);
    assert_eq!(st.report.skipped[0].error.field, passbook_core::Field::Date);
    assert_eq!(st.report.skipped[0].position.row, 1);
}

#[test]
fn test_bad_record_keeps_its_continuations() {
    // the continuation belongs to the dropped record, not to COFFEE
    let st = run(&[
        "01/02/2023 COFFEE -3.50",
        "XX/YY/ZZZZ SHOP -10.00",
        "BRANCH 12",
    ])
    .unwrap();
    assert_eq!(st.batch.as_slice()[0].description, "COFFEE");
}

#[test]
fn test_document_order_is_preserved() {
    let st = run(&[
        "05/02/2023 LATER -1.00",
        "01/02/2023 EARLIER -2.00",
        "03/02/2023 MIDDLE -3.00",
    ])
    .unwrap();
    let descriptions: Vec<_> = st.batch.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(descriptions, vec!["LATER", "EARLIER", "MIDDLE"]);
}

#[test]
fn test_noise_between_continuations_is_ignored() {
    let st = run(&[
        "01/02/2023 INTERNATIONAL WIRE",
        "Page 1 of 2",
        "STATEMENT OF ACCOUNT",
        "TRANSFER FEE -25.00 975.00",
    ])
    .unwrap();
    assert_eq!(st.batch.len(), 1);
    assert_eq!(st.batch.as_slice()[0].description, "INTERNATIONAL WIRE TRANSFER FEE");
}

#[test]
fn test_one_record_per_transaction_line() {
    // a transaction followed by k continuations emits exactly one record
    let n = FieldNormalizer::default();
    for k in 0..4 {
        let mut lines = vec![RawLine::new("01/02/2023 START", 1, 0)];
        for i in 0..k {
            lines.push(RawLine::new(format!("PART{i}"), 1, i + 1));
        }
        lines.push(RawLine::new("END -1.00", 1, k + 1));
        lines.push(RawLine::new("02/02/2023 NEXT -2.00", 1, k + 2));

        let classifier = Classifier::default();
        let mut state = AssemblerState::Idle;
        let mut emitted = Vec::new();
        for line in &lines {
            let (next, out) = step(state, line, classifier.classify(line), &n);
            state = next;
            emitted.extend(out);
        }

        assert_eq!(emitted.len(), 1, "k = {k}");
        let mut expected = vec!["START".to_string()];
        expected.extend((0..k).map(|i| format!("PART{i}")));
        expected.push("END".to_string());
        assert_eq!(emitted[0].description(), expected.join(" "));
    }
}

#[test]
fn test_debit_credit_suffixes() {
    let st = run(&[
        "01-Feb-2023 ATM WITHDRAWAL 500.00 Dr 2,500.00 Cr",
        "02-Feb-2023 NEFT CREDIT 1,000.00 Cr 3,500.00 Cr",
    ])
    .unwrap();
    let amounts: Vec<_> = st.batch.iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![dec("-500.00"), dec("1000.00")]);
    assert_eq!(st.batch.as_slice()[1].balance, Some(dec("3500.00")));
}

#[test]
fn test_slash_narration_stays_with_its_record() {
    let st = run(&[
        "01/02/2023 CASH",
        "TO/ATM/CASH WITHDRAWAL MG ROAD",
        "BRANCH -500.00 1000.00",
    ])
    .unwrap();

    assert_eq!(st.batch.len(), 1);
    assert!(st.report.skipped.is_empty());
    let t = &st.batch.as_slice()[0];
    assert_eq!(t.description, "CASH TO/ATM/CASH WITHDRAWAL MG ROAD BRANCH");
    assert_eq!(t.amount, dec("-500.00"));
    assert_eq!(t.balance, Some(dec("1000.00")));
}

#[test]
fn test_sept_dates_and_spaced_currency() {
    let st = run(&["Sept 1, 2023 RENT $ 1,200.00 $ 3,800.00", "01/09/2023 COFFEE -3.50"]).unwrap();

    assert_eq!(st.batch.len(), 2);
    assert!(st.report.skipped.is_empty());
    let rent = &st.batch.as_slice()[0];
    assert_eq!(rent.date, NaiveDate::from_ymd_opt(2023, 9, 1).unwrap());
    assert_eq!(rent.description, "RENT");
    assert_eq!(rent.amount, dec("1200.00"));
    assert_eq!(rent.balance, Some(dec("3800.00")));
}
