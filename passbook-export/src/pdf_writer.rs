//! Paginated PDF table in a monospaced font.
//!
//! Each row is one Courier text line laid out with fixed column widths, so
//! no text measurement is needed. Pages are A4 landscape.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use passbook_core::{Transaction, TransactionBatch};

use crate::{row_cells, ExportError, ExportOptions, COLUMNS};

const PAGE_WIDTH: i64 = 842;
const PAGE_HEIGHT: i64 = 595;
const MARGIN: i64 = 40;
const FONT_SIZE: i64 = 9;
const LINE_HEIGHT: i64 = 12;
pub const ROWS_PER_PAGE: usize = 36;

const DATE_WIDTH: usize = 12;
const DESCRIPTION_WIDTH: usize = 78;
const MONEY_WIDTH: usize = 16;

fn pdf_text(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn table_line(cells: &[String; 4]) -> String {
    format!(
        "{:<dw$}  {:<ew$}  {:>mw$}  {:>mw$}",
        fit(&cells[0], DATE_WIDTH),
        fit(&cells[1], DESCRIPTION_WIDTH),
        fit(&cells[2], MONEY_WIDTH),
        fit(&cells[3], MONEY_WIDTH),
        dw = DATE_WIDTH,
        ew = DESCRIPTION_WIDTH,
        mw = MONEY_WIDTH,
    )
}

fn push_text(ops: &mut Vec<Operation>, font: &str, x: i64, y: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.as_bytes().to_vec()), Object::Integer(FONT_SIZE)],
    ));
    ops.push(Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(pdf_text(text))]));
    ops.push(Operation::new("ET", vec![]));
}

fn push_rule(ops: &mut Vec<Operation>, y: i64) {
    ops.push(Operation::new("m", vec![Object::Integer(MARGIN), Object::Integer(y)]));
    ops.push(Operation::new(
        "l",
        vec![Object::Integer(PAGE_WIDTH - MARGIN), Object::Integer(y)],
    ));
    ops.push(Operation::new("S", vec![]));
}

fn page_content(
    rows: &[&Transaction],
    page_no: usize,
    page_count: usize,
    options: &ExportOptions,
) -> Result<Content, ExportError> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    if let Some(title) = &options.title {
        push_text(&mut ops, "F2", MARGIN, y, title);
        y -= LINE_HEIGHT * 2;
    }

    let header = COLUMNS.map(String::from);
    push_text(&mut ops, "F2", MARGIN, y, &table_line(&header));
    push_rule(&mut ops, y - 4);
    y -= LINE_HEIGHT + 4;

    for txn in rows {
        push_text(&mut ops, "F1", MARGIN, y, &table_line(&row_cells(txn, options)?));
        y -= LINE_HEIGHT;
    }

    let footer = format!("Page {page_no} of {page_count}");
    push_text(&mut ops, "F1", PAGE_WIDTH - MARGIN - 80, MARGIN / 2, &footer);

    Ok(Content { operations: ops })
}

pub fn write_pdf(batch: &TransactionBatch, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let rows: Vec<&Transaction> = batch.iter().collect();
    let chunks: Vec<&[&Transaction]> = rows.chunks(ROWS_PER_PAGE).collect();
    let page_count = chunks.len();

    let mut kids: Vec<Object> = Vec::with_capacity(page_count);
    for (idx, chunk) in chunks.iter().enumerate() {
        let content = page_content(chunk, idx + 1, page_count, options)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
