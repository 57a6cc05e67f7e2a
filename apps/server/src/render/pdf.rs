//! PDF rendering with `lopdf`.
//!
//! Documents are A4 portrait, drawn with the standard Helvetica fonts in
//! WinAnsi encoding, so no font files are embedded.
//!
//! ## Page Layout
//! ```text
//! ┌──────────────────────────────┐
//! │ Title (bold)                 │  heading block, repeated on every page
//! │ Subtitle                     │
//! │ Generated: ...               │
//! │ ──────────────────────────── │
//! │ Col A   Col B   Col C        │  header row (bold), repeated
//! │ ──────────────────────────── │
//! │ ...     ...     ...          │  body rows
//! │ TOTAL: ...                   │  footer lines, last page only
//! │                  Page 1 of 3 │
//! └──────────────────────────────┘
//! ```

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;

use techstore_core::{Money, SaleDetail};

use super::TableReport;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const BOTTOM: f32 = 60.0;
const LINE_HEIGHT: f32 = 14.0;
const BODY_SIZE: f32 = 10.0;
/// Rough average glyph width of Helvetica, as a fraction of the font size.
const AVG_GLYPH: f32 = 0.5;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to encode page content: {0}")]
    Encode(String),

    #[error("Failed to write document: {0}")]
    Write(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone)]
struct TextLine {
    font: Font,
    size: f32,
    text: String,
}

impl TextLine {
    fn new(font: Font, size: f32, text: impl Into<String>) -> Self {
        TextLine {
            font,
            size,
            text: text.into(),
        }
    }
}

/// Everything needed to lay out a paginated table document.
#[derive(Debug, Clone)]
struct Layout {
    heading: Vec<TextLine>,
    headers: Vec<String>,
    /// Relative column widths, one per header.
    weights: Vec<f32>,
    rows: Vec<Vec<String>>,
    footer: Vec<TextLine>,
}

/// Renders a tabular report.
pub fn table_document(report: &TableReport) -> Result<Vec<u8>, PdfError> {
    let mut heading = vec![TextLine::new(Font::Bold, 16.0, report.title.as_str())];
    if let Some(subtitle) = &report.subtitle {
        heading.push(TextLine::new(Font::Regular, 11.0, subtitle.as_str()));
    }
    heading.push(TextLine::new(Font::Regular, 9.0, report.generated_label()));

    let mut footer = Vec::new();
    if report.is_empty() {
        footer.push(TextLine::new(Font::Regular, BODY_SIZE, "No data."));
    }
    if let Some(text) = &report.footer {
        footer.push(TextLine::new(Font::Bold, 11.0, text.as_str()));
    }

    render(Layout {
        heading,
        weights: vec![1.0; report.headers.len()],
        headers: report.headers.clone(),
        rows: report.rows.clone(),
        footer,
    })
}

/// Renders the invoice of one sale.
pub fn invoice_document(detail: &SaleDetail) -> Result<Vec<u8>, PdfError> {
    let sale = &detail.sale;
    let mut heading = vec![
        TextLine::new(Font::Bold, 16.0, "TechStore - Sales Invoice"),
        TextLine::new(
            Font::Regular,
            9.0,
            format!("Generated: {}", Utc::now().format("%Y-%m-%d %H:%M UTC")),
        ),
        TextLine::new(Font::Bold, 11.0, format!("Sale #: {}", sale.id)),
        TextLine::new(
            Font::Regular,
            BODY_SIZE,
            format!("Date: {}", sale.sold_at.format("%Y-%m-%d %H:%M")),
        ),
        TextLine::new(Font::Regular, BODY_SIZE, format!("Type: {}", sale.kind_label())),
        TextLine::new(Font::Regular, BODY_SIZE, format!("Client: {}", detail.client.full_name())),
        TextLine::new(
            Font::Regular,
            BODY_SIZE,
            format!("Document: {}", detail.client.document.as_deref().unwrap_or("-")),
        ),
    ];
    if let Some(credit) = &detail.credit {
        heading.push(TextLine::new(
            Font::Regular,
            BODY_SIZE,
            format!(
                "Credit due: {}  Remaining: {}",
                credit.due_date,
                credit.remaining_balance()
            ),
        ));
    }

    let rows = detail
        .lines
        .iter()
        .map(|line| {
            vec![
                line.product_name.clone(),
                line.quantity.to_string(),
                Money::from_cents(line.unit_price_cents).to_string(),
                Money::from_cents(line.subtotal_cents).to_string(),
            ]
        })
        .collect();

    render(Layout {
        heading,
        headers: ["Product", "Quantity", "Unit price", "Subtotal"]
            .into_iter()
            .map(String::from)
            .collect(),
        weights: vec![4.0, 1.2, 1.8, 1.8],
        rows,
        footer: vec![TextLine::new(Font::Bold, 12.0, format!("TOTAL: {}", sale.total()))],
    })
}

fn render(layout: Layout) -> Result<Vec<u8>, PdfError> {
    let heading_height: f32 = layout.heading.iter().map(|l| l.size + 6.0).sum();
    let table_top = PAGE_HEIGHT - MARGIN - heading_height - 10.0;
    // Header row plus its rules take two lines
    let capacity = (((table_top - BOTTOM) / LINE_HEIGHT).floor() as usize)
        .saturating_sub(2)
        .max(1);

    let footer_lines = layout.footer.len();
    let mut pages: Vec<&[Vec<String>]> = layout.rows.chunks(capacity).collect();
    if pages.is_empty() {
        pages.push(&[]);
    }
    // Footer goes on the last page; open a new one if it doesn't fit
    let last_len = pages.last().map(|p| p.len()).unwrap_or(0);
    if last_len + footer_lines + 1 > capacity {
        pages.push(&[]);
    }

    let columns = column_positions(&layout.weights);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font_dictionary("Helvetica"));
    let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let total_pages = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(total_pages);

    for (index, rows) in pages.iter().enumerate() {
        let mut ops = Vec::new();

        // Heading block
        let mut y = PAGE_HEIGHT - MARGIN;
        for line in &layout.heading {
            y -= line.size;
            text(&mut ops, line.font, line.size, MARGIN, y, &line.text);
            y -= 6.0;
        }

        // Header row
        let mut y = table_top;
        rule(&mut ops, y + LINE_HEIGHT - 2.0);
        for (col, header) in layout.headers.iter().enumerate() {
            let (x, width) = columns[col];
            text(&mut ops, Font::Bold, BODY_SIZE, x, y, &fit(header, width, BODY_SIZE));
        }
        rule(&mut ops, y - 4.0);
        y -= LINE_HEIGHT + 2.0;

        for row in rows.iter() {
            for (col, cell) in row.iter().enumerate().take(columns.len()) {
                let (x, width) = columns[col];
                text(&mut ops, Font::Regular, BODY_SIZE, x, y, &fit(cell, width, BODY_SIZE));
            }
            y -= LINE_HEIGHT;
        }

        if index + 1 == total_pages {
            y -= 4.0;
            for line in &layout.footer {
                text(&mut ops, line.font, line.size, MARGIN, y, &line.text);
                y -= line.size + 6.0;
            }
        }

        let page_label = format!("Page {} of {}", index + 1, total_pages);
        text(&mut ops, Font::Regular, 8.0, PAGE_WIDTH - MARGIN - 60.0, BOTTOM - 25.0, &page_label);

        let content = Content { operations: ops };
        let encoded = content.encode().map_err(|e| PdfError::Encode(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => total_pages as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(|e| PdfError::Write(e.to_string()))?;
    Ok(buffer)
}

fn font_dictionary(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// `(x, width)` of each column across the printable width.
fn column_positions(weights: &[f32]) -> Vec<(f32, f32)> {
    let total: f32 = weights.iter().sum();
    let usable = PAGE_WIDTH - 2.0 * MARGIN;

    let mut x = MARGIN;
    weights
        .iter()
        .map(|w| {
            let width = if total > 0.0 { usable * w / total } else { 0.0 };
            let column = (x, width);
            x += width;
            column
        })
        .collect()
}

/// Shortens `text` so it fits `width` points at `size`.
fn fit(text: &str, width: f32, size: f32) -> String {
    let max_chars = ((width - 4.0) / (size * AVG_GLYPH)).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3).max(1);
    let mut short: String = text.chars().take(keep).collect();
    short.push_str("...");
    short
}

fn text(ops: &mut Vec<Operation>, font: Font, size: f32, x: f32, y: f32, value: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.resource().into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(win_ansi(value), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn rule(ops: &mut Vec<Operation>, y: f32) {
    ops.push(Operation::new("w", vec![0.5_f32.into()]));
    ops.push(Operation::new("m", vec![MARGIN.into(), y.into()]));
    ops.push(Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), y.into()]));
    ops.push(Operation::new("S", vec![]));
}

/// Encodes text for the WinAnsi (cp1252) font encoding. Characters outside
/// it become `?`.
fn win_ansi(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|ch| match ch {
            '\u{20AC}' => 0x80,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            c if (c as u32) < 0x80 || ((c as u32) >= 0xA0 && (c as u32) <= 0xFF) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use techstore_core::{Client, Credit, CreditStatus, Sale, SaleLineDetail};

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_table_document_is_a_pdf() {
        let mut report = TableReport::new("Daily Sales Summary", ["Day", "Sales", "Total"]).footer("TOTAL: $0.00");
        report.push_row(vec!["2024-03-01".into(), "2".into(), "$10.00".into()]);

        let bytes = table_document(&report).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_long_tables_paginate() {
        let mut report = TableReport::new("Session Log", ["#", "User"]);
        for i in 0..200 {
            report.push_row(vec![i.to_string(), format!("user{i}")]);
        }

        let bytes = table_document(&report).unwrap();
        assert!(page_count(&bytes) >= 4);
    }

    #[test]
    fn test_empty_table_still_renders() {
        let report = TableReport::new("Outstanding Credits", ["Credit"]);
        let bytes = table_document(&report).unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_invoice_document() {
        let detail = SaleDetail {
            sale: Sale {
                id: 12,
                sold_at: Utc::now(),
                user_id: 1,
                client_id: 1,
                total_cents: 2_500,
                is_credit: true,
            },
            client: Client {
                id: 1,
                first_name: "José".into(),
                last_name: "Núñez".into(),
                document: Some("0912345678".into()),
                phone: None,
                address: None,
                email: None,
            },
            lines: vec![SaleLineDetail {
                id: 1,
                product_id: 3,
                product_name: "USB-C Cable 1m".into(),
                quantity: 5,
                unit_price_cents: 500,
                subtotal_cents: 2_500,
            }],
            credit: Some(Credit {
                id: 4,
                sale_id: 12,
                total_balance_cents: 2_500,
                remaining_balance_cents: 2_500,
                due_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                status: CreditStatus::Current,
            }),
        };

        let bytes = invoice_document(&detail).unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_fit_and_encoding() {
        assert_eq!(fit("short", 100.0, 10.0), "short");
        let long = fit(&"x".repeat(100), 60.0, 10.0);
        assert!(long.ends_with("..."));
        assert!(long.chars().count() <= 11);

        assert_eq!(win_ansi("Ñ€x"), vec![0xD1, 0x80, b'x']);
        assert_eq!(win_ansi("日"), vec![b'?']);
    }
}
