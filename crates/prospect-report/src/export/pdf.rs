//! Paginated PDF table.
//!
//! Rows are laid out as fixed-width lines in the built-in Courier font, so
//! no font needs embedding and column alignment follows from the character
//! count. Cells longer than their column are cut and end with `…`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use prospect_core::Prospect;

use super::{Column, ExportMetadata, COLUMNS};
use crate::error::ExportError;

const TITLE: &str = "Prospect search results";

// A4 landscape, in points.
const PAGE_WIDTH: i64 = 842;
const PAGE_HEIGHT: i64 = 595;
const MARGIN: i64 = 28;

const TITLE_SIZE: i64 = 14;
const META_SIZE: i64 = 8;
const META_LINE: i64 = 10;
const BODY_SIZE: i64 = 6;
const LINE_HEIGHT: i64 = 8;

/// Courier advances 0.6 em per glyph: 4.8 pt at 8 pt.
const META_MAX_CHARS: usize = 160;

/// Width of each table column in characters.
fn width(column: Column) -> usize {
    match column {
        Column::Name | Column::Emails => 20,
        Column::Address => 26,
        Column::City | Column::Category | Column::WhatsApp => 12,
        Column::Postcode => 8,
        Column::Website => 18,
        Column::Phones => 14,
        Column::ContactCount => 2,
        Column::DistanceKm => 6,
        Column::Hours | Column::Source => 16,
        Column::Brand | Column::Operator => 10,
        // Spreadsheet-only columns.
        Column::Cuisine
        | Column::Stars
        | Column::CategoryKind
        | Column::Latitude
        | Column::Longitude
        | Column::Id => 0,
    }
}

fn label(column: Column) -> &'static str {
    match column {
        Column::ContactCount => "#",
        Column::DistanceKm => "km",
        Column::Hours => "Hours",
        other => other.header(),
    }
}

struct TextLine {
    size: i64,
    y: i64,
    text: String,
}

pub(super) fn render(
    rows: &[&Prospect],
    metadata: &ExportMetadata,
) -> Result<Vec<u8>, ExportError> {
    let pages = paginate(rows, metadata);
    let total = pages.len();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::with_capacity(total);
    for (index, lines) in pages.iter().enumerate() {
        let content = page_content(lines, index + 1, total);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(win_ansi(TITLE), StringFormat::Literal),
        "Producer" => Object::String(b"prospect".to_vec(), StringFormat::Literal),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn page_content(lines: &[TextLine], page: usize, total: usize) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5 + 5);
    let footer = TextLine {
        size: BODY_SIZE,
        y: MARGIN - LINE_HEIGHT,
        text: format!("Page {page} / {total}"),
    };
    for line in lines.iter().chain(std::iter::once(&footer)) {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec!["F1".into(), Object::Integer(line.size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(MARGIN), Object::Integer(line.y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(&line.text), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Lays the title, metadata and table out over as many pages as needed.
/// Always returns at least one page; the header row repeats on every page.
fn paginate(rows: &[&Prospect], metadata: &ExportMetadata) -> Vec<Vec<TextLine>> {
    let header = table_line(COLUMNS.iter().map(|c| label(*c).to_owned()));
    let rule = "-".repeat(header.chars().count());
    let bottom = MARGIN;

    let mut body = rows
        .iter()
        .map(|p| table_line(COLUMNS.iter().map(|c| c.text(p))))
        .peekable();
    let mut pages = Vec::new();

    loop {
        let mut page = Vec::new();
        let mut y = PAGE_HEIGHT - MARGIN;

        if pages.is_empty() {
            y -= TITLE_SIZE;
            page.push(TextLine {
                size: TITLE_SIZE,
                y,
                text: TITLE.to_owned(),
            });
            y -= 6;
            for (name, value) in metadata.lines() {
                y -= META_LINE;
                page.push(TextLine {
                    size: META_SIZE,
                    y,
                    text: fit(&format!("{name}: {value}"), META_MAX_CHARS)
                        .trim_end()
                        .to_owned(),
                });
            }
            y -= META_LINE;
        }

        for text in [header.clone(), rule.clone()] {
            y -= LINE_HEIGHT;
            page.push(TextLine {
                size: BODY_SIZE,
                y,
                text,
            });
        }

        while y - LINE_HEIGHT >= bottom {
            let Some(text) = body.next() else {
                break;
            };
            y -= LINE_HEIGHT;
            page.push(TextLine {
                size: BODY_SIZE,
                y,
                text,
            });
        }

        pages.push(page);
        if body.peek().is_none() {
            break;
        }
    }
    pages
}

fn table_line(cells: impl Iterator<Item = String>) -> String {
    COLUMNS
        .iter()
        .zip(cells)
        .map(|(column, cell)| fit(&cell, width(*column)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pads or truncates `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let clean: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let len = clean.chars().count();
    if len > width {
        let mut cut: String = clean.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        let mut padded = clean;
        padded.extend(std::iter::repeat_n(' ', width - len));
        padded
    }
}

/// Encodes text for the standard `WinAnsiEncoding` (Windows-1252).
/// Characters outside it become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            'Š' => 0x8A,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            'š' => 0x9A,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            c => match u8::try_from(u32::from(c)) {
                Ok(b) if !(0x80..0xA0).contains(&b) => b,
                _ => b'?',
            },
        })
        .collect()
}
