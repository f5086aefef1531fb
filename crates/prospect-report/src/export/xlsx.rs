use prospect_core::Prospect;
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};

use super::{map_columns, ExportMetadata, MapColumn, SHEET_COLUMNS};
use crate::error::ExportError;

const ROWS_SHEET: &str = "Prospects";
const META_SHEET: &str = "Search";

/// Excel rejects longer cell strings.
const MAX_CELL_CHARS: usize = 32_767;

/// Two sheets: the rows (sheet columns, then one column per tag, payment
/// method and extras key) and
/// the search metadata.
pub(super) fn render(
    rows: &[&Prospect],
    metadata: &ExportMetadata,
) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    write_rows_sheet(workbook.add_worksheet(), rows, &bold)?;
    write_metadata_sheet(workbook.add_worksheet(), metadata, &bold)?;

    Ok(workbook.save_to_buffer()?)
}

fn write_rows_sheet(
    sheet: &mut Worksheet,
    rows: &[&Prospect],
    bold: &Format,
) -> Result<(), ExportError> {
    sheet.set_name(ROWS_SHEET)?;
    let dynamic = map_columns(rows);

    let headers = SHEET_COLUMNS
        .iter()
        .map(|c| c.header().to_owned())
        .chain(dynamic.iter().map(MapColumn::header));
    for (col, header) in (0..).zip(headers) {
        sheet.write_string_with_format(0, col, header, bold)?;
    }

    for (row, p) in (1..).zip(rows) {
        let mut col: ColNum = 0;
        for column in SHEET_COLUMNS {
            match column.number(p) {
                Some(n) => {
                    sheet.write_number(row, col, n)?;
                }
                None => write_text(sheet, row, col, &column.text(p))?,
            }
            col += 1;
        }
        for column in &dynamic {
            if let Some(value) = column.value(p) {
                write_text(sheet, row, col, value)?;
            }
            col += 1;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.set_column_width(0, 30)?;
    sheet.set_column_width(1, 40)?;
    Ok(())
}

fn write_metadata_sheet(
    sheet: &mut Worksheet,
    metadata: &ExportMetadata,
    bold: &Format,
) -> Result<(), ExportError> {
    sheet.set_name(META_SHEET)?;
    for (row, (label, value)) in (0..).zip(metadata.lines()) {
        sheet.write_string_with_format(row, 0, label, bold)?;
        write_text(sheet, row, 1, &value)?;
    }
    sheet.set_column_width(0, 14)?;
    sheet.set_column_width(1, 60)?;
    Ok(())
}

fn write_text(
    sheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    text: &str,
) -> Result<(), ExportError> {
    if text.is_empty() {
        return Ok(());
    }
    if text.chars().count() > MAX_CELL_CHARS {
        let truncated: String = text.chars().take(MAX_CELL_CHARS).collect();
        sheet.write_string(row, col, truncated)?;
    } else {
        sheet.write_string(row, col, text)?;
    }
    Ok(())
}
