use csv::Writer;
use prospect_core::Prospect;

use super::{map_columns, SHEET_COLUMNS};
use crate::error::ExportError;

/// Header row, then one record per prospect: sheet columns, then tag,
/// payment and extras columns.
pub(super) fn render(rows: &[&Prospect]) -> Result<Vec<u8>, ExportError> {
    let dynamic = map_columns(rows);
    let mut writer = Writer::from_writer(Vec::new());

    let header = SHEET_COLUMNS
        .iter()
        .map(|c| c.header().to_owned())
        .chain(dynamic.iter().map(super::MapColumn::header));
    writer.write_record(header)?;

    for p in rows {
        let record = SHEET_COLUMNS.iter().map(|c| c.text(p)).chain(
            dynamic
                .iter()
                .map(|column| column.value(p).unwrap_or_default().to_owned()),
        );
        writer.write_record(record)?;
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}
