//! Export of the visible rows to xlsx, pdf or csv.
//!
//! The pdf table uses the fixed column set ([`COLUMNS`]). The spreadsheet
//! and csv exports use [`SHEET_COLUMNS`] and then one column per upstream
//! tag (`tag:<key>`), payment method (`payment:<key>`) and `extras` key, so
//! every upstream field still reaches the file.

mod delimited;
mod pdf;
mod xlsx;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use prospect_core::{CoverageStats, Prospect};

use crate::error::ExportError;

/// Separator between list items (emails, phones) inside one cell.
pub const LIST_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Pdf,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
            Self::Csv => "csv",
        }
    }

    /// Guesses the format from a file name's extension.
    #[must_use]
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "pdf" => Ok(Self::Pdf),
            "csv" => Ok(Self::Csv),
            _ => Err(ExportError::UnknownFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Search context written alongside the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    pub query_summary: String,
    pub result_count: usize,
    pub elapsed_secs: Option<f64>,
    pub enriched_count: Option<u64>,
    pub exported_at: DateTime<Utc>,
    pub coverage: Option<CoverageStats>,
}

impl ExportMetadata {
    /// Label/value pairs in display order.
    pub(crate) fn lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("Query", self.query_summary.clone()),
            ("Results", self.result_count.to_string()),
            (
                "Elapsed",
                self.elapsed_secs
                    .map_or_else(|| "-".to_owned(), |s| format!("{s:.1} s")),
            ),
            (
                "Enriched",
                self.enriched_count
                    .map_or_else(|| "-".to_owned(), |n| n.to_string()),
            ),
            (
                "Exported at",
                self.exported_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ),
        ];
        if let Some(coverage) = &self.coverage {
            let p = &coverage.percents;
            lines.push((
                "Coverage",
                format!(
                    "website {:.1}%, email {:.1}%, phone {:.1}%, whatsapp {:.1}%, contactable {:.1}%",
                    p.has_site, p.has_email, p.has_phone, p.has_whatsapp, p.contactable
                ),
            ));
        }
        lines
    }
}

/// One exported column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Column {
    Name,
    Address,
    City,
    Postcode,
    Category,
    Website,
    Emails,
    Phones,
    WhatsApp,
    ContactCount,
    DistanceKm,
    Hours,
    Brand,
    Operator,
    Source,
    Cuisine,
    Stars,
    CategoryKind,
    Latitude,
    Longitude,
    Id,
}

pub(crate) const COLUMNS: [Column; 15] = [
    Column::Name,
    Column::Address,
    Column::City,
    Column::Postcode,
    Column::Category,
    Column::Website,
    Column::Emails,
    Column::Phones,
    Column::WhatsApp,
    Column::ContactCount,
    Column::DistanceKm,
    Column::Hours,
    Column::Brand,
    Column::Operator,
    Column::Source,
];

pub(crate) const SHEET_COLUMNS: [Column; 21] = [
    Column::Name,
    Column::Address,
    Column::City,
    Column::Postcode,
    Column::Category,
    Column::Website,
    Column::Emails,
    Column::Phones,
    Column::WhatsApp,
    Column::ContactCount,
    Column::DistanceKm,
    Column::Hours,
    Column::Brand,
    Column::Operator,
    Column::Source,
    Column::Cuisine,
    Column::Stars,
    Column::CategoryKind,
    Column::Latitude,
    Column::Longitude,
    Column::Id,
];

impl Column {
    pub(crate) fn header(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Address => "Address",
            Self::City => "City",
            Self::Postcode => "Postcode",
            Self::Category => "Category",
            Self::Website => "Website",
            Self::Emails => "Emails",
            Self::Phones => "Phones",
            Self::WhatsApp => "WhatsApp",
            Self::ContactCount => "Contacts",
            Self::DistanceKm => "Distance (km)",
            Self::Hours => "Opening hours",
            Self::Brand => "Brand",
            Self::Operator => "Operator",
            Self::Source => "Source",
            Self::Cuisine => "Cuisine",
            Self::Stars => "Stars",
            Self::CategoryKind => "Category type",
            Self::Latitude => "Latitude",
            Self::Longitude => "Longitude",
            Self::Id => "Id",
        }
    }

    /// Numeric value for columns a spreadsheet should store as numbers.
    pub(crate) fn number(self, p: &Prospect) -> Option<f64> {
        match self {
            Self::ContactCount => Some(f64::from(p.contact_method_count)),
            Self::DistanceKm => p.distance_km,
            Self::Latitude => p.position.map(|pos| pos.lat),
            Self::Longitude => p.position.map(|pos| pos.lon),
            _ => None,
        }
    }

    pub(crate) fn text(self, p: &Prospect) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        match self {
            Self::Name => p.display_name().to_owned(),
            Self::Address => p.address.full.clone(),
            Self::City => opt(&p.address.city),
            Self::Postcode => opt(&p.address.postcode),
            Self::Category => p.category.label().unwrap_or_default().to_owned(),
            Self::Website => opt(&p.contacts.website),
            Self::Emails => p.contacts.emails.join(LIST_SEPARATOR),
            Self::Phones => p.contacts.phones.join(LIST_SEPARATOR),
            Self::WhatsApp => p.contacts.whatsapp.join(LIST_SEPARATOR),
            Self::ContactCount => p.contact_method_count.to_string(),
            Self::DistanceKm => p.distance_km.map(|d| format!("{d:.2}")).unwrap_or_default(),
            Self::Hours => opt(&p.attributes.hours),
            Self::Brand => opt(&p.attributes.brand),
            Self::Operator => opt(&p.attributes.operator),
            Self::Source => opt(&p.source_ref),
            Self::Cuisine => opt(&p.attributes.cuisine),
            Self::Stars => opt(&p.attributes.stars),
            Self::CategoryKind => opt(&p.category.kind),
            Self::Latitude => p.position.map(|pos| pos.lat.to_string()).unwrap_or_default(),
            Self::Longitude => p.position.map(|pos| pos.lon.to_string()).unwrap_or_default(),
            Self::Id => p.id.clone(),
        }
    }
}

/// Which key/value map of a prospect a dynamic column reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum MapSource {
    Tags,
    Payment,
    Extras,
}

/// A column derived from the keys present in the exported rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct MapColumn {
    source: MapSource,
    key: String,
}

impl MapColumn {
    pub(crate) fn header(&self) -> String {
        match self.source {
            MapSource::Tags => format!("tag:{}", self.key),
            MapSource::Payment => format!("payment:{}", self.key),
            MapSource::Extras => self.key.clone(),
        }
    }

    pub(crate) fn value<'p>(&self, p: &'p Prospect) -> Option<&'p str> {
        let map = match self.source {
            MapSource::Tags => &p.tags_raw,
            MapSource::Payment => &p.payment_methods,
            MapSource::Extras => &p.extras,
        };
        map.get(&self.key).map(String::as_str)
    }
}

/// Tag keys, then payment methods, then `extras` keys present in any row,
/// each group sorted.
pub(crate) fn map_columns(rows: &[&Prospect]) -> Vec<MapColumn> {
    let mut columns = BTreeSet::new();
    for p in rows {
        for (source, map) in [
            (MapSource::Tags, &p.tags_raw),
            (MapSource::Payment, &p.payment_methods),
            (MapSource::Extras, &p.extras),
        ] {
            columns.extend(map.keys().map(|key| MapColumn {
                source,
                key: key.clone(),
            }));
        }
    }
    columns.into_iter().collect()
}

/// Renders `rows` (the current visible projection) in `format`.
///
/// # Errors
///
/// Returns [`ExportError`] if the underlying writer fails.
pub fn export(
    rows: &[&Prospect],
    metadata: &ExportMetadata,
    format: ExportFormat,
) -> Result<Vec<u8>, ExportError> {
    let bytes = match format {
        ExportFormat::Xlsx => xlsx::render(rows, metadata)?,
        ExportFormat::Pdf => pdf::render(rows, metadata)?,
        ExportFormat::Csv => delimited::render(rows)?,
    };
    tracing::info!(
        format = %format,
        rows = rows.len(),
        bytes = bytes.len(),
        "export rendered"
    );
    Ok(bytes)
}

/// `prospects-YYYY-MM-DD.<ext>`
#[must_use]
pub fn suggested_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!("prospects-{}.{}", date.format("%Y-%m-%d"), format.extension())
}
