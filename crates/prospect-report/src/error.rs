use thiserror::Error;

/// Errors raised while writing an export file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("spreadsheet export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("PDF export failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown export format '{0}' (expected xlsx, pdf or csv)")]
    UnknownFormat(String),
}
