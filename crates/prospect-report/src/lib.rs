//! Client-side view over search results, and file export.

pub mod collate;
pub mod error;
pub mod export;
pub mod view;

pub use error::ExportError;
pub use export::{export, suggested_file_name, ExportFormat, ExportMetadata};
pub use view::{ResultView, SortDirection, ViewSortKey};
