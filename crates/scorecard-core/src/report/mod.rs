pub mod console;
pub mod export;
pub mod rows;

pub use export::{build_export, ExportFile, ExportFormat, CSV_CONTENT_TYPE, XLSX_CONTENT_TYPE};
pub use rows::{export_row, rows_for_run};
