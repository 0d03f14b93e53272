use crate::codec::{self, Row};
use crate::errors::Result;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const RESULTS_SHEET: &str = "Results";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Csv,
    #[default]
    Xlsx,
}

impl ExportFormat {
    /// `csv` (any case) selects CSV; everything else falls back to xlsx.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("csv") {
            ExportFormat::Csv
        } else {
            ExportFormat::Xlsx
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_CONTENT_TYPE,
            ExportFormat::Xlsx => XLSX_CONTENT_TYPE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

pub fn build_export(rows: &[Row], format: ExportFormat, run_id: i64) -> Result<ExportFile> {
    let bytes = match format {
        ExportFormat::Csv => codec::serialize_delimited(rows)?,
        ExportFormat::Xlsx => codec::serialize_spreadsheet(rows, RESULTS_SHEET)?,
    };
    Ok(ExportFile {
        bytes,
        content_type: format.content_type(),
        filename: format!("test-run-{}-results.{}", run_id, format.extension()),
    })
}
