use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Workbook, XlsxError};

use super::Row;
use crate::errors::{Result, ScorecardError};

/// Reads the first sheet; the first row names the fields.
pub(super) fn parse(bytes: &[u8]) -> Result<Vec<Row>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ScorecardError::Format(format!("unreadable spreadsheet: {e}")))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ScorecardError::Format("spreadsheet has no sheets".into()))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ScorecardError::Format(format!("sheet '{sheet}': {e}")))?;

    let mut lines = range.rows();
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(cell_text).collect();

    let rows = lines
        .map(|cells| {
            header
                .iter()
                .enumerate()
                .filter(|(_, h)| !h.is_empty())
                .map(|(i, h)| (h.as_str(), cells.get(i).map(cell_text).unwrap_or_default()))
                .collect::<Row>()
        })
        .collect();
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

pub(super) fn serialize(header: &[String], rows: &[Row], sheet_name: &str) -> Result<Vec<u8>> {
    write_workbook(header, rows, sheet_name)
        .map_err(|e| ScorecardError::Other(anyhow::anyhow!("spreadsheet write failed: {e}")))
}

fn write_workbook(
    header: &[String],
    rows: &[Row],
    sheet_name: &str,
) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    for (col, name) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, name.as_str())?;
    }
    for (r, row) in rows.iter().enumerate() {
        let line = (r + 1) as u32;
        for (col, name) in header.iter().enumerate() {
            let value = row.get(name).unwrap_or_default();
            if !value.is_empty() {
                sheet.write_string(line, col as u16, value)?;
            }
        }
    }

    workbook.save_to_buffer()
}
