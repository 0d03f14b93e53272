//! Tabular codec: CSV and spreadsheet files in, the same shapes out.
//!
//! Rows stay loosely typed (ordered string keys to string values) until
//! validation, so columns beyond `id`/`input`/`expected` survive the whole
//! upload -> store -> export round trip.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::errors::{Result, RowIssue, ScorecardError};
use crate::model::columns;

mod delimited;
mod spreadsheet;

/// An ordered record of string fields. Keys are unique; re-inserting a key
/// replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => Some(std::mem::replace(v, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn has_content(&self) -> bool {
        self.fields.iter().any(|(_, v)| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Upload formats, resolved once from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Delimited,
    Spreadsheet,
}

impl TableFormat {
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(TableFormat::Delimited),
            "xlsx" | "xls" => Ok(TableFormat::Spreadsheet),
            _ => Err(ScorecardError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// Parses `bytes` into rows, choosing the decoder from `filename`'s extension.
pub fn parse_rows(bytes: &[u8], filename: &str) -> Result<Vec<Row>> {
    let format = TableFormat::from_filename(filename)?;
    parse_rows_as(bytes, format)
}

/// Delimited input keeps every non-empty line, even one made only of
/// separators; blank spreadsheet rows are skipped.
pub fn parse_rows_as(bytes: &[u8], format: TableFormat) -> Result<Vec<Row>> {
    match format {
        TableFormat::Delimited => delimited::parse(bytes),
        TableFormat::Spreadsheet => Ok(spreadsheet::parse(bytes)?
            .into_iter()
            .filter(Row::has_content)
            .collect()),
    }
}

/// [`parse_rows`] plus the required-field check. Every offending row is reported.
pub fn parse_validated_test_rows(bytes: &[u8], filename: &str) -> Result<Vec<Row>> {
    parse_validated_test_rows_as(bytes, TableFormat::from_filename(filename)?)
}

pub fn parse_validated_test_rows_as(bytes: &[u8], format: TableFormat) -> Result<Vec<Row>> {
    let rows = parse_rows_as(bytes, format)?;
    validate_required_fields(&rows)?;
    Ok(rows)
}

pub fn validate_required_fields(rows: &[Row]) -> Result<()> {
    let issues: Vec<RowIssue> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let missing: Vec<&'static str> = columns::REQUIRED
                .iter()
                .copied()
                .filter(|col| row.get(col).map_or(true, |v| v.trim().is_empty()))
                .collect();
            (!missing.is_empty()).then_some(RowIssue {
                row: idx + 1,
                missing,
            })
        })
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ScorecardError::Validation(issues))
    }
}

pub fn serialize_delimited(rows: &[Row]) -> Result<Vec<u8>> {
    delimited::serialize(&header_for(rows), rows)
}

pub fn serialize_spreadsheet(rows: &[Row], sheet_name: &str) -> Result<Vec<u8>> {
    spreadsheet::serialize(&header_for(rows), rows, sheet_name)
}

/// First row's keys, then any keys first seen in later rows.
fn header_for(rows: &[Row]) -> Vec<String> {
    let mut header: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !header.iter().any(|h| h == key) {
                header.push(key.to_string());
            }
        }
    }
    header
}
