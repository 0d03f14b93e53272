use super::Row;
use crate::errors::{Result, ScorecardError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub(super) fn parse(bytes: &[u8]) -> Result<Vec<Row>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| ScorecardError::Format(format!("CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        match record {
            Ok(record) => rows.push(
                header
                    .iter()
                    .zip(record.iter())
                    .filter(|(h, _)| !h.is_empty())
                    .map(|(h, v)| (h.as_str(), v))
                    .collect::<Row>(),
            ),
            Err(e) => errors.push(format!("row {}: {}", idx + 1, e)),
        }
    }

    if !errors.is_empty() {
        return Err(ScorecardError::Format(format!(
            "CSV parse errors: {}",
            errors.join("; ")
        )));
    }
    Ok(rows)
}

pub(super) fn serialize(header: &[String], rows: &[Row]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let io = |e: csv::Error| ScorecardError::Other(anyhow::anyhow!("CSV write failed: {e}"));

    if !header.is_empty() {
        writer.write_record(header).map_err(io)?;
    }
    for row in rows {
        writer
            .write_record(header.iter().map(|h| row.get(h).unwrap_or_default()))
            .map_err(io)?;
    }

    writer
        .into_inner()
        .map_err(|e| ScorecardError::Other(anyhow::anyhow!("CSV flush failed: {e}")))
}
