//! Tabular import files → [`RawRow`]s.
//!
//! Import files are CSV with a header row. Each header is translated
//! through [`rename_header`] before rows are built, so downstream code only
//! sees canonical field names. Ragged rows are accepted; missing cells are
//! simply absent from the row map.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use catalog_core::normalize::{rename_header, RawRow};

/// Read every row of a CSV file.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open import file: {}", path.display()))?;
    read_rows_from(file)
        .with_context(|| format!("There was an error parsing the file: {}", path.display()))
}

/// Read every row from any CSV source.
pub fn read_rows_from<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(rename_header)
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    tracing::debug!(rows = rows.len(), columns = headers.len(), "read import rows");
    Ok(rows)
}
