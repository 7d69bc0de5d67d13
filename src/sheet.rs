//! Ingestion boundary: uploaded file bytes to a [`RawSheet`].
//!
//! Workbooks (xlsx, xlsm, xls, xlsb, ods) are decoded with `calamine` and
//! only their first worksheet is read. CSV files go through the `csv` crate.
//! The first row is always the header row.

use crate::cell::CellValue;
use crate::error::{DashboardError, Result};
use crate::ingestion::{RawRow, RawSheet};
use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use chrono::Datelike;
use futures::io::{AsyncRead, AsyncReadExt};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Workbook,
    Csv,
}

impl SourceFormat {
    pub fn from_file_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SourceFormat::Workbook),
            "csv" => Ok(SourceFormat::Csv),
            _ => Err(DashboardError::UnsupportedFormat(name.to_string())),
        }
    }

    /// Prefix for generated record ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            SourceFormat::Workbook => "excel",
            SourceFormat::Csv => "csv",
        }
    }
}

/// Reads the whole upload into memory. This is the only asynchronous step of
/// an import; everything after it runs synchronously on the bytes.
pub async fn read_upload<R>(mut reader: R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    debug!("Read {} bytes from upload", bytes.len());
    Ok(bytes)
}

pub fn read_sheet(bytes: &[u8], format: SourceFormat) -> Result<RawSheet> {
    let sheet = match format {
        SourceFormat::Workbook => read_workbook(bytes)?,
        SourceFormat::Csv => read_csv(bytes)?,
    };
    info!(
        "Read {:?} sheet with {} header cells and {} data rows",
        format,
        sheet.headers.len(),
        sheet.rows.len()
    );
    Ok(sheet)
}

fn read_workbook(bytes: &[u8]) -> Result<RawSheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DashboardError::EmptyWorkbook)??;

    // Ranges start at the first used cell, which need not be A1.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .ok_or(DashboardError::NoHeaderRow)?
        .iter()
        .map(|cell| cell_from_data(cell).to_trimmed_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(DashboardError::NoHeaderRow);
    }

    let rows = rows
        .enumerate()
        .map(|(idx, cells)| {
            RawRow::new(
                first_row + idx + 2,
                cells.iter().map(cell_from_data).collect(),
            )
        })
        .collect();

    Ok(RawSheet { headers, rows })
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::DateTime(dt) => date_cell(dt),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("{e:?}")),
    }
}

/// Native date cells are converted with the workbook's own epoch (1900 or
/// 1904). Durations and out-of-range values become text so the date column
/// rejects them instead of reading them as serials.
fn date_cell(dt: &ExcelDateTime) -> CellValue {
    if dt.is_duration() {
        return CellValue::Text(dt.as_f64().to_string());
    }
    match dt.as_datetime().map(|datetime| datetime.date()) {
        Some(date) if date.year() >= 1900 => CellValue::Date(date),
        _ => CellValue::Text(dt.as_f64().to_string()),
    }
}

fn read_csv(bytes: &[u8]) -> Result<RawSheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Err(DashboardError::NoHeaderRow),
    };
    let headers: Vec<String> = header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(DashboardError::NoHeaderRow);
    }

    let mut rows = Vec::new();
    for (idx, record) in records.enumerate() {
        let record = record?;
        let source_row = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        rows.push(RawRow::new(
            source_row,
            record.iter().map(CellValue::from).collect(),
        ));
    }

    Ok(RawSheet { headers, rows })
}
