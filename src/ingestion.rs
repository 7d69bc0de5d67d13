//! Record normalization: raw spreadsheet rows to validated [`SalesRecord`]s.
//!
//! Validation is all-or-nothing. Headers are checked before any row is
//! touched, every row collects all of its field problems before failing, and
//! the first failing row aborts the whole import.

use crate::cell::CellValue;
use crate::dates::{parse_date_value, DateParseError};
use crate::error::{DashboardError, FieldProblem, ProblemKind, Result};
use crate::fiscal::FiscalYear;
use crate::schema::SalesRecord;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    PartyName,
    BrokerName,
    CityName,
    ProductCategory,
    RrmaNumber,
    State,
    District,
    Date,
    TotalQuantity,
    SalesPerson,
    VoucherNumber,
    OrderAmount,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::PartyName,
        Column::BrokerName,
        Column::CityName,
        Column::ProductCategory,
        Column::RrmaNumber,
        Column::State,
        Column::District,
        Column::Date,
        Column::TotalQuantity,
        Column::SalesPerson,
        Column::VoucherNumber,
        Column::OrderAmount,
    ];

    /// Canonical header text. Matching against a file is case-insensitive.
    pub fn header(&self) -> &'static str {
        match self {
            Column::PartyName => "Party Name",
            Column::BrokerName => "Broker Name",
            Column::CityName => "City Name",
            Column::ProductCategory => "Product Category",
            Column::RrmaNumber => "RRMA Number",
            Column::State => "State",
            Column::District => "District",
            Column::Date => "Date",
            Column::TotalQuantity => "Total Qty",
            Column::SalesPerson => "Sales Man",
            Column::VoucherNumber => "Vch No.",
            Column::OrderAmount => "Order amount",
        }
    }
}

/// One data row together with its 1-based row number in the source file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRow {
    pub source_row: usize,
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn new(source_row: usize, cells: Vec<CellValue>) -> Self {
        Self { source_row, cells }
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_blank)
    }
}

/// The first worksheet of an upload: header cells plus data rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawSheet {
    /// Builds a sheet whose header sits on row 1 and data starts on row 2.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| RawRow::new(idx + 2, cells))
            .collect();
        Self { headers, rows }
    }
}

/// Where each canonical column lives in the source header row.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    positions: Vec<(Column, usize, String)>,
}

impl HeaderIndex {
    /// Resolves every canonical column, failing with the complete list of
    /// missing headers. Duplicate headers resolve to their first occurrence.
    pub fn resolve(headers: &[String]) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        let mut positions = Vec::with_capacity(Column::ALL.len());
        let mut missing = Vec::new();

        for column in Column::ALL {
            let wanted = column.header().to_lowercase();
            match normalized.iter().position(|h| !h.is_empty() && *h == wanted) {
                Some(idx) => positions.push((column, idx, headers[idx].trim().to_string())),
                None => missing.push(column.header().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(DashboardError::MissingColumns(missing));
        }

        Ok(Self { positions })
    }

    /// Header text as written in the source file, used in diagnostics.
    pub fn source_header(&self, column: Column) -> &str {
        self.positions
            .iter()
            .find(|(c, _, _)| *c == column)
            .map(|(_, _, header)| header.as_str())
            .unwrap_or_else(|| column.header())
    }

    fn cell<'a>(&self, column: Column, row: &'a RawRow) -> &'a CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.positions
            .iter()
            .find(|(c, _, _)| *c == column)
            .and_then(|(_, idx, _)| row.cells.get(*idx))
            .unwrap_or(&EMPTY)
    }
}

/// Normalizes a whole sheet. `id_prefix` tags generated record ids with their
/// origin (e.g. "excel", "csv").
pub fn normalize_sheet(sheet: &RawSheet, id_prefix: &str) -> Result<Vec<SalesRecord>> {
    let index = HeaderIndex::resolve(&sheet.headers)?;

    let mut records = Vec::with_capacity(sheet.rows.len());
    for row in &sheet.rows {
        if row.is_blank() {
            debug!("Skipping blank source row {}", row.source_row);
            continue;
        }

        match normalize_row(&index, row, id_prefix) {
            Ok(record) => records.push(record),
            Err(problems) => {
                warn!(
                    "Rejecting import: source row {} has {} problem(s)",
                    row.source_row,
                    problems.len()
                );
                return Err(DashboardError::RowValidation {
                    row: row.source_row,
                    problems,
                });
            }
        }
    }

    info!(
        "Normalized {} sales records from {} source rows",
        records.len(),
        sheet.rows.len()
    );
    Ok(records)
}

/// Normalizes one row, collecting every field problem before giving up.
pub fn normalize_row(
    index: &HeaderIndex,
    row: &RawRow,
    id_prefix: &str,
) -> std::result::Result<SalesRecord, Vec<FieldProblem>> {
    let mut problems = Vec::new();

    let text = |column: Column| coerce_text(index.cell(column, row));

    let date_cell = index.cell(Column::Date, row);
    let date = match parse_date_value(date_cell) {
        Ok(date) => Some(date),
        Err(err) => {
            let value = date_cell.to_trimmed_string();
            let kind = match err {
                DateParseError::Missing => ProblemKind::MissingValue,
                DateParseError::Impossible => ProblemKind::ImpossibleDate { value },
                DateParseError::Unparseable => ProblemKind::UnparseableDate { value },
                DateParseError::InvalidSerial => ProblemKind::InvalidDateSerial { value },
            };
            problems.push(FieldProblem::new(index.source_header(Column::Date), kind));
            None
        }
    };

    let mut numeric = |column: Column| -> f64 {
        let header = index.source_header(column);
        match coerce_number(index.cell(column, row)) {
            Ok(value) => {
                if column == Column::TotalQuantity && value < 0.0 {
                    problems.push(FieldProblem::new(
                        header,
                        ProblemKind::NegativeQuantity {
                            value: index.cell(column, row).to_trimmed_string(),
                        },
                    ));
                }
                value
            }
            Err(kind) => {
                problems.push(FieldProblem::new(header, kind));
                0.0
            }
        }
    };

    let total_quantity = numeric(Column::TotalQuantity);
    let order_amount = numeric(Column::OrderAmount);

    let date = match date {
        Some(date) if problems.is_empty() => date,
        _ => return Err(problems),
    };

    let district = text(Column::District);

    Ok(SalesRecord {
        id: format!("{}-{}", id_prefix, Uuid::new_v4()),
        party_name: text(Column::PartyName),
        broker_name: text(Column::BrokerName),
        city_name: text(Column::CityName),
        product_category: text(Column::ProductCategory),
        rrma_number: text(Column::RrmaNumber),
        state: text(Column::State),
        district: (!district.is_empty()).then_some(district),
        date,
        total_quantity,
        sales_person: text(Column::SalesPerson),
        voucher_number: text(Column::VoucherNumber),
        order_amount,
        fiscal_year: FiscalYear::containing(date),
    })
}

fn coerce_text(cell: &CellValue) -> String {
    cell.to_trimmed_string()
}

/// Empty cells count as zero. Anything else must still parse as a number
/// once currency symbols, grouping separators and spaces are removed.
fn coerce_number(cell: &CellValue) -> std::result::Result<f64, ProblemKind> {
    match cell {
        _ if cell.is_blank() => Ok(0.0),
        CellValue::Number(n) if n.is_finite() => Ok(*n),
        other => {
            let raw = other.to_trimmed_string();
            let stripped: String = raw
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
                .collect();
            stripped
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or(ProblemKind::InvalidNumber { value: raw })
        }
    }
}
