//! Report tables as a workbook model with one sheet per metric. A workbook
//! exports as a single `.xlsx` file, and each sheet can also be dumped as CSV.

use crate::aggregation::{MonthlyPartyRow, MonthlyReport, YearlyReport};
use crate::error::Result;
use crate::fiscal::FiscalYear;
use log::info;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetCell {
    Number(f64),
    Text(String),
}

impl fmt::Display for SheetCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetCell::Number(n) => write!(f, "{}", n),
            SheetCell::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for SheetCell {
    fn from(value: f64) -> Self {
        SheetCell::Number(value)
    }
}

impl From<u32> for SheetCell {
    fn from(value: u32) -> Self {
        SheetCell::Number(f64::from(value))
    }
}

impl From<&str> for SheetCell {
    fn from(value: &str) -> Self {
        SheetCell::Text(value.to_string())
    }
}

impl From<String> for SheetCell {
    fn from(value: String) -> Self {
        SheetCell::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<SheetCell>>,
}

impl Sheet {
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    /// File name without extension.
    pub file_stem: String,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Encodes the workbook as `.xlsx`, one worksheet per sheet with a bold
    /// header row. Numbers stay numeric cells.
    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>> {
        let mut workbook = XlsxWorkbook::new();
        let header_format = Format::new().set_bold();

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
            }
            for (idx, row) in sheet.rows.iter().enumerate() {
                let row_num = idx as u32 + 1;
                for (col, cell) in row.iter().enumerate() {
                    match cell {
                        SheetCell::Number(n) => worksheet.write_number(row_num, col as u16, *n)?,
                        SheetCell::Text(s) => worksheet.write_string(row_num, col as u16, s)?,
                    };
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// Writes `<file_stem>.xlsx` into `dir` and returns its path.
    pub fn write_xlsx(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let path = dir.join(format!("{}.xlsx", self.file_stem));
        std::fs::write(&path, self.to_xlsx_bytes()?)?;
        info!(
            "Exported workbook {} with {} sheet(s) to {}",
            self.file_stem,
            self.sheets.len(),
            path.display()
        );
        Ok(path)
    }

    /// Writes `<file_stem>_<sheet name>.csv` for every sheet into `dir` and
    /// returns the written paths.
    pub fn write_csv_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(self.sheets.len());
        for sheet in &self.sheets {
            let file_name = format!("{}_{}.csv", self.file_stem, sheet.name.replace(' ', "_"));
            let path = dir.join(file_name);
            std::fs::write(&path, sheet.to_csv()?)?;
            written.push(path);
        }
        info!(
            "Exported workbook {} as {} CSV file(s) to {}",
            self.file_stem,
            written.len(),
            dir.display()
        );
        Ok(written)
    }
}

/// First selected broker reduced to `[A-Za-z0-9_]`, cut to five characters,
/// plus a trailing underscore. Empty when nothing usable remains.
pub fn broker_prefix(brokers: &[String]) -> String {
    let Some(first) = brokers.first() else {
        return String::new();
    };
    let cleaned: String = first
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(5)
        .collect();
    if cleaned.is_empty() {
        String::new()
    } else {
        format!("{}_", cleaned)
    }
}

fn year_token(fiscal_year: FiscalYear) -> String {
    fiscal_year.label().replacen(' ', "_", 1)
}

pub const QUINTALS_SHEET: &str = "Quintals per Month";
pub const ORDERS_SHEET: &str = "Orders per Month";
pub const YEARLY_SHEET: &str = "Party Yearly Comparison";

pub fn monthly_workbook(report: &MonthlyReport, brokers: &[String]) -> Workbook {
    let mut quantity_headers = vec!["Party Name".to_string()];
    quantity_headers.extend(report.months.iter().cloned());
    let mut order_headers = quantity_headers.clone();
    quantity_headers.push("Grand Total Quintals".to_string());
    order_headers.push("Grand Total Orders".to_string());

    let quantity_row = |row: &MonthlyPartyRow| {
        let mut cells: Vec<SheetCell> = vec![row.party_name.as_str().into()];
        cells.extend(row.quantities.iter().map(|q| SheetCell::from(*q)));
        cells.push(row.total_quantity.into());
        cells
    };
    let order_row = |row: &MonthlyPartyRow| {
        let mut cells: Vec<SheetCell> = vec![row.party_name.as_str().into()];
        cells.extend(row.orders.iter().map(|o| SheetCell::from(*o)));
        cells.push(row.total_orders.into());
        cells
    };

    Workbook {
        file_stem: format!(
            "{}Party_Monthly_Qtl_Orders_{}",
            broker_prefix(brokers),
            year_token(report.fiscal_year)
        ),
        sheets: vec![
            Sheet {
                name: QUINTALS_SHEET.to_string(),
                headers: quantity_headers,
                rows: report.rows.iter().map(quantity_row).collect(),
            },
            Sheet {
                name: ORDERS_SHEET.to_string(),
                headers: order_headers,
                rows: report.rows.iter().map(order_row).collect(),
            },
        ],
    }
}

/// Returns `None` for a report with no fiscal years.
pub fn yearly_workbook(report: &YearlyReport, brokers: &[String]) -> Option<Workbook> {
    let target = report.target_year()?;
    let previous = report
        .previous_year()
        .map(|fy| fy.short_label())
        .unwrap_or_default();

    let mut headers = vec!["Party Name".to_string()];
    headers.extend(report.fiscal_years.iter().map(FiscalYear::short_label));
    headers.push(format!("Grand Total ({} Yrs)", report.fiscal_years.len()));
    headers.push(format!(
        "Qtl Diff ({} to {})",
        previous,
        target.short_label()
    ));
    headers.push("% Diff".to_string());

    let rows = report
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<SheetCell> = vec![row.party_name.as_str().into()];
            cells.extend(row.quantities.iter().map(|q| SheetCell::from(*q)));
            cells.push(row.grand_total.into());
            cells.push(match row.difference {
                Some(diff) => diff.into(),
                None => "-".into(),
            });
            cells.push(match &row.percent_change {
                Some(change) => change.display().into(),
                None => "-".into(),
            });
            cells
        })
        .collect();

    Some(Workbook {
        file_stem: format!(
            "{}Party_YearlySales_{}",
            broker_prefix(brokers),
            year_token(target)
        ),
        sheets: vec![Sheet {
            name: YEARLY_SHEET.to_string(),
            headers,
            rows,
        }],
    })
}
