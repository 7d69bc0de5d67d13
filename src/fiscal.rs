//! April–March fiscal calendar.
//!
//! A fiscal year `FY Y-(Y+1)` runs from April 1 of `Y` through March 31 of
//! `Y+1`. All arithmetic is done on [`NaiveDate`], which carries no timezone,
//! so a date-only value can never drift across a day boundary.

use crate::cell::CellValue;
use crate::dates::parse_date_value;
use crate::error::{DashboardError, Result};
use crate::schema::SalesRecord;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Calendar month (1-based) on which every fiscal year starts.
pub const FISCAL_YEAR_START_MONTH: u32 = 4;

pub const FISCAL_MONTHS_SHORT: [&str; 12] = [
    "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec", "Jan", "Feb", "Mar",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiscalYear {
    start_year: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl FiscalRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

impl FiscalYear {
    pub fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= FISCAL_YEAR_START_MONTH {
            Self::starting(date.year())
        } else {
            Self::starting(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year, FISCAL_YEAR_START_MONTH, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.end_year(), 3, 31).unwrap_or(NaiveDate::MAX)
    }

    pub fn range(&self) -> FiscalRange {
        FiscalRange {
            start_date: self.start_date(),
            end_date: self.end_date(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::containing(date) == *self
    }

    pub fn previous(&self) -> Self {
        Self::starting(self.start_year - 1)
    }

    pub fn next(&self) -> Self {
        Self::starting(self.start_year + 1)
    }

    /// The `count` fiscal years immediately before this one, oldest first.
    pub fn preceding(&self, count: usize) -> Vec<FiscalYear> {
        (1..=count as i32)
            .rev()
            .map(|offset| Self::starting(self.start_year - offset))
            .collect()
    }

    /// "2023-2024" without the "FY " prefix; used for report column headers.
    pub fn short_label(&self) -> String {
        format!("{}-{}", self.start_year, self.end_year())
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY {}-{}", self.start_year, self.end_year())
    }
}

impl FromStr for FiscalYear {
    type Err = DashboardError;

    fn from_str(label: &str) -> Result<Self> {
        let invalid = || DashboardError::InvalidFiscalYear(label.to_string());

        let years = label.strip_prefix("FY ").ok_or_else(invalid)?;
        let (start, end) = years.split_once('-').ok_or_else(invalid)?;
        let start_year = parse_four_digit_year(start).ok_or_else(invalid)?;
        let end_year = parse_four_digit_year(end).ok_or_else(invalid)?;

        if end_year != start_year + 1 {
            return Err(invalid());
        }

        Ok(Self::starting(start_year))
    }
}

fn parse_four_digit_year(text: &str) -> Option<i32> {
    if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl Serialize for FiscalYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FiscalYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

pub fn fiscal_year_of(date: NaiveDate) -> FiscalYear {
    FiscalYear::containing(date)
}

/// Resolves an arbitrary cell to its fiscal year, or `None` when the cell does
/// not hold a recognizable calendar date.
pub fn fiscal_year_of_cell(value: &CellValue) -> Option<FiscalYear> {
    parse_date_value(value).ok().map(FiscalYear::containing)
}

pub fn range_of(label: &str) -> Result<FiscalRange> {
    label.parse::<FiscalYear>().map(|fy| fy.range())
}

pub fn preceding_years(label: &str, count: usize) -> Result<Vec<FiscalYear>> {
    label.parse::<FiscalYear>().map(|fy| fy.preceding(count))
}

/// Distinct fiscal years present in `records`, latest first.
pub fn distinct_years_in<'a, I>(records: I) -> Vec<FiscalYear>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    let years: BTreeSet<FiscalYear> = records.into_iter().map(|r| r.fiscal_year).collect();
    years.into_iter().rev().collect()
}

/// Returns the 0-based position of `date`'s month inside its fiscal year
/// (April = 0, March = 11).
pub fn fiscal_month_index(date: NaiveDate) -> usize {
    let month = date.month();
    if month >= FISCAL_YEAR_START_MONTH {
        (month - FISCAL_YEAR_START_MONTH) as usize
    } else {
        (month + 12 - FISCAL_YEAR_START_MONTH) as usize
    }
}
