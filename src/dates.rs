//! Date recognition for spreadsheet cells.
//!
//! Accepted representations, tried in order:
//! 1. native date cells
//! 2. `d/m/yyyy` text (day first, 1–2 digit day and month)
//! 3. ISO-like text in a fixed set of generic layouts
//! 4. numeric serials in the 1900 spreadsheet date system

use crate::cell::CellValue;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};

/// Largest serial the 1900 date system can express (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Lotus 1-2-3 treated 1900 as a leap year; serial 60 is the phantom 1900-02-29.
const PHANTOM_LEAP_DAY_SERIAL: i64 = 60;

const GENERIC_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

const GENERIC_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateParseError {
    Missing,
    /// Matched the day/month/year layout but names a non-existent day.
    Impossible,
    Unparseable,
    InvalidSerial,
}

pub fn parse_date_value(value: &CellValue) -> Result<NaiveDate, DateParseError> {
    match value {
        _ if value.is_blank() => Err(DateParseError::Missing),
        CellValue::Date(date) => Ok(*date),
        CellValue::Number(serial) => {
            date_from_serial(*serial).ok_or(DateParseError::InvalidSerial)
        }
        CellValue::Text(text) => parse_date_text(text.trim()),
        CellValue::Bool(_) | CellValue::Empty => Err(DateParseError::Unparseable),
    }
}

pub fn parse_date_text(text: &str) -> Result<NaiveDate, DateParseError> {
    if let Some(parts) = split_day_month_year(text) {
        let (day, month, year) = parts;
        return NaiveDate::from_ymd_opt(year, month, day).ok_or(DateParseError::Impossible);
    }

    parse_generic(text).ok_or(DateParseError::Unparseable)
}

/// Recognizes `d/m/yyyy` with 1–2 digit day and month and a 4 digit year.
fn split_day_month_year(text: &str) -> Option<(u32, u32, i32)> {
    let mut parts = text.split('/');
    let day = parts.next()?;
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
    };
    if !digits(day, 1, 2) || !digits(month, 1, 2) || !digits(year, 4, 4) {
        return None;
    }

    Some((day.parse().ok()?, month.parse().ok()?, year.parse().ok()?))
}

/// Generic fallback. Values carrying an explicit offset keep the calendar date
/// as written rather than being shifted into another zone. Only four digit
/// years are accepted so "15/04/23" is never read as year 15.
fn parse_generic(text: &str) -> Option<NaiveDate> {
    parse_generic_any_year(text).filter(|date| (1000..=9999).contains(&date.year()))
}

fn parse_generic_any_year(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }

    GENERIC_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            GENERIC_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Converts a 1900-system spreadsheet serial to a calendar date, discarding
/// the time-of-day fraction.
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL + 0.999_999).contains(&serial) {
        return None;
    }

    let days = serial.floor() as i64;
    if days == PHANTOM_LEAP_DAY_SERIAL {
        return None;
    }
    let offset = if days > PHANTOM_LEAP_DAY_SERIAL {
        days - 1
    } else {
        days
    };

    NaiveDate::from_ymd_opt(1899, 12, 31)?.checked_add_days(Days::new(offset as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_month_year_text() {
        assert_eq!(parse_date_text("15/04/2023"), Ok(ymd(2023, 4, 15)));
        assert_eq!(parse_date_text("1/4/2023"), Ok(ymd(2023, 4, 1)));
        assert_eq!(parse_date_text("31/02/2024"), Err(DateParseError::Impossible));
        assert_eq!(parse_date_text("29/02/2024"), Ok(ymd(2024, 2, 29)));
        assert_eq!(parse_date_text("29/02/2023"), Err(DateParseError::Impossible));
    }

    #[test]
    fn test_day_month_year_needs_four_digit_year() {
        assert_eq!(parse_date_text("15/04/23"), Err(DateParseError::Unparseable));
        assert_eq!(parse_date_text("150/04/2023"), Err(DateParseError::Unparseable));
    }

    #[test]
    fn test_generic_layouts() {
        assert_eq!(parse_date_text("2023-04-15"), Ok(ymd(2023, 4, 15)));
        assert_eq!(parse_date_text("2023/04/15"), Ok(ymd(2023, 4, 15)));
        assert_eq!(parse_date_text("2023-04-15T10:30:00"), Ok(ymd(2023, 4, 15)));
        assert_eq!(parse_date_text("15-Apr-2023"), Ok(ymd(2023, 4, 15)));
        assert_eq!(parse_date_text("April 15, 2023"), Ok(ymd(2023, 4, 15)));
        assert_eq!(parse_date_text("not a date"), Err(DateParseError::Unparseable));
    }

    #[test]
    fn test_offsets_keep_written_date() {
        assert_eq!(
            parse_date_text("2024-04-01T00:30:00+05:30"),
            Ok(ymd(2024, 4, 1))
        );
        assert_eq!(
            parse_date_text("2024-03-31T23:30:00-08:00"),
            Ok(ymd(2024, 3, 31))
        );
    }

    #[test]
    fn test_serials() {
        assert_eq!(date_from_serial(1.0), Some(ymd(1900, 1, 1)));
        assert_eq!(date_from_serial(59.0), Some(ymd(1900, 2, 28)));
        assert_eq!(date_from_serial(60.0), None);
        assert_eq!(date_from_serial(61.0), Some(ymd(1900, 3, 1)));
        assert_eq!(date_from_serial(44927.0), Some(ymd(2023, 1, 1)));
        assert_eq!(date_from_serial(45017.75), Some(ymd(2023, 4, 1)));
        assert_eq!(date_from_serial(0.0), None);
        assert_eq!(date_from_serial(-5.0), None);
        assert_eq!(date_from_serial(f64::NAN), None);
        assert_eq!(date_from_serial(MAX_SERIAL), Some(ymd(9999, 12, 31)));
        assert_eq!(date_from_serial(MAX_SERIAL + 1.0), None);
    }

    #[test]
    fn test_cell_dispatch() {
        assert_eq!(
            parse_date_value(&CellValue::Date(ymd(2022, 5, 1))),
            Ok(ymd(2022, 5, 1))
        );
        assert_eq!(
            parse_date_value(&CellValue::Number(44927.0)),
            Ok(ymd(2023, 1, 1))
        );
        assert_eq!(
            parse_date_value(&CellValue::Text("  ".into())),
            Err(DateParseError::Missing)
        );
        assert_eq!(
            parse_date_value(&CellValue::Bool(true)),
            Err(DateParseError::Unparseable)
        );
    }
}
