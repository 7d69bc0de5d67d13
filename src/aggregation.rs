//! Group-by-sum routines feeding charts and reports.

use crate::fiscal::{fiscal_month_index, FiscalYear, FISCAL_MONTHS_SHORT};
use crate::format::abbreviate_state;
use crate::schema::{ChartDataPoint, SalesRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bucket label used when a record's key is blank.
pub const UNKNOWN_LABEL: &str = "Unknown";

pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// Number of bars shown on ranked charts.
pub const DEFAULT_TOP_N: usize = 15;

/// Sums `value_fn` per `key_fn` bucket, blank keys going to [`UNKNOWN_LABEL`].
/// Buckets come back sorted by value, highest first; equal sums keep the
/// order in which their keys were first seen.
pub fn group_and_sum<'a, I, K, V>(records: I, key_fn: K, value_fn: V) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
    K: Fn(&SalesRecord) -> String,
    V: Fn(&SalesRecord) -> f64,
{
    group_and_sum_or(records, UNKNOWN_LABEL, key_fn, value_fn)
}

pub fn group_and_sum_or<'a, I, K, V>(
    records: I,
    fallback: &str,
    key_fn: K,
    value_fn: V,
) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
    K: Fn(&SalesRecord) -> String,
    V: Fn(&SalesRecord) -> f64,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<ChartDataPoint> = Vec::new();

    for record in records {
        let key = key_fn(record);
        let key = if key.trim().is_empty() {
            fallback.to_string()
        } else {
            key
        };
        let value = value_fn(record);

        match positions.get(&key) {
            Some(&idx) => buckets[idx].value += value,
            None => {
                positions.insert(key.clone(), buckets.len());
                buckets.push(ChartDataPoint::new(key, value));
            }
        }
    }

    sort_descending(&mut buckets);
    buckets
}

/// Stable, so ties keep their relative order.
fn sort_descending(points: &mut [ChartDataPoint]) {
    points.sort_by(|a, b| b.value.total_cmp(&a.value));
}

pub fn top_n(mut points: Vec<ChartDataPoint>, n: usize) -> Vec<ChartDataPoint> {
    points.truncate(n);
    points
}

pub fn quantity_by_product_category<'a, I>(records: I) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    group_and_sum(records, |r| r.product_category.clone(), |r| r.total_quantity)
}

/// Quantity per state, keyed by abbreviation. Abbreviating happens after
/// summing so the full name and its code never split into two bars.
pub fn quantity_by_state<'a, I>(records: I) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    let by_name = group_and_sum(records, |r| r.state.clone(), |r| r.total_quantity);

    let mut merged: Vec<ChartDataPoint> = Vec::with_capacity(by_name.len());
    for point in by_name {
        let code = abbreviate_state(&point.label);
        match merged.iter_mut().find(|p| p.label == code) {
            Some(existing) => existing.value += point.value,
            None => merged.push(ChartDataPoint::new(code, point.value)),
        }
    }
    sort_descending(&mut merged);
    merged
}

/// `"City, ST"`; both parts missing collapses to [`UNKNOWN_LOCATION`].
pub fn location_label(record: &SalesRecord) -> String {
    let city = record.city_name.trim();
    let state = record.state.trim();
    if city.is_empty() && state.is_empty() {
        return UNKNOWN_LOCATION.to_string();
    }

    let city = if city.is_empty() { "Unknown City" } else { city };
    let state = if state.is_empty() {
        "Unknown State"
    } else {
        abbreviate_state(state)
    };
    format!("{}, {}", city, state)
}

pub fn quantity_by_location<'a, I>(records: I, n: usize) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    top_n(
        group_and_sum_or(records, UNKNOWN_LOCATION, location_label, |r| {
            r.total_quantity
        }),
        n,
    )
}

pub fn quantity_by_party<'a, I>(records: I, n: usize) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    top_n(
        group_and_sum_or(records, "Unknown Party", |r| r.party_name.clone(), |r| {
            r.total_quantity
        }),
        n,
    )
}

pub fn quantity_by_broker<'a, I>(records: I, n: usize) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    top_n(
        group_and_sum_or(records, "Unknown Broker", |r| r.broker_name.clone(), |r| {
            r.total_quantity
        }),
        n,
    )
}

pub fn quantity_by_district<'a, I>(records: I, n: usize) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    top_n(
        group_and_sum_or(
            records,
            "Unknown District",
            |r| r.district.clone().unwrap_or_default(),
            |r| r.total_quantity,
        ),
        n,
    )
}

pub fn quantity_by_city<'a, I>(records: I, n: usize) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    top_n(
        group_and_sum_or(records, "Unknown City", |r| r.city_name.clone(), |r| {
            r.total_quantity
        }),
        n,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_quantity: f64,
    pub total_order_amount: f64,
    pub record_count: usize,
}

impl KpiSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a SalesRecord>,
    {
        records.into_iter().fold(Self::default(), |mut acc, r| {
            acc.total_quantity += r.total_quantity;
            acc.total_order_amount += r.order_amount;
            acc.record_count += 1;
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPartyRow {
    pub party_name: String,
    /// Indexed by fiscal month, April first.
    pub quantities: [f64; 12],
    pub orders: [u32; 12],
    pub total_quantity: f64,
    pub total_orders: u32,
}

impl MonthlyPartyRow {
    fn new(party_name: String) -> Self {
        Self {
            party_name,
            quantities: [0.0; 12],
            orders: [0; 12],
            total_quantity: 0.0,
            total_orders: 0,
        }
    }

    fn add(&mut self, month: usize, quantity: f64) {
        self.quantities[month] += quantity;
        self.orders[month] += 1;
        self.total_quantity += quantity;
        self.total_orders += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub fiscal_year: FiscalYear,
    pub months: Vec<String>,
    /// Sorted by total quantity, highest first.
    pub rows: Vec<MonthlyPartyRow>,
    pub grand_total: MonthlyPartyRow,
}

impl MonthlyReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-party monthly quantity and order counts for one fiscal year.
/// Records with a blank party name are left out.
pub fn monthly_group_and_sum<'a, I>(records: I, fiscal_year: FiscalYear) -> MonthlyReport
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<MonthlyPartyRow> = Vec::new();
    let mut grand_total = MonthlyPartyRow::new("Grand Total".to_string());

    for record in records {
        if record.fiscal_year != fiscal_year || record.party_name.trim().is_empty() {
            continue;
        }
        let month = fiscal_month_index(record.date);
        let idx = *positions.entry(record.party_name.as_str()).or_insert_with(|| {
            rows.push(MonthlyPartyRow::new(record.party_name.clone()));
            rows.len() - 1
        });
        rows[idx].add(month, record.total_quantity);
        grand_total.add(month, record.total_quantity);
    }

    rows.sort_by(|a, b| b.total_quantity.total_cmp(&a.total_quantity));

    MonthlyReport {
        fiscal_year,
        months: FISCAL_MONTHS_SHORT.iter().map(|m| m.to_string()).collect(),
        rows,
        grand_total,
    }
}

/// Year-over-year change of the target year against the year before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PercentChange {
    Finite(f64),
    /// The previous year was zero and the target year is positive.
    InfiniteIncrease,
}

impl PercentChange {
    pub fn between(previous: f64, target: f64) -> Self {
        if previous != 0.0 {
            PercentChange::Finite((target - previous) / previous * 100.0)
        } else if target > 0.0 {
            PercentChange::InfiniteIncrease
        } else {
            PercentChange::Finite(0.0)
        }
    }

    /// `"12.34%"` or `"∞"`.
    pub fn display(&self) -> String {
        match self {
            PercentChange::Finite(pct) => format!("{:.2}%", pct),
            PercentChange::InfiniteIncrease => "∞".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyPartyRow {
    pub party_name: String,
    /// One entry per listed fiscal year, in listing order.
    pub quantities: Vec<f64>,
    pub grand_total: f64,
    /// `None` when fewer than two years are listed.
    pub difference: Option<f64>,
    pub percent_change: Option<PercentChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyReport {
    /// Oldest first; the last entry is the target year.
    pub fiscal_years: Vec<FiscalYear>,
    /// Sorted by grand total, highest first.
    pub rows: Vec<YearlyPartyRow>,
}

impl YearlyReport {
    pub fn target_year(&self) -> Option<FiscalYear> {
        self.fiscal_years.last().copied()
    }

    pub fn previous_year(&self) -> Option<FiscalYear> {
        self.fiscal_years.len().checked_sub(2).map(|i| self.fiscal_years[i])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-party quantity for each listed fiscal year, compared target-to-previous.
pub fn yearly_group_and_sum<'a, I>(records: I, fiscal_years: &[FiscalYear]) -> YearlyReport
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<YearlyPartyRow> = Vec::new();

    for record in records {
        let Some(year_idx) = fiscal_years.iter().position(|fy| *fy == record.fiscal_year) else {
            continue;
        };
        if record.party_name.trim().is_empty() {
            continue;
        }
        let idx = *positions.entry(record.party_name.as_str()).or_insert_with(|| {
            rows.push(YearlyPartyRow {
                party_name: record.party_name.clone(),
                quantities: vec![0.0; fiscal_years.len()],
                grand_total: 0.0,
                difference: None,
                percent_change: None,
            });
            rows.len() - 1
        });
        rows[idx].quantities[year_idx] += record.total_quantity;
    }

    for row in rows.iter_mut() {
        row.grand_total = row.quantities.iter().sum();
        if let [.., previous, target] = row.quantities.as_slice() {
            row.difference = Some(target - previous);
            row.percent_change = Some(PercentChange::between(*previous, *target));
        }
    }

    rows.sort_by(|a, b| b.grand_total.total_cmp(&a.grand_total));

    YearlyReport {
        fiscal_years: fiscal_years.to_vec(),
        rows,
    }
}
