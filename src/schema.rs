use crate::fiscal::FiscalYear;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label shown for the match-all choice of a dimension filter.
pub const ALL_FILTER_OPTION: &str = "All";

/// Label shown for the match-all choice of the fiscal-year filter.
pub const ALL_FISCAL_YEARS_OPTION: &str = "All Fiscal Years";

/// One sales transaction line. Quantities are in quintals, amounts in INR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: String,
    pub party_name: String,
    pub broker_name: String,
    pub city_name: String,
    pub product_category: String,
    pub rrma_number: String,
    pub state: String,
    pub district: Option<String>,
    pub date: NaiveDate,
    pub total_quantity: f64,
    pub sales_person: String,
    pub voucher_number: String,
    pub order_amount: f64,
    pub fiscal_year: FiscalYear,
}

impl SalesRecord {
    pub fn value_of(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::State => Some(&self.state),
            Dimension::District => self.district.as_deref(),
            Dimension::City => Some(&self.city_name),
            Dimension::ProductCategory => Some(&self.product_category),
            Dimension::SalesPerson => Some(&self.sales_person),
            Dimension::Broker => Some(&self.broker_name),
        }
    }
}

/// The filterable text dimensions, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    State,
    District,
    City,
    ProductCategory,
    SalesPerson,
    Broker,
}

impl Dimension {
    /// Each dimension's options depend only on the dimensions before it.
    pub const CASCADE_ORDER: [Dimension; 6] = [
        Dimension::State,
        Dimension::District,
        Dimension::City,
        Dimension::ProductCategory,
        Dimension::SalesPerson,
        Dimension::Broker,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::State => "state",
            Dimension::District => "district",
            Dimension::City => "city",
            Dimension::ProductCategory => "product_category",
            Dimension::SalesPerson => "sales_person",
            Dimension::Broker => "broker",
        }
    }

    pub fn position(&self) -> usize {
        Self::CASCADE_ORDER
            .iter()
            .position(|d| d == self)
            .unwrap_or(Self::CASCADE_ORDER.len())
    }

    /// Dimensions strictly before this one in cascade order.
    pub fn upstream(&self) -> &'static [Dimension] {
        &Self::CASCADE_ORDER[..self.position()]
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A filter value: either the match-all sentinel or one concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice<T = String> {
    All,
    Only(T),
}

impl<T> Default for Choice<T> {
    fn default() -> Self {
        Choice::All
    }
}

impl<T> Choice<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Choice::All)
    }

    pub fn as_only(&self) -> Option<&T> {
        match self {
            Choice::All => None,
            Choice::Only(value) => Some(value),
        }
    }
}

impl Choice<String> {
    pub fn only(value: impl Into<String>) -> Self {
        Choice::Only(value.into())
    }

    /// Builds a choice from a presentation label, mapping the sentinel to `All`.
    pub fn from_label(label: &str) -> Self {
        if label == ALL_FILTER_OPTION {
            Choice::All
        } else {
            Choice::Only(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Choice::All => ALL_FILTER_OPTION,
            Choice::Only(value) => value,
        }
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(wanted) => value == Some(wanted.as_str()),
        }
    }
}

impl Choice<FiscalYear> {
    pub fn label(&self) -> String {
        match self {
            Choice::All => ALL_FISCAL_YEARS_OPTION.to_string(),
            Choice::Only(fy) => fy.label(),
        }
    }

    pub fn matches(&self, fiscal_year: FiscalYear) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(wanted) => *wanted == fiscal_year,
        }
    }
}

/// The dashboard's active filter state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    pub state: Choice,
    pub district: Choice,
    pub city: Choice,
    pub product_category: Choice,
    pub sales_person: Choice,
    pub broker: Choice,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub fiscal_year: Choice<FiscalYear>,
}

impl FilterSelection {
    pub fn choice(&self, dimension: Dimension) -> &Choice {
        match dimension {
            Dimension::State => &self.state,
            Dimension::District => &self.district,
            Dimension::City => &self.city,
            Dimension::ProductCategory => &self.product_category,
            Dimension::SalesPerson => &self.sales_person,
            Dimension::Broker => &self.broker,
        }
    }

    pub fn choice_mut(&mut self, dimension: Dimension) -> &mut Choice {
        match dimension {
            Dimension::State => &mut self.state,
            Dimension::District => &mut self.district,
            Dimension::City => &mut self.city,
            Dimension::ProductCategory => &mut self.product_category,
            Dimension::SalesPerson => &mut self.sales_person,
            Dimension::Broker => &mut self.broker,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Date bounds are inclusive; an absent bound does not constrain.
    pub fn matches_dates(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }

    pub fn matches_dimensions<'a, I>(&self, dimensions: I, record: &SalesRecord) -> bool
    where
        I: IntoIterator<Item = &'a Dimension>,
    {
        dimensions
            .into_iter()
            .all(|d| self.choice(*d).matches(record.value_of(*d)))
    }

    /// The date range is authoritative; the fiscal-year choice only drives it
    /// and is not applied a second time.
    pub fn matches(&self, record: &SalesRecord) -> bool {
        self.matches_dates(record.date)
            && self.matches_dimensions(&Dimension::CASCADE_ORDER, record)
    }
}

/// One point of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    pub label: String,
    pub value: f64,
}

impl ChartDataPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: &str, district: Option<&str>, date: NaiveDate) -> SalesRecord {
        SalesRecord {
            id: "t-1".to_string(),
            party_name: "Party A".to_string(),
            broker_name: "Broker X".to_string(),
            city_name: "Chennai".to_string(),
            product_category: "Raw Rice".to_string(),
            rrma_number: "RRMA-1".to_string(),
            state: state.to_string(),
            district: district.map(str::to_string),
            date,
            total_quantity: 10.0,
            sales_person: "Salesperson A".to_string(),
            voucher_number: "VCH-1".to_string(),
            order_amount: 1000.0,
            fiscal_year: FiscalYear::containing(date),
        }
    }

    #[test]
    fn test_default_selection_matches_everything() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let selection = FilterSelection::default();
        assert!(selection.is_default());
        assert!(selection.matches(&record("Goa", None, date)));
    }

    #[test]
    fn test_district_choice_never_matches_missing_district() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let selection = FilterSelection {
            district: Choice::only("North District"),
            ..Default::default()
        };
        assert!(!selection.matches(&record("Goa", None, date)));
        assert!(selection.matches(&record("Goa", Some("North District"), date)));
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let selection = FilterSelection {
            start_date: NaiveDate::from_ymd_opt(2023, 4, 1),
            end_date: NaiveDate::from_ymd_opt(2023, 4, 30),
            ..Default::default()
        };
        assert!(selection.matches_dates(NaiveDate::from_ymd_opt(2023, 4, 1).unwrap()));
        assert!(selection.matches_dates(NaiveDate::from_ymd_opt(2023, 4, 30).unwrap()));
        assert!(!selection.matches_dates(NaiveDate::from_ymd_opt(2023, 5, 1).unwrap()));
        assert!(!selection.matches_dates(NaiveDate::from_ymd_opt(2023, 3, 31).unwrap()));
    }

    #[test]
    fn test_upstream_dimensions() {
        assert!(Dimension::State.upstream().is_empty());
        assert_eq!(
            Dimension::City.upstream(),
            &[Dimension::State, Dimension::District]
        );
        assert_eq!(Dimension::Broker.upstream().len(), 5);
    }

    #[test]
    fn test_choice_labels() {
        assert_eq!(Choice::from_label("All"), Choice::All);
        assert_eq!(Choice::from_label("Goa"), Choice::only("Goa"));
        assert_eq!(Choice::<FiscalYear>::All.label(), "All Fiscal Years");
        assert_eq!(
            Choice::Only(FiscalYear::starting(2021)).label(),
            "FY 2021-2022"
        );
    }
}
