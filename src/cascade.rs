//! Cascading filter options.
//!
//! The options offered for a dimension come from records matching every
//! selection *before* it in [`Dimension::CASCADE_ORDER`]; later selections,
//! its own selection and the date range are ignored.

use crate::fiscal::{distinct_years_in, FiscalYear};
use crate::schema::{
    Choice, Dimension, FilterSelection, SalesRecord, ALL_FILTER_OPTION, ALL_FISCAL_YEARS_OPTION,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Available values per dimension, sorted and de-duplicated, without sentinels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterOptionSets {
    pub states: Vec<String>,
    pub districts: Vec<String>,
    pub cities: Vec<String>,
    pub product_categories: Vec<String>,
    pub sales_persons: Vec<String>,
    pub brokers: Vec<String>,
    /// Newest first.
    pub fiscal_years: Vec<FiscalYear>,
}

impl FilterOptionSets {
    pub fn values(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::State => &self.states,
            Dimension::District => &self.districts,
            Dimension::City => &self.cities,
            Dimension::ProductCategory => &self.product_categories,
            Dimension::SalesPerson => &self.sales_persons,
            Dimension::Broker => &self.brokers,
        }
    }

    fn values_mut(&mut self, dimension: Dimension) -> &mut Vec<String> {
        match dimension {
            Dimension::State => &mut self.states,
            Dimension::District => &mut self.districts,
            Dimension::City => &mut self.cities,
            Dimension::ProductCategory => &mut self.product_categories,
            Dimension::SalesPerson => &mut self.sales_persons,
            Dimension::Broker => &mut self.brokers,
        }
    }

    pub fn contains(&self, dimension: Dimension, value: &str) -> bool {
        self.values(dimension)
            .binary_search_by(|v| v.as_str().cmp(value))
            .is_ok()
    }

    /// Presentation view: dimension name to labels, sentinel first.
    pub fn with_sentinels(&self) -> BTreeMap<String, Vec<String>> {
        let mut map = BTreeMap::new();
        for dimension in Dimension::CASCADE_ORDER {
            let mut labels = Vec::with_capacity(self.values(dimension).len() + 1);
            labels.push(ALL_FILTER_OPTION.to_string());
            labels.extend(self.values(dimension).iter().cloned());
            map.insert(dimension.name().to_string(), labels);
        }

        let mut years = Vec::with_capacity(self.fiscal_years.len() + 1);
        years.push(ALL_FISCAL_YEARS_OPTION.to_string());
        years.extend(self.fiscal_years.iter().map(FiscalYear::label));
        map.insert("fiscal_year".to_string(), years);
        map
    }
}

/// Derives every option set for the current selection.
pub fn derive_options(records: &[SalesRecord], selection: &FilterSelection) -> FilterOptionSets {
    let mut options = FilterOptionSets {
        fiscal_years: distinct_years_in(records),
        ..Default::default()
    };

    for dimension in Dimension::CASCADE_ORDER {
        let upstream = dimension.upstream();
        let values: BTreeSet<&str> = records
            .iter()
            .filter(|record| selection.matches_dimensions(upstream, record))
            .filter_map(|record| record.value_of(dimension))
            .filter(|value| !value.trim().is_empty())
            .collect();
        *options.values_mut(dimension) = values.into_iter().map(str::to_string).collect();
    }

    options
}

/// Resets to `All` every dimension choice that its option set no longer
/// offers. Dates and the fiscal year are untouched.
pub fn reconcile(selection: &FilterSelection, options: &FilterOptionSets) -> FilterSelection {
    let mut next = selection.clone();
    for dimension in Dimension::CASCADE_ORDER {
        let stale = match next.choice(dimension) {
            Choice::All => false,
            Choice::Only(value) => !options.contains(dimension, value),
        };
        if stale {
            debug!(
                "Resetting {} filter '{}': no longer available",
                dimension,
                next.choice(dimension).label()
            );
            *next.choice_mut(dimension) = Choice::All;
        }
    }
    next
}

/// Derives options, reconciles the selection against them and re-derives
/// once if anything was reset. Resets only relax upstream constraints, so the
/// second derivation is already consistent.
pub fn settle(
    records: &[SalesRecord],
    selection: &FilterSelection,
) -> (FilterSelection, FilterOptionSets) {
    let options = derive_options(records, selection);
    let reconciled = reconcile(selection, &options);
    if reconciled == *selection {
        (reconciled, options)
    } else {
        let options = derive_options(records, &reconciled);
        (reconciled, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(state: &str, district: Option<&str>, city: &str, broker: &str) -> SalesRecord {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        SalesRecord {
            id: format!("t-{}-{}", state, city),
            party_name: "Party".to_string(),
            broker_name: broker.to_string(),
            city_name: city.to_string(),
            product_category: "Raw Rice".to_string(),
            rrma_number: "R1".to_string(),
            state: state.to_string(),
            district: district.map(str::to_string),
            date,
            total_quantity: 1.0,
            sales_person: "Salesperson A".to_string(),
            voucher_number: "V1".to_string(),
            order_amount: 1.0,
            fiscal_year: FiscalYear::containing(date),
        }
    }

    fn sample() -> Vec<SalesRecord> {
        vec![
            record("A", Some("A-North"), "Alpha", "Broker X"),
            record("A", Some("A-South"), "Apex", "Broker Y"),
            record("B", Some("B-East"), "Beta", "Broker X"),
            record("C", None, "Gamma", "Broker Z"),
            record("C", Some(""), "", "Broker Z"),
        ]
    }

    #[test]
    fn test_state_selection_limits_districts() {
        let records = sample();
        let selection = FilterSelection {
            state: Choice::only("A"),
            ..Default::default()
        };
        let options = derive_options(&records, &selection);

        assert_eq!(options.states, vec!["A", "B", "C"]);
        assert_eq!(options.districts, vec!["A-North", "A-South"]);
        assert_eq!(options.cities, vec!["Alpha", "Apex"]);
        assert_eq!(options.brokers, vec!["Broker X", "Broker Y"]);
    }

    #[test]
    fn test_downstream_selection_does_not_narrow_upstream() {
        let records = sample();
        let selection = FilterSelection {
            broker: Choice::only("Broker Z"),
            ..Default::default()
        };
        let options = derive_options(&records, &selection);
        assert_eq!(options.states, vec!["A", "B", "C"]);
        assert_eq!(options.brokers, vec!["Broker X", "Broker Y", "Broker Z"]);
    }

    #[test]
    fn test_blank_values_are_not_options() {
        let options = derive_options(&sample(), &FilterSelection::default());
        assert!(!options.districts.iter().any(|d| d.is_empty()));
        assert!(!options.cities.iter().any(|c| c.is_empty()));
    }

    #[test]
    fn test_reconcile_resets_unavailable_choices() {
        let records = sample();
        let selection = FilterSelection {
            state: Choice::only("B"),
            district: Choice::only("A-North"),
            broker: Choice::only("Broker X"),
            ..Default::default()
        };
        let (settled, options) = settle(&records, &selection);

        assert_eq!(settled.state, Choice::only("B"));
        assert_eq!(settled.district, Choice::All);
        assert_eq!(settled.broker, Choice::only("Broker X"));
        assert_eq!(options.districts, vec!["B-East"]);
        assert_eq!(reconcile(&settled, &options), settled);
    }

    #[test]
    fn test_sentinels_come_first() {
        let options = derive_options(&sample(), &FilterSelection::default());
        let labels = options.with_sentinels();
        assert_eq!(labels["state"][0], ALL_FILTER_OPTION);
        assert_eq!(labels["fiscal_year"], vec!["All Fiscal Years", "FY 2023-2024"]);
    }
}
