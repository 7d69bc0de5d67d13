//! The loaded dataset plus everything derived from it.
//!
//! The dataset sits behind an [`Arc`] and is swapped wholesale, so a reader
//! holding a snapshot sees either the old or the new records, never a mix.
//! Loads are sequenced with [`LoadTicket`]s; only the newest load may land.

use crate::cascade::{self, FilterOptionSets};
use crate::error::Result;
use crate::filters::{FilterCoordinator, FilterUpdate};
use crate::fiscal::{distinct_years_in, FiscalYear};
use crate::schema::{FilterSelection, SalesRecord};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Empty,
    Mock,
    Upload { file_name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<SalesRecord>,
    pub source: DataSource,
    /// Distinct fiscal years in `records`, latest first.
    pub fiscal_years: Vec<FiscalYear>,
}

impl Dataset {
    pub fn new(records: Vec<SalesRecord>, source: DataSource) -> Self {
        let fiscal_years = distinct_years_in(&records);
        Self {
            records,
            source,
            fiscal_years,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), DataSource::Empty)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Applied,
    /// A newer load was started; this one was dropped.
    Superseded,
    /// The load failed and the previous dataset was kept.
    Rejected,
}

#[derive(Debug)]
pub struct DatasetStore {
    dataset: Arc<Dataset>,
    filters: FilterCoordinator,
    filtered: Vec<SalesRecord>,
    options: FilterOptionSets,
    latest_ticket: u64,
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetStore {
    pub fn new() -> Self {
        Self {
            dataset: Arc::new(Dataset::empty()),
            filters: FilterCoordinator::new(),
            filtered: Vec::new(),
            options: FilterOptionSets::default(),
            latest_ticket: 0,
        }
    }

    pub fn snapshot(&self) -> Arc<Dataset> {
        Arc::clone(&self.dataset)
    }

    /// Swaps in a new dataset and resets every filter. Loads still in flight
    /// become stale.
    pub fn replace(&mut self, records: Vec<SalesRecord>, source: DataSource) {
        self.latest_ticket += 1;
        self.swap(records, source);
    }

    fn swap(&mut self, records: Vec<SalesRecord>, source: DataSource) {
        info!("Loaded {} records from {:?}", records.len(), source);
        self.dataset = Arc::new(Dataset::new(records, source));
        self.filters.clear();
        self.refresh();
    }

    /// Starts a load. Any ticket issued earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_ticket += 1;
        debug!("Issued load ticket {}", self.latest_ticket);
        LoadTicket(self.latest_ticket)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest_ticket
    }

    /// Lands a finished load. Stale tickets are discarded whatever their
    /// result; a failed current load leaves the dataset untouched and hands
    /// the error back.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<(Vec<SalesRecord>, DataSource)>,
    ) -> Result<LoadOutcome> {
        if !self.is_current(ticket) {
            warn!(
                "Discarding load {} superseded by load {}",
                ticket.0, self.latest_ticket
            );
            return Ok(LoadOutcome::Superseded);
        }

        let (records, source) = result?;
        self.swap(records, source);
        Ok(LoadOutcome::Applied)
    }

    pub fn selection(&self) -> &FilterSelection {
        self.filters.selection()
    }

    pub fn filters(&self) -> &FilterCoordinator {
        &self.filters
    }

    pub fn filtered_records(&self) -> &[SalesRecord] {
        &self.filtered
    }

    pub fn options(&self) -> &FilterOptionSets {
        &self.options
    }

    pub fn update_filter(&mut self, update: FilterUpdate) -> &FilterSelection {
        debug!("Applying filter update {:?}", update);
        self.filters.apply(update);
        self.refresh();
        self.filters.selection()
    }

    pub fn clear_filters(&mut self) -> &FilterSelection {
        self.filters.clear();
        self.refresh();
        self.filters.selection()
    }

    /// Re-derives options, drops choices they no longer offer and recomputes
    /// the filtered set.
    fn refresh(&mut self) {
        let records = &self.dataset.records;
        let (settled, options) = cascade::settle(records, self.filters.selection());
        self.filters.replace_dimensions(&settled);
        self.options = options;

        let selection = self.filters.selection();
        self.filtered = records
            .iter()
            .filter(|r| selection.matches(r))
            .cloned()
            .collect();
        debug!(
            "{} of {} records match the current filters",
            self.filtered.len(),
            records.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::schema::{Choice, Dimension};
    use chrono::NaiveDate;

    fn record(id: &str, state: &str, district: &str, date: NaiveDate) -> SalesRecord {
        SalesRecord {
            id: id.to_string(),
            party_name: "Party".to_string(),
            broker_name: "Broker X".to_string(),
            city_name: "City".to_string(),
            product_category: "Bran".to_string(),
            rrma_number: String::new(),
            state: state.to_string(),
            district: Some(district.to_string()),
            date,
            total_quantity: 1.0,
            sales_person: "Salesperson A".to_string(),
            voucher_number: String::new(),
            order_amount: 1.0,
            fiscal_year: FiscalYear::containing(date),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<SalesRecord> {
        vec![
            record("1", "A", "A1", ymd(2022, 5, 1)),
            record("2", "A", "A2", ymd(2023, 5, 1)),
            record("3", "B", "B1", ymd(2023, 6, 1)),
        ]
    }

    #[test]
    fn test_replace_resets_filters() {
        let mut store = DatasetStore::new();
        store.replace(sample(), DataSource::Mock);
        store.update_filter(FilterUpdate::Dimension(Dimension::State, Choice::only("A")));
        assert_eq!(store.filtered_records().len(), 2);

        store.replace(sample(), DataSource::Mock);
        assert!(store.selection().is_default());
        assert_eq!(store.filtered_records().len(), 3);
        assert_eq!(
            store.snapshot().fiscal_years,
            vec![FiscalYear::starting(2023), FiscalYear::starting(2022)]
        );
    }

    #[test]
    fn test_upstream_change_resets_stale_downstream_choice() {
        let mut store = DatasetStore::new();
        store.replace(sample(), DataSource::Mock);
        store.update_filter(FilterUpdate::Dimension(Dimension::State, Choice::only("A")));
        store.update_filter(FilterUpdate::Dimension(Dimension::District, Choice::only("A2")));
        assert_eq!(store.filtered_records().len(), 1);

        let selection = store
            .update_filter(FilterUpdate::Dimension(Dimension::State, Choice::only("B")))
            .clone();
        assert_eq!(selection.district, Choice::All);
        assert_eq!(store.options().districts, vec!["B1"]);
        assert_eq!(store.filtered_records()[0].id, "3");
    }

    #[test]
    fn test_fiscal_year_filter_uses_date_range() {
        let mut store = DatasetStore::new();
        store.replace(sample(), DataSource::Mock);
        store.update_filter(FilterUpdate::FiscalYear(Choice::Only(FiscalYear::starting(2023))));
        let ids: Vec<&str> = store.filtered_records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut store = DatasetStore::new();
        let first = store.begin_load();
        let second = store.begin_load();

        let outcome = store
            .complete_load(second, Ok((sample(), DataSource::Mock)))
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Applied);

        let outcome = store
            .complete_load(first, Ok((Vec::new(), DataSource::Empty)))
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Superseded);
        assert_eq!(store.snapshot().len(), 3);
    }

    #[test]
    fn test_failed_load_keeps_dataset() {
        let mut store = DatasetStore::new();
        store.replace(sample(), DataSource::Mock);
        let before = store.snapshot();

        let ticket = store.begin_load();
        let result = store.complete_load(ticket, Err(DashboardError::NoHeaderRow));
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_direct_replace_supersedes_pending_load() {
        let mut store = DatasetStore::new();
        let pending = store.begin_load();
        store.replace(sample(), DataSource::Mock);

        let outcome = store
            .complete_load(pending, Ok((Vec::new(), DataSource::Empty)))
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Superseded);
        assert_eq!(store.snapshot().len(), 3);
        assert_eq!(store.snapshot().source, DataSource::Mock);
    }
}
