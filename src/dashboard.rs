use crate::aggregation::{
    quantity_by_product_category, quantity_by_state, KpiSummary, MonthlyReport, YearlyReport,
};
use crate::analysis::{self, BrokerAnalysis, StateAnalysis};
use crate::cascade::FilterOptionSets;
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::filters::FilterUpdate;
use crate::fiscal::FiscalYear;
use crate::ingestion::normalize_sheet;
use crate::mock::generate_mock_data;
use crate::reports::{self, Workbook};
use crate::schema::{ChartDataPoint, Choice, Dimension, FilterSelection, SalesRecord};
use crate::sheet::{read_sheet, read_upload, SourceFormat};
use crate::store::{DataSource, Dataset, DatasetStore, LoadOutcome, LoadTicket};
use futures::io::AsyncRead;
use log::{error, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The main dashboard's chart series for the current filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainCharts {
    pub kpis: KpiSummary,
    pub by_product_category: Vec<ChartDataPoint>,
    pub by_state: Vec<ChartDataPoint>,
}

/// Everything the presentation layer needs, wired together.
pub struct SalesDashboard {
    config: DashboardConfig,
    store: DatasetStore,
    last_error: Option<String>,
}

impl SalesDashboard {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: DatasetStore::new(),
            last_error: None,
        })
    }

    /// A dashboard already holding the default mock dataset.
    pub fn with_mock_data(config: DashboardConfig) -> Result<Self> {
        let mut dashboard = Self::new(config)?;
        dashboard.load_mock_data()?;
        Ok(dashboard)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Replaces the dataset with fresh mock records and clears any upload
    /// error. Any import still in flight is superseded.
    pub fn load_mock_data(&mut self) -> Result<LoadOutcome> {
        let ticket = self.store.begin_load();
        let result = generate_mock_data(
            self.config.mock_record_count,
            self.config.mock_start_date,
            self.config.mock_seed,
        )
        .map(|records| (records, DataSource::Mock));
        let outcome = self.store.complete_load(ticket, result)?;
        self.last_error = None;
        Ok(outcome)
    }

    pub fn begin_import(&mut self) -> LoadTicket {
        self.store.begin_load()
    }

    /// Lands an import started with [`Self::begin_import`]. A failure is
    /// logged and kept as the dismissible [`Self::last_error`]; the current
    /// dataset and filters stay as they were.
    pub fn complete_import(
        &mut self,
        ticket: LoadTicket,
        file_name: &str,
        bytes: &[u8],
    ) -> LoadOutcome {
        if !self.store.is_current(ticket) {
            return LoadOutcome::Superseded;
        }

        let result = parse_upload(file_name, bytes).map(|records| {
            (
                records,
                DataSource::Upload {
                    file_name: file_name.to_string(),
                },
            )
        });

        match self.store.complete_load(ticket, result) {
            Ok(outcome) => {
                if outcome == LoadOutcome::Applied {
                    self.last_error = None;
                }
                outcome
            }
            Err(e) => {
                error!("Import of '{}' failed: {}", file_name, e);
                self.last_error = Some(e.to_string());
                LoadOutcome::Rejected
            }
        }
    }

    /// Synchronous import of bytes already in memory.
    pub fn import_bytes(&mut self, file_name: &str, bytes: &[u8]) -> LoadOutcome {
        let ticket = self.begin_import();
        self.complete_import(ticket, file_name, bytes)
    }

    /// Reads an upload stream to the end, then imports it.
    pub async fn import_upload<R>(&mut self, file_name: &str, reader: R) -> LoadOutcome
    where
        R: AsyncRead + Unpin,
    {
        let ticket = self.begin_import();
        match read_upload(reader).await {
            Ok(bytes) => self.complete_import(ticket, file_name, &bytes),
            Err(e) => {
                error!("Reading upload '{}' failed: {}", file_name, e);
                self.last_error = Some(e.to_string());
                LoadOutcome::Rejected
            }
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn dataset(&self) -> Arc<Dataset> {
        self.store.snapshot()
    }

    pub fn selection(&self) -> &FilterSelection {
        self.store.selection()
    }

    pub fn update_filter(&mut self, update: FilterUpdate) -> &FilterSelection {
        self.store.update_filter(update)
    }

    pub fn set_dimension(&mut self, dimension: Dimension, label: &str) -> &FilterSelection {
        self.store
            .update_filter(FilterUpdate::Dimension(dimension, Choice::from_label(label)))
    }

    pub fn clear_filters(&mut self) -> &FilterSelection {
        self.store.clear_filters()
    }

    pub fn filtered_records(&self) -> &[SalesRecord] {
        self.store.filtered_records()
    }

    pub fn options(&self) -> &FilterOptionSets {
        self.store.options()
    }

    /// Option lists keyed by dimension name, each led by its sentinel.
    pub fn option_labels(&self) -> BTreeMap<String, Vec<String>> {
        self.store.options().with_sentinels()
    }

    pub fn main_charts(&self) -> MainCharts {
        let records = self.store.filtered_records();
        MainCharts {
            kpis: KpiSummary::from_records(records),
            by_product_category: quantity_by_product_category(records),
            by_state: quantity_by_state(records),
        }
    }

    pub fn broker_analysis(
        &self,
        brokers: &[String],
        fiscal_year: Choice<FiscalYear>,
    ) -> BrokerAnalysis {
        let dataset = self.store.snapshot();
        // A year that vanished with a reload falls back to all years.
        let fiscal_year = match fiscal_year {
            Choice::Only(fy) if !dataset.fiscal_years.contains(&fy) => Choice::All,
            other => other,
        };
        analysis::broker_analysis(&dataset.records, brokers, fiscal_year, self.config.top_n)
    }

    pub fn state_analysis(&self, states: &[String]) -> StateAnalysis {
        let dataset = self.store.snapshot();
        analysis::state_analysis(&dataset.records, states, self.config.top_n)
    }

    pub fn report_fiscal_years(&self, brokers: &[String]) -> Vec<FiscalYear> {
        analysis::report_fiscal_years(&self.store.snapshot().records, brokers)
    }

    /// `None` when the brokers have no data in any fiscal year.
    pub fn monthly_report(
        &self,
        brokers: &[String],
        target: Option<FiscalYear>,
    ) -> Option<MonthlyReport> {
        let dataset = self.store.snapshot();
        let target = analysis::resolve_target_year(&dataset.records, brokers, target)?;
        Some(analysis::monthly_report(&dataset.records, brokers, target))
    }

    pub fn yearly_report(
        &self,
        brokers: &[String],
        target: Option<FiscalYear>,
    ) -> Option<YearlyReport> {
        let dataset = self.store.snapshot();
        let target = analysis::resolve_target_year(&dataset.records, brokers, target)?;
        Some(analysis::yearly_report(
            &dataset.records,
            brokers,
            target,
            self.config.comparison_years,
        ))
    }

    /// Export workbook for the monthly report; `None` when it has no rows.
    pub fn monthly_workbook(
        &self,
        brokers: &[String],
        target: Option<FiscalYear>,
    ) -> Option<Workbook> {
        let report = self.monthly_report(brokers, target)?;
        if report.is_empty() {
            return None;
        }
        info!("Building monthly workbook for {}", report.fiscal_year);
        Some(reports::monthly_workbook(&report, brokers))
    }

    pub fn yearly_workbook(
        &self,
        brokers: &[String],
        target: Option<FiscalYear>,
    ) -> Option<Workbook> {
        let report = self.yearly_report(brokers, target)?;
        if report.is_empty() {
            return None;
        }
        reports::yearly_workbook(&report, brokers)
    }
}

/// Reads and normalizes one uploaded file. Nothing is loaded unless every
/// row validates.
pub fn parse_upload(file_name: &str, bytes: &[u8]) -> Result<Vec<SalesRecord>> {
    let format = SourceFormat::from_file_name(file_name)?;
    let sheet = read_sheet(bytes, format)?;
    let records = normalize_sheet(&sheet, format.id_prefix())?;
    info!("Parsed {} records from '{}'", records.len(), file_name);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Party Name,Broker Name,City Name,Product Category,RRMA Number,State,District,Date,Total Qty,Sales Man,Vch No.,Order amount";

    fn config() -> DashboardConfig {
        DashboardConfig {
            mock_record_count: 50,
            mock_seed: Some(11),
            ..Default::default()
        }
    }

    #[test]
    fn test_mock_data_is_default_dataset() {
        let dashboard = SalesDashboard::with_mock_data(config()).unwrap();
        assert_eq!(dashboard.dataset().len(), 50);
        assert_eq!(dashboard.dataset().source, DataSource::Mock);
        assert_eq!(dashboard.filtered_records().len(), 50);
        assert_eq!(dashboard.option_labels()["broker"][0], "All");
    }

    #[test]
    fn test_failed_import_keeps_dataset_and_reports_error() {
        let mut dashboard = SalesDashboard::with_mock_data(config()).unwrap();
        dashboard.set_dimension(Dimension::SalesPerson, "Salesperson A");
        let before = dashboard.selection().clone();

        let csv = format!("{}\nAcme,Broker X,Patna,Bran,R1,Bihar,,15/04/2023,abc,S,V1,100\n", HEADER);
        let outcome = dashboard.import_bytes("upload.csv", csv.as_bytes());

        assert_eq!(outcome, LoadOutcome::Rejected);
        assert_eq!(dashboard.dataset().len(), 50);
        assert_eq!(dashboard.selection(), &before);
        let message = dashboard.last_error().unwrap();
        assert!(message.contains("row 2"));
        assert!(message.contains("abc"));

        dashboard.dismiss_error();
        assert!(dashboard.last_error().is_none());
    }

    #[test]
    fn test_successful_import_replaces_dataset() {
        let mut dashboard = SalesDashboard::with_mock_data(config()).unwrap();
        let csv = format!(
            "{}\nAcme,Broker X,Patna,Bran,R1,Bihar,,15/04/2023,12,S,V1,100\n",
            HEADER
        );
        let outcome = dashboard.import_bytes("upload.csv", csv.as_bytes());

        assert_eq!(outcome, LoadOutcome::Applied);
        let dataset = dashboard.dataset();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.fiscal_years, vec![FiscalYear::starting(2023)]);
        assert!(dataset.records[0].id.starts_with("csv-"));
        assert!(dashboard.selection().is_default());
    }

    #[test]
    fn test_stale_import_is_ignored() {
        let mut dashboard = SalesDashboard::with_mock_data(config()).unwrap();
        let stale = dashboard.begin_import();
        dashboard.load_mock_data().unwrap();

        let csv = format!("{}\n", HEADER);
        let outcome = dashboard.complete_import(stale, "late.csv", csv.as_bytes());
        assert_eq!(outcome, LoadOutcome::Superseded);
        assert_eq!(dashboard.dataset().len(), 50);
        assert!(dashboard.last_error().is_none());
    }

    #[test]
    fn test_reports_default_to_latest_year() {
        let dashboard = SalesDashboard::with_mock_data(config()).unwrap();
        let brokers = vec!["Broker X".to_string(), "Broker Y".to_string()];
        let years = dashboard.report_fiscal_years(&brokers);

        let report = dashboard.monthly_report(&brokers, None).unwrap();
        assert_eq!(Some(report.fiscal_year), years.first().copied());
        assert!(dashboard.monthly_report(&[], None).is_none());

        let yearly = dashboard.yearly_report(&brokers, None).unwrap();
        assert_eq!(yearly.fiscal_years.len(), 4);
    }
}
