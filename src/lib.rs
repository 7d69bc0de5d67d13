//! # Sales Dashboard Core
//!
//! Data layer of a sales dashboard: spreadsheet ingestion, fiscal-year aware
//! filtering and the aggregations behind charts and reports.
//!
//! ## Core Concepts
//!
//! - **Fiscal Year**: April through March, labelled `"FY 2023-2024"`
//! - **Ingestion**: a spreadsheet upload becomes either a complete set of
//!   validated [`SalesRecord`]s or one descriptive error, never a partial load
//! - **Filters**: six cascading text dimensions plus a date range that is
//!   coupled to the fiscal-year picker
//! - **Aggregation**: group-by-sum chart series and per-party monthly and
//!   yearly report tables
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_dashboard_core::*;
//!
//! let mut dashboard = SalesDashboard::with_mock_data(DashboardConfig::default())?;
//!
//! dashboard.update_filter(FilterUpdate::FiscalYear(Choice::Only(FiscalYear::starting(2023))));
//! dashboard.set_dimension(Dimension::State, "Tamil Nadu");
//!
//! for point in dashboard.main_charts().by_product_category {
//!     println!("{}: {}", point.label, format_quantity(point.value));
//! }
//!
//! let outcome = dashboard.import_bytes("sales.xlsx", &std::fs::read("sales.xlsx")?);
//! if let Some(message) = dashboard.last_error() {
//!     eprintln!("{}", message);
//! }
//! ```

pub mod aggregation;
pub mod analysis;
pub mod cascade;
pub mod cell;
pub mod config;
pub mod dashboard;
pub mod dates;
pub mod error;
pub mod filters;
pub mod fiscal;
pub mod format;
pub mod ingestion;
pub mod mock;
pub mod reports;
pub mod schema;
pub mod sheet;
pub mod store;

pub use aggregation::{
    group_and_sum, group_and_sum_or, monthly_group_and_sum, top_n, yearly_group_and_sum,
    KpiSummary, MonthlyPartyRow, MonthlyReport, PercentChange, YearlyPartyRow, YearlyReport,
};
pub use analysis::{BrokerAnalysis, StateAnalysis};
pub use cascade::{derive_options, reconcile, FilterOptionSets};
pub use cell::CellValue;
pub use config::DashboardConfig;
pub use dashboard::{parse_upload, MainCharts, SalesDashboard};
pub use dates::{date_from_serial, parse_date_value, DateParseError};
pub use error::{DashboardError, FieldProblem, ProblemKind, Result};
pub use filters::{ChangeSource, FilterCoordinator, FilterUpdate};
pub use fiscal::*;
pub use format::{abbreviate_state, format_currency, format_quantity};
pub use ingestion::*;
pub use mock::{generate_mock_data, MockGenerator};
pub use reports::{Sheet, SheetCell, Workbook};
pub use schema::*;
pub use sheet::{read_sheet, read_upload, SourceFormat};
pub use store::{DataSource, Dataset, DatasetStore, LoadOutcome, LoadTicket};

use log::info;
use std::path::Path;

/// Reads and validates a spreadsheet file from disk. The file type is taken
/// from its extension.
pub fn load_spreadsheet(path: impl AsRef<Path>) -> Result<Vec<SalesRecord>> {
    let path = path.as_ref();
    info!("Loading spreadsheet {}", path.display());

    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_upload(&file_name, &bytes)
}
