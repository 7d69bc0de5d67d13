//! Broker, state and report views over the full dataset. These ignore the
//! main filter selection and work from their own multi-select lists.

use crate::aggregation::{
    monthly_group_and_sum, quantity_by_broker, quantity_by_city, quantity_by_district,
    quantity_by_location, quantity_by_party, yearly_group_and_sum, KpiSummary, MonthlyReport,
    YearlyReport,
};
use crate::fiscal::{distinct_years_in, FiscalYear};
use crate::schema::{ChartDataPoint, Choice, SalesRecord};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerAnalysis {
    pub brokers: Vec<String>,
    pub fiscal_year: Choice<FiscalYear>,
    pub kpis: KpiSummary,
    pub by_location: Vec<ChartDataPoint>,
    pub by_party: Vec<ChartDataPoint>,
}

impl BrokerAnalysis {
    pub fn title(&self) -> String {
        match &self.fiscal_year {
            Choice::All => "Broker Performance Analysis".to_string(),
            Choice::Only(fy) => format!("Broker Performance Analysis ({})", fy),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAnalysis {
    pub states: Vec<String>,
    pub kpis: KpiSummary,
    pub by_city: Vec<ChartDataPoint>,
    pub by_broker: Vec<ChartDataPoint>,
    pub by_district: Vec<ChartDataPoint>,
}

fn selected(values: &[String], candidate: &str) -> bool {
    values.iter().any(|v| v == candidate)
}

/// Records of the selected brokers. No brokers selected means no data.
pub fn broker_records<'a>(records: &'a [SalesRecord], brokers: &[String]) -> Vec<&'a SalesRecord> {
    records
        .iter()
        .filter(|r| selected(brokers, &r.broker_name))
        .collect()
}

pub fn broker_analysis(
    records: &[SalesRecord],
    brokers: &[String],
    fiscal_year: Choice<FiscalYear>,
    top_n: usize,
) -> BrokerAnalysis {
    let subset: Vec<&SalesRecord> = broker_records(records, brokers)
        .into_iter()
        .filter(|r| fiscal_year.matches(r.fiscal_year))
        .collect();
    debug!(
        "Broker analysis over {} records for {} broker(s)",
        subset.len(),
        brokers.len()
    );

    BrokerAnalysis {
        brokers: brokers.to_vec(),
        fiscal_year,
        kpis: KpiSummary::from_records(subset.iter().copied()),
        by_location: quantity_by_location(subset.iter().copied(), top_n),
        by_party: quantity_by_party(subset.iter().copied(), top_n),
    }
}

pub fn state_analysis(records: &[SalesRecord], states: &[String], top_n: usize) -> StateAnalysis {
    let subset: Vec<&SalesRecord> = records
        .iter()
        .filter(|r| selected(states, &r.state))
        .collect();

    StateAnalysis {
        states: states.to_vec(),
        kpis: KpiSummary::from_records(subset.iter().copied()),
        by_city: quantity_by_city(subset.iter().copied(), top_n),
        by_broker: quantity_by_broker(subset.iter().copied(), top_n),
        by_district: quantity_by_district(subset.iter().copied(), top_n),
    }
}

/// Fiscal years a report can target for these brokers, latest first.
pub fn report_fiscal_years(records: &[SalesRecord], brokers: &[String]) -> Vec<FiscalYear> {
    distinct_years_in(broker_records(records, brokers))
}

/// Keeps `requested` when the brokers have data in it, otherwise falls back
/// to their latest year.
pub fn resolve_target_year(
    records: &[SalesRecord],
    brokers: &[String],
    requested: Option<FiscalYear>,
) -> Option<FiscalYear> {
    let years = report_fiscal_years(records, brokers);
    match requested {
        Some(fy) if years.contains(&fy) => Some(fy),
        _ => years.first().copied(),
    }
}

pub fn monthly_report(
    records: &[SalesRecord],
    brokers: &[String],
    target: FiscalYear,
) -> MonthlyReport {
    monthly_group_and_sum(broker_records(records, brokers), target)
}

/// Compares `target` with the `comparison_years` years before it.
pub fn yearly_report(
    records: &[SalesRecord],
    brokers: &[String],
    target: FiscalYear,
    comparison_years: usize,
) -> YearlyReport {
    let mut years = target.preceding(comparison_years);
    years.push(target);
    yearly_group_and_sum(broker_records(records, brokers), &years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(broker: &str, state: &str, date: NaiveDate, qty: f64) -> SalesRecord {
        SalesRecord {
            id: format!("{}-{}", broker, date),
            party_name: format!("Party of {}", broker),
            broker_name: broker.to_string(),
            city_name: "Chennai".to_string(),
            product_category: "Bran".to_string(),
            rrma_number: String::new(),
            state: state.to_string(),
            district: None,
            date,
            total_quantity: qty,
            sales_person: "Salesperson A".to_string(),
            voucher_number: String::new(),
            order_amount: qty * 10.0,
            fiscal_year: FiscalYear::containing(date),
        }
    }

    fn sample() -> Vec<SalesRecord> {
        vec![
            record("Broker X", "Tamil Nadu", NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(), 4.0),
            record("Broker X", "Tamil Nadu", NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(), 6.0),
            record("Broker Y", "Kerala", NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(), 9.0),
        ]
    }

    #[test]
    fn test_no_brokers_selected_means_no_data() {
        let analysis = broker_analysis(&sample(), &[], Choice::All, 15);
        assert_eq!(analysis.kpis.record_count, 0);
        assert!(analysis.by_party.is_empty());
    }

    #[test]
    fn test_broker_analysis_with_fiscal_year() {
        let brokers = vec!["Broker X".to_string()];
        let fy = FiscalYear::starting(2023);
        let analysis = broker_analysis(&sample(), &brokers, Choice::Only(fy), 15);

        assert_eq!(analysis.kpis.total_quantity, 6.0);
        assert_eq!(analysis.kpis.total_order_amount, 60.0);
        assert_eq!(analysis.by_location, vec![ChartDataPoint::new("Chennai, TN", 6.0)]);
        assert_eq!(analysis.title(), "Broker Performance Analysis (FY 2023-2024)");
    }

    #[test]
    fn test_state_analysis() {
        let states = vec!["Kerala".to_string()];
        let analysis = state_analysis(&sample(), &states, 15);
        assert_eq!(analysis.kpis.record_count, 1);
        assert_eq!(analysis.by_broker, vec![ChartDataPoint::new("Broker Y", 9.0)]);
        assert_eq!(
            analysis.by_district,
            vec![ChartDataPoint::new("Unknown District", 9.0)]
        );
    }

    #[test]
    fn test_report_target_year() {
        let brokers = vec!["Broker X".to_string()];
        let records = sample();
        assert_eq!(
            report_fiscal_years(&records, &brokers),
            vec![FiscalYear::starting(2023), FiscalYear::starting(2022)]
        );
        assert_eq!(
            resolve_target_year(&records, &brokers, Some(FiscalYear::starting(2019))),
            Some(FiscalYear::starting(2023))
        );
        assert_eq!(
            resolve_target_year(&records, &brokers, Some(FiscalYear::starting(2022))),
            Some(FiscalYear::starting(2022))
        );
        assert_eq!(resolve_target_year(&records, &[], None), None);
    }

    #[test]
    fn test_yearly_report_lists_comparison_years() {
        let brokers = vec!["Broker X".to_string()];
        let report = yearly_report(&sample(), &brokers, FiscalYear::starting(2023), 3);
        assert_eq!(report.fiscal_years.len(), 4);
        assert_eq!(report.fiscal_years[0], FiscalYear::starting(2020));
        assert_eq!(report.rows[0].quantities, vec![0.0, 0.0, 4.0, 6.0]);
        assert_eq!(report.rows[0].difference, Some(2.0));
    }
}
