use anyhow::Result;
use sales_dashboard_core::{
    format_currency, format_quantity, Choice, DashboardConfig, Dimension, FilterUpdate,
    FiscalYear, LoadOutcome, SalesDashboard,
};

const UPLOAD: &str = "\
Party Name,Broker Name,City Name,Product Category,RRMA Number,State,District,Date,Total Qty,Sales Man,Vch No.,Order amount
Acme Traders,Broker X,Chennai,Raw Rice,RRMA-1001,Tamil Nadu,North District,15/04/2023,120,Salesperson A,VCH-10001,\"1,74,000\"
Acme Traders,Broker X,Chennai,Boiled Rice,RRMA-1002,Tamil Nadu,North District,2023-11-02,80,Salesperson A,VCH-10002,116000
Bharat Foods,Broker Y,Patna,Bran,RRMA-1003,Bihar,,05/01/2024,45.5,Salesperson B,VCH-10003,36400
Coastal Mills,Broker X,Panaji,Broken Rice,RRMA-1004,Goa,South District,2022-06-18,60,Salesperson C,VCH-10004,78000
";

fn main() -> Result<()> {
    let config = DashboardConfig {
        mock_seed: Some(7),
        ..Default::default()
    };
    let mut dashboard = SalesDashboard::with_mock_data(config)?;
    println!(
        "Mock dataset: {} records across {} fiscal years",
        dashboard.dataset().len(),
        dashboard.dataset().fiscal_years.len()
    );

    let broken = UPLOAD.replace("45.5", "forty");
    if dashboard.import_bytes("broken.csv", broken.as_bytes()) == LoadOutcome::Rejected {
        println!("Rejected upload: {}", dashboard.last_error().unwrap_or_default());
        dashboard.dismiss_error();
    }

    let outcome = dashboard.import_bytes("sales.csv", UPLOAD.as_bytes());
    println!("Upload outcome: {:?}", outcome);

    dashboard.update_filter(FilterUpdate::FiscalYear(Choice::Only(FiscalYear::starting(2023))));
    dashboard.set_dimension(Dimension::State, "Tamil Nadu");

    let charts = dashboard.main_charts();
    println!(
        "FY 2023-2024, Tamil Nadu: {} / {}",
        format_quantity(charts.kpis.total_quantity),
        format_currency(charts.kpis.total_order_amount)
    );
    for point in &charts.by_product_category {
        println!("  {:<12} {}", point.label, format_quantity(point.value));
    }

    let brokers = vec!["Broker X".to_string()];
    if let Some(report) = dashboard.yearly_report(&brokers, None) {
        for row in &report.rows {
            let change = row
                .percent_change
                .map(|c| c.display())
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<14} {:>10} {}", row.party_name, format_quantity(row.grand_total), change);
        }
    }

    if let Some(workbook) = dashboard.monthly_workbook(&brokers, None) {
        let dir = std::env::temp_dir().join("sales-dashboard-demo");
        println!("Wrote {}", workbook.write_xlsx(&dir)?.display());
        for path in workbook.write_csv_dir(&dir)? {
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
