//! Synthetic sales records used as the default dataset.

use crate::error::{DashboardError, Result};
use crate::fiscal::FiscalYear;
use crate::schema::SalesRecord;
use chrono::{Days, NaiveDate, Utc};
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use uuid::Builder;

pub const PRODUCT_CATEGORIES: &[&str] = &["Raw Rice", "Boiled Rice", "Broken Rice", "Bran", "Param"];

pub const STATES: &[&str] = &[
    "Andhra Pradesh",
    "Telangana",
    "Tamil Nadu",
    "Karnataka",
    "Maharashtra",
    "Uttar Pradesh",
    "Gujarat",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Kerala",
    "Madhya Pradesh",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tripura",
    "Uttarakhand",
    "West Bengal",
];

pub const CITIES: &[&str] = &[
    "Hyderabad",
    "Vijayawada",
    "Chennai",
    "Bangalore",
    "Mumbai",
    "Lucknow",
    "Ahmedabad",
    "Itanagar",
    "Dispur",
    "Patna",
    "Raipur",
    "Panaji",
    "Chandigarh",
    "Shimla",
    "Ranchi",
    "Thiruvananthapuram",
    "Bhopal",
    "Imphal",
    "Shillong",
    "Aizawl",
    "Kohima",
    "Bhubaneswar",
    "Jaipur",
    "Gangtok",
    "Agartala",
    "Dehradun",
    "Kolkata",
];

pub const DISTRICTS: &[&str] = &[
    "North District",
    "South District",
    "East District",
    "West District",
    "Central District",
    "Urban District",
    "Rural District",
];

pub const SALES_PEOPLE: &[&str] = &["Salesperson A", "Salesperson B", "Salesperson C"];

pub const BROKER_NAMES: &[&str] = &["Broker X", "Broker Y", "Broker Z", "Broker Alpha", "Broker Beta"];

/// Mean and spread of the per-quintal price, in INR.
const PRICE_PER_QUINTAL_MEAN: f64 = 1_450.0;
const PRICE_PER_QUINTAL_STD_DEV: f64 = 250.0;
const PRICE_PER_QUINTAL_FLOOR: f64 = 400.0;

pub struct MockGenerator {
    start_date: NaiveDate,
    end_date: NaiveDate,
    price: Normal<f64>,
}

impl MockGenerator {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if end_date < start_date {
            return Err(DashboardError::InvalidConfig(format!(
                "mock end date {} is before start date {}",
                end_date, start_date
            )));
        }
        let price = Normal::new(PRICE_PER_QUINTAL_MEAN, PRICE_PER_QUINTAL_STD_DEV)
            .map_err(|e| DashboardError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            start_date,
            end_date,
            price,
        })
    }

    /// Generator spanning `start_date` through today.
    pub fn until_today(start_date: NaiveDate) -> Result<Self> {
        Self::new(start_date, Utc::now().date_naive().max(start_date))
    }

    pub fn generate<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<SalesRecord> {
        let span_days = (self.end_date - self.start_date).num_days().max(0) as u64;

        (0..count)
            .map(|i| {
                let date = self
                    .start_date
                    .checked_add_days(Days::new(rng.gen_range(0..=span_days)))
                    .unwrap_or(self.start_date);
                let total_quantity = rng.gen_range(5..=104) as f64;
                let price = self.price.sample(rng).max(PRICE_PER_QUINTAL_FLOOR);
                let order_amount = (total_quantity * price * 100.0).round() / 100.0;

                SalesRecord {
                    id: format!("mock-{}", Builder::from_random_bytes(rng.gen()).into_uuid()),
                    party_name: party_name(i, rng.gen_range(0..100)),
                    broker_name: pick(BROKER_NAMES, rng),
                    city_name: pick(CITIES, rng),
                    product_category: pick(PRODUCT_CATEGORIES, rng),
                    rrma_number: format!("RRMA-{}", rng.gen_range(1000..10000)),
                    state: pick(STATES, rng),
                    district: Some(pick(DISTRICTS, rng)),
                    date,
                    total_quantity,
                    sales_person: pick(SALES_PEOPLE, rng),
                    voucher_number: format!("VCH-{}", rng.gen_range(10000..100000)),
                    order_amount,
                    fiscal_year: FiscalYear::containing(date),
                }
            })
            .collect()
    }
}

/// "Party A-17", "Party B1-3": letter cycles every 26 records.
fn party_name(index: usize, suffix: u32) -> String {
    let letter = (b'A' + (index % 26) as u8) as char;
    let round = index / 26;
    if round == 0 {
        format!("Party {}-{}", letter, suffix)
    } else {
        format!("Party {}{}-{}", letter, round, suffix)
    }
}

fn pick<R: Rng + ?Sized>(values: &[&str], rng: &mut R) -> String {
    values.choose(rng).copied().unwrap_or_default().to_string()
}

/// Generates `count` records from `start_date` to today. A seed makes the
/// output reproducible apart from the end date.
pub fn generate_mock_data(
    count: usize,
    start_date: NaiveDate,
    seed: Option<u64>,
) -> Result<Vec<SalesRecord>> {
    let generator = MockGenerator::until_today(start_date)?;
    let records = match seed {
        Some(seed) => generator.generate(count, &mut StdRng::seed_from_u64(seed)),
        None => generator.generate(count, &mut thread_rng()),
    };
    info!(
        "Generated {} mock records from {} to {}",
        records.len(),
        generator.start_date,
        generator.end_date
    );
    Ok(records)
}
