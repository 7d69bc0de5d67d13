use crate::aggregation::DEFAULT_TOP_N;
use crate::error::{DashboardError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime settings for a [`crate::SalesDashboard`]. Every field is optional
/// in JSON and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DashboardConfig {
    #[schemars(description = "Number of synthetic records in the default dataset.")]
    pub mock_record_count: usize,

    #[schemars(description = "First date mock records may fall on (YYYY-MM-DD). Records run up to today.")]
    pub mock_start_date: NaiveDate,

    #[schemars(description = "Seed for reproducible mock data. Omit for fresh random data on every load.")]
    pub mock_seed: Option<u64>,

    #[schemars(description = "Number of bars on ranked charts (party, broker, location, ...).")]
    pub top_n: usize,

    #[schemars(description = "How many fiscal years before the target year the yearly comparison report lists.")]
    pub comparison_years: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            mock_record_count: 200,
            mock_start_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            mock_seed: None,
            top_n: DEFAULT_TOP_N,
            comparison_years: 3,
        }
    }
}

impl DashboardConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mock_record_count == 0 {
            return Err(DashboardError::InvalidConfig(
                "mock_record_count must be at least 1".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(DashboardError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }
        if self.comparison_years == 0 {
            return Err(DashboardError::InvalidConfig(
                "comparison_years must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn json_schema() -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(schemars::schema_for!(DashboardConfig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = DashboardConfig::from_json(r#"{"mock_seed": 9}"#).unwrap();
        assert_eq!(config.mock_seed, Some(9));
        assert_eq!(config.mock_record_count, 200);
        assert_eq!(config.top_n, 15);
        assert_eq!(config.comparison_years, 3);
        assert_eq!(
            config.mock_start_date,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            DashboardConfig::from_json(r#"{"top_n": 0}"#),
            Err(DashboardError::InvalidConfig(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json("{not json"),
            Err(DashboardError::SerializationError(_))
        ));
    }

    #[test]
    fn test_schema_lists_fields() {
        let schema = DashboardConfig::json_schema().unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("mock_record_count").is_some());
        assert!(properties.get("comparison_years").is_some());
    }
}
