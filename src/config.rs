use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::merge::MergeStrategy;
use crate::error::{DashboardError, Result};

/// Numeric columns screened by the IQR filter, in the order they are applied.
pub const DEFAULT_OUTLIER_COLUMNS: &[&str] = &[
    "price",
    "freight_value",
    "payment_value",
    "product_description_lenght",
    "product_weight_g",
    "product_length_cm",
    "product_height_cm",
    "product_width_cm",
];

pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_TOP_CITIES: usize = 10;

/// Session configuration. Every field is optional in the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_dir: PathBuf,
    pub csv_delimiter: char,
    pub merge_strategy: MergeStrategy,
    pub outlier_columns: Vec<String>,
    pub iqr_multiplier: f64,
    pub top_cities: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            csv_delimiter: ',',
            merge_strategy: MergeStrategy::Auto,
            outlier_columns: DEFAULT_OUTLIER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            top_cities: DEFAULT_TOP_CITIES,
        }
    }
}

impl Config {
    /// Read and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DashboardError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.csv_delimiter.is_ascii() {
            return Err(DashboardError::Config(format!(
                "csv_delimiter must be a single ASCII character, got '{}'",
                self.csv_delimiter
            )));
        }
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(DashboardError::Config(format!(
                "iqr_multiplier must be a finite number >= 0, got {}",
                self.iqr_multiplier
            )));
        }
        if self.top_cities == 0 {
            return Err(DashboardError::Config("top_cities must be at least 1".into()));
        }
        Ok(())
    }

    /// The delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        self.csv_delimiter as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.outlier_columns.len(), 8);
        assert_eq!(config.outlier_columns[3], "product_description_lenght");
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = Config::from_toml_str(
            r#"
            data_dir = "exports"
            csv_delimiter = ";"
            merge_strategy = "outer_join"
            outlier_columns = ["price"]
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("exports"));
        assert_eq!(config.delimiter_byte(), b';');
        assert_eq!(config.merge_strategy, MergeStrategy::OuterJoin);
        assert_eq!(config.outlier_columns, vec!["price".to_string()]);
        assert_eq!(config.top_cities, DEFAULT_TOP_CITIES);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_toml_str("iqr_multiplier = -1.0"),
            Err(DashboardError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("top_cities = 0"),
            Err(DashboardError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("unknown_key = 1"),
            Err(DashboardError::Toml(_))
        ));
    }
}
