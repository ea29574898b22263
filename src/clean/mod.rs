/// Cleaning pipeline: a fixed, linear sequence of in-place table passes.
///
/// ```text
///   merged table
///        │
///        ▼
///   ┌──────────┐
///   │  impute   │  median (numeric) / mode (categorical)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  dedup    │  drop full-row duplicates, keep first
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ outliers  │  IQR filter, one column after another
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  derive   │  purchase_month from order_purchase_timestamp
///   └──────────┘
/// ```

pub mod dedup;
pub mod derive;
pub mod impute;
pub mod outliers;

use log::info;

use crate::data::model::RecordTable;
pub use dedup::drop_duplicates;
pub use derive::derive_purchase_month;
pub use impute::{ImputeReport, impute_missing};
pub use outliers::{OutlierOutcome, OutlierStep, remove_outliers};

/// Parameters of the outlier stage.
#[derive(Debug, Clone)]
pub struct CleaningOptions {
    pub outlier_columns: Vec<String>,
    pub iqr_multiplier: f64,
}

impl From<&crate::config::Config> for CleaningOptions {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            outlier_columns: config.outlier_columns.clone(),
            iqr_multiplier: config.iqr_multiplier,
        }
    }
}

/// Summary of one run of [`clean`].
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub imputation: ImputeReport,
    pub duplicates_removed: usize,
    pub outliers: Vec<OutlierOutcome>,
    pub purchase_month_derived: bool,
    pub rows_out: usize,
}

impl CleaningReport {
    pub fn outliers_removed(&self) -> usize {
        self.outliers.iter().map(OutlierOutcome::removed).sum()
    }
}

/// Run impute → dedup → outlier filters → derive on `table` in place.
pub fn clean(table: &mut RecordTable, options: &CleaningOptions) -> CleaningReport {
    let rows_in = table.len();

    let imputation = impute_missing(table);
    let duplicates_removed = drop_duplicates(table);
    let outliers = remove_outliers(table, &options.outlier_columns, options.iqr_multiplier);
    let purchase_month_derived = derive_purchase_month(table);

    let report = CleaningReport {
        rows_in,
        imputation,
        duplicates_removed,
        outliers,
        purchase_month_derived,
        rows_out: table.len(),
    };
    info!(
        "Cleaned table: {} → {} rows ({} cells imputed, {} duplicates, {} outliers)",
        report.rows_in,
        report.rows_out,
        report.imputation.total_filled(),
        report.duplicates_removed,
        report.outliers_removed()
    );
    report
}
