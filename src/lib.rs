//! sales-lens: merge multi-file sales exports, clean them, and summarise the
//! result by month, category, city, and payment method.

pub mod clean;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;

pub use clean::{CleaningOptions, CleaningReport, clean};
pub use config::Config;
pub use data::filter::{FilterSpec, PriceRange};
pub use data::loader::{LoadOptions, LoadReport, load_directory};
pub use data::merge::MergeStrategy;
pub use data::model::{CellValue, Column, ColumnKind, RecordTable};
pub use error::{DashboardError, Result};
pub use state::Session;
