use std::collections::BTreeSet;

use log::info;

use crate::clean::{CleaningOptions, CleaningReport, clean};
use crate::config::Config;
use crate::data::filter::{FilterSpec, PriceRange, filtered_indices};
use crate::data::loader::{LoadOptions, LoadReport, load_directory};
use crate::data::model::{CellValue, RecordTable};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One analysis session: the cleaned table plus the active filter.
///
/// The table is built once by [`Session::open`] and never mutated afterwards;
/// only the filter and the cached visible rows change.
pub struct Session {
    table: RecordTable,
    load: LoadReport,
    cleaning: CleaningReport,

    /// Active selections and price range.
    filter: FilterSpec,

    /// Indices of rows passing the current filter (cached).
    visible_indices: Vec<usize>,
}

impl Session {
    /// Load every file in `config.data_dir`, merge, and clean.
    pub fn open(config: &Config) -> crate::Result<Self> {
        let options = LoadOptions {
            csv_delimiter: config.delimiter_byte(),
            merge_strategy: config.merge_strategy,
        };
        let mut load = load_directory(&config.data_dir, &options)?;
        let mut table = std::mem::take(&mut load.table);
        let cleaning = clean(&mut table, &CleaningOptions::from(config));
        Ok(Self::from_parts(table, load, cleaning))
    }

    /// Start a session over an already cleaned table.
    pub fn from_parts(table: RecordTable, load: LoadReport, cleaning: CleaningReport) -> Self {
        info!(
            "Session ready: {} rows, columns {:?}",
            table.len(),
            table.column_names()
        );
        let visible_indices = (0..table.len()).collect();
        Self {
            table,
            load,
            cleaning,
            filter: FilterSpec::default(),
            visible_indices,
        }
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load
    }

    pub fn cleaning_report(&self) -> &CleaningReport {
        &self.cleaning
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn visible_indices(&self) -> &[usize] {
        &self.visible_indices
    }

    /// Copy of the rows passing the current filter.
    pub fn visible_table(&self) -> RecordTable {
        self.table.take_rows(&self.visible_indices)
    }

    /// Distinct values of a column, for populating a selector.
    pub fn unique_values(&self, column: &str) -> BTreeSet<CellValue> {
        self.table.unique_values(column)
    }

    /// Replace the whole filter.
    pub fn set_filter(&mut self, filter: FilterSpec) {
        self.filter = filter;
        self.refilter();
    }

    /// Recompute `visible_indices` after filter change.
    fn refilter(&mut self) {
        self.visible_indices = filtered_indices(&self.table, &self.filter);
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle_value(&mut self, column: &str, value: &CellValue) {
        let selected = self.filter.selections.entry(column.to_string()).or_default();
        if selected.contains(value) {
            selected.remove(value);
        } else {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Select every value in a column.
    pub fn select_all(&mut self, column: &str) {
        let all_vals = self.table.unique_values(column);
        self.filter.selections.insert(column.to_string(), all_vals);
        self.refilter();
    }

    /// Clear a column's selection; an empty selection constrains nothing.
    pub fn select_none(&mut self, column: &str) {
        self.filter.selections.insert(column.to_string(), BTreeSet::new());
        self.refilter();
    }

    pub fn set_price_range(&mut self, range: Option<PriceRange>) {
        self.filter.price_range = range;
        self.refilter();
    }
}
