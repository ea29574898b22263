use std::collections::{BTreeMap, BTreeSet};

use super::model::{CellValue, RecordTable};

pub const CATEGORY_COLUMN: &str = "product_category_name";
pub const CITY_COLUMN: &str = "customer_city";
pub const PAYMENT_COLUMN: &str = "payment_type";
pub const PRICE_COLUMN: &str = "price";

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
/// If a column is absent or its set is empty, it means "no filter" (show all).
pub type FilterState = BTreeMap<String, BTreeSet<CellValue>>;

/// Inclusive bounds on the `price` column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Everything the presentation layer can narrow the table by.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub selections: FilterState,
    pub price_range: Option<PriceRange>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `column` to the given values. An empty iterator clears the
    /// constraint.
    pub fn with_values<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let set: BTreeSet<CellValue> = values.into_iter().map(Into::into).collect();
        self.selections.insert(column.to_string(), set);
        self
    }

    pub fn with_categories<I: IntoIterator<Item = S>, S: Into<String>>(self, values: I) -> Self {
        self.with_values(CATEGORY_COLUMN, values.into_iter().map(|s| CellValue::Text(s.into())))
    }

    pub fn with_cities<I: IntoIterator<Item = S>, S: Into<String>>(self, values: I) -> Self {
        self.with_values(CITY_COLUMN, values.into_iter().map(|s| CellValue::Text(s.into())))
    }

    pub fn with_payment_methods<I: IntoIterator<Item = S>, S: Into<String>>(self, values: I) -> Self {
        self.with_values(PAYMENT_COLUMN, values.into_iter().map(|s| CellValue::Text(s.into())))
    }

    pub fn with_price_range(mut self, min: f64, max: f64) -> Self {
        self.price_range = Some(PriceRange { min, max });
        self
    }

    /// Whether no constraint is active.
    pub fn is_empty(&self) -> bool {
        self.price_range.is_none() && self.selections.values().all(BTreeSet::is_empty)
    }
}

/// Return indices of rows that pass all active filters.
///
/// A row passes a column filter when:
/// * The filter set for that column is empty → passes (no constraint)
/// * The row's value for that column is in the selected set → passes
/// * The table has no such column → passes only if `Null` is selected
///
/// A row passes the price range when its `price` is numeric and in bounds.
pub fn filtered_indices(table: &RecordTable, spec: &FilterSpec) -> Vec<usize> {
    let active: Vec<(&String, &BTreeSet<CellValue>)> = spec
        .selections
        .iter()
        .filter(|(_, selected)| !selected.is_empty())
        .collect();
    let price = spec
        .price_range
        .map(|range| (range, table.column(PRICE_COLUMN)));

    (0..table.len())
        .filter(|&row| {
            for (col, selected) in &active {
                match table.value(row, col) {
                    Some(val) => {
                        if !selected.contains(val) {
                            return false;
                        }
                    }
                    None => {
                        if !selected.contains(&CellValue::Null) {
                            return false;
                        }
                    }
                }
            }
            match price {
                Some((range, Some(col))) => col.values[row]
                    .as_f64()
                    .is_some_and(|p| range.contains(p)),
                Some((_, None)) => false,
                None => true,
            }
        })
        .collect()
}

/// Copy of the rows passing `spec`; the source table is left untouched.
pub fn apply(table: &RecordTable, spec: &FilterSpec) -> RecordTable {
    table.take_rows(&filtered_indices(table, spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordTable {
        let header = ["customer_city", "payment_type", "price"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = vec![
            vec!["rio".into(), "boleto".into(), CellValue::Float(10.0)],
            vec!["recife".into(), "credit_card".into(), CellValue::Float(55.0)],
            vec!["rio".into(), "credit_card".into(), CellValue::Float(80.0)],
        ];
        RecordTable::from_rows(header, rows).unwrap()
    }

    #[test]
    fn empty_spec_keeps_everything() {
        let table = sample();
        assert!(FilterSpec::new().is_empty());
        assert_eq!(filtered_indices(&table, &FilterSpec::new()), vec![0, 1, 2]);
        let cleared = FilterSpec::new().with_cities(Vec::<String>::new());
        assert_eq!(filtered_indices(&table, &cleared), vec![0, 1, 2]);
    }

    #[test]
    fn selections_and_price_range_combine() {
        let table = sample();
        let spec = FilterSpec::new()
            .with_cities(["rio"])
            .with_price_range(20.0, 100.0);
        assert_eq!(filtered_indices(&table, &spec), vec![2]);

        let spec = FilterSpec::new().with_payment_methods(["credit_card", "voucher"]);
        let subset = apply(&table, &spec);
        assert_eq!(subset.len(), 2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn selection_on_missing_column_matches_nothing() {
        let table = sample();
        let spec = FilterSpec::new().with_categories(["toys"]);
        assert!(filtered_indices(&table, &spec).is_empty());
    }
}
