use log::{info, warn};

use crate::data::model::RecordTable;

/// Bounds computed for one column and what they removed.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierStep {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutlierOutcome {
    Filtered(OutlierStep),
    Skipped { column: String, reason: String },
}

impl OutlierOutcome {
    pub fn removed(&self) -> usize {
        match self {
            OutlierOutcome::Filtered(step) => step.removed,
            OutlierOutcome::Skipped { .. } => 0,
        }
    }
}

/// Quantile `q` in [0, 1] of `sorted` by linear interpolation between order
/// statistics at position `q·(n−1)`.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Apply the IQR filter for each column in turn, each on the output of the
/// previous one.
pub fn remove_outliers<S: AsRef<str>>(
    table: &mut RecordTable,
    columns: &[S],
    multiplier: f64,
) -> Vec<OutlierOutcome> {
    columns
        .iter()
        .map(|c| filter_column(table, c.as_ref(), multiplier))
        .collect()
}

/// Keep rows whose `column` value lies in [Q1 − k·IQR, Q3 + k·IQR].
///
/// Rows missing a value in `column` are dropped. Absent, non-numeric, and
/// all-missing columns are skipped.
pub fn filter_column(table: &mut RecordTable, column: &str, multiplier: f64) -> OutlierOutcome {
    let skip = |reason: &str| {
        warn!("Outlier check skipped for '{column}': {reason}");
        OutlierOutcome::Skipped {
            column: column.to_string(),
            reason: reason.to_string(),
        }
    };

    let Some(col) = table.column(column) else {
        return skip("column not present");
    };
    if !col.kind.is_numeric() {
        return skip(&format!("column is {}, not numeric", col.kind));
    }

    let mut sorted = col.numeric_values();
    sorted.sort_by(f64::total_cmp);
    let (Some(q1), Some(q3)) = (quantile(&sorted, 0.25), quantile(&sorted, 0.75)) else {
        return skip("no values");
    };
    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    let keep: Vec<bool> = col
        .values
        .iter()
        .map(|v| v.as_f64().is_some_and(|x| x >= lower && x <= upper))
        .collect();
    let removed = keep.iter().filter(|k| !**k).count();
    if removed > 0 {
        table.retain_rows(&keep);
    }

    info!(
        "Outlier filter '{column}': Q1={q1} Q3={q3} IQR={iqr} bounds=[{lower}, {upper}] removed {removed}, {} rows remain",
        table.len()
    );

    OutlierOutcome::Filtered(OutlierStep {
        column: column.to_string(),
        q1,
        q3,
        iqr,
        lower,
        upper,
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column};

    fn prices(values: &[f64]) -> RecordTable {
        let cells = values.iter().map(|&v| CellValue::Float(v)).collect();
        RecordTable::from_columns(vec![Column::new("price", cells)]).unwrap()
    }

    #[test]
    fn removes_the_extreme_price() {
        let mut table = prices(&[10.0, 12.0, 11.0, 1000.0, 13.0, 9.0]);
        let OutlierOutcome::Filtered(step) = filter_column(&mut table, "price", 1.5) else {
            panic!("price should be filtered");
        };
        assert!((step.q1 - 10.25).abs() < 1e-9);
        assert!((step.q3 - 12.75).abs() < 1e-9);
        assert!((step.iqr - 2.5).abs() < 1e-9);
        assert!((step.lower - 6.5).abs() < 1e-9);
        assert!((step.upper - 16.5).abs() < 1e-9);
        assert_eq!(step.removed, 1);
        assert_eq!(table.len(), 5);
        assert!(table
            .column("price")
            .unwrap()
            .numeric_values()
            .iter()
            .all(|&p| p != 1000.0));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut table = prices(&[10.0, 12.0, 11.0, 1000.0, 13.0, 9.0]);
        filter_column(&mut table, "price", 1.5);
        let outcome = filter_column(&mut table, "price", 1.5);
        assert_eq!(outcome.removed(), 0);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn absent_and_text_columns_are_skipped() {
        let mut table = RecordTable::from_columns(vec![Column::new(
            "city",
            vec![CellValue::Text("rio".into())],
        )])
        .unwrap();
        let outcomes = remove_outliers(&mut table, &["price", "city"], 1.5);
        assert!(matches!(outcomes[0], OutlierOutcome::Skipped { .. }));
        assert!(matches!(outcomes[1], OutlierOutcome::Skipped { .. }));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn later_columns_see_the_shrunk_table() {
        let table = RecordTable::from_columns(vec![
            Column::new(
                "price",
                [1.0, 2.0, 3.0, 4.0, 500.0].iter().map(|&v| CellValue::Float(v)).collect(),
            ),
            Column::new(
                "freight_value",
                [1.0, 1.0, 1.0, 1.0, 1.0].iter().map(|&v| CellValue::Float(v)).collect(),
            ),
        ])
        .unwrap();
        let mut t = table.clone();
        let outcomes = remove_outliers(&mut t, &["price", "freight_value"], 1.5);
        assert_eq!(outcomes[0].removed(), 1);
        assert_eq!(outcomes[1].removed(), 0);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [9.0, 10.0, 11.0, 12.0, 13.0, 1000.0];
        assert_eq!(quantile(&sorted, 0.0), Some(9.0));
        assert_eq!(quantile(&sorted, 1.0), Some(1000.0));
        assert_eq!(quantile(&[5.0], 0.25), Some(5.0));
        assert_eq!(quantile(&[], 0.5), None);
    }
}
