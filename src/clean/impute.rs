use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use crate::data::model::{CellValue, Column, ColumnKind, RecordTable};

/// What imputation did to the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputeReport {
    /// Column name → number of cells filled.
    pub filled: BTreeMap<String, usize>,
    /// Columns with no value to impute from; left missing.
    pub unfilled: Vec<String>,
}

impl ImputeReport {
    pub fn total_filled(&self) -> usize {
        self.filled.values().sum()
    }
}

/// Fill missing cells in place: numeric columns with their median,
/// categorical columns with their mode.
pub fn impute_missing(table: &mut RecordTable) -> ImputeReport {
    let mut report = ImputeReport::default();

    for col in table.columns_mut() {
        let missing = col.null_count();
        if missing == 0 {
            continue;
        }

        let filled = match col.kind {
            k if k.is_numeric() => fill_with_median(col),
            k if k.is_categorical() => fill_with_mode(col),
            _ => None,
        };

        match filled {
            Some(fill) => {
                debug!("Imputed {missing} missing value(s) in '{}' with {fill}", col.name);
                report.filled.insert(col.name.clone(), missing);
            }
            None => {
                warn!(
                    "Column '{}' has no values to impute from; leaving {missing} cell(s) missing",
                    col.name
                );
                report.unfilled.push(col.name.clone());
            }
        }
    }

    report
}

/// Median of `values`; the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent non-missing value; ties go to the value seen first.
pub fn mode(values: &[CellValue]) -> Option<&CellValue> {
    let mut counts: HashMap<&CellValue, (usize, usize)> = HashMap::new();
    for (pos, v) in values.iter().enumerate().filter(|(_, v)| !v.is_null()) {
        counts.entry(v).or_insert((0, pos)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
        .map(|(v, _)| v)
}

fn fill_with_median(col: &mut Column) -> Option<CellValue> {
    let m = median(&col.numeric_values())?;
    let fill = if col.kind == ColumnKind::Integer && m.fract() == 0.0 {
        CellValue::Integer(m as i64)
    } else {
        if col.kind == ColumnKind::Integer {
            col.widen_to_float();
        }
        CellValue::Float(m)
    };
    fill_nulls(col, &fill);
    Some(fill)
}

fn fill_with_mode(col: &mut Column) -> Option<CellValue> {
    let fill = mode(&col.values)?.clone();
    fill_nulls(col, &fill);
    Some(fill)
}

fn fill_nulls(col: &mut Column, fill: &CellValue) {
    for v in col.values.iter_mut().filter(|v| v.is_null()) {
        *v = fill.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn single(name: &str, values: Vec<CellValue>) -> RecordTable {
        RecordTable::from_columns(vec![Column::new(name, values)]).unwrap()
    }

    #[test]
    fn categorical_gap_takes_the_mode() {
        let mut table = single(
            "category",
            vec![text("A"), text("B"), text("A"), text("A"), CellValue::Null],
        );
        let report = impute_missing(&mut table);
        assert_eq!(table.value(4, "category"), Some(&text("A")));
        assert_eq!(report.filled.get("category"), Some(&1));
    }

    #[test]
    fn mode_ties_go_to_first_seen() {
        let values = vec![text("B"), text("A"), text("A"), text("B"), CellValue::Null];
        assert_eq!(mode(&values), Some(&text("B")));
        assert_eq!(mode(&[CellValue::Null]), None);
    }

    #[test]
    fn numeric_gap_takes_the_median() {
        let mut table = single(
            "price",
            vec![
                CellValue::Float(1.0),
                CellValue::Null,
                CellValue::Float(3.0),
                CellValue::Float(100.0),
            ],
        );
        impute_missing(&mut table);
        assert_eq!(table.value(1, "price"), Some(&CellValue::Float(3.0)));
        assert_eq!(table.column("price").unwrap().null_count(), 0);
    }

    #[test]
    fn fractional_integer_median_widens_column() {
        let mut table = single(
            "qty",
            vec![CellValue::Integer(1), CellValue::Integer(2), CellValue::Null],
        );
        impute_missing(&mut table);
        let col = table.column("qty").unwrap();
        assert_eq!(col.kind, ColumnKind::Float);
        assert_eq!(col.values, vec![
            CellValue::Float(1.0),
            CellValue::Float(2.0),
            CellValue::Float(1.5)
        ]);
    }

    #[test]
    fn integral_integer_median_stays_integer() {
        let mut table = single(
            "qty",
            vec![CellValue::Integer(1), CellValue::Integer(5), CellValue::Integer(3), CellValue::Null],
        );
        impute_missing(&mut table);
        assert_eq!(table.value(3, "qty"), Some(&CellValue::Integer(3)));
        assert_eq!(table.column("qty").unwrap().kind, ColumnKind::Integer);
    }

    #[test]
    fn all_missing_column_is_left_and_reported() {
        let mut table = single("notes", vec![CellValue::Null, CellValue::Null]);
        let report = impute_missing(&mut table);
        assert_eq!(report.unfilled, vec!["notes".to_string()]);
        assert_eq!(report.total_filled(), 0);
        assert_eq!(table.column("notes").unwrap().null_count(), 2);
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }
}
