use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};
use serde::Deserialize;

use super::model::{CellValue, Column, RecordTable};

/// How the per-file tables are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Concatenate when every schema matches, outer-join otherwise.
    #[default]
    Auto,
    /// Stack rows; columns absent from a file are filled with `Null`.
    Concat,
    /// Outer-join left to right on the columns each pair shares.
    OuterJoin,
}

/// Combine tables with `strategy`, returning the merged table and the
/// strategy that was actually applied (`Auto` resolves to one of the others).
pub fn merge_tables(
    tables: Vec<RecordTable>,
    strategy: MergeStrategy,
) -> (RecordTable, MergeStrategy) {
    let resolved = match strategy {
        MergeStrategy::Auto if same_schema(&tables) => MergeStrategy::Concat,
        MergeStrategy::Auto => MergeStrategy::OuterJoin,
        other => other,
    };

    let mut merged = match resolved {
        MergeStrategy::OuterJoin => {
            let mut iter = tables.into_iter();
            let first = iter.next().unwrap_or_default();
            iter.fold(first, |acc, next| outer_join(&acc, &next))
        }
        _ => concat(tables),
    };
    merged.normalize();
    (merged, resolved)
}

/// Whether every table has the same set of column names.
pub fn same_schema(tables: &[RecordTable]) -> bool {
    let mut sets = tables
        .iter()
        .map(|t| t.column_names().into_iter().collect::<BTreeSet<_>>());
    match sets.next() {
        Some(first) => sets.all(|s| s == first),
        None => true,
    }
}

/// Stack rows of all tables over the union of their columns.
///
/// Column order follows first appearance, so identical schemas keep the
/// first table's order.
pub fn concat(tables: Vec<RecordTable>) -> RecordTable {
    let mut names: Vec<String> = Vec::new();
    for table in &tables {
        for name in table.column_names() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }

    let total: usize = tables.iter().map(RecordTable::len).sum();
    let mut values: Vec<Vec<CellValue>> = vec![Vec::with_capacity(total); names.len()];
    for table in &tables {
        for (name, out) in names.iter().zip(values.iter_mut()) {
            match table.column(name) {
                Some(col) => out.extend(col.values.iter().cloned()),
                None => out.extend(std::iter::repeat(CellValue::Null).take(table.len())),
            }
        }
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(values)
        .map(|(name, vals)| Column::new(name, vals))
        .collect();
    // Column lengths all equal `total` and names are unique by construction.
    RecordTable::from_columns(columns).unwrap_or_default()
}

/// Full outer join of `left` and `right` on the columns they share.
///
/// Output rows: each left row with its right matches (right order), or alone
/// when unmatched; then every right row that matched nothing. Many-to-many
/// keys yield the cross product. Output columns: all left columns, then the
/// right-only columns. With no shared column there is no key and the tables
/// are stacked instead.
pub fn outer_join(left: &RecordTable, right: &RecordTable) -> RecordTable {
    let keys: Vec<&str> = left
        .column_names()
        .into_iter()
        .filter(|name| right.has_column(name))
        .collect();

    if keys.is_empty() {
        warn!(
            "No shared columns between {:?} and {:?}; stacking rows instead of joining",
            left.column_names(),
            right.column_names()
        );
        return concat(vec![left.clone(), right.clone()]);
    }
    debug!("Outer join on {keys:?}");

    let key_of = |table: &RecordTable, row: usize| -> Vec<CellValue> {
        keys.iter()
            .map(|k| table.value(row, k).cloned().unwrap_or(CellValue::Null))
            .collect()
    };

    let mut right_index: HashMap<Vec<CellValue>, Vec<usize>> = HashMap::new();
    for row in 0..right.len() {
        right_index.entry(key_of(right, row)).or_default().push(row);
    }

    // (left row, right row) pairs in output order.
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
    let mut right_matched = vec![false; right.len()];
    for l in 0..left.len() {
        match right_index.get(&key_of(left, l)) {
            Some(matches) => {
                for &r in matches {
                    right_matched[r] = true;
                    pairs.push((Some(l), Some(r)));
                }
            }
            None => pairs.push((Some(l), None)),
        }
    }
    for (r, matched) in right_matched.iter().enumerate() {
        if !matched {
            pairs.push((None, Some(r)));
        }
    }

    let mut columns: Vec<Column> = Vec::new();
    for col in left.columns() {
        let is_key = keys.contains(&col.name.as_str());
        let right_col = if is_key { right.column(&col.name) } else { None };
        let values = pairs
            .iter()
            .map(|&(l, r)| match (l, r, right_col) {
                (Some(l), _, _) => col.values[l].clone(),
                (None, Some(r), Some(rc)) => rc.values[r].clone(),
                _ => CellValue::Null,
            })
            .collect();
        columns.push(Column::new(col.name.clone(), values));
    }
    for col in right.columns() {
        if left.has_column(&col.name) {
            continue;
        }
        let values = pairs
            .iter()
            .map(|&(_, r)| r.map_or(CellValue::Null, |r| col.values[r].clone()))
            .collect();
        columns.push(Column::new(col.name.clone(), values));
    }

    RecordTable::from_columns(columns).unwrap_or_default()
}
