use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::clean::derive::PURCHASE_MONTH_COLUMN;
use crate::data::filter::{CATEGORY_COLUMN, CITY_COLUMN, PAYMENT_COLUMN};
use crate::data::model::{CellValue, Column, RecordTable};
use crate::error::{DashboardError, Result};

pub const ORDER_ID_COLUMN: &str = "order_id";
pub const ORDER_ITEM_ID_COLUMN: &str = "order_item_id";

// ---------------------------------------------------------------------------
// Purchases per month and category
// ---------------------------------------------------------------------------

/// Month × category purchase counts; absent combinations are zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyCategoryCounts {
    /// Sorted `YYYY-MM` labels (rows).
    pub months: Vec<String>,
    /// Sorted category names (columns).
    pub categories: Vec<String>,
    /// `counts[m][c]` for `months[m]` and `categories[c]`.
    pub counts: Vec<Vec<usize>>,
}

impl MonthlyCategoryCounts {
    pub fn get(&self, month: &str, category: &str) -> usize {
        let m = self.months.iter().position(|x| x == month);
        let c = self.categories.iter().position(|x| x == category);
        match (m, c) {
            (Some(m), Some(c)) => self.counts[m][c],
            _ => 0,
        }
    }

    /// Total purchases in one month, across categories.
    pub fn month_total(&self, month: &str) -> usize {
        self.months
            .iter()
            .position(|x| x == month)
            .map_or(0, |m| self.counts[m].iter().sum())
    }
}

/// Count non-missing `order_item_id` per (`purchase_month`, category).
pub fn monthly_category_counts(table: &RecordTable) -> Result<MonthlyCategoryCounts> {
    let months = require(table, PURCHASE_MONTH_COLUMN)?;
    let categories = require(table, CATEGORY_COLUMN)?;
    let items = require(table, ORDER_ITEM_ID_COLUMN)?;

    let mut grouped: BTreeMap<(String, String), usize> = BTreeMap::new();
    for row in 0..table.len() {
        let (m, c, i) = (&months.values[row], &categories.values[row], &items.values[row]);
        if m.is_null() || c.is_null() || i.is_null() {
            continue;
        }
        *grouped.entry((m.to_string(), c.to_string())).or_default() += 1;
    }

    let month_labels: Vec<String> = grouped
        .keys()
        .map(|(m, _)| m.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let category_labels: Vec<String> = grouped
        .keys()
        .map(|(_, c)| c.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let counts = month_labels
        .iter()
        .map(|m| {
            category_labels
                .iter()
                .map(|c| grouped.get(&(m.clone(), c.clone())).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    Ok(MonthlyCategoryCounts {
        months: month_labels,
        categories: category_labels,
        counts,
    })
}

// ---------------------------------------------------------------------------
// Cities and payment methods
// ---------------------------------------------------------------------------

/// The `n` cities with the most distinct orders, largest first.
pub fn top_cities(table: &RecordTable, n: usize) -> Result<Vec<(String, usize)>> {
    let cities = require(table, CITY_COLUMN)?;
    let orders = require(table, ORDER_ID_COLUMN)?;

    let mut distinct: HashMap<String, HashSet<&CellValue>> = HashMap::new();
    for (city, order) in cities.values.iter().zip(&orders.values) {
        if city.is_null() || order.is_null() {
            continue;
        }
        distinct.entry(city.to_string()).or_default().insert(order);
    }

    let mut ranked: Vec<(String, usize)> = distinct
        .into_iter()
        .map(|(city, orders)| (city, orders.len()))
        .collect();
    sort_by_count(&mut ranked);
    ranked.truncate(n);
    Ok(ranked)
}

/// Rows per payment method, most used first.
pub fn payment_distribution(table: &RecordTable) -> Result<Vec<(String, usize)>> {
    let payments = require(table, PAYMENT_COLUMN)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for p in payments.values.iter().filter(|p| !p.is_null()) {
        *counts.entry(p.to_string()).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    sort_by_count(&mut ranked);
    Ok(ranked)
}

fn sort_by_count(ranked: &mut [(String, usize)]) {
    ranked.sort_by(|(na, ca), (nb, cb)| cb.cmp(ca).then_with(|| na.cmp(nb)));
}

fn require<'a>(table: &'a RecordTable, column: &str) -> Result<&'a Column> {
    table
        .column(column)
        .ok_or_else(|| DashboardError::MissingColumn(column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> RecordTable {
        let header = [
            ORDER_ID_COLUMN,
            ORDER_ITEM_ID_COLUMN,
            PURCHASE_MONTH_COLUMN,
            CATEGORY_COLUMN,
            CITY_COLUMN,
            PAYMENT_COLUMN,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let row = |order: &str, item: i64, month: &str, cat: &str, city: &str, pay: &str| {
            vec![
                CellValue::from(order),
                CellValue::Integer(item),
                CellValue::from(month),
                CellValue::from(cat),
                CellValue::from(city),
                CellValue::from(pay),
            ]
        };
        let rows = vec![
            row("o1", 1, "2018-01", "toys", "rio", "credit_card"),
            row("o1", 2, "2018-01", "toys", "rio", "credit_card"),
            row("o2", 1, "2018-01", "books", "recife", "boleto"),
            row("o3", 1, "2018-02", "toys", "rio", "credit_card"),
            row("o4", 1, "2018-02", "books", "natal", "voucher"),
        ];
        RecordTable::from_rows(header, rows).unwrap()
    }

    #[test]
    fn monthly_counts_pivot() {
        let pivot = monthly_category_counts(&sales()).unwrap();
        assert_eq!(pivot.months, vec!["2018-01", "2018-02"]);
        assert_eq!(pivot.categories, vec!["books", "toys"]);
        assert_eq!(pivot.get("2018-01", "toys"), 2);
        assert_eq!(pivot.get("2018-02", "books"), 1);
        assert_eq!(pivot.get("2019-01", "toys"), 0);
        assert_eq!(pivot.month_total("2018-01"), 3);
    }

    #[test]
    fn cities_rank_by_distinct_orders() {
        let ranked = top_cities(&sales(), 2).unwrap();
        assert_eq!(ranked, vec![("rio".to_string(), 2), ("natal".to_string(), 1)]);
    }

    #[test]
    fn payments_rank_by_rows() {
        let ranked = payment_distribution(&sales()).unwrap();
        assert_eq!(ranked[0], ("credit_card".to_string(), 3));
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[1], ("boleto".to_string(), 1));
    }

    #[test]
    fn missing_column_is_reported() {
        let table = RecordTable::from_rows(vec!["price".into()], vec![]).unwrap();
        assert!(matches!(
            payment_distribution(&table),
            Err(DashboardError::MissingColumn(c)) if c == PAYMENT_COLUMN
        ));
    }
}
