use log::debug;

use crate::data::model::{parse_timestamp, CellValue, Column, RecordTable};

pub const PURCHASE_TIMESTAMP_COLUMN: &str = "order_purchase_timestamp";
pub const PURCHASE_MONTH_COLUMN: &str = "purchase_month";

/// Parse `order_purchase_timestamp` and add a `purchase_month` column holding
/// `YYYY-MM`. Returns false when the timestamp column is absent.
pub fn derive_purchase_month(table: &mut RecordTable) -> bool {
    let Some(ts_col) = table.column_mut(PURCHASE_TIMESTAMP_COLUMN) else {
        return false;
    };

    for v in &mut ts_col.values {
        *v = match v {
            CellValue::Timestamp(_) | CellValue::Null => continue,
            CellValue::Text(s) => parse_timestamp(s).map_or(CellValue::Null, CellValue::Timestamp),
            _ => CellValue::Null,
        };
    }
    ts_col.normalize();

    let months: Vec<CellValue> = ts_col
        .values
        .iter()
        .map(|v| match v {
            CellValue::Timestamp(t) => CellValue::Text(t.format("%Y-%m").to_string()),
            _ => CellValue::Null,
        })
        .collect();
    let unparsed = months.iter().filter(|m| m.is_null()).count();
    debug!("Derived {PURCHASE_MONTH_COLUMN}; {unparsed} row(s) without a timestamp");

    // Same length as the table by construction.
    table
        .set_column(Column::new(PURCHASE_MONTH_COLUMN, months))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_comes_from_parsed_timestamp() {
        let mut table = RecordTable::from_rows(
            vec![PURCHASE_TIMESTAMP_COLUMN.into()],
            vec![
                vec![CellValue::guess("2017-10-02 10:56:33")],
                vec![CellValue::Text("garbage".into())],
                vec![CellValue::Null],
            ],
        )
        .unwrap();
        assert!(derive_purchase_month(&mut table));
        assert_eq!(
            table.value(0, PURCHASE_MONTH_COLUMN),
            Some(&CellValue::Text("2017-10".into()))
        );
        assert!(table.value(1, PURCHASE_MONTH_COLUMN).unwrap().is_null());
        assert!(table.value(2, PURCHASE_MONTH_COLUMN).unwrap().is_null());
    }

    #[test]
    fn absent_timestamp_is_a_no_op() {
        let mut table = RecordTable::from_rows(
            vec!["price".into()],
            vec![vec![CellValue::Float(1.0)]],
        )
        .unwrap();
        assert!(!derive_purchase_month(&mut table));
        assert!(!table.has_column(PURCHASE_MONTH_COLUMN));
    }
}
