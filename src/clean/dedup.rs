use std::collections::HashSet;

use log::debug;

use crate::data::model::RecordTable;

/// Drop rows equal to an earlier row in every column, keeping the first
/// occurrence. Returns how many rows were removed.
pub fn drop_duplicates(table: &mut RecordTable) -> usize {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(table.len());
        (0..table.len()).map(|row| seen.insert(table.row(row))).collect()
    };

    let removed = keep.iter().filter(|k| !**k).count();
    if removed > 0 {
        table.retain_rows(&keep);
    }
    debug!("Dropped {removed} duplicate row(s), {} remain", table.len());
    removed
}
