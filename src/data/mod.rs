/// Data layer: core types, loading, merging, and filtering.
///
/// Architecture:
/// ```text
///  *.csv / *.json / *.parquet   (one directory)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse each file → RecordTable, skip failures
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  merge    │  concat (same schema) or outer join (shared columns)
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ RecordTable  │  named, typed columns aligned by row
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply selections / price range → row indices
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod merge;
pub mod model;
