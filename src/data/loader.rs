use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::merge::{MergeStrategy, merge_tables};
use super::model::{CellValue, Field, RecordTable};
use crate::error::DashboardError;

/// Extensions picked up when scanning a directory.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "json", "parquet", "pq"];

/// Options shared by every file read during one ingestion.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub csv_delimiter: u8,
    pub merge_strategy: MergeStrategy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            csv_delimiter: b',',
            merge_strategy: MergeStrategy::Auto,
        }
    }
}

/// A file that could not be read, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of reading a whole directory.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Files that loaded, in read order, with their row counts.
    pub loaded: Vec<(PathBuf, usize)>,
    pub skipped: Vec<SkippedFile>,
    /// Strategy actually applied when combining the files.
    pub strategy: MergeStrategy,
    pub table: RecordTable,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read every supported file in `dir` and merge them into one table.
///
/// Unreadable files are skipped and reported. Returns
/// [`DashboardError::NoData`] when nothing could be loaded, including when
/// `dir` itself cannot be listed.
pub fn load_directory(dir: &Path, options: &LoadOptions) -> crate::Result<LoadReport> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read directory {}: {e}", dir.display());
            return Err(DashboardError::NoData {
                dir: dir.to_path_buf(),
                skipped: 0,
            });
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_supported_extension(p))
        .collect();
    paths.sort();
    debug!("Found {} candidate file(s) in {}", paths.len(), dir.display());

    let mut tables = Vec::with_capacity(paths.len());
    let mut loaded = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        match load_file(&path, options) {
            Ok(table) => {
                info!(
                    "Loaded {} rows with columns {:?} from {}",
                    table.len(),
                    table.column_names(),
                    path.display()
                );
                loaded.push((path, table.len()));
                tables.push(table);
            }
            Err(e) => {
                warn!("Skipping {}: {e:#}", path.display());
                skipped.push(SkippedFile {
                    path,
                    error: format!("{e:#}"),
                });
            }
        }
    }

    if tables.is_empty() {
        return Err(DashboardError::NoData {
            dir: dir.to_path_buf(),
            skipped: skipped.len(),
        });
    }

    let (table, strategy) = merge_tables(tables, options.merge_strategy);
    info!(
        "Merged {} file(s) with {strategy:?}: {} rows x {} columns",
        loaded.len(),
        table.len(),
        table.columns().len()
    );

    Ok(LoadReport {
        loaded,
        skipped,
        strategy,
        table,
    })
}

/// Load a single table from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line
/// * `.json`    – `[{ "order_id": ..., "price": ... }, ...]`
/// * `.parquet` – flat columns of strings, numbers, or booleans
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<RecordTable> {
    let ext = extension_of(path);

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path, options.csv_delimiter)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    if table.columns().is_empty() {
        bail!("{} has no columns", path.display());
    }
    Ok(table)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn has_supported_extension(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(path).as_str())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, types guessed per column.
/// Fields of a column that stays text keep their exact spelling.
fn load_csv(path: &Path, delimiter: u8) -> Result<RecordTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows: Vec<Vec<Field>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(|s| Field::Raw(s.to_string())).collect());
    }

    RecordTable::from_fields(headers, rows).map_err(anyhow::Error::msg)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "order_id": "a1", "price": 12.5, "product_category_name": "toys" },
///   ...
/// ]
/// ```
///
/// Keys missing from a record become `Null`. Columns appear in the order
/// records first introduce them, each record's keys in `serde_json` map order.
fn load_json(path: &Path) -> Result<RecordTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut header: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !header.contains(key) {
                header.push(key.clone());
            }
        }
    }

    let rows: Vec<Vec<Field>> = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            header
                .iter()
                .map(|key| obj.get(key).map_or(Field::Typed(CellValue::Null), json_to_field))
                .collect()
        })
        .collect();

    RecordTable::from_fields(header, rows).map_err(anyhow::Error::msg)
}

fn json_to_field(val: &JsonValue) -> Field {
    let cell = match val {
        JsonValue::String(s) => return Field::Raw(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    };
    Field::Typed(cell)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Strings go through the same type
/// guessing as CSV fields; anything that is not a string, integer, float, or
/// boolean is rendered to text first.
fn load_parquet(path: &Path) -> Result<RecordTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let header: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows: Vec<Vec<Field>> = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_field(col.as_ref(), row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            rows.push(cells);
        }
    }

    RecordTable::from_fields(header, rows).map_err(anyhow::Error::msg)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_field(col: &dyn Array, row: usize) -> Result<Field> {
    if col.is_null(row) {
        return Ok(Field::Typed(CellValue::Null));
    }
    let cell = match col.data_type() {
        DataType::Utf8 => return Ok(Field::Raw(col.as_string::<i32>().value(row).to_string())),
        DataType::LargeUtf8 => {
            return Ok(Field::Raw(col.as_string::<i64>().value(row).to_string()));
        }
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => CellValue::float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        _ => {
            let text = array_value_to_string(col, row)
                .with_context(|| format!("rendering {:?} value", col.data_type()))?;
            return Ok(Field::Raw(text));
        }
    };
    Ok(Field::Typed(cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ColumnKind;
    use std::fs;

    #[test]
    fn csv_types_are_guessed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        fs::write(&path, "order_id,price,city\na1,10.5,rio\na2,,\na3,7,recife\n").unwrap();

        let table = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.column("price").unwrap().kind, ColumnKind::Float);
        assert_eq!(table.column("city").unwrap().kind, ColumnKind::Text);
        assert_eq!(table.column("price").unwrap().null_count(), 1);
    }

    #[test]
    fn mixed_code_column_keeps_source_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.csv");
        fs::write(&path, "code,qty\n007,1\n1.0,1\n1,1\nA12,1\n").unwrap();

        let mut table = load_file(&path, &LoadOptions::default()).unwrap();
        let code = table.column("code").unwrap();
        assert_eq!(code.kind, ColumnKind::Text);
        let expected: Vec<CellValue> = ["007", "1.0", "1", "A12"]
            .iter()
            .map(|s| CellValue::from(*s))
            .collect();
        assert_eq!(code.values, expected);
        assert_eq!(crate::clean::drop_duplicates(&mut table), 0);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn json_negative_zero_matches_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zeros.json");
        fs::write(&path, r#"[{"price": -0.0}, {"price": 0.0}]"#).unwrap();

        let mut table = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(table.value(0, "price"), table.value(1, "price"));
        assert_eq!(crate::clean::drop_duplicates(&mut table), 1);
    }

    #[test]
    fn csv_honours_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("semi.csv");
        fs::write(&path, "id;price\n1;2.5\n").unwrap();

        let options = LoadOptions {
            csv_delimiter: b';',
            ..LoadOptions::default()
        };
        let table = load_file(&path, &options).unwrap();
        assert_eq!(table.column_names(), vec!["id", "price"]);
    }

    #[test]
    fn json_records_fill_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payments.json");
        fs::write(
            &path,
            r#"[{"order_id": "a1", "payment_value": 20.0},
                {"order_id": "a2", "payment_type": "boleto"}]"#,
        )
        .unwrap();

        let table = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(
            table.column_names(),
            vec!["order_id", "payment_value", "payment_type"]
        );
        assert!(table.value(0, "payment_type").unwrap().is_null());
        assert!(table.value(1, "payment_value").unwrap().is_null());
    }

    #[test]
    fn json_must_be_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"order_id": 1}"#).unwrap();
        assert!(load_file(&path, &LoadOptions::default()).is_err());
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let err = load_file(Path::new("notes.txt"), &LoadOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported"));
    }
}
