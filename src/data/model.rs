use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// CellValue – a single cell in a column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
/// Used as a `BTreeSet` element and a `HashSet` key, so it must be `Ord + Hash`.
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Null,
}

// -- Manual Eq/Ord/Hash: floats compare by total order and hash by bits --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                Timestamp(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Timestamp(t) => t.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_DISPLAY)),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::float(f)
    }
}

const TIMESTAMP_DISPLAY: &str = "%Y-%m-%d %H:%M:%S";

/// Field contents that Pandas' `read_csv` treats as missing by default.
pub const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

impl CellValue {
    /// Interpret the value as an `f64` when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Float cell with NaN read as missing and `-0.0` folded into `0.0`.
    pub fn float(v: f64) -> CellValue {
        if v.is_nan() {
            CellValue::Null
        } else if v == 0.0 {
            CellValue::Float(0.0)
        } else {
            CellValue::Float(v)
        }
    }

    /// Guess the type of a raw text field.
    ///
    /// Order: null token → integer → float → bool → timestamp → text.
    pub fn guess(raw: &str) -> CellValue {
        let s = raw.trim();
        if NULL_TOKENS.contains(&s) {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::float(f);
        }
        if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
            return CellValue::Bool(s.eq_ignore_ascii_case("true"));
        }
        if let Some(ts) = parse_timestamp(s) {
            return CellValue::Timestamp(ts);
        }
        CellValue::Text(raw.to_string())
    }
}

// ---------------------------------------------------------------------------
// Field – a cell as read from a file, before its column is classified
// ---------------------------------------------------------------------------

/// Source field handed to [`Column::from_fields`].
///
/// `Raw` text is type-guessed but kept, so a column that falls back to text
/// holds exactly what the file said (`"007"` stays `"007"`).
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Raw(String),
    Typed(CellValue),
}

impl Field {
    fn guess(&self) -> CellValue {
        match self {
            Field::Raw(s) => CellValue::guess(s),
            Field::Typed(v) => v.clone(),
        }
    }
}

impl From<CellValue> for Field {
    fn from(v: CellValue) -> Self {
        Field::Typed(v)
    }
}

/// Parse the timestamp layouts found in sales exports.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for layout in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(ts);
        }
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ---------------------------------------------------------------------------
// Column classification
// ---------------------------------------------------------------------------

/// Kind of a column, inferred purely from the values it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Bool,
    Timestamp,
    Text,
    /// Every value is missing.
    Empty,
}

impl ColumnKind {
    /// Numeric columns are imputed with the median, everything else with the mode.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, ColumnKind::Text | ColumnKind::Bool | ColumnKind::Timestamp)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Integer => "int",
            ColumnKind::Float => "float",
            ColumnKind::Bool => "bool",
            ColumnKind::Timestamp => "timestamp",
            ColumnKind::Text => "text",
            ColumnKind::Empty => "empty",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Column – one named, homogeneous vector of cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<CellValue>,
}

impl Column {
    /// Build a column and coerce its values to a single kind.
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        let mut column = Column {
            name: name.into(),
            kind: ColumnKind::Empty,
            values,
        };
        column.normalize();
        column
    }

    /// Build a column from source fields. When the column ends up `Text`,
    /// raw fields keep their original spelling instead of the guessed
    /// value's rendering.
    pub fn from_fields(name: impl Into<String>, fields: Vec<Field>) -> Self {
        let values = fields.iter().map(Field::guess).collect();
        let mut column = Column::new(name, values);
        if column.kind == ColumnKind::Text {
            for (v, field) in column.values.iter_mut().zip(fields) {
                if let (false, Field::Raw(raw)) = (v.is_null(), field) {
                    *v = CellValue::Text(raw);
                }
            }
        }
        column
    }

    /// Re-derive `kind` from the values and make them homogeneous.
    ///
    /// Integers mixed with floats are widened to floats; any other mix is
    /// rendered as text.
    pub fn normalize(&mut self) {
        let mut int = false;
        let mut float = false;
        let mut boolean = false;
        let mut ts = false;
        let mut text = false;
        for v in &self.values {
            match v {
                CellValue::Integer(_) => int = true,
                CellValue::Float(_) => float = true,
                CellValue::Bool(_) => boolean = true,
                CellValue::Timestamp(_) => ts = true,
                CellValue::Text(_) => text = true,
                CellValue::Null => {}
            }
        }

        self.kind = match (int, float, boolean, ts, text) {
            (false, false, false, false, false) => ColumnKind::Empty,
            (true, false, false, false, false) => ColumnKind::Integer,
            (_, true, false, false, false) => ColumnKind::Float,
            (false, false, true, false, false) => ColumnKind::Bool,
            (false, false, false, true, false) => ColumnKind::Timestamp,
            _ => ColumnKind::Text,
        };

        match self.kind {
            ColumnKind::Float => self.widen_to_float(),
            ColumnKind::Text => {
                for v in &mut self.values {
                    if !matches!(v, CellValue::Text(_) | CellValue::Null) {
                        *v = CellValue::Text(v.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    /// Convert every integer cell to a float and mark the column `Float`.
    pub fn widen_to_float(&mut self) {
        for v in &mut self.values {
            if let CellValue::Integer(i) = v {
                *v = CellValue::Float(*i as f64);
            }
        }
        self.kind = ColumnKind::Float;
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Non-missing values as `f64`, in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(CellValue::as_f64).collect()
    }
}

// ---------------------------------------------------------------------------
// RecordTable – the complete loaded table
// ---------------------------------------------------------------------------

/// Column-oriented table; every column has the same number of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl RecordTable {
    /// Build a table from columns, checking that they line up.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, String> {
        let n_rows = columns.first().map_or(0, |c| c.values.len());
        for col in &columns {
            if col.values.len() != n_rows {
                return Err(format!(
                    "column '{}' has {} rows, expected {n_rows}",
                    col.name,
                    col.values.len()
                ));
            }
        }
        let mut seen = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(format!("duplicate column name '{}'", col.name));
            }
        }
        Ok(RecordTable { columns, n_rows })
    }

    /// Build a table from a header and row-major cells; short rows are padded
    /// with `Null`.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, String> {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Field::Typed).collect())
            .collect();
        Self::from_fields(header, rows)
    }

    /// Like [`RecordTable::from_rows`], from fields as read from a file.
    pub fn from_fields(header: Vec<String>, rows: Vec<Vec<Field>>) -> Result<Self, String> {
        let mut values: Vec<Vec<Field>> = vec![Vec::with_capacity(rows.len()); header.len()];
        for (row_no, row) in rows.into_iter().enumerate() {
            if row.len() > header.len() {
                return Err(format!(
                    "row {row_no} has {} fields but the header has {}",
                    row.len(),
                    header.len()
                ));
            }
            let mut row = row.into_iter();
            for col in values.iter_mut() {
                col.push(row.next().unwrap_or(Field::Typed(CellValue::Null)));
            }
        }
        let columns = header
            .into_iter()
            .zip(values)
            .map(|(name, fields)| Column::from_fields(name, fields))
            .collect();
        Self::from_columns(columns)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Ordered list of column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Cell at (`row`, `column`), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// All cells of one row, in column order.
    pub fn row(&self, index: usize) -> Vec<&CellValue> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// Append a column, replacing any existing column of the same name.
    pub fn set_column(&mut self, column: Column) -> Result<(), String> {
        if !self.columns.is_empty() && column.values.len() != self.n_rows {
            return Err(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.values.len(),
                self.n_rows
            ));
        }
        if self.columns.is_empty() {
            self.n_rows = column.values.len();
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Keep only rows whose entry in `keep` is true. `keep.len()` must equal
    /// `self.len()`.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.n_rows);
        for col in &mut self.columns {
            let mut flags = keep.iter();
            col.values.retain(|_| *flags.next().unwrap_or(&false));
        }
        self.n_rows = keep.iter().filter(|k| **k).count();
    }

    /// New table holding the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> RecordTable {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                kind: c.kind,
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        RecordTable {
            columns,
            n_rows: indices.len(),
        }
    }

    /// Sorted set of distinct values in a column.
    pub fn unique_values(&self, column: &str) -> BTreeSet<CellValue> {
        self.column(column)
            .map(|c| c.values.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Re-classify every column after cells were combined from several sources.
    pub fn normalize(&mut self) {
        for col in &mut self.columns {
            col.normalize();
        }
    }
}
