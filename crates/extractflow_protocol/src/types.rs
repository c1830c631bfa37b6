//! Canonical data model types

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::defaults::{DEFAULT_NAMESPACE, DEFAULT_TABLE};
use crate::error::{ProtocolError, Result};

// ============================================================================
// Column types
// ============================================================================

/// Semantic type of an extract column.
///
/// Closed set: every column of every extract is exactly one of these.
///
/// # Arrow Mapping
///
/// | ColumnType | Arrow |
/// |------------|-------|
/// | Integer | Int64 |
/// | Float | Float64 |
/// | Text | Utf8 |
/// | Date | Date32 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// UTF-8 string (default/fallback)
    #[default]
    Text,
    /// Calendar date (no time component)
    Date,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
        }
    }

    /// Return the Arrow type name for this column type.
    pub fn arrow_type_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "Int64",
            ColumnType::Float => "Float64",
            ColumnType::Text => "Utf8",
            ColumnType::Date => "Date32",
        }
    }

    pub fn all() -> [ColumnType; 4] {
        [
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Text,
            ColumnType::Date,
        ]
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "integer" | "int" | "int64" => Ok(ColumnType::Integer),
            "float" | "double" | "float64" => Ok(ColumnType::Float),
            "text" | "string" | "utf8" => Ok(ColumnType::Text),
            "date" | "datetime" | "timestamp" => Ok(ColumnType::Date),
            _ => Err(ProtocolError::InvalidColumnType(s.to_string())),
        }
    }
}

// ============================================================================
// Values, rows, datasets
// ============================================================================

/// A nullable scalar cell of the loosely-typed input.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the runtime kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An ordered mapping from column name to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, preserving insertion order.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

/// An ordered batch of rows sharing one column order.
///
/// Stored row-major with the column names held once; every row has exactly
/// `columns().len()` values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Empty dataset with the given column order.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row of values in column order.
    pub fn push_row(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(ProtocolError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        self.rows.push(values);
        Ok(())
    }

    /// Build from named rows. The first row fixes the column order; every
    /// other row must repeat it exactly.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self> {
        let mut iter = rows.into_iter();
        let first = match iter.next() {
            Some(row) => row,
            None => return Ok(Self::default()),
        };
        let columns: Vec<String> = first.names().map(str::to_string).collect();
        let mut dataset = Self::new(columns);
        dataset.rows.push(first.into_values());

        for (idx, row) in iter.enumerate() {
            if !row.names().eq(dataset.columns.iter().map(String::as_str)) {
                return Err(ProtocolError::ColumnOrderMismatch {
                    row: idx + 1,
                    expected: dataset.columns.clone(),
                    got: row.names().map(str::to_string).collect(),
                });
            }
            dataset.rows.push(row.into_values());
        }
        Ok(dataset)
    }

    /// Build from whole columns of equal length.
    pub fn from_columns<N: Into<String>>(columns: Vec<(N, Vec<Value>)>) -> Result<Self> {
        let columns: Vec<(String, Vec<Value>)> =
            columns.into_iter().map(|(n, v)| (n.into(), v)).collect();
        let height = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        for (name, values) in &columns {
            if values.len() != height {
                return Err(ProtocolError::ColumnLength {
                    name: name.clone(),
                    expected: height,
                    got: values.len(),
                });
            }
        }

        let names = columns.iter().map(|(n, _)| n.clone()).collect();
        let mut iters: Vec<_> = columns.into_iter().map(|(_, v)| v.into_iter()).collect();
        let rows = (0..height)
            .map(|_| iters.iter_mut().filter_map(Iterator::next).collect())
            .collect();

        Ok(Self {
            columns: names,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Namespace-qualified table identity inside an extract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub namespace: String,
    pub name: String,
}

impl TableName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_TABLE)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for TableName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [name] if !name.trim().is_empty() => Ok(TableName::new(DEFAULT_NAMESPACE, *name)),
            [ns, name] if !ns.trim().is_empty() && !name.trim().is_empty() => {
                Ok(TableName::new(*ns, *name))
            }
            _ => Err(ProtocolError::InvalidTableName(s.to_string())),
        }
    }
}

/// One named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered, validated column list paired with a table identity.
///
/// Column names are unique and there is at least one column. Once built it
/// cannot be mutated; deserialization goes through the same validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SchemaRepr")]
pub struct Schema {
    table: TableName,
    columns: Vec<ColumnDef>,
}

#[derive(Deserialize)]
struct SchemaRepr {
    table: TableName,
    columns: Vec<ColumnDef>,
}

impl TryFrom<SchemaRepr> for Schema {
    type Error = ProtocolError;

    fn try_from(repr: SchemaRepr) -> Result<Self> {
        Schema::try_new(repr.table, repr.columns)
    }
}

impl Schema {
    pub fn try_new(table: TableName, columns: Vec<ColumnDef>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ProtocolError::EmptySchema);
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ProtocolError::DuplicateColumn {
                    name: column.name.clone(),
                });
            }
        }
        Ok(Self { table, columns })
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Same ordered (name, type) list. The table identity is ignored.
    pub fn is_structurally_equal(&self, other: &Schema) -> bool {
        self.columns == other.columns
    }

    /// Describe the first structural difference, if any.
    pub fn structural_diff(&self, other: &Schema) -> Option<String> {
        if self.columns.len() != other.columns.len() {
            return Some(format!(
                "expected {} columns, got {}",
                self.columns.len(),
                other.columns.len()
            ));
        }
        self.columns
            .iter()
            .zip(other.columns.iter())
            .enumerate()
            .find(|(_, (a, b))| a != b)
            .map(|(i, (a, b))| {
                format!(
                    "column {}: expected {}:{}, got {}:{}",
                    i, a.name, a.column_type, b.name, b.column_type
                )
            })
    }

    pub fn fingerprint(&self) -> String {
        crate::fingerprint::schema_fingerprint(self)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.table)?;
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", column.name, column.column_type)?;
        }
        write!(f, "}}")
    }
}

// ============================================================================
// Conflict-resolution modes
// ============================================================================

fn normalize_mode(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .collect::<String>()
        .to_lowercase()
}

/// How building an extract interacts with an extract already at the path.
///
/// Deserializes through [`FromStr`], so `create-and-replace`,
/// `CREATE_AND_REPLACE` and `CreateAndReplace` all parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum CreateMode {
    /// Discard any existing extract, build fresh.
    #[serde(rename = "create_and_replace")]
    AndReplace,
    /// Same effect as `AndReplace`; absence is not noteworthy.
    #[default]
    #[serde(rename = "create_or_replace")]
    OrReplace,
    /// Existing extract with an equal schema required; rows appended.
    #[serde(rename = "create_and_append")]
    AndAppend,
    /// Replace when absent, append when present.
    #[serde(rename = "create_or_append")]
    OrAppend,
    /// Path must be empty.
    #[serde(rename = "create_only")]
    Only,
}

impl CreateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateMode::AndReplace => "create_and_replace",
            CreateMode::OrReplace => "create_or_replace",
            CreateMode::AndAppend => "create_and_append",
            CreateMode::OrAppend => "create_or_append",
            CreateMode::Only => "create_only",
        }
    }

    pub fn all() -> [CreateMode; 5] {
        [
            CreateMode::AndReplace,
            CreateMode::OrReplace,
            CreateMode::AndAppend,
            CreateMode::OrAppend,
            CreateMode::Only,
        ]
    }
}

impl fmt::Display for CreateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CreateMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_mode(s).as_str() {
            "createandreplace" => Ok(CreateMode::AndReplace),
            "createorreplace" => Ok(CreateMode::OrReplace),
            "createandappend" => Ok(CreateMode::AndAppend),
            "createorappend" => Ok(CreateMode::OrAppend),
            "createonly" => Ok(CreateMode::Only),
            _ => Err(ProtocolError::InvalidCreateMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for CreateMode {
    type Error = ProtocolError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// How a committed extract is merged into a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum PublishMode {
    /// Replace the entry's content, creating it if needed.
    #[default]
    Overwrite,
    /// Merge rows into an existing entry with an equal schema.
    Append,
    /// Entry must not exist yet.
    CreateNew,
}

impl PublishMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishMode::Overwrite => "overwrite",
            PublishMode::Append => "append",
            PublishMode::CreateNew => "create_new",
        }
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PublishMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_mode(s).as_str() {
            "overwrite" => Ok(PublishMode::Overwrite),
            "append" => Ok(PublishMode::Append),
            "createnew" => Ok(PublishMode::CreateNew),
            _ => Err(ProtocolError::InvalidPublishMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for PublishMode {
    type Error = ProtocolError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Identity of a catalog entry: a named datasource inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogTarget {
    pub project: String,
    pub name: String,
}

impl CatalogTarget {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CatalogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.name)
    }
}
