use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{PopulationError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell of a population table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Used as a `BTreeMap` key downstream (category counts) so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Flag(bool),
    Missing,
}

// -- Manual Eq/Ord so we can put Value in BTreeMap --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Missing => 0,
                Flag(_) => 1,
                Number(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Missing, Missing) => std::cmp::Ordering::Equal,
            (Flag(a), Flag(b)) => a.cmp(b),
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Number(f) => f.to_bits().hash(state),
            Value::Flag(b) => b.hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Flag(b) => write!(f, "{b}"),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

// ---------------------------------------------------------------------------
// ColumnValues – typed storage for one column
// ---------------------------------------------------------------------------

/// Typed, nullable storage for the values of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Flag(Vec<Option<bool>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Flag(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the storage kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnValues::Numeric(_) => "numeric",
            ColumnValues::Text(_) => "text",
            ColumnValues::Flag(_) => "flag",
        }
    }

    /// The cell at `row` as a [`Value`].
    pub fn get(&self, row: usize) -> Value {
        let cell = match self {
            ColumnValues::Numeric(v) => v.get(row).copied().flatten().map(Value::Number),
            ColumnValues::Text(v) => v.get(row).cloned().flatten().map(Value::Text),
            ColumnValues::Flag(v) => v.get(row).copied().flatten().map(Value::Flag),
        };
        cell.unwrap_or(Value::Missing)
    }

    pub fn is_defined(&self, row: usize) -> bool {
        match self {
            ColumnValues::Numeric(v) => matches!(v.get(row), Some(Some(_))),
            ColumnValues::Text(v) => matches!(v.get(row), Some(Some(_))),
            ColumnValues::Flag(v) => matches!(v.get(row), Some(Some(_))),
        }
    }

    /// Copy out the given rows, in the given order.
    pub fn take(&self, rows: &[usize]) -> ColumnValues {
        match self {
            ColumnValues::Numeric(v) => ColumnValues::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnValues::Text(v) => {
                ColumnValues::Text(rows.iter().map(|&r| v[r].clone()).collect())
            }
            ColumnValues::Flag(v) => ColumnValues::Flag(rows.iter().map(|&r| v[r]).collect()),
        }
    }

    /// Infer a column kind from loosely typed cells.
    ///
    /// * every defined cell is a number → numeric
    /// * every defined cell is a flag   → flag
    /// * anything else                  → text (numbers and flags rendered)
    pub fn from_values(values: Vec<Value>) -> ColumnValues {
        let defined = || values.iter().filter(|v| !v.is_missing());
        if defined().all(|v| matches!(v, Value::Number(_))) {
            return ColumnValues::Numeric(values.iter().map(Value::as_f64).map(finite).collect());
        }
        if defined().all(|v| matches!(v, Value::Flag(_))) {
            return ColumnValues::Flag(values.iter().map(Value::as_bool).collect());
        }
        ColumnValues::Text(
            values
                .into_iter()
                .map(|v| match v {
                    Value::Missing => None,
                    Value::Text(s) => Some(s),
                    other => Some(other.to_string()),
                })
                .collect(),
        )
    }
}

/// Non-finite numbers are stored as missing.
pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// A named column with a semantic unit tag (empty for dimensionless/text).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub unit: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn numeric(
        name: impl Into<String>,
        unit: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Self {
        Column {
            name: name.into(),
            unit: unit.into(),
            values: ColumnValues::Numeric(values.into_iter().map(finite).collect()),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Column {
            name: name.into(),
            unit: String::new(),
            values: ColumnValues::Text(values),
        }
    }

    pub fn flag(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Column {
            name: name.into(),
            unit: String::new(),
            values: ColumnValues::Flag(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Table – keyed columnar storage shared by populations
// ---------------------------------------------------------------------------

/// Row-keyed columnar storage. Immutable once built; populations share it
/// behind an `Arc` and select rows from it.
#[derive(Debug, Clone)]
pub struct Table {
    keys: Vec<String>,
    key_index: HashMap<String, usize>,
    columns: Vec<Column>,
    column_index: HashMap<String, usize>,
}

impl Table {
    /// Build a table, checking that every column has one value per key and
    /// that keys are unique.
    pub fn new(keys: Vec<String>, columns: Vec<Column>) -> Result<Self> {
        let mut key_index = HashMap::with_capacity(keys.len());
        for (row, key) in keys.iter().enumerate() {
            if key_index.insert(key.clone(), row).is_some() {
                return Err(PopulationError::DuplicateRowKey(key.clone()));
            }
        }

        let mut ordered: Vec<Column> = Vec::with_capacity(columns.len());
        let mut column_index = HashMap::with_capacity(columns.len());
        for column in columns {
            let actual = column.len();
            if actual != keys.len() {
                return Err(PopulationError::InconsistentColumn {
                    column: column.name,
                    expected: keys.len(),
                    actual,
                });
            }
            match column_index.get(&column.name) {
                Some(&idx) => {
                    log::warn!("column '{}' given twice, keeping the last one", column.name);
                    ordered[idx] = column;
                }
                None => {
                    column_index.insert(column.name.clone(), ordered.len());
                    ordered.push(column);
                }
            }
        }

        Ok(Table {
            keys,
            key_index,
            columns: ordered,
            column_index,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn key(&self, row: usize) -> Option<&str> {
        self.keys.get(row).map(String::as_str)
    }

    pub fn row_of(&self, key: &str) -> Option<usize> {
        self.key_index.get(key).copied()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index.get(name).map(|&i| &self.columns[i])
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Occurrence count of each value of `column` over the given rows.
    pub fn value_counts(&self, column: &str, rows: &[usize]) -> Option<BTreeMap<Value, usize>> {
        let column = self.column(column)?;
        let mut counts = BTreeMap::new();
        for &row in rows {
            *counts.entry(column.values.get(row)).or_insert(0) += 1;
        }
        Some(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_value_ordering_groups_by_kind() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Number(2.0),
            Value::Missing,
            Value::Flag(true),
            Value::Number(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Missing,
                Value::Flag(true),
                Value::Number(-1.0),
                Value::Number(2.0),
                Value::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_numeric_column_drops_non_finite() {
        let column = Column::numeric("mass", "earthMass", vec![Some(1.0), Some(f64::NAN), None]);
        assert_eq!(column.values.get(0), Value::Number(1.0));
        assert!(column.values.get(1).is_missing());
        assert!(!column.values.is_defined(2));
    }

    #[test]
    fn test_from_values_inference() {
        let numeric = ColumnValues::from_values(vec![Value::Number(1.0), Value::Missing]);
        assert_eq!(numeric.kind(), "numeric");

        let flags = ColumnValues::from_values(vec![Value::Flag(false), Value::Missing]);
        assert_eq!(flags.kind(), "flag");

        let mixed = ColumnValues::from_values(vec![Value::Number(3.0), Value::Text("x".into())]);
        assert_eq!(mixed, ColumnValues::Text(vec![Some("3".into()), Some("x".into())]));
    }

    #[test]
    fn test_table_rejects_inconsistent_column() {
        let err = Table::new(
            keys(&["a", "b"]),
            vec![Column::numeric("mass", "", vec![Some(1.0)])],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PopulationError::InconsistentColumn { ref column, expected: 2, actual: 1 }
                if column == "mass"
        ));
    }

    #[test]
    fn test_table_rejects_duplicate_keys() {
        let err = Table::new(keys(&["a", "a"]), vec![]).unwrap_err();
        assert!(matches!(err, PopulationError::DuplicateRowKey(k) if k == "a"));
    }

    #[test]
    fn test_value_counts() {
        let table = Table::new(
            keys(&["a", "b", "c"]),
            vec![Column::text(
                "discovery_method",
                vec![Some("Transit".into()), None, Some("Transit".into())],
            )],
        )
        .unwrap();
        let counts = table.value_counts("discovery_method", &[0, 1, 2]).unwrap();
        assert_eq!(counts[&Value::Text("Transit".into())], 2);
        assert_eq!(counts[&Value::Missing], 1);
        assert!(table.value_counts("radius", &[0]).is_none());
    }
}
