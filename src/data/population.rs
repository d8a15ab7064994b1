use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::color::PlotStyle;
use crate::error::{PopulationError, Result};

use super::derived::Quantity;
use super::filter::{Predicate, Split};
use super::model::{Column, ColumnValues, Table, Value};

// ---------------------------------------------------------------------------
// Population – an immutable, row-selected view over a shared table
// ---------------------------------------------------------------------------

/// A named, filterable set of bodies.
///
/// Every derivation (filter, mask, index, slice, keys) returns a new
/// `Population` that shares the parent's [`Table`] and only owns its row
/// selection. Nothing mutates a population after construction.
#[derive(Debug, Clone)]
pub struct Population {
    label: String,
    table: Arc<Table>,
    rows: Arc<[usize]>,
    style: PlotStyle,
}

impl Population {
    /// Wrap a freshly loaded table, selecting every row.
    pub fn new(label: impl Into<String>, table: Table) -> Self {
        let rows: Arc<[usize]> = (0..table.len()).collect();
        Population {
            label: label.into(),
            table: Arc::new(table),
            rows,
            style: PlotStyle::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn style(&self) -> &PlotStyle {
        &self.style
    }

    pub fn with_style(mut self, style: PlotStyle) -> Self {
        self.style = style;
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row keys in population order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|&r| self.table.keys()[r].as_str())
    }

    pub fn key(&self, index: usize) -> Option<&str> {
        self.rows.get(index).and_then(|&r| self.table.key(r))
    }

    pub fn key_set(&self) -> BTreeSet<&str> {
        self.keys().collect()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.table.column_names()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.table.column(name).is_some()
    }

    pub fn unit(&self, column: &str) -> Result<&str> {
        Ok(self.column(column)?.unit.as_str())
    }

    /// Cell value at population row `index`.
    pub fn value(&self, index: usize, column: &str) -> Result<Value> {
        let column = self.column(column)?;
        let row = *self.rows.get(index).ok_or(PopulationError::IndexOutOfRange {
            index: index as isize,
            len: self.len(),
        })?;
        Ok(column.values.get(row))
    }

    /// Values of a numeric column, one per population row.
    pub fn numeric(&self, column: &str) -> Result<Vec<Option<f64>>> {
        match &self.column(column)?.values {
            ColumnValues::Numeric(v) => Ok(self.rows.iter().map(|&r| v[r]).collect()),
            other => Err(type_mismatch(column, "numeric", other)),
        }
    }

    /// Values of a numeric column, or all-missing if the table lacks it.
    pub(crate) fn numeric_or_missing(&self, column: &str) -> Result<Vec<Option<f64>>> {
        if self.has_column(column) {
            self.numeric(column)
        } else {
            Ok(vec![None; self.len()])
        }
    }

    pub fn text(&self, column: &str) -> Result<Vec<Option<&str>>> {
        match &self.column(column)?.values {
            ColumnValues::Text(v) => Ok(self.rows.iter().map(|&r| v[r].as_deref()).collect()),
            other => Err(type_mismatch(column, "text", other)),
        }
    }

    pub fn flag(&self, column: &str) -> Result<Vec<Option<bool>>> {
        match &self.column(column)?.values {
            ColumnValues::Flag(v) => Ok(self.rows.iter().map(|&r| v[r]).collect()),
            other => Err(type_mismatch(column, "flag", other)),
        }
    }

    /// Values of a text column, or all-missing if the table lacks it.
    pub(crate) fn text_or_missing(&self, column: &str) -> Result<Vec<Option<&str>>> {
        if self.has_column(column) {
            self.text(column)
        } else {
            Ok(vec![None; self.len()])
        }
    }

    /// Values of a flag column, or all-missing if the table lacks it.
    pub(crate) fn flag_or_missing(&self, column: &str) -> Result<Vec<Option<bool>>> {
        if self.has_column(column) {
            self.flag(column)
        } else {
            Ok(vec![None; self.len()])
        }
    }

    /// Evaluate a derived quantity for every row.
    pub fn quantity(&self, quantity: Quantity) -> Result<Vec<Option<f64>>> {
        quantity.compute(self)
    }

    // -----------------------------------------------------------------------
    // Derivations
    // -----------------------------------------------------------------------

    /// Rows for which `predicate` holds. Rows where it is undefined are dropped.
    pub fn filter(&self, predicate: &Predicate) -> Result<Population> {
        let truth = predicate.evaluate(self)?;
        let rows: Vec<usize> = self
            .rows
            .iter()
            .zip(truth)
            .filter(|(_, t)| *t == Some(true))
            .map(|(&r, _)| r)
            .collect();
        log::debug!(
            "{}: {}/{} rows pass {predicate}",
            self.label,
            rows.len(),
            self.len()
        );
        Ok(self.derive(rows))
    }

    /// Rows where `mask` is true. The mask must have one entry per row.
    pub fn filter_mask(&self, mask: &[bool]) -> Result<Population> {
        if mask.len() != self.len() {
            return Err(PopulationError::ShapeMismatch {
                expected: self.len(),
                actual: mask.len(),
            });
        }
        let rows = self
            .rows
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(&r, _)| r)
            .collect();
        Ok(self.derive(rows))
    }

    /// The (positive, negative) halves of a complementary split.
    pub fn split(&self, split: Split) -> Result<(Population, Population)> {
        let positive = self.filter(&split.positive())?;
        let negative = self.filter(&split.negative())?;
        Ok((positive, negative))
    }

    /// A single-row population. Negative indices count from the end.
    pub fn by_index(&self, index: isize) -> Result<Population> {
        let len = self.len() as isize;
        let resolved = if index < 0 { index + len } else { index };
        if resolved < 0 || resolved >= len {
            return Err(PopulationError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(self.derive(vec![self.rows[resolved as usize]]))
    }

    /// Sequence-slice selection: bounds are clipped, negatives count from
    /// the end, and a negative step walks backwards.
    pub fn by_slice(
        &self,
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    ) -> Result<Population> {
        let positions = slice_positions(self.len(), start, stop, step)?;
        let rows = positions.into_iter().map(|p| self.rows[p]).collect();
        Ok(self.derive(rows))
    }

    /// Rows with the given keys, in the order given. Repeated keys are
    /// selected once.
    pub fn by_keys<S: AsRef<str>>(&self, keys: &[S]) -> Result<Population> {
        let members: BTreeSet<usize> = self.rows.iter().copied().collect();
        let mut seen = BTreeSet::new();
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            let row = self
                .table
                .row_of(key)
                .filter(|row| members.contains(row))
                .ok_or_else(|| PopulationError::UnknownRowKey(key.to_string()))?;
            if seen.insert(row) {
                rows.push(row);
            }
        }
        Ok(self.derive(rows))
    }

    /// Copy the selected rows out into a standalone table.
    pub fn to_table(&self) -> Result<Table> {
        let keys = self.keys().map(str::to_string).collect();
        let columns = self
            .table
            .columns()
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                unit: c.unit.clone(),
                values: c.values.take(&self.rows),
            })
            .collect();
        Table::new(keys, columns)
    }

    pub(crate) fn table(&self) -> &Table {
        &self.table
    }

    pub(crate) fn rows(&self) -> &[usize] {
        &self.rows
    }

    fn column(&self, name: &str) -> Result<&Column> {
        self.table
            .column(name)
            .ok_or_else(|| PopulationError::UnknownColumn(name.to_string()))
    }

    fn derive(&self, rows: Vec<usize>) -> Population {
        Population {
            label: self.label.clone(),
            table: Arc::clone(&self.table),
            rows: rows.into(),
            style: self.style.clone(),
        }
    }
}

fn type_mismatch(column: &str, expected: &'static str, found: &ColumnValues) -> PopulationError {
    PopulationError::TypeMismatch {
        column: column.to_string(),
        expected,
        found: found.kind(),
    }
}

/// Positions selected by a `start:stop:step` slice over `len` items.
fn slice_positions(
    len: usize,
    start: Option<isize>,
    stop: Option<isize>,
    step: Option<isize>,
) -> Result<Vec<usize>> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(PopulationError::InvalidSlice("step cannot be zero".into()));
    }

    let len = len as isize;
    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
    let clip = |bound: isize| {
        if bound < 0 {
            (bound + len).max(lower)
        } else {
            bound.min(upper)
        }
    };
    let start = start.map(clip).unwrap_or(if step > 0 { lower } else { upper });
    let stop = stop.map(clip).unwrap_or(if step > 0 { upper } else { lower });

    let mut positions = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        positions.push(i as usize);
        i += step;
    }
    Ok(positions)
}

/// Two populations are equal when they select the same keys in the same
/// order with identical values in every column.
impl PartialEq for Population {
    fn eq(&self, other: &Self) -> bool {
        if !self.keys().eq(other.keys()) {
            return false;
        }
        if Arc::ptr_eq(&self.table, &other.table) {
            return true;
        }
        if self.column_names() != other.column_names() {
            return false;
        }
        self.table.columns().iter().all(|column| {
            let Some(theirs) = other.table.column(&column.name) else {
                return false;
            };
            column.unit == theirs.unit
                && self
                    .rows
                    .iter()
                    .zip(other.rows.iter())
                    .all(|(&a, &b)| column.values.get(a) == theirs.values.get(b))
        })
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} | {} rows>", self.label, self.len())
    }
}
