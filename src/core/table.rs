//! In-memory data map: an ordered column list plus rows of cells.
//!
//! Every row carries one cell per column. Structural gaps (uneven path
//! depth) are `Cell::Text("")`; inference misses are `Cell::Missing`.
//! The two never compare equal.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Last path segment of every entry.
pub const DATA_FILE: &str = "Data File";
/// Extension of [`DATA_FILE`], leading dot included.
pub const DATA_FORMAT: &str = "Data Format";
/// Entry size as reported by the listing.
pub const FILE_SIZE: &str = "File Size (Bytes)";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("unknown column: {0}")]
    UnknownColumn(ColumnKey),

    #[error("duplicate column: {0}")]
    DuplicateColumn(ColumnKey),

    #[error("row has {found} cells, table has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    #[error("column has {found} values, table has {expected} rows")]
    ColumnLength { expected: usize, found: usize },

    #[error("cannot append tables with different columns")]
    ColumnMismatch,

    #[error("{paths} paths but {sizes} sizes in archive listing")]
    SizeMismatch { paths: usize, sizes: usize },
}

/// Column identifier. Unmapped hierarchical segments keep their position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnKey {
    Position(usize),
    Name(String),
}

impl ColumnKey {
    /// Interpret a persisted header: purely numeric headers are positions.
    pub fn from_header(header: &str) -> Self {
        match header.parse::<usize>() {
            Ok(pos) => ColumnKey::Position(pos),
            Err(_) => ColumnKey::Name(header.to_string()),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Position(pos) => write!(f, "{pos}"),
            ColumnKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for ColumnKey {
    fn from(pos: usize) -> Self {
        ColumnKey::Position(pos)
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Name(name.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(name: String) -> Self {
        ColumnKey::Name(name)
    }
}

/// One table value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Int(u64),
    /// No extractor pattern matched.
    Missing,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Textual value for matching; `None` for a missing value.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Cell::Int(n) => Some(Cow::Owned(n.to_string())),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Render for output, substituting `missing` for [`Cell::Missing`].
    pub fn render<'a>(&'a self, missing: &'a str) -> Cow<'a, str> {
        self.as_text()
            .unwrap_or(Cow::Borrowed(missing))
    }
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [ColumnKey],
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    pub fn get(&self, key: &ColumnKey) -> Option<&'a Cell> {
        self.columns
            .iter()
            .position(|c| c == key)
            .map(|i| &self.cells[i])
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a ColumnKey, &'a Cell)> {
        self.columns
            .iter()
            .zip(self.cells.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<ColumnKey>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Empty table with the given columns.
    pub fn new(columns: Vec<ColumnKey>) -> Result<Self, TableError> {
        for (i, key) in columns.iter().enumerate() {
            if columns[..i].contains(key) {
                return Err(TableError::DuplicateColumn(key.clone()));
            }
        }
        Ok(Self { columns, rows: Vec::new() })
    }

    /// Same columns, no rows.
    pub fn empty_like(&self) -> Self {
        Self { columns: self.columns.clone(), rows: Vec::new() }
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, key: &ColumnKey) -> bool {
        self.column_index(key).is_some()
    }

    pub fn column_index(&self, key: &ColumnKey) -> Option<usize> {
        self.columns.iter().position(|c| c == key)
    }

    pub fn require_column(&self, key: &ColumnKey) -> Result<usize, TableError> {
        self.column_index(key)
            .ok_or_else(|| TableError::UnknownColumn(key.clone()))
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows
            .get(index)
            .map(|cells| Row { columns: &self.columns, cells })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows
            .iter()
            .map(|cells| Row { columns: &self.columns, cells })
    }

    pub fn cell(&self, index: usize, key: &ColumnKey) -> Option<&Cell> {
        let col = self.column_index(key)?;
        self.rows.get(index).map(|r| &r[col])
    }

    /// All values of one column, top to bottom.
    pub fn column_values(&self, key: &ColumnKey) -> Result<Vec<&Cell>, TableError> {
        let col = self.require_column(key)?;
        Ok(self.rows.iter().map(|r| &r[col]).collect())
    }

    pub fn push_row(&mut self, cells: Vec<Cell>) -> Result<(), TableError> {
        if cells.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        self.rows.push(cells);
        Ok(())
    }

    /// Add a column at the end, or overwrite it in place if it exists.
    pub fn set_column(&mut self, key: ColumnKey, values: Vec<Cell>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                expected: self.rows.len(),
                found: values.len(),
            });
        }

        match self.column_index(&key) {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                self.columns.push(key);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Remove the listed columns. Absent keys are skipped; returns how many went.
    pub fn drop_columns(&mut self, keys: &[ColumnKey]) -> usize {
        let doomed: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| keys.contains(c))
            .map(|(i, _)| i)
            .collect();

        self.retain_columns(|i| !doomed.contains(&i));
        doomed.len()
    }

    /// Put the listed columns first, in the given order. Others keep their
    /// relative order. Absent keys are skipped.
    pub fn move_to_front(&mut self, keys: &[ColumnKey]) {
        let order = self.present_indices(keys);
        let rest = (0..self.columns.len()).filter(|i| !order.contains(i));
        let order: Vec<usize> = order.iter().copied().chain(rest).collect();
        self.permute(&order);
    }

    /// Put the listed columns last, in the given order.
    pub fn move_to_back(&mut self, keys: &[ColumnKey]) {
        let tail = self.present_indices(keys);

        let order: Vec<usize> = (0..self.columns.len())
            .filter(|i| !tail.contains(i))
            .chain(tail.iter().copied())
            .collect();
        self.permute(&order);
    }

    /// Copy the rows matching `keep` into a new table.
    pub fn filter<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|cells| keep(&Row { columns: &self.columns, cells }))
            .cloned()
            .collect();

        Table { columns: self.columns.clone(), rows }
    }

    /// Append all rows of `other`; both tables must share the same columns.
    pub fn append(&mut self, other: Table) -> Result<(), TableError> {
        if other.columns != self.columns {
            return Err(TableError::ColumnMismatch);
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Indices of the keys present in the table, first occurrence wins.
    fn present_indices(&self, keys: &[ColumnKey]) -> Vec<usize> {
        let mut found: Vec<usize> = Vec::with_capacity(keys.len());
        for i in keys.iter().filter_map(|k| self.column_index(k)) {
            if !found.contains(&i) {
                found.push(i);
            }
        }
        found
    }

    fn retain_columns<F: Fn(usize) -> bool>(&mut self, keep: F) {
        let order: Vec<usize> = (0..self.columns.len()).filter(|&i| keep(i)).collect();
        self.permute(&order);
    }

    /// Rebuild columns (and every row) from the given source indices.
    /// `order` must not repeat an index.
    fn permute(&mut self, order: &[usize]) {
        debug_assert!(
            order.iter().enumerate().all(|(n, i)| !order[..n].contains(i)),
            "column permutation repeats an index"
        );
        self.columns = order.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            let mut old: Vec<Option<Cell>> = row.drain(..).map(Some).collect();
            *row = order
                .iter()
                .map(|&i| old[i].take().unwrap_or(Cell::Missing))
                .collect();
        }
    }
}
