//! Listing → table conversion.
//!
//! Each retained entry path is split on `/`; every segment but the last
//! becomes a positional column, the last becomes [`DATA_FILE`]. Entries
//! whose final segment has no `.` are treated as directory markers and
//! dropped. A directory literally named `v1.2.0` slips through this check;
//! the heuristic is kept as-is so outputs stay comparable.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::table::{Cell, ColumnKey, DATA_FILE, DATA_FORMAT, FILE_SIZE, Table, TableError};

/// One listing member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub path: String,
    pub size: u64,
}

impl Entry {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self { path: path.into(), size }
    }

    /// Final path segment.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit('/')
            .next()
            .unwrap_or(&self.path)
    }

    /// "Looks like a file": the final segment contains a dot.
    pub fn looks_like_file(&self) -> bool {
        self.file_name().contains('.')
    }
}

/// Pair archive paths with their sizes, position by position.
pub fn entries_from_parallel(paths: Vec<String>, sizes: Vec<u64>) -> Result<Vec<Entry>, TableError> {
    if paths.len() != sizes.len() {
        return Err(TableError::SizeMismatch { paths: paths.len(), sizes: sizes.len() });
    }
    Ok(paths
        .into_iter()
        .zip(sizes)
        .map(|(path, size)| Entry { path, size })
        .collect())
}

/// Extension of a file name from its last dot, dot included; empty if none.
pub fn data_format(file_name: &str) -> &str {
    file_name
        .rfind('.')
        .map_or("", |i| &file_name[i..])
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ColumnMapError {
    #[error("position {0} is mapped more than once")]
    DuplicatePosition(usize),

    #[error("column name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("position {position} ('{name}') is beyond the observed path depth {depth}")]
    OutOfRange { position: usize, name: String, depth: usize },

    #[error("path positions {0:?} have no column name")]
    Unmapped(Vec<usize>),
}

/// One `(position, name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnName {
    pub position: usize,
    pub name: String,
}

/// Ordered position → column name mapping for hierarchical segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMap {
    names: Vec<ColumnName>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, rejecting duplicate positions or names.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ColumnMapError>
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for (position, name) in pairs {
            map = map.with(position, name)?;
        }
        Ok(map)
    }

    pub fn with(mut self, position: usize, name: impl Into<String>) -> Result<Self, ColumnMapError> {
        let name = name.into();
        if self.names.iter().any(|c| c.position == position) {
            return Err(ColumnMapError::DuplicatePosition(position));
        }
        if self.names.iter().any(|c| c.name == name) {
            return Err(ColumnMapError::DuplicateName(name));
        }
        self.names.push(ColumnName { position, name });
        Ok(self)
    }

    pub fn name_for(&self, position: usize) -> Option<&str> {
        self.names
            .iter()
            .find(|c| c.position == position)
            .map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnName> {
        self.names.iter()
    }

    /// Column key for a hierarchical position.
    pub fn key_for(&self, position: usize) -> ColumnKey {
        self.name_for(position)
            .map_or(ColumnKey::Position(position), ColumnKey::from)
    }

    /// Check the mapping against the deepest observed directory depth.
    ///
    /// Duplicates are always rejected (at construction or here, for maps
    /// deserialized from a file). Out-of-range and unmapped positions are
    /// only errors when `strict` is set.
    pub fn validate(&self, depth: usize, strict: bool) -> Result<(), ColumnMapError> {
        for (i, c) in self.names.iter().enumerate() {
            if self.names[..i].iter().any(|o| o.position == c.position) {
                return Err(ColumnMapError::DuplicatePosition(c.position));
            }
            if self.names[..i].iter().any(|o| o.name == c.name) {
                return Err(ColumnMapError::DuplicateName(c.name.clone()));
            }
        }

        if !strict {
            return Ok(());
        }

        if let Some(c) = self.names.iter().find(|c| c.position >= depth) {
            return Err(ColumnMapError::OutOfRange {
                position: c.position,
                name: c.name.clone(),
                depth,
            });
        }

        let unmapped: Vec<usize> = (0..depth)
            .filter(|p| self.name_for(*p).is_none())
            .collect();
        if !unmapped.is_empty() {
            return Err(ColumnMapError::Unmapped(unmapped));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Columns(#[from] ColumnMapError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Builds a [`Table`] from listing entries.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    columns: ColumnMap,
    prefix: Option<String>,
    strict: bool,
}

impl TableBuilder {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns, prefix: None, strict: false }
    }

    /// Keep only entries whose path contains `prefix` (bucket mode).
    pub fn with_prefix(mut self, prefix: Option<impl Into<String>>) -> Self {
        self.prefix = prefix.map(Into::into);
        self
    }

    /// Require the column map to cover every observed position exactly.
    pub fn with_strict_columns(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn retains(&self, entry: &Entry) -> bool {
        let in_prefix = self
            .prefix
            .as_deref()
            .is_none_or(|p| entry.path.contains(p));
        in_prefix && entry.looks_like_file()
    }

    pub fn build(&self, entries: &[Entry]) -> Result<Table, BuildError> {
        let kept: Vec<(&Entry, Vec<&str>)> = entries
            .iter()
            .filter(|e| self.retains(e))
            .map(|e| (e, e.path.split('/').collect()))
            .collect();

        debug!(
            listed = entries.len(),
            kept = kept.len(),
            prefix = self.prefix.as_deref().unwrap_or(""),
            "tokenized listing"
        );

        let depth = kept
            .iter()
            .map(|(_, segments)| segments.len() - 1)
            .max()
            .unwrap_or(0);

        // An empty listing says nothing about depth.
        self.columns.validate(depth, self.strict && !kept.is_empty())?;

        let mut keys: Vec<ColumnKey> = (0..depth)
            .map(|p| self.columns.key_for(p))
            .collect();
        keys.extend([FILE_SIZE.into(), DATA_FILE.into(), DATA_FORMAT.into()]);

        let mut table = Table::new(keys)?;
        for (entry, segments) in kept {
            let (file, dirs) = segments
                .split_last()
                .map_or(("", &[][..]), |(f, d)| (*f, d));

            let mut cells: Vec<Cell> = Vec::with_capacity(depth + 3);
            cells.extend(dirs.iter().map(|s| Cell::text(*s)));
            cells.resize(depth, Cell::text(""));
            cells.push(Cell::Int(entry.size));
            cells.push(Cell::text(file));
            cells.push(Cell::text(data_format(file)));

            table.push_row(cells)?;
        }

        Ok(table)
    }
}

/// Lenient one-shot build: entries filtered by `prefix`, named by `columns`.
pub fn build_table(entries: &[Entry], columns: &ColumnMap, prefix: Option<&str>) -> Result<Table, BuildError> {
    TableBuilder::new(columns.clone())
        .with_prefix(prefix)
        .build(entries)
}
