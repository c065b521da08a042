//! Named mapping recipes.
//!
//! A layout fixes, for one archive version or bucket dataset, how path
//! positions are named, which extractors run against which columns (and in
//! what priority), which raw columns are dropped and how the remaining
//! columns are ordered. Built-in layouts cover the known datasets; others
//! can be loaded from TOML.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tabled::settings::Style;
use tracing::{debug, instrument};

use super::extract::{self, ExtractError, ExtractReport, ExtractorKind};
use super::table::{ColumnKey, DATA_FILE, DATA_FORMAT, FILE_SIZE, Table};
use super::tokenize::{BuildError, ColumnMap, ColumnMapError, Entry, TableBuilder};
use crate::cli::{AppContext, LayoutsArgs};

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("unknown layout '{name}' (available: {available})")]
    Unknown { name: String, available: String },

    #[error("failed to read layout file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid layout file {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("layout '{layout}' lists column '{key}' twice in `{list}`")]
    RepeatedColumn {
        layout: String,
        list: &'static str,
        key: ColumnKey,
    },

    #[error("layout '{layout}' expects {expected} input")]
    WrongMode { layout: String, expected: SourceMode },

    #[error(transparent)]
    Columns(#[from] ColumnMapError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Where a layout's entries come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    /// Bucket keys filtered by a substring prefix
    Prefix,
    /// Members of one archive object
    Archive,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Prefix => f.write_str("a bucket prefix"),
            SourceMode::Archive => f.write_str("an archive key"),
        }
    }
}

/// One extractor invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub extract: ExtractorKind,
    /// Source columns, highest priority first
    pub from: Vec<ColumnKey>,
    /// Output column override
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl Step {
    pub fn new<I, K>(extract: ExtractorKind, from: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ColumnKey>,
    {
        Self {
            extract,
            from: from.into_iter().map(Into::into).collect(),
            output: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mode: SourceMode,
    /// Raw columns removed after extraction
    #[serde(default)]
    pub drop: Vec<ColumnKey>,
    /// Columns moved to the front, in order
    #[serde(default)]
    pub front: Vec<ColumnKey>,
    /// Columns moved to the back, in order
    #[serde(default)]
    pub back: Vec<ColumnKey>,
    pub columns: ColumnMap,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// What a layout run did, for logging and `--verbose` output.
#[derive(Debug, Clone, Default)]
pub struct LayoutReport {
    pub extracted: Vec<ExtractReport>,
    pub dropped: usize,
}

impl Layout {
    /// Load a layout from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, LayoutError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|source| LayoutError::Read { path: display.clone(), source })?;
        let layout: Layout =
            toml::from_str(&text).map_err(|source| LayoutError::Parse { path: display, source })?;
        layout.validate()?;
        Ok(layout)
    }

    /// Structural checks that do not depend on a listing.
    pub fn validate(&self) -> Result<(), LayoutError> {
        self.columns.validate(usize::MAX, false)?;

        for (list, keys) in [("front", &self.front), ("back", &self.back)] {
            if let Some(key) = keys
                .iter()
                .enumerate()
                .find_map(|(i, k)| keys[..i].contains(k).then_some(k))
            {
                return Err(LayoutError::RepeatedColumn {
                    layout: self.name.clone(),
                    list,
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }

    /// Look up a built-in layout by name.
    pub fn builtin(name: &str) -> Result<Self, LayoutError> {
        builtins()
            .into_iter()
            .find(|l| l.name == name)
            .ok_or_else(|| LayoutError::Unknown {
                name: name.to_string(),
                available: builtin_names().join(", "),
            })
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn expect_mode(&self, mode: SourceMode) -> Result<(), LayoutError> {
        if self.mode != mode {
            return Err(LayoutError::WrongMode { layout: self.name.clone(), expected: self.mode });
        }
        Ok(())
    }

    /// Tokenize `entries` and run the whole recipe.
    #[instrument(skip(self, entries), fields(layout = %self.name, entries = entries.len()))]
    pub fn map(
        &self,
        entries: &[Entry],
        prefix: Option<&str>,
        strict_columns: bool,
    ) -> Result<(Table, LayoutReport), LayoutError> {
        let mut table = TableBuilder::new(self.columns.clone())
            .with_prefix(prefix)
            .with_strict_columns(strict_columns)
            .build(entries)?;
        let report = self.apply(&mut table)?;
        Ok((table, report))
    }

    /// Run extractor steps, drop raw columns, then rearrange.
    pub fn apply(&self, table: &mut Table) -> Result<LayoutReport, LayoutError> {
        let mut report = LayoutReport::default();

        for step in &self.steps {
            let r = extract::apply(table, step.extract, &step.from, step.output.as_deref())?;
            report.extracted.push(r);
        }

        let absent: Vec<&ColumnKey> = self
            .drop
            .iter()
            .filter(|k| !table.has_column(k))
            .collect();
        if !absent.is_empty() {
            debug!(?absent, "drop list names columns not in this listing");
        }
        report.dropped = table.drop_columns(&self.drop);

        table.move_to_front(&self.front);
        table.move_to_back(&self.back);

        Ok(report)
    }
}

pub fn builtin_names() -> Vec<&'static str> {
    vec![
        "rt-input",
        "rt-baseline",
        "land-da-v1.0.0",
        "land-da-v1.1",
        "land-da-v1.2",
        "land-da-develop-20240626",
    ]
}

fn keys<const N: usize>(items: [&str; N]) -> Vec<ColumnKey> {
    items.into_iter().map(ColumnKey::from).collect()
}

fn positions<const N: usize>(items: [usize; N]) -> Vec<ColumnKey> {
    items.into_iter().map(ColumnKey::from).collect()
}

fn column_map<const N: usize>(pairs: [(usize, &str); N]) -> ColumnMap {
    // Built-in maps are literal and duplicate-free.
    ColumnMap::from_pairs(pairs).unwrap_or_default()
}

/// All built-in layouts, in [`builtin_names`] order.
pub fn builtins() -> Vec<Layout> {
    use ExtractorKind as X;

    vec![
        Layout {
            name: "rt-input".into(),
            description: "Regression-test input data (input-data-YYYYMMDD prefix)".into(),
            mode: SourceMode::Prefix,
            columns: column_map([(0, "Dataset"), (1, "UFS Component"), (2, "Sub-Category"), (4, "Category")]),
            steps: vec![
                Step::new(X::GridResolution, keys(["Sub-Category", "UFS Component", DATA_FILE])),
                Step::new(X::OceanO, keys(["Sub-Category"])),
                Step::new(X::OceanMx, keys(["Sub-Category", DATA_FILE])),
                Step::new(X::OceanBare, keys(["Sub-Category"])),
                Step::new(X::Version, positions([5, 6])),
            ],
            drop: positions([3, 5, 6, 7]),
            front: keys([
                DATA_FILE,
                "UFS Component",
                "Resolution (C)",
                "Ocean Resolution (o)",
                "Ocean Resolution (mx)",
                "Ocean Resolution (w/o symbol)",
                DATA_FORMAT,
                FILE_SIZE,
                "Category",
                "Sub-Category",
                "Dataset",
            ]),
            back: vec![],
        },
        Layout {
            name: "rt-baseline".into(),
            description: "Regression-test baselines (develop-YYYYMMDD prefix)".into(),
            mode: SourceMode::Prefix,
            columns: column_map([(0, "Dataset"), (2, "Category")]),
            steps: vec![
                Step::new(X::TestName, positions([1])),
                Step::new(X::Compiler, positions([1])),
            ],
            drop: positions([1]),
            front: keys([DATA_FILE, "Test Name", "Compiler"]),
            back: keys([FILE_SIZE, DATA_FORMAT, "Dataset"]),
        },
        Layout {
            name: "land-da-v1.0.0".into(),
            description: "Land DA v1.0.0 test-component archive".into(),
            mode: SourceMode::Archive,
            columns: column_map([
                (0, "Category"),
                (1, "Sub-Category 1"),
                (2, "Sub-Category 2"),
                (3, "Sub-Category 3"),
                (5, "YYYY"),
            ]),
            steps: vec![
                Step::new(X::GridResolutionShort, keys([DATA_FILE, "Sub-Category 1"])),
                Step::new(X::OceanMx, keys([DATA_FILE, "Sub-Category 1"])),
            ],
            drop: positions([4]),
            front: keys([
                DATA_FILE,
                "Category",
                "Sub-Category 1",
                "Sub-Category 2",
                "Sub-Category 3",
                "Resolution (C)",
                "Ocean Resolution (mx)",
                DATA_FORMAT,
                FILE_SIZE,
            ]),
            back: vec![],
        },
        Layout {
            name: "land-da-v1.1".into(),
            description: "Land DA v1.1 input archive (landda_inputs.tar.gz_v1.1)".into(),
            mode: SourceMode::Archive,
            columns: column_map([(1, "Category"), (2, "Dataset Type"), (3, "Sub-Category"), (5, "Version (YYYY)")]),
            steps: vec![
                Step::new(X::GridResolutionShort, vec![ColumnKey::from(DATA_FILE), ColumnKey::Position(4)]),
                Step::new(X::OceanMx, keys([DATA_FILE, "Sub-Category"])),
            ],
            drop: positions([0, 4]),
            front: keys([
                DATA_FILE,
                "Category",
                "Sub-Category",
                "Resolution (C)",
                "Ocean Resolution (mx)",
                DATA_FORMAT,
                FILE_SIZE,
                "Version (YYYY)",
                "Dataset Type",
            ]),
            back: vec![],
        },
        Layout {
            name: "land-da-v1.2".into(),
            description: "Land DA v1.2.0 input archive (Landdav1.2.0_input_data.tar.gz)".into(),
            mode: SourceMode::Archive,
            columns: column_map([
                (1, "Category"),
                (2, "Sub-Category 3"),
                (3, "Sub-Category 2"),
                (4, "Sub-Category 1"),
            ]),
            steps: vec![
                Step::new(X::GridResolutionShort, keys([DATA_FILE, "Sub-Category 1"])),
                Step::new(X::OceanMx, keys([DATA_FILE, "Sub-Category 2"])),
                Step::new(X::Version, vec![ColumnKey::Position(6), ColumnKey::from("Sub-Category 2")]),
                Step::new(X::DatasetType, keys(["Sub-Category 3"])),
            ],
            drop: positions([0, 5, 6]),
            front: keys([
                DATA_FILE,
                "Dataset Type",
                "Category",
                "Resolution (C)",
                "Ocean Resolution (mx)",
                DATA_FORMAT,
                FILE_SIZE,
                "Version",
                "Sub-Category 1",
                "Sub-Category 2",
                "Sub-Category 3",
            ]),
            back: vec![],
        },
        Layout {
            name: "land-da-develop-20240626".into(),
            description: "Land DA develop-20240626 input archive".into(),
            mode: SourceMode::Archive,
            columns: column_map([
                (1, "Category"),
                (3, "Dataset Type"),
                (6, "Sub-Category 1"),
                (7, "File Extension"),
                (8, "Sub-Category 2"),
                (9, "Sub-Category 3"),
                (10, "YYYY"),
            ]),
            steps: vec![
                Step::new(X::GridResolutionShort, keys([DATA_FILE, "Sub-Category 2"])),
                Step::new(X::OceanMx, keys([DATA_FILE, "Sub-Category 2"])),
            ],
            drop: positions([0, 2, 4, 5]),
            front: keys([
                DATA_FILE,
                "Dataset Type",
                "Category",
                "Resolution (C)",
                "Ocean Resolution (mx)",
                "File Extension",
                FILE_SIZE,
                "YYYY",
                "Sub-Category 1",
                "Sub-Category 2",
                "Sub-Category 3",
            ]),
            back: vec![],
        },
    ]
}

/// `dmap layouts`: list built-ins, or print one as TOML.
pub fn run(args: LayoutsArgs, ctx: &AppContext) -> anyhow::Result<()> {
    if let Some(name) = args.show {
        let layout = Layout::builtin(&name)?;
        print!("{}", layout.to_toml()?);
        return Ok(());
    }

    if ctx.quiet {
        for name in builtin_names() {
            println!("{name}");
        }
        return Ok(());
    }

    #[derive(Tabled)]
    struct LayoutRow {
        name: String,
        mode: String,
        steps: usize,
        description: String,
    }

    let rows: Vec<LayoutRow> = builtins()
        .into_iter()
        .map(|l| LayoutRow {
            mode: match l.mode {
                SourceMode::Prefix => "prefix".into(),
                SourceMode::Archive => "archive".into(),
            },
            steps: l.steps.len(),
            name: l.name,
            description: l.description,
        })
        .collect();

    let mut table = tabled::Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
