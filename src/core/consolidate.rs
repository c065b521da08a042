//! Multi-source consolidation into a named workbook.
//!
//! Reloaded data maps (regression-test baselines, regression-test inputs and
//! one application archive) are cut down to the rows a test case needs.
//! Every sheet is a pure row filter over one source; rows matching nothing
//! are simply absent.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::table::{Cell, ColumnKey, DATA_FILE, Row, Table, TableError};
use crate::cli::{AppContext, ConsolidateArgs};
use crate::infra::config::Config;
use crate::infra::io::{ensure_output_dir, read_table_csv, workbook_name, write_workbook_xlsx};

pub const SHEET_IC: &str = "DATM_NOAHMP_IC";
pub const SHEET_NON_FIXED: &str = "NonFixed_FV3";
pub const SHEET_FIXED: &str = "Fixed_FV3";
pub const SHEET_BASELINE: &str = "Baseline";
pub const SHEET_ARCHIVE: &str = "Land_DA_TAR";

/// Fixed sheet order of a consolidated workbook.
pub const SHEET_ORDER: [&str; 5] = [SHEET_IC, SHEET_NON_FIXED, SHEET_FIXED, SHEET_BASELINE, SHEET_ARCHIVE];

const DATASET: &str = "Dataset";
const COMPONENT: &str = "UFS Component";
const SUB_CATEGORY: &str = "Sub-Category";
const RESOLUTION: &str = "Resolution (C)";
const COMPILER: &str = "Compiler";
const TEST_NAME: &str = "Test Name";

/// Selection targets for one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    /// Baseline stamp, matched as `develop-{baseline_date}`
    pub baseline_date: String,
    /// Input stamp, matched as `input-data-{input_date}`
    pub input_date: String,
    pub ic_components: Vec<String>,
    pub grid_component: String,
    pub grid_spec_files: Vec<String>,
    pub tile_prefix: String,
    pub staging_sub_category: String,
    pub fix_component: String,
    pub resolution: f64,
    pub compiler: String,
    pub test_name: String,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            baseline_date: String::new(),
            input_date: String::new(),
            ic_components: vec!["DATM_GSWP3_input_data".into(), "NOAHMP_IC".into()],
            grid_component: "FV3_input_data".into(),
            grid_spec_files: vec!["grid_spec.nc".into()],
            tile_prefix: "C96_grid.tile".into(),
            staging_sub_category: "INPUT".into(),
            fix_component: "FV3_fix_tiled".into(),
            resolution: 96.0,
            compiler: "intel".into(),
            test_name: "datm_cdeps_lnd_gswp3".into(),
        }
    }
}

impl Criteria {
    pub fn input_dataset(&self) -> String {
        format!("input-data-{}", self.input_date)
    }

    pub fn baseline_dataset(&self) -> String {
        format!("develop-{}", self.baseline_date)
    }
}

/// Row predicate over named columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(ColumnKey, String),
    OneOf(ColumnKey, Vec<String>),
    StartsWith(ColumnKey, String),
    /// Numeric comparison, so `96` and `96.0` agree
    NumericEquals(ColumnKey, f64),
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn equals(column: &str, value: impl Into<String>) -> Self {
        Predicate::Equals(column.into(), value.into())
    }

    pub fn one_of(column: &str, values: &[String]) -> Self {
        Predicate::OneOf(column.into(), values.to_vec())
    }

    pub fn matches(&self, row: &Row<'_>) -> bool {
        let text = |key: &ColumnKey| row.get(key).and_then(Cell::as_text);

        match self {
            Predicate::Equals(key, want) => text(key).is_some_and(|v| v == want.as_str()),
            Predicate::OneOf(key, wants) => {
                text(key).is_some_and(|v| wants.iter().any(|w| v == w.as_str()))
            }
            Predicate::StartsWith(key, prefix) => {
                text(key).is_some_and(|v| v.starts_with(prefix.as_str()))
            }
            Predicate::NumericEquals(key, want) => text(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .is_some_and(|v| v == *want),
            Predicate::All(parts) => parts.iter().all(|p| p.matches(row)),
        }
    }

    /// Columns this predicate reads.
    pub fn columns(&self) -> Vec<&ColumnKey> {
        match self {
            Predicate::Equals(k, _)
            | Predicate::OneOf(k, _)
            | Predicate::StartsWith(k, _)
            | Predicate::NumericEquals(k, _) => vec![k],
            Predicate::All(parts) => parts.iter().flat_map(Predicate::columns).collect(),
        }
    }
}

/// Copy the rows of `table` that satisfy `predicate`.
///
/// A predicate over a column the table lacks selects nothing.
pub fn select(table: &Table, predicate: &Predicate, sheet: &str) -> Table {
    let absent: Vec<String> = predicate
        .columns()
        .into_iter()
        .filter(|k| !table.has_column(k))
        .map(ToString::to_string)
        .collect();

    if !absent.is_empty() {
        warn!(sheet, ?absent, "source table lacks filter columns; selecting no rows");
        return table.empty_like();
    }

    table.filter(|row| predicate.matches(row))
}

/// The three reloaded data maps.
#[derive(Debug, Clone)]
pub struct Sources {
    pub baseline: Table,
    pub input: Table,
    pub archive: Table,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// Ordered, named collection of tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, table: Table) {
        self.sheets.push(Sheet { name: name.into(), table });
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.table)
    }

    pub fn names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Build the five-sheet workbook for one test case.
#[instrument(skip_all, fields(baseline = %criteria.baseline_date, input = %criteria.input_date))]
pub fn consolidate(sources: &Sources, criteria: &Criteria) -> Result<Workbook, TableError> {
    let input_dataset = Predicate::equals(DATASET, criteria.input_dataset());

    let ic = Predicate::All(vec![
        input_dataset.clone(),
        Predicate::one_of(COMPONENT, &criteria.ic_components),
    ]);

    let staged_grid = |file: Predicate| {
        Predicate::All(vec![
            input_dataset.clone(),
            Predicate::equals(COMPONENT, criteria.grid_component.clone()),
            file,
            Predicate::equals(SUB_CATEGORY, criteria.staging_sub_category.clone()),
        ])
    };
    let grid_spec = staged_grid(Predicate::one_of(DATA_FILE, &criteria.grid_spec_files));
    let grid_tiles = staged_grid(Predicate::StartsWith(DATA_FILE.into(), criteria.tile_prefix.clone()));

    let fixed = Predicate::All(vec![
        input_dataset.clone(),
        Predicate::equals(COMPONENT, criteria.fix_component.clone()),
        Predicate::NumericEquals(RESOLUTION.into(), criteria.resolution),
    ]);

    let baseline = Predicate::All(vec![
        Predicate::equals(DATASET, criteria.baseline_dataset()),
        Predicate::equals(COMPILER, criteria.compiler.clone()),
        Predicate::equals(TEST_NAME, criteria.test_name.clone()),
    ]);

    // Grid-spec rows first, then tile rows, as two stacked selections.
    let mut non_fixed = select(&sources.input, &grid_spec, SHEET_NON_FIXED);
    non_fixed.append(select(&sources.input, &grid_tiles, SHEET_NON_FIXED))?;

    let mut workbook = Workbook::new();
    workbook.push(SHEET_IC, select(&sources.input, &ic, SHEET_IC));
    workbook.push(SHEET_NON_FIXED, non_fixed);
    workbook.push(SHEET_FIXED, select(&sources.input, &fixed, SHEET_FIXED));
    workbook.push(SHEET_BASELINE, select(&sources.baseline, &baseline, SHEET_BASELINE));
    workbook.push(SHEET_ARCHIVE, sources.archive.clone());

    for sheet in workbook.sheets() {
        debug!(sheet = %sheet.name, rows = sheet.table.len(), "consolidated sheet");
    }

    Ok(workbook)
}

/// `dmap consolidate`: reload three data maps and write the workbook.
pub fn run(args: ConsolidateArgs, ctx: &AppContext, cfg: &Config) -> Result<()> {
    let mut criteria = cfg.consolidate.clone();
    if let Some(date) = args.baseline_date {
        criteria.baseline_date = date;
    }
    if let Some(date) = args.input_date {
        criteria.input_date = date;
    }
    if let Some(res) = args.resolution {
        criteria.resolution = res;
    }
    if let Some(compiler) = args.compiler {
        criteria.compiler = compiler;
    }
    if let Some(test) = args.test_name {
        criteria.test_name = test;
    }
    if criteria.baseline_date.is_empty() || criteria.input_date.is_empty() {
        anyhow::bail!("Baseline and input dates are required (--baseline-date/--input-date or [consolidate] config)");
    }

    let missing = cfg.missing_marker.as_str();
    let load = |path: &std::path::Path| {
        read_table_csv(path, missing).with_context(|| format!("Failed to load data map {}", path.display()))
    };
    let sources = Sources {
        baseline: load(&args.baseline_map)?,
        input: load(&args.input_map)?,
        archive: load(&args.archive_map)?,
    };

    let workbook = consolidate(&sources, &criteria)?;

    let output = args.output.unwrap_or_else(|| {
        args.output_dir
            .unwrap_or_else(|| cfg.output_dir.clone())
            .join(workbook_name(&args.version))
    });

    if ctx.dry_run {
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would write:".yellow());
            println!("  {}", output.display());
            for sheet in workbook.sheets() {
                println!("    {} ({} rows)", sheet.name, sheet.table.len());
            }
        }
        return Ok(());
    }

    if let Some(parent) = output.parent() {
        ensure_output_dir(parent)?;
    }
    write_workbook_xlsx(&workbook, &output, missing)
        .with_context(|| format!("Failed to save workbook to {}", output.display()))?;

    if !ctx.quiet {
        println!("{} Data maps consolidated and saved to {}", "✓".green(), output.display());
    }
    Ok(())
}
