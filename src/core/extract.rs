//! Attribute extractors.
//!
//! Every extractor is a record of ordered rules. For each row the rules are
//! tried in order; for each rule the caller's source columns are scanned in
//! priority order. The first column whose value the rule detects wins and
//! the rule's `take` match (minus its strip token) becomes the attribute.
//! When nothing matches the cell is [`Cell::Missing`].

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::table::{Cell, ColumnKey, Table, TableError};

/// Catalog of known extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorKind {
    /// "C" grid resolution from up to three columns (`C96`, `data768`, ...)
    GridResolution,
    /// "C" grid resolution, two or three digits only
    GridResolutionShort,
    /// Ocean resolution tagged `mx` (`mx100`)
    OceanMx,
    /// Ocean resolution tagged `o` (`o100`)
    OceanO,
    /// Untagged ocean resolution: the whole value is 2-3 digits
    OceanBare,
    /// Dataset stamp (`develop-YYYYMMDD`, `input-data-YYYYMMDD`)
    DatasetType,
    /// Version stamp (`YYYY-MM`, else `YYYY`)
    Version,
    /// Everything before the last `_`
    TestName,
    /// Everything after the last `_`
    Compiler,
}

impl ExtractorKind {
    pub const ALL: [ExtractorKind; 9] = [
        ExtractorKind::GridResolution,
        ExtractorKind::GridResolutionShort,
        ExtractorKind::OceanMx,
        ExtractorKind::OceanO,
        ExtractorKind::OceanBare,
        ExtractorKind::DatasetType,
        ExtractorKind::Version,
        ExtractorKind::TestName,
        ExtractorKind::Compiler,
    ];

    pub fn spec(self) -> &'static ExtractorSpec {
        &SPECS[self as usize]
    }

    /// Column the extractor writes unless a layout renames it.
    pub fn output_column(self) -> &'static str {
        self.spec().output
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractorKind::GridResolution => "grid-resolution",
            ExtractorKind::GridResolutionShort => "grid-resolution-short",
            ExtractorKind::OceanMx => "ocean-mx",
            ExtractorKind::OceanO => "ocean-o",
            ExtractorKind::OceanBare => "ocean-bare",
            ExtractorKind::DatasetType => "dataset-type",
            ExtractorKind::Version => "version",
            ExtractorKind::TestName => "test-name",
            ExtractorKind::Compiler => "compiler",
        };
        f.write_str(name)
    }
}

/// Literal removed from a matched value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strip {
    None,
    Prefix(&'static str),
    Suffix(&'static str),
}

impl Strip {
    fn apply<'a>(&self, value: &'a str) -> &'a str {
        match self {
            Strip::None => value,
            Strip::Prefix(p) => value.strip_prefix(p).unwrap_or(value),
            Strip::Suffix(s) => value.strip_suffix(s).unwrap_or(value),
        }
    }
}

/// One pattern of an extractor.
#[derive(Debug)]
pub struct Rule {
    detect: Regex,
    take: Regex,
    strip: Strip,
}

impl Rule {
    fn new(detect: &str, take: &str, strip: Strip) -> Self {
        Self {
            detect: Regex::new(detect).expect("built-in detect pattern"),
            take: Regex::new(take).expect("built-in take pattern"),
            strip,
        }
    }

    fn simple(pattern: &str, strip: Strip) -> Self {
        Self::new(pattern, pattern, strip)
    }

    /// Attribute for a single candidate value, if this rule detects it.
    pub fn apply(&self, value: &str) -> Option<String> {
        if !self.detect.is_match(value) {
            return None;
        }
        let m = self.take.find(value)?;
        Some(self.strip.apply(m.as_str()).to_string())
    }
}

#[derive(Debug)]
pub struct ExtractorSpec {
    pub kind: ExtractorKind,
    pub output: &'static str,
    pub rules: Vec<Rule>,
}

impl ExtractorSpec {
    /// Infer the attribute from candidate values in priority order.
    pub fn infer<S: AsRef<str>>(&self, candidates: &[Option<S>]) -> Option<String> {
        self.rules.iter().find_map(|rule| {
            candidates
                .iter()
                .flatten()
                .find_map(|v| rule.apply(v.as_ref()))
        })
    }
}

// Indexed by `ExtractorKind as usize`.
static SPECS: LazyLock<Vec<ExtractorSpec>> = LazyLock::new(|| {
    ExtractorKind::ALL
        .iter()
        .map(|&kind| build_spec(kind))
        .collect()
});

fn build_spec(kind: ExtractorKind) -> ExtractorSpec {
    let (output, rules) = match kind {
        ExtractorKind::GridResolution => (
            "Resolution (C)",
            vec![
                Rule::simple(r"C\d{2,4}", Strip::Prefix("C")),
                Rule::simple(r"data\d{2,4}", Strip::Prefix("data")),
                Rule::new(r"C\d{2,4}(.*?)\.", r"C\d{2,4}", Strip::Prefix("C")),
            ],
        ),
        ExtractorKind::GridResolutionShort => (
            "Resolution (C)",
            vec![Rule::simple(r"C\d{2,3}", Strip::Prefix("C"))],
        ),
        ExtractorKind::OceanMx => (
            "Ocean Resolution (mx)",
            vec![Rule::simple(r"mx\d{2,3}", Strip::Prefix("mx"))],
        ),
        ExtractorKind::OceanO => (
            "Ocean Resolution (o)",
            vec![Rule::simple(r"o\d{2,3}", Strip::Prefix("o"))],
        ),
        ExtractorKind::OceanBare => (
            "Ocean Resolution (w/o symbol)",
            vec![Rule::simple(r"^\d{2,3}$", Strip::None)],
        ),
        ExtractorKind::DatasetType => (
            "Dataset Type",
            vec![
                Rule::simple(r"develop-\d{8}", Strip::None),
                Rule::simple(r"input-data-\d{8}", Strip::None),
            ],
        ),
        ExtractorKind::Version => (
            "Version",
            vec![
                Rule::simple(r"[0-9]{4}-[0-9]{2}", Strip::None),
                Rule::simple(r"[0-9]{4}", Strip::None),
            ],
        ),
        ExtractorKind::TestName => (
            "Test Name",
            vec![Rule::new("_", "^.*_", Strip::Suffix("_"))],
        ),
        ExtractorKind::Compiler => (
            "Compiler",
            vec![Rule::new("_", "_[^_]*$", Strip::Prefix("_"))],
        ),
    };

    ExtractorSpec { kind, output, rules }
}

/// Outcome of one extractor pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub column: ColumnKey,
    pub matched: usize,
    pub missing: usize,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("extractor {0} needs at least one source column")]
    NoSources(ExtractorKind),

    #[error("extractor {kind}: {source}")]
    Table {
        kind: ExtractorKind,
        #[source]
        source: TableError,
    },
}

/// Run one extractor over `table`, reading `sources` in priority order and
/// writing its output column (or `output` when given).
pub fn apply(
    table: &mut Table,
    kind: ExtractorKind,
    sources: &[ColumnKey],
    output: Option<&str>,
) -> Result<ExtractReport, ExtractError> {
    if sources.is_empty() {
        return Err(ExtractError::NoSources(kind));
    }

    let cols = sources
        .iter()
        .map(|k| table.require_column(k))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ExtractError::Table { kind, source })?;

    let spec = kind.spec();
    let values: Vec<Cell> = table
        .rows()
        .map(|row| {
            let candidates: Vec<Option<Cow<'_, str>>> = cols
                .iter()
                .map(|&c| row.cells()[c].as_text())
                .collect();
            spec.infer(&candidates)
                .map_or(Cell::Missing, Cell::Text)
        })
        .collect();

    let missing = values.iter().filter(|c| c.is_missing()).count();
    let column = ColumnKey::from(output.unwrap_or(spec.output));
    let matched = values.len() - missing;

    table
        .set_column(column.clone(), values)
        .map_err(|source| ExtractError::Table { kind, source })?;

    debug!(extractor = %kind, %column, matched, missing, "applied extractor");

    Ok(ExtractReport { column, matched, missing })
}
