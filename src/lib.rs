//! **datamap** - Data maps for regression-test archives and storage buckets
//!
//! Lists tar archive members or bucket keys, splits each path into
//! hierarchical columns, infers grid/ocean resolution, version stamps and
//! test metadata by ordered pattern matching, and writes the result as CSV.
//! Several persisted maps can be consolidated into one multi-sheet workbook.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core pipeline - tokenizing, extraction, layouts and consolidation
pub mod core {
    /// Ordered-column table with typed cells
    pub mod table;
    pub use table::{Cell, ColumnKey, Table, TableError};

    /// Listing → table conversion with explicit column maps
    pub mod tokenize;
    pub use tokenize::{ColumnMap, Entry, TableBuilder, build_table};

    /// Declarative attribute extractors
    pub mod extract;
    pub use extract::{ExtractorKind, ExtractorSpec};

    /// Named mapping recipes for known archive and bucket layouts
    pub mod layout;
    pub use layout::{Layout, SourceMode, run as layouts_run};

    /// Row-filter consolidation into a workbook
    pub mod consolidate;
    pub use consolidate::{Criteria, Workbook, consolidate, run as consolidate_run};

    /// Command-line source selection
    pub mod listing;

    /// `map` and `keys` commands
    pub mod map;
    pub use map::{keys_run, run as map_run};
}

/// Listing sources - S3, local mirrors and tar archives
pub mod source;

/// Infrastructure - configuration, persistence, logging and walking
pub mod infra {
    /// Layered configuration with TOML defaults
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// CSV and XLSX persistence
    pub mod io;

    /// tracing-subscriber setup
    pub mod logging;

    /// Local mirror walking
    pub mod walk;
    pub use walk::FileWalker;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{consolidate_run, keys_run, layouts_run, map_run};
pub use infra::{Config, FileWalker, load_config};
