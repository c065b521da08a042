use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::source::BucketLabel;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: bool,  // global --verbose
}

#[derive(Parser)]
#[command(name = "dmap")]
#[command(about = "Build data maps of regression-test archives and storage buckets")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress spinners and non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log progress at info level (overridden by DATAMAP_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Explicit config file (default: datamap.toml in the working directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn context(&self) -> AppContext {
        AppContext {
            quiet: self.quiet,
            no_color: self.no_color,
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Map an archive or a bucket prefix to a CSV data map
    Map(MapArgs),

    /// List bucket keys or archive members to a side file
    Keys(KeysArgs),

    /// Merge persisted data maps into one multi-sheet workbook
    Consolidate(ConsolidateArgs),


    /// List built-in layouts or print one as TOML
    Layouts(LayoutsArgs),

    /// Initialize a datamap.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where listings come from.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Bucket label (land-da, srw, rt)
    #[arg(short, long, value_enum)]
    pub bucket: Option<BucketLabel>,

    /// Read a local directory mirror of the bucket instead of S3
    #[arg(long, value_name = "DIR")]
    pub local: Option<PathBuf>,

    /// Local tar file (plain or gzip) instead of a bucket object
    #[arg(long, value_name = "FILE", conflicts_with_all = ["key", "prefix"])]
    pub tar: Option<PathBuf>,

    /// Key of a tar object in the bucket
    #[arg(short, long, conflicts_with = "prefix")]
    pub key: Option<String>,

    /// Substring that selected bucket keys must contain
    #[arg(short, long)]
    pub prefix: Option<String>,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["tar", "key", "prefix"])))]
#[command(group(ArgGroup::new("recipe").required(true).args(["layout", "layout_file"])))]
pub struct MapArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Built-in layout name (see `dmap layouts`)
    #[arg(short, long)]
    pub layout: Option<String>,

    /// Layout recipe loaded from a TOML file
    #[arg(long, value_name = "FILE")]
    pub layout_file: Option<PathBuf>,

    /// Output file (default: derived from key/prefix under the output dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Print the first N rows as a table after mapping
    #[arg(long, value_name = "N")]
    pub preview: Option<usize>,

    /// Reject column maps that do not cover the observed path depth
    #[arg(long)]
    pub strict_columns: bool,

    /// Text written for values no pattern matched (overrides config)
    #[arg(long)]
    pub missing_marker: Option<String>,
}

#[derive(Parser, Debug)]
pub struct KeysArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output file (default: {bucket_name}_all_keys.csv under the output dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ConsolidateArgs {
    /// Data map of the baseline bucket prefix
    #[arg(long, value_name = "CSV")]
    pub baseline_map: PathBuf,

    /// Data map of the input-data bucket prefix
    #[arg(long, value_name = "CSV")]
    pub input_map: PathBuf,

    /// Data map of the application archive
    #[arg(long, value_name = "CSV")]
    pub archive_map: PathBuf,

    /// Baseline stamp, selects `develop-{date}` rows
    #[arg(long)]
    pub baseline_date: Option<String>,

    /// Input stamp, selects `input-data-{date}` rows
    #[arg(long)]
    pub input_date: Option<String>,

    /// Application version used in the workbook name
    #[arg(long = "app-version", value_name = "VERSION")]
    pub version: String,

    /// Target grid resolution for the fixed-file sheet
    #[arg(long)]
    pub resolution: Option<f64>,

    /// Compiler of the baseline test
    #[arg(long)]
    pub compiler: Option<String>,

    /// Baseline test name
    #[arg(long)]
    pub test_name: Option<String>,

    /// Output file (default: land_da_test_case_{version}_data_maps.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct LayoutsArgs {
    /// Print one layout as TOML (usable with `map --layout-file`)
    #[arg(long, value_name = "NAME")]
    pub show: Option<String>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
