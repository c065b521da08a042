use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::consolidate::Criteria;
use crate::source::S3Options;

/// Config files probed in the working directory, first hit wins.
pub const CONFIG_FILES: [&str; 4] = ["datamap.toml", "datamap.yaml", "datamap.json", ".datamap.toml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Directory every output file is written to
    pub output_dir: PathBuf,

    /// Text written for values no extractor could infer
    pub missing_marker: String,

    /// Reject column maps that leave positions unmapped or point past the
    /// observed depth
    pub strict_columns: bool,

    /// Anonymous S3 access
    pub s3: S3Options,

    /// Local bucket mirrors
    pub local: LocalConfig,

    /// Test-case selection used by `consolidate`
    pub consolidate: Criteria,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig
{
    /// Extra ignore globs for mirror walks (relative paths)
    pub ignore: Vec<String>,

    pub include_hidden: bool,

    /// Follow symlinks inside the mirror; a dangling link fails the listing
    pub follow_symlinks: bool,
}

impl Default for LocalConfig
{
    fn default() -> Self
    {
        Self {
            ignore: vec!["**/.DS_Store".to_string(), "**/*.md5".to_string()],
            include_hidden: false,
            follow_symlinks: false,
        }
    }
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            output_dir: PathBuf::from("results"),
            missing_marker: String::new(),
            strict_columns: false,
            s3: S3Options::default(),
            local: LocalConfig::default(),
            consolidate: Criteria::default(),
        }
    }
}

/// Load configuration from the first config file found in the working
/// directory (or `explicit`), then `DATAMAP_*` environment variables.
/// Nested keys use a double underscore: `DATAMAP_S3__READ_TIMEOUT_SECS=5`.
pub fn load_config(explicit: Option<&Path>) -> Result<Config>
{
    let mut builder = config::Config::builder();

    match explicit
    {
        Some(path) =>
        {
            if !path.exists()
            {
                anyhow::bail!("Config file {} does not exist", path.display());
            }
            builder = builder.add_source(config::File::from(path));
        }
        None =>
        {
            for path in &CONFIG_FILES
            {
                if Path::new(path).exists()
                {
                    builder = builder.add_source(config::File::from(Path::new(path)));
                    break;
                }
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DATAMAP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    tracing::debug!(?parsed.output_dir, strict = parsed.strict_columns, "configuration loaded");
    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let toml_string =
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("{}", "DRY RUN: Would write:".yellow());
            println!("  {}", config_path.display());
        }
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn default_round_trips_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
        assert!(text.contains("[consolidate]"));
        assert!(text.contains("[s3]"));
    }

    #[test]
    fn explicit_file_overrides_defaults()
    {
        let dir = TempDir::new().unwrap();
        let path = dir
            .path()
            .join("custom.toml");
        std::fs::write(
            &path,
            r#"
output_dir = "out"
missing_marker = "NA"

[consolidate]
compiler = "gnu"
resolution = 192.0
"#,
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert_eq!(cfg.missing_marker, "NA");
        assert_eq!(cfg.consolidate.compiler, "gnu");
        assert_eq!(cfg.consolidate.resolution, 192.0);
        assert_eq!(cfg.consolidate.test_name, "datm_cdeps_lnd_gswp3");
        assert_eq!(cfg.s3, S3Options::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error()
    {
        let dir = TempDir::new().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn init_refuses_to_overwrite()
    {
        let dir = TempDir::new().unwrap();
        let ctx = AppContext {
            quiet: true,
            no_color: true,
            dry_run: false,
            verbose: false,
        };
        let args = || InitArgs {
            path: dir
                .path()
                .to_path_buf(),
            force: false,
        };

        init(args(), &ctx).unwrap();
        assert!(
            dir.path()
                .join("datamap.toml")
                .exists()
        );
        assert!(init(args(), &ctx).is_err());
    }
}
