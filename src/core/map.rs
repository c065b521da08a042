//! `dmap map` and `dmap keys`: listing → data map CSV / key listing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::{AppContext, KeysArgs, MapArgs};
use crate::core::layout::{Layout, LayoutReport, SourceMode};
use crate::core::listing::{self, Listing};
use crate::core::table::Table;
use crate::infra::config::Config;
use crate::infra::io::{
    archive_map_name, ensure_output_dir, key_listing_name, prefix_map_name, write_key_listing,
    write_table_csv,
};

pub fn run(
    args: MapArgs,
    ctx: &AppContext,
    cfg: &Config,
) -> Result<()> {
    let layout = match (&args.layout, &args.layout_file) {
        (_, Some(path)) => Layout::from_file(path)?,
        (Some(name), None) => Layout::builtin(name)?,
        (None, None) => anyhow::bail!("One of --layout or --layout-file is required"),
    };

    let listing = listing::fetch(&args.source, cfg, ctx)?;
    layout.expect_mode(listing.mode)?;

    let prefix = match listing.mode {
        SourceMode::Prefix => Some(listing.selector.as_str()),
        SourceMode::Archive => None,
    };
    let strict = args.strict_columns || cfg.strict_columns;
    let (table, report) = layout
        .map(&listing.entries, prefix, strict)
        .with_context(|| format!("Failed to apply layout '{}'", layout.name))?;
    log_report(&layout, &table, &report);

    let missing = args
        .missing_marker
        .as_deref()
        .unwrap_or(&cfg.missing_marker);
    let output = map_output_path(&args, cfg, &listing);

    if let Some(n) = args.preview
        && !ctx.quiet
    {
        println!("{}", preview(&table, n, missing));
    }

    // Archive listings also leave the raw member list next to the map.
    let key_listing = match listing.mode {
        SourceMode::Archive => Some(
            output
                .parent()
                .unwrap_or(Path::new(""))
                .join(key_listing_name(&listing.bucket_name)),
        ),
        SourceMode::Prefix => None,
    };

    if ctx.dry_run {
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would write:".yellow());
            println!("  {} ({} rows, {} columns)", output.display(), table.len(), table.width());
            if let Some(path) = &key_listing {
                println!("  {} ({} keys)", path.display(), listing.entries.len());
            }
        }
        return Ok(());
    }

    if let Some(parent) = output.parent() {
        ensure_output_dir(parent)?;
    }
    if let Some(path) = &key_listing {
        write_key_listing(&listing.entries, path)
            .with_context(|| format!("Failed to save key listing to {}", path.display()))?;
        if !ctx.quiet {
            println!("{} List of {} keys saved to {}", "✓".green(), listing.bucket_name, path.display());
        }
    }
    write_table_csv(&table, &output, missing)
        .with_context(|| format!("Failed to save data map to {}", output.display()))?;

    if !ctx.quiet {
        println!("{} Data map saved to {}", "✓".green(), output.display());
    }
    Ok(())
}

fn log_report(
    layout: &Layout,
    table: &Table,
    report: &LayoutReport,
) {
    for r in &report.extracted {
        tracing::debug!(column = %r.column, matched = r.matched, missing = r.missing, "extracted");
    }
    tracing::info!(
        layout = %layout.name,
        rows = table.len(),
        columns = table.width(),
        dropped = report.dropped,
        "mapped listing"
    );
}

fn output_dir(
    flag: Option<&Path>,
    cfg: &Config,
) -> PathBuf {
    flag.map(Path::to_path_buf)
        .unwrap_or_else(|| cfg.output_dir.clone())
}

fn map_output_path(
    args: &MapArgs,
    cfg: &Config,
    listing: &Listing,
) -> PathBuf {
    if let Some(out) = &args.output {
        return out.clone();
    }
    let name = match listing.mode {
        SourceMode::Archive => archive_map_name(&listing.selector, &listing.tag),
        SourceMode::Prefix => prefix_map_name(&listing.tag, &listing.selector),
    };
    output_dir(args.output_dir.as_deref(), cfg).join(name)
}

/// First `n` rows rendered as a terminal table.
pub fn preview(
    table: &Table,
    n: usize,
    missing: &str,
) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.columns().iter().map(|c| c.to_string()));
    for row in table.rows().take(n) {
        builder.push_record(
            row.cells()
                .iter()
                .map(|c| c.render(missing).into_owned()),
        );
    }
    let mut rendered = builder.build();
    rendered.with(Style::rounded());
    rendered.to_string()
}

pub fn keys_run(
    args: KeysArgs,
    ctx: &AppContext,
    cfg: &Config,
) -> Result<()> {
    let listing = listing::fetch(&args.source, cfg, ctx)?;

    let output = args.output.clone().unwrap_or_else(|| {
        output_dir(args.output_dir.as_deref(), cfg).join(key_listing_name(&listing.bucket_name))
    });

    if ctx.dry_run {
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would write:".yellow());
            println!("  {} ({} keys)", output.display(), listing.entries.len());
        }
        return Ok(());
    }

    if let Some(parent) = output.parent() {
        ensure_output_dir(parent)?;
    }
    write_key_listing(&listing.entries, &output)
        .with_context(|| format!("Failed to save key listing to {}", output.display()))?;

    if !ctx.quiet {
        println!(
            "{} List of {} keys saved to {}",
            "✓".green(),
            listing.bucket_name,
            output.display()
        );
    }
    Ok(())
}
