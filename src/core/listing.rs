//! Resolve `--bucket/--local/--tar/--key/--prefix` into one listing.

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli::{AppContext, SourceArgs};
use crate::core::layout::SourceMode;
use crate::core::tokenize::Entry;
use crate::infra::config::Config;
use crate::infra::walk::FileWalker;
use crate::source::{LocalStore, ObjectStore, S3Store, read_archive_members};

/// A fetched listing plus the names needed for output files.
#[derive(Debug)]
pub struct Listing {
    pub entries: Vec<Entry>,
    pub mode: SourceMode,
    /// Archive key or prefix the listing was selected by
    pub selector: String,
    /// Short bucket tag used in data map names (label, or store name)
    pub tag: String,
    /// Full bucket name used in key listing names
    pub bucket_name: String,
}

/// Open the object store named by `--local` and/or `--bucket`.
pub fn open_store(
    source: &SourceArgs,
    cfg: &Config,
) -> Result<Box<dyn ObjectStore>> {
    match (&source.local, source.bucket) {
        (Some(dir), label) => {
            let walker = FileWalker::new(&cfg.local.ignore)
                .context("Invalid [local] ignore pattern")?
                .with_include_hidden(cfg.local.include_hidden)
                .with_follow_symlinks(cfg.local.follow_symlinks);
            let store = match label {
                Some(label) => LocalStore::new(dir, label.bucket_name(), walker),
                None => LocalStore::from_dir(dir, walker),
            };
            Ok(Box::new(store))
        }
        (None, Some(label)) => {
            let store = S3Store::new(label.bucket_name(), &cfg.s3)
                .with_context(|| format!("Failed to set up S3 access to {}", label.bucket_name()))?;
            Ok(Box::new(store))
        }
        (None, None) => bail!("One of --bucket or --local is required"),
    }
}

fn spinner(ctx: &AppContext, message: String) -> ProgressBar {
    if ctx.quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Fetch the listing selected on the command line.
pub fn fetch(
    source: &SourceArgs,
    cfg: &Config,
    ctx: &AppContext,
) -> Result<Listing> {
    if let Some(tar) = &source.tar {
        let file = File::open(tar).with_context(|| format!("Failed to open {}", tar.display()))?;
        let pb = spinner(ctx, format!("Reading {}", tar.display()));
        let entries = read_archive_members(BufReader::new(file))
            .with_context(|| format!("Failed to list archive {}", tar.display()))?;
        pb.finish_and_clear();

        let selector = tar
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| tar.display().to_string());
        let (tag, bucket_name) = match source.bucket {
            Some(label) => (label.to_string(), label.bucket_name().to_string()),
            None => ("local".to_string(), "local".to_string()),
        };
        return Ok(Listing { entries, mode: SourceMode::Archive, selector, tag, bucket_name });
    }

    let store = open_store(source, cfg)?;
    let tag = source
        .bucket
        .map(|l| l.to_string())
        .unwrap_or_else(|| store.name().to_string());
    let bucket_name = store.name().to_string();

    let (entries, mode, selector) = match (&source.key, &source.prefix) {
        (Some(key), _) => {
            let pb = spinner(ctx, format!("Listing {key}"));
            let entries = store
                .archive_members(key)
                .with_context(|| format!("Failed to list archive {key} in {bucket_name}"))?;
            pb.finish_and_clear();
            (entries, SourceMode::Archive, key.clone())
        }
        (None, Some(prefix)) => {
            let pb = spinner(ctx, format!("Listing {bucket_name}"));
            let entries = store
                .list_prefixed(prefix)
                .with_context(|| format!("Failed to list {bucket_name}"))?;
            pb.finish_and_clear();
            (entries, SourceMode::Prefix, prefix.clone())
        }
        (None, None) => {
            let pb = spinner(ctx, format!("Listing {bucket_name}"));
            let entries = store
                .list_keys()
                .with_context(|| format!("Failed to list {bucket_name}"))?;
            pb.finish_and_clear();
            (entries, SourceMode::Prefix, String::new())
        }
    };

    tracing::info!(entries = entries.len(), %mode, %selector, bucket = %bucket_name, "fetched listing");
    Ok(Listing { entries, mode, selector, tag, bucket_name })
}
