//! Filepath: src/infra/walk.rs
//! Directory walker for local bucket mirrors.
//! - Extra ignore globs (early prune + late filter)
//! - Optional hidden file policy, following symlinks, and max depth
//! - Keys are `/`-joined paths relative to the root, sorted
//!
//! Backed by ripgrep's `ignore` crate and `globset`. Version-control
//! ignore files are not consulted: a mirror is data, not a source tree.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};
use tracing::debug;

/// One regular file found under the walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile
{
    /// Relative key, always `/`-separated
    pub key: String,

    /// Absolute (or root-joined) path on disk
    pub path: PathBuf,

    /// Length in bytes
    pub size: u64,
}

/// Walker with extra ignore globs and a hidden-file policy.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out files that still slipped through.
#[derive(Debug, Clone)]
pub struct FileWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Include hidden (dot) files; default true
    include_hidden: bool,

    /// Follow symbolic links; default false
    follow_symlinks: bool,

    /// Maximum recursion depth; default None (unbounded)
    max_depth: Option<usize>,
}

impl FileWalker
{
    /// Build a walker with additional ignore patterns (e.g. "**/*.md5",
    /// "scratch/**"). Patterns match on relative paths.
    pub fn new(additional_ignores: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_patterns: builder.build()?,
            include_hidden: true,
            follow_symlinks: false,
            max_depth: None,
        })
    }

    /// (Optional) Include or exclude hidden files (dotfiles).
    pub fn with_include_hidden(
        mut self,
        include_hidden: bool,
    ) -> Self
    {
        self.include_hidden = include_hidden;
        self
    }

    /// (Optional) Follow or skip symbolic links (default false).
    pub fn with_follow_symlinks(
        mut self,
        follow: bool,
    ) -> Self
    {
        self.follow_symlinks = follow;
        self
    }

    /// (Optional) Limit recursion depth (`None` = unbounded).
    pub fn with_max_depth(
        mut self,
        depth: Option<usize>,
    ) -> Self
    {
        self.max_depth = depth;
        self
    }

    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // WalkBuilder::hidden(true) => *skip* dotfiles
        b.hidden(!self.include_hidden);

        b.ignore(false);
        b.parents(false);
        b.git_ignore(false);
        b.git_global(false);
        b.git_exclude(false);

        b.follow_links(self.follow_symlinks);
        b.max_depth(self.max_depth);

        let extra = self
            .ignore_patterns
            .clone();
        let prune_root = root.to_path_buf();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .map(|ft| ft.is_dir())
                .unwrap_or(false);

            if !is_dir
            {
                return true;
            }
            let rel = ent
                .path()
                .strip_prefix(&prune_root)
                .unwrap_or(ent.path());
            !extra.is_match(rel)
        });

        b
    }

    /// Traverse regular files under `root`, sorted by key.
    /// The first unreadable entry aborts the walk.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> io::Result<Vec<WalkedFile>>
    {
        let root_path = root.as_ref();
        let walker = self
            .build_walk(root_path)
            .build();

        let mut out: Vec<WalkedFile> = Vec::new();
        for res in walker
        {
            let entry = res.map_err(io::Error::other)?;
            if !entry
                .file_type()
                .is_some_and(|ft| ft.is_file())
            {
                continue;
            }

            let size = entry
                .metadata()
                .map_err(io::Error::other)?
                .len();
            let path = entry.into_path();
            let key = relative_key(root_path, &path).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{} is outside {}", path.display(), root_path.display()),
                )
            })?;

            if self
                .ignore_patterns
                .is_match(&key)
            {
                continue;
            }
            out.push(WalkedFile { key, path, size });
        }

        out.sort_by(|a, b| {
            a.key
                .cmp(&b.key)
        });
        debug!(files = out.len(), root = %root_path.display(), "walked mirror");

        Ok(out)
    }
}

/// `/`-joined path of `path` relative to `root`; `None` when outside it.
fn relative_key(
    root: &Path,
    path: &Path,
) -> Option<String>
{
    let rel = path
        .strip_prefix(root)
        .ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| {
            c.as_os_str()
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    if parts.is_empty()
    {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Create a file with parent dirs as needed
    fn write_file(
        root: &Path,
        rel: &str,
        contents: &str,
    ) -> Result<()>
    {
        let path = root.join(rel);
        if let Some(parent) = path.parent()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn keys(files: &[WalkedFile]) -> Vec<&str>
    {
        files
            .iter()
            .map(|f| f.key.as_str())
            .collect()
    }

    #[test]
    fn test_keys_are_relative_sorted_and_sized() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, "v1/FV3_fix/C96.mx100.nc", "0123456789")?;
        write_file(root, "v1/README", "r")?;
        write_file(root, "a.tar", "")?;

        let walker = FileWalker::new(&[])?;
        let files = walker.walk_files(root)?;

        assert_eq!(keys(&files), ["a.tar", "v1/FV3_fix/C96.mx100.nc", "v1/README"]);
        assert_eq!(files[1].size, 10);
        assert_eq!(files[0].size, 0);
        Ok(())
    }

    #[test]
    fn test_gitignore_is_not_consulted() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, ".gitignore", "*.nc")?;
        write_file(root, "data.nc", "x")?;

        let walker = FileWalker::new(&[])?.with_include_hidden(false);
        let files = walker.walk_files(root)?;

        assert_eq!(keys(&files), ["data.nc"]);
        Ok(())
    }

    #[test]
    fn test_additional_globs_prune_and_filter() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, "scratch/tmp/a.nc", "bin")?;
        write_file(root, "v1/b.nc.md5", "sum")?;
        write_file(root, "v1/b.nc", "data")?;

        let ignores = vec!["scratch".to_string(), "**/*.md5".to_string()];
        let walker = FileWalker::new(&ignores)?;
        let files = walker.walk_files(root)?;

        assert_eq!(keys(&files), ["v1/b.nc"]);
        Ok(())
    }

    #[test]
    fn test_hidden_files_policy() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, ".hidden.txt", "h")?;
        write_file(root, "visible.txt", "v")?;

        let walker = FileWalker::new(&[])?;
        assert_eq!(keys(&walker.walk_files(root)?), [".hidden.txt", "visible.txt"]);

        let walker = FileWalker::new(&[])?.with_include_hidden(false);
        assert_eq!(keys(&walker.walk_files(root)?), ["visible.txt"]);
        Ok(())
    }

    #[test]
    fn test_max_depth() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "a.txt", "a")?;
        write_file(root, "sub/b.txt", "b")?;

        let walker = FileWalker::new(&[])?.with_max_depth(Some(1));
        assert_eq!(keys(&walker.walk_files(root)?), ["a.txt"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_link_aborts_walk_when_following() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "v1/a.nc", "a")?;
        std::os::unix::fs::symlink(root.join("gone"), root.join("v1/dangling.nc"))?;

        let walker = FileWalker::new(&[])?.with_follow_symlinks(true);
        assert!(walker.walk_files(root).is_err());
        Ok(())
    }
}
