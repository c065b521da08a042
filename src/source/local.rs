//! A bucket mirrored to a local directory: keys are paths relative to the root.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, instrument};

use super::{ObjectStore, SourceError};
use crate::core::tokenize::Entry;
use crate::infra::walk::FileWalker;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    name: String,
    walker: FileWalker,
}

impl LocalStore {
    /// Mirror rooted at `root`; `name` stands in for the bucket name.
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>, walker: FileWalker) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            walker,
        }
    }

    /// Use the directory's own name as the bucket name.
    pub fn from_dir(root: impl Into<PathBuf>, walker: FileWalker) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string());
        Self::new(root, name, walker)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, SourceError> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(SourceError::NotFound(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn list_keys(&self) -> Result<Vec<Entry>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::NotFound(self.root.display().to_string()));
        }
        let entries: Vec<Entry> = self
            .walker
            .walk_files(&self.root)?
            .into_iter()
            .map(|f| Entry::new(f.key, f.size))
            .collect();
        debug!(keys = entries.len(), "listed local mirror");
        Ok(entries)
    }

    fn open(&self, key: &str) -> Result<Box<dyn Read + '_>, SourceError> {
        let path = self.resolve(key)?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(key.to_string()))
            }
            Err(err) => Err(SourceError::Io(err)),
        }
    }
}
