//! Reference document corpus index
//!
//! Enumerates the candidate citation targets once at construction and
//! treats the list as a read-only snapshot until an explicit `reload`.

use crate::errors::{AssistantError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Snapshot of the reference document directory
///
/// Holds filenames only; directory entries are excluded. Names are sorted
/// so matching is deterministic regardless of filesystem listing order.
#[derive(Debug, Clone)]
pub struct CorpusIndex {
    docs_dir: PathBuf,
    files: Vec<String>,
}

impl CorpusIndex {
    /// Enumerate the document directory
    ///
    /// Fails when the directory does not exist.
    pub fn load(docs_dir: impl Into<PathBuf>) -> Result<Self> {
        let docs_dir = docs_dir.into();
        if !docs_dir.is_dir() {
            return Err(AssistantError::Config(format!(
                "document directory does not exist: {}",
                docs_dir.display()
            )));
        }

        let files = Self::enumerate(&docs_dir)?;
        info!(count = files.len(), dir = %docs_dir.display(), "corpus index loaded");

        Ok(Self { docs_dir, files })
    }

    fn enumerate(dir: &Path) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Re-enumerate the directory, replacing the snapshot
    ///
    /// Operator entry point for picking up new documents without restart.
    pub fn reload(&mut self) -> Result<usize> {
        self.files = Self::enumerate(&self.docs_dir)?;
        info!(count = self.files.len(), "corpus index reloaded");
        Ok(self.files.len())
    }

    /// Enumerated filenames, sorted
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Directory backing this index
    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_load_files_only() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b.pdf")).unwrap();
        File::create(dir.path().join("a.pdf")).unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let index = CorpusIndex::load(dir.path()).unwrap();

        // Sorted, and the subdirectory is excluded
        assert_eq!(index.files(), ["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let result = CorpusIndex::load("/nonexistent/docs/path");
        assert!(matches!(result, Err(AssistantError::Config(_))));
    }

    #[test]
    fn test_reload_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("a.pdf")).unwrap();

        let mut index = CorpusIndex::load(dir.path()).unwrap();
        assert_eq!(index.len(), 1);

        File::create(dir.path().join("b.pdf")).unwrap();
        // Snapshot is unchanged until reload is called
        assert_eq!(index.len(), 1);

        let count = index.reload().unwrap();
        assert_eq!(count, 2);
        assert_eq!(index.files(), ["a.pdf", "b.pdf"]);
    }
}
