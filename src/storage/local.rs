//! Filesystem backend for the level store
//!
//! Paths are relative to one directory; nothing here knows about levels.

use super::StorageError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn with_base_dir(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    /// Plain file names directly inside `dir`; subdirectories are skipped
    pub fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.path_of(dir))?.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub fn read(&self, file: &str) -> Result<Vec<u8>, StorageError> {
        Ok(std::fs::read(self.path_of(file))?)
    }

    /// Create or replace `file`, making its directory first if needed
    pub fn write(&self, file: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_of(file);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, data)?;
        Ok(())
    }

    /// Remove `file`. A file that is already gone is not an error.
    pub fn delete(&self, file: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_of(file)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    pub fn exists(&self, file: &str) -> bool {
        self.path_of(file).exists()
    }
}
