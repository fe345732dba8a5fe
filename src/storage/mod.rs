//! Storage layer for levels
//!
//! Levels are kept as `<name>.level` files under a store directory, one
//! file per level, content in the JSON model format (optionally brotli
//! compressed). The store is the only place that maps level names to
//! paths; names are checked before they ever reach the filesystem.

mod local;

pub use local::LocalStorage;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::EditorConfig;
use crate::world::{parse_level_data, serialize_level, validate_level, Level, LevelError};

/// File extension for stored levels
pub const LEVEL_EXTENSION: &str = "level";

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    /// File or resource not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Level name would escape the store or is empty
    #[error("Invalid level name: {0:?}")]
    InvalidName(String),
    /// Stored data is not a valid level
    #[error("Level error: {0}")]
    Level(#[from] LevelError),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(e.to_string()),
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(e.to_string()),
            _ => StorageError::Io(e.to_string()),
        }
    }
}

/// Check that a level name is usable as a single file stem
pub fn validate_name(name: &str) -> Result<(), StorageError> {
    let bad = name.trim().is_empty()
        || name.contains(['/', '\\', '\0'])
        || name.contains("..")
        || name.starts_with('.');
    if bad {
        Err(StorageError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Name-keyed store of levels in a directory
#[derive(Debug, Clone)]
pub struct LevelStore {
    local: LocalStorage,
    compress: bool,
}

impl LevelStore {
    /// Store rooted at `dir`, writing plain JSON
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            local: LocalStorage::with_base_dir(dir),
            compress: false,
        }
    }

    /// Store at the configured levels directory with the configured compression
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.levels_dir.clone()).with_compression(config.compress_levels)
    }

    /// Whether newly saved levels are brotli compressed
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn dir(&self) -> &Path {
        self.local.base_dir()
    }

    fn file_name(name: &str) -> Result<String, StorageError> {
        validate_name(name)?;
        Ok(format!("{}.{}", name, LEVEL_EXTENSION))
    }

    /// Validate and store a level under `name`, replacing any previous one
    pub fn save(&self, name: &str, level: &Level) -> Result<(), StorageError> {
        let file = Self::file_name(name)?;
        validate_level(level)?;
        let data = serialize_level(level, self.compress)?;
        debug!(name, bytes = data.len(), compressed = self.compress, "saving level");
        self.local.write(&file, &data)
    }

    /// Load and validate the level stored under `name`
    pub fn load(&self, name: &str) -> Result<Level, StorageError> {
        let file = Self::file_name(name)?;
        let data = match self.local.read(&file) {
            Err(StorageError::NotFound(_)) => return Err(StorageError::NotFound(name.to_string())),
            other => other?,
        };
        debug!(name, bytes = data.len(), "loading level");
        Ok(parse_level_data(&data)?)
    }

    /// Names of all stored levels, sorted
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let files = match self.local.list(".") {
            Ok(files) => files,
            // Nothing saved yet
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let suffix = format!(".{}", LEVEL_EXTENSION);
        let mut names: Vec<String> = files
            .iter()
            .filter_map(|f| f.strip_suffix(&suffix))
            .filter(|n| validate_name(n).is_ok())
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.local.exists(&Self::file_name(name)?))
    }

    /// Remove a stored level. Missing levels are reported as `NotFound`.
    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        let file = Self::file_name(name)?;
        if !self.local.exists(&file) {
            return Err(StorageError::NotFound(name.to_string()));
        }
        debug!(name, "deleting level");
        self.local.delete(&file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{default_level, RoomContent};
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, LevelStore) {
        let dir = TempDir::new().unwrap();
        let store = LevelStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            StorageError::NotFound("test.level".to_string()).to_string(),
            "Not found: test.level"
        );
        assert_eq!(
            StorageError::InvalidName("../x".to_string()).to_string(),
            "Invalid level name: \"../x\""
        );
    }

    #[test]
    fn test_io_error_mapping() {
        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(StorageError::from(not_found), StorageError::NotFound(_)));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert!(matches!(StorageError::from(denied), StorageError::PermissionDenied(_)));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("level one").is_ok());
        assert!(validate_name("chapter-2_b").is_ok());

        for bad in ["", "   ", "a/b", "a\\b", "..", "../up", ".hidden"] {
            assert!(
                matches!(validate_name(bad), Err(StorageError::InvalidName(_))),
                "{:?} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_save_and_load_plain() {
        let (dir, store) = setup_store();
        let mut level = default_level("First");
        level.rooms[0].place(RoomContent::wall(2, 2));

        store.save("first", &level).unwrap();
        assert!(dir.path().join("first.level").exists());

        let text = std::fs::read_to_string(dir.path().join("first.level")).unwrap();
        assert!(text.starts_with('{'));

        assert_eq!(store.load("first").unwrap(), level);
    }

    #[test]
    fn test_save_and_load_compressed() {
        let (dir, store) = setup_store();
        let store = store.with_compression(true);
        let level = default_level("Packed");

        store.save("packed", &level).unwrap();
        let bytes = std::fs::read(dir.path().join("packed.level")).unwrap();
        assert_ne!(bytes.first(), Some(&b'{'));

        assert_eq!(store.load("packed").unwrap(), level);

        // A plain store still reads compressed files
        let plain = LevelStore::new(dir.path());
        assert_eq!(plain.load("packed").unwrap(), level);
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let (dir, store) = setup_store();
        store.save("zeta", &default_level("z")).unwrap();
        store.save("alpha", &default_level("a")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = LevelStore::new(dir.path().join("not-created-yet"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_exists_and_delete() {
        let (_dir, store) = setup_store();
        store.save("gone", &default_level("g")).unwrap();
        assert!(store.exists("gone").unwrap());

        store.delete("gone").unwrap();
        assert!(!store.exists("gone").unwrap());
        assert!(matches!(store.delete("gone"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_load_missing() {
        let (_dir, store) = setup_store();
        match store.load("nothing") {
            Err(StorageError::NotFound(name)) => assert_eq!(name, "nothing"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (_dir, store) = setup_store();
        let level = default_level("x");
        assert!(matches!(store.save("../escape", &level), Err(StorageError::InvalidName(_))));
        assert!(matches!(store.load(""), Err(StorageError::InvalidName(_))));
        assert!(matches!(store.exists("a/b"), Err(StorageError::InvalidName(_))));
    }

    #[test]
    fn test_invalid_level_not_saved() {
        let (dir, store) = setup_store();
        let mut level = default_level("bad");
        level.rooms[0].place(RoomContent::room_ref(0, 0, 42));

        assert!(matches!(
            store.save("bad", &level),
            Err(StorageError::Level(LevelError::Validation(_)))
        ));
        assert!(!dir.path().join("bad.level").exists());
    }

    #[test]
    fn test_corrupt_file_reported() {
        let (dir, store) = setup_store();
        std::fs::write(dir.path().join("junk.level"), "{ not json").unwrap();
        assert!(matches!(
            store.load("junk"),
            Err(StorageError::Level(LevelError::Json(_)))
        ));
    }
}
