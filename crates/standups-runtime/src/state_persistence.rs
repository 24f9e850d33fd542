//! Storage backends for persisted application data.
//!
//! Reducers never touch the file system. They hand serialized bytes to a
//! [`StorageBackend`] under a [`StorageKey`], usually from a debounced effect.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     StorageBackend                            │
//! │   - MemoryStorage: in-memory (testing, ephemeral)             │
//! │   - FileStorage: one file per key under a data directory      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: Storage failures never panic; operations return `Result`.
//! 2. **Atomic writes**: File storage uses write-rename pattern to prevent corruption.
//! 3. **First run**: Loading a key that was never saved yields `Ok(None)`.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Returns error, stored data unaffected |
//! | `StorageError::Serialization` | Encode/decode by the caller | Returned to the caller |
//! | `StorageError::Corruption` | Poisoned lock, invalid key | Returns error |
//! | `StorageError::Unavailable` | Backend switched off | Returns error |

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// Serialization or deserialization error.
    Serialization(String),
    /// Stored data or backend state is invalid.
    Corruption(String),
    /// Backend is not available.
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StorageError::Corruption(msg) => write!(f, "storage corruption: {msg}"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Serialization(_)
            | StorageError::Corruption(_)
            | StorageError::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Storage Key
// ─────────────────────────────────────────────────────────────────────────────

/// Logical name of a stored document, e.g. `standups.json`.
///
/// File storage uses the key as a file name, so it must be a single plain
/// path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_plain_file_name(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains(['/', '\\'])
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for pluggable storage backends.
///
/// Implementations must be thread-safe (`Send + Sync`): saves run on effect
/// threads while the reducer thread may load.
pub trait StorageBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Load the document stored under `key`, `None` if it was never saved.
    fn load(&self, key: &StorageKey) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the document stored under `key`.
    fn save(&self, key: &StorageKey, data: &[u8]) -> StorageResult<()>;

    /// Remove the document stored under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &StorageKey) -> StorageResult<()>;

    /// Check if the backend is available and functional.
    fn is_available(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory storage backend for testing and ephemeral sessions.
///
/// Keeps a log of every successful save so tests can count writes and
/// inspect their payloads.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<StorageKey, Vec<u8>>>,
    writes: RwLock<Vec<(StorageKey, Vec<u8>)>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create memory storage pre-populated with one document.
    #[must_use]
    pub fn with_document(key: StorageKey, data: Vec<u8>) -> Self {
        let storage = Self::new();
        if let Ok(mut guard) = storage.data.write() {
            guard.insert(key, data);
        }
        storage
    }

    /// Every save so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<(StorageKey, Vec<u8>)> {
        self.writes.read().map(|w| w.clone()).unwrap_or_default()
    }

    /// Number of saves so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.read().map(|w| w.len()).unwrap_or(0)
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn load(&self, key: &StorageKey) -> StorageResult<Option<Vec<u8>>> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn save(&self, key: &StorageKey, data: &[u8]) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.insert(key.clone(), data.to_vec());
        drop(guard);

        self.writes
            .write()
            .map_err(|_| StorageError::Corruption("write log lock poisoned".into()))?
            .push((key.clone(), data.to_vec()));
        Ok(())
    }

    fn remove(&self, key: &StorageKey) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.remove(key);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.data.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStorage")
            .field("documents", &count)
            .field("writes", &self.write_count())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage
// ─────────────────────────────────────────────────────────────────────────────

/// File-based storage backend, one file per key under a directory.
///
/// # Atomic Writes
///
/// Writes use a temporary file + rename pattern to prevent corruption:
/// 1. Write to `{dir}/{key}.tmp`
/// 2. Flush and sync
/// 3. Rename `{key}.tmp` -> `{key}`
///
/// Saves through one `FileStorage` are serialized, so effects writing from
/// several threads never share the temporary file.
pub struct FileStorage {
    dir: PathBuf,
    writing: Mutex<()>,
}

impl FileStorage {
    /// Create a file storage rooted at `dir`.
    ///
    /// The directory does not need to exist; it is created on first save.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            writing: Mutex::new(()),
        }
    }

    /// Create storage at the default location for the application.
    ///
    /// Uses `$STANDUPS_DATA_DIR` when set, otherwise
    /// `$XDG_DATA_HOME/{app_name}` or `~/.local/share/{app_name}`.
    #[must_use]
    pub fn default_for_app(app_name: &str) -> Self {
        if let Ok(dir) = std::env::var("STANDUPS_DATA_DIR") {
            return Self::new(dir);
        }
        Self::new(data_dir_or_fallback().join(app_name))
    }

    /// Directory holding the stored documents.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &StorageKey) -> StorageResult<PathBuf> {
        if !key.is_plain_file_name() {
            return Err(StorageError::Corruption(format!(
                "storage key is not a plain file name: {key}"
            )));
        }
        Ok(self.dir.join(key.as_str()))
    }

    fn temp_path(&self, key: &StorageKey) -> PathBuf {
        self.dir.join(format!("{}.tmp", key.as_str()))
    }
}

/// Get the data directory, falling back to the current dir if unavailable.
fn data_dir_or_fallback() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

impl StorageBackend for FileStorage {
    fn name(&self) -> &str {
        "FileStorage"
    }

    fn load(&self, key: &StorageKey) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            // First run - nothing saved yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &StorageKey, data: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let _writing = self.writing.lock().unwrap_or_else(PoisonError::into_inner);
        fs::create_dir_all(&self.dir)?;

        let tmp_path = self.temp_path(key);
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(data)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&tmp_path, &path)?;

        tracing::debug!(
            path = %path.display(),
            bytes = data.len(),
            "saved document"
        );
        Ok(())
    }

    fn remove(&self, key: &StorageKey) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_available(&self) -> bool {
        if !self.dir.exists() {
            return fs::create_dir_all(&self.dir).is_ok();
        }
        let test_path = self.dir.join(".standups_test_write");
        if fs::write(&test_path, b"test").is_ok() {
            let _ = fs::remove_file(&test_path);
            return true;
        }
        false
    }
}

impl fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStorage").field("dir", &self.dir).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
