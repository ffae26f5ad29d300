//! Flat key-value persistence backends for settings records.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use log::debug;

/// Text blobs stored under string keys.
///
/// Access is synchronous and single-threaded, so methods take `&self`;
/// backends with in-process state use interior mutability.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove `key`. Returns whether a record existed.
    fn remove(&self, key: &str) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// FileStorage — one file per key
// ---------------------------------------------------------------------------

pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!("storage: wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.borrow_mut().remove(key).is_some())
    }
}

// ---------------------------------------------------------------------------
// NoStorage — host without a persistence backend
// ---------------------------------------------------------------------------

/// Backend that is never available. Every call fails.
pub struct NoStorage;

impl Storage for NoStorage {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        bail!("no persistence backend available")
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        bail!("no persistence backend available")
    }

    fn remove(&self, _key: &str) -> Result<bool> {
        bail!("no persistence backend available")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "epub-reader-storage-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = temp_dir("round-trip");
        let storage = FileStorage::new(&dir);
        assert_eq!(storage.get("ns:abc").unwrap(), None);
        storage.set("ns:abc", "{\"restore\":true}").unwrap();
        assert_eq!(
            storage.get("ns:abc").unwrap().as_deref(),
            Some("{\"restore\":true}")
        );
        assert!(storage.remove("ns:abc").unwrap());
        assert!(!storage.remove("ns:abc").unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_storage_sanitizes_key() {
        let storage = FileStorage::new("/data");
        assert_eq!(
            storage.path_for("epubjs-reader:0a1b/..\\x"),
            PathBuf::from("/data/epubjs-reader_0a1b_.._x.json")
        );
    }

    #[test]
    fn memory_storage_remove_reports_existence() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").unwrap();
        assert_eq!(storage.len(), 1);
        assert!(storage.remove("k").unwrap());
        assert!(!storage.remove("k").unwrap());
        assert!(storage.is_empty());
    }

    #[test]
    fn no_storage_always_fails() {
        assert!(NoStorage.get("k").is_err());
        assert!(NoStorage.set("k", "v").is_err());
        assert!(NoStorage.remove("k").is_err());
    }
}
