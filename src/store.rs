use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Client-persisted key-value storage that survives a page reload.
///
/// Only presence and absence of a key carry meaning for callers; values are
/// opaque. Implementations never fail loudly: when storage cannot be used
/// they report `is_available() == false` and writes become no-ops. Writes
/// return whether the change actually persisted.
pub trait PersistedStore {
    /// Whether the host allows storage at all
    fn is_available(&self) -> bool;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value) -> bool;

    fn delete(&mut self, key: &str) -> bool;
}

/// In-process store, the equivalent of a fresh browser origin
#[derive(Debug, Clone)]
pub struct MemoryStore {
    available: bool,
    entries: HashMap<String, Value>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            available: true,
            entries: HashMap::new(),
        }
    }

    /// A store whose host has storage disabled
    pub fn unavailable() -> Self {
        Self {
            available: false,
            entries: HashMap::new(),
        }
    }

    /// Drops every entry, as when the user clears site data
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PersistedStore for MemoryStore {
    fn is_available(&self) -> bool {
        self.available
    }

    fn get(&self, key: &str) -> Option<Value> {
        if !self.available {
            return None;
        }
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> bool {
        if self.available {
            self.entries.insert(key.to_string(), value);
        }
        self.available
    }

    fn delete(&mut self, key: &str) -> bool {
        if self.available {
            self.entries.remove(key);
        }
        self.available
    }
}

/// Store backed by a JSON object on disk, so entries outlive the process.
///
/// A missing file starts empty. A file that cannot be read or parsed marks
/// the store unavailable rather than silently discarding its contents.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    available: bool,
    entries: Map<String, Value>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let (available, entries) = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => (true, Map::new()),
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(entries) => (true, entries),
                Err(e) => {
                    ::log::warn!("Store file {} is corrupt: {}", path.display(), e);
                    (false, Map::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (true, Map::new()),
            Err(e) => {
                ::log::warn!("Store file {} is unreadable: {}", path.display(), e);
                (false, Map::new())
            }
        };

        ::log::debug!(
            "Opened store {} ({} entries, available: {})",
            path.display(),
            entries.len(),
            available
        );

        Self {
            path,
            available,
            entries,
        }
    }

    fn flush(&mut self) -> bool {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let json = serde_json::to_string_pretty(&self.entries)?;
            fs::write(&self.path, json)
        })();

        if let Err(e) = result {
            ::log::warn!(
                "Failed to write store {}, disabling it: {}",
                self.path.display(),
                e
            );
            self.available = false;
            return false;
        }
        true
    }
}

impl PersistedStore for FileStore {
    fn is_available(&self) -> bool {
        self.available
    }

    fn get(&self, key: &str) -> Option<Value> {
        if !self.available {
            return None;
        }
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> bool {
        if !self.available {
            return false;
        }
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn delete(&mut self, key: &str) -> bool {
        if !self.available {
            return false;
        }
        if self.entries.remove(key).is_some() {
            return self.flush();
        }
        true
    }
}
