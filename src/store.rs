//! Key-value persistence collaborator.
//!
//! Consumers store small bits of UI state (panel corner, enabled flag)
//! under well-known keys. The store is an explicit long-lived service
//! passed by reference, not an ambient global; write failures are logged
//! and never surface to callers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

pub const KEY_CORNER: &str = "glasspane.corner";
pub const KEY_ENABLED: &str = "glasspane.enabled";

pub const STORE_FILE: &str = "glasspane_store.json";

static DEFAULT_STORE_PATH: Lazy<PathBuf> = Lazy::new(|| {
    dirs_next::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("glasspane")
        .join(STORE_FILE)
});

pub fn default_store_path() -> &'static Path {
    &DEFAULT_STORE_PATH
}

pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.set(key, if value { "true" } else { "false" });
    }
}

/// JSON-file-backed store. The whole map is rewritten on each change; the
/// data is a handful of keys.
pub struct JsonFileStore {
    path: PathBuf,
    cache: RefCell<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Fresh store at `path`, ignoring whatever is on disk.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        let cache = if content.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&content)?
        };
        Ok(Self {
            path: path.to_path_buf(),
            cache: RefCell::new(cache),
        })
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&*self.cache.borrow())?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn persist_logged(&self) {
        if let Err(err) = self.persist() {
            tracing::warn!(path = %self.path.display(), %err, "failed to persist store");
        }
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.cache
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.persist_logged();
    }

    fn remove(&self, key: &str) {
        if self.cache.borrow_mut().remove(key).is_some() {
            self.persist_logged();
        }
    }
}

/// In-memory store for tests and headless use.
#[derive(Default)]
pub struct MemoryStore {
    cache: RefCell<HashMap<String, String>>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.cache
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.cache.borrow_mut().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_helpers_round_trip() {
        let store = MemoryStore::default();
        assert_eq!(store.get_bool(KEY_ENABLED), None);
        store.set_bool(KEY_ENABLED, true);
        assert_eq!(store.get_bool(KEY_ENABLED), Some(true));
        store.set_bool(KEY_ENABLED, false);
        assert_eq!(store.get_bool(KEY_ENABLED), Some(false));
        store.set(KEY_ENABLED, "maybe");
        assert_eq!(store.get_bool(KEY_ENABLED), None);
    }

    #[test]
    fn remove_clears_key() {
        let store = MemoryStore::default();
        store.set(KEY_CORNER, "top-left");
        store.remove(KEY_CORNER);
        assert_eq!(store.get(KEY_CORNER), None);
    }
}
