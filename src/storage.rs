//! Durable string key-value storage.
//!
//! Absence of a key is never an error; callers fall back to their defaults.

use crate::statics;
use crate::value::RawValue;
use anyhow::{Context, bail};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

/// In-process storage; contents die with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: IndexMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.shift_remove(key);
        Ok(())
    }
}

/// A single JSON object file of string entries, rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: IndexMap<String, String>,
}

impl FileStore {
    /// `<config dir>/propsheet/storage.json`, or the working directory when the
    /// platform has no config dir.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(statics::STORAGE_DIR_NAME);
        path.push(statics::STORAGE_FILE_NAME);
        path
    }

    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let entries = if path.exists() {
            let text = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
            parse_entries(&text).with_context(|| format!("parsing {path:?}"))?
        } else {
            IndexMap::new()
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "Opened storage");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {parent:?}"))?;
        }
        let map = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), RawValue::String(v.clone())))
            .collect();
        let mut text = RawValue::Object(map).to_json_pretty();
        text.push('\n');
        fs::write(&self.path, text).with_context(|| format!("writing {:?}", self.path))
    }
}

fn parse_entries(text: &str) -> anyhow::Result<IndexMap<String, String>> {
    let root = RawValue::parse(text)?;
    let Some(obj) = root.as_object() else {
        bail!("storage file must hold an object, found {}", root.type_name());
    };
    // Non-string entries were not written by us; skip them.
    Ok(obj
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        if self.entries.shift_remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FileStore, KeyValueStore, MemoryStore};

    #[test]
    fn memory_store_get_set_remove() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("theme").unwrap(), None);
        store.set("theme", "dark").unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
        store.remove("theme").unwrap();
        assert_eq!(store.get("theme").unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("theme").unwrap(), None);
        store.set("theme", "midnight").unwrap();
        store.set("sidebarWidth", "420").unwrap();
        store.remove("sidebarWidth").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("midnight"));
        assert_eq!(reopened.get("sidebarWidth").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_non_object_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let err = FileStore::open(&path).unwrap_err();
        assert!(format!("{err:#}").contains("must hold an object"));
    }

    #[test]
    fn default_path_ends_with_storage_file() {
        let path = FileStore::default_path();
        assert!(path.ends_with("propsheet/storage.json"));
    }
}
