//! Recent-search history and the key/value stores it persists through.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Maximum number of remembered searches.
pub const MAX_RECENT: usize = 5;

/// Storage key for the recent-search list.
pub const RECENT_KEY: &str = "recentSearches";

/// Client-local key/value storage.
pub trait RecentStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// A JSON object on disk, one entry per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<data dir>/stock-researcher/storage.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("stock-researcher").join("storage.json"))
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "ignoring unreadable storage file");
            BTreeMap::new()
        })
    }
}

impl RecentStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all();
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create storage directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(&entries).context("Failed to serialize storage")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write storage file: {}", self.path.display()))
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecentStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A remembered search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearch {
    pub symbol: String,
    pub name: String,
}

/// Bounded, most-recent-first, de-duplicated by symbol.
pub struct RecentSearches {
    entries: Vec<RecentSearch>,
    store: Box<dyn RecentStore>,
}

impl RecentSearches {
    /// Load the persisted list. A missing or corrupt value starts an empty list.
    pub fn load(store: Box<dyn RecentStore>) -> Self {
        let mut entries: Vec<RecentSearch> = match store.get(RECENT_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "discarding corrupt recent searches");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let mut seen = std::collections::HashSet::new();
        entries.retain(|e| seen.insert(e.symbol.clone()));
        entries.truncate(MAX_RECENT);

        Self { entries, store }
    }

    pub fn entries(&self) -> &[RecentSearch] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move `entry` to the front and persist.
    pub fn push(&mut self, entry: RecentSearch) -> Result<()> {
        self.entries.retain(|e| e.symbol != entry.symbol);
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_RECENT);
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let value = serde_json::to_string(&self.entries).context("Failed to serialize recent searches")?;
        self.store.set(RECENT_KEY, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str) -> RecentSearch {
        RecentSearch {
            symbol: symbol.to_string(),
            name: format!("{} Inc.", symbol),
        }
    }

    #[test]
    fn test_push_is_bounded_and_most_recent_first() {
        let mut recent = RecentSearches::load(Box::new(MemoryStore::new()));
        for symbol in ["A", "B", "C", "D", "E", "F", "G"] {
            recent.push(entry(symbol)).unwrap();
        }
        let symbols: Vec<&str> = recent.entries().iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["G", "F", "E", "D", "C"]);
    }

    #[test]
    fn test_repeated_search_does_not_duplicate() {
        let mut recent = RecentSearches::load(Box::new(MemoryStore::new()));
        recent.push(entry("AAPL")).unwrap();
        recent.push(entry("MSFT")).unwrap();
        recent.push(entry("AAPL")).unwrap();
        recent.push(entry("AAPL")).unwrap();
        let symbols: Vec<&str> = recent.entries().iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_history_survives_reload() {
        let path = std::env::temp_dir().join(format!(
            "stock-researcher-recent-{}-{}.json",
            std::process::id(),
            line!()
        ));
        let _ = fs::remove_file(&path);

        let mut recent = RecentSearches::load(Box::new(FileStore::new(path.clone())));
        recent.push(entry("AMZN")).unwrap();
        recent.push(entry("MSFT")).unwrap();

        let reloaded = RecentSearches::load(Box::new(FileStore::new(path.clone())));
        let symbols: Vec<&str> = reloaded.entries().iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["MSFT", "AMZN"]);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_value_starts_empty() {
        let store = MemoryStore::new();
        store.set(RECENT_KEY, "{not json").unwrap();
        assert!(RecentSearches::load(Box::new(store)).is_empty());
    }

    #[test]
    fn test_persisted_list_is_sanitized() {
        let store = MemoryStore::new();
        let stored: Vec<RecentSearch> = ["A", "A", "B", "C", "D", "E", "F"].into_iter().map(entry).collect();
        store.set(RECENT_KEY, &serde_json::to_string(&stored).unwrap()).unwrap();

        let recent = RecentSearches::load(Box::new(store));
        assert_eq!(recent.len(), MAX_RECENT);
        assert_eq!(recent.entries()[1].symbol, "B");
    }
}
