//! Durable history and bookmark records

use std::path::Path;

use crate::bookmarks::{Bookmark, BookmarkManager};
use crate::history::{HistoryEntry, HistoryManager, HISTORY_LIMIT};
use crate::input::SEARCH_PREFIX;
use crate::Result;
use tiwut_storage::Database;

/// History and bookmarks over one shared database handle.
///
/// Every mutating call commits its own transaction before returning.
#[derive(Clone)]
pub struct PersistenceStore {
    history: HistoryManager,
    bookmarks: BookmarkManager,
}

impl PersistenceStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::with_database(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::with_database(Database::open_in_memory()?))
    }

    pub fn with_database(db: Database) -> Self {
        Self {
            history: HistoryManager::new(db.clone(), SEARCH_PREFIX),
            bookmarks: BookmarkManager::new(db),
        }
    }

    /// Returns `false` for search addresses, which are never recorded.
    pub fn add_history_entry(&self, address: &str, title: &str) -> Result<bool> {
        self.history.append(address, title)
    }

    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.history.recent(limit)
    }

    /// The history dialog view
    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.history.recent(HISTORY_LIMIT)
    }

    pub fn search_history(&self, query: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.history.search(query, limit)
    }

    pub fn clear_history(&self) -> Result<()> {
        self.history.clear_all()
    }

    pub fn add_bookmark(&self, address: &str, title: &str) -> Result<bool> {
        self.bookmarks.add(address, title)
    }

    pub fn bookmarks(&self) -> Result<Vec<Bookmark>> {
        self.bookmarks.list()
    }

    pub fn is_bookmarked(&self, address: &str) -> Result<bool> {
        self.bookmarks.contains(address)
    }

    pub fn delete_bookmark(&self, address: &str) -> Result<bool> {
        self.bookmarks.delete(address)
    }

    pub fn clear_bookmarks(&self) -> Result<()> {
        self.bookmarks.clear_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("browser_data.db");

        {
            let store = PersistenceStore::open(&path).unwrap();
            store.add_history_entry("https://example.com", "Example").unwrap();
            store.add_history_entry("https://www.google.com/search?q=x", "t").unwrap();
            store.add_bookmark("https://example.com", "Example").unwrap();
        }

        let store = PersistenceStore::open(&path).unwrap();
        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].address, "https://example.com");
        assert!(store.is_bookmarked("https://example.com").unwrap());

        // Re-adding after reopen is still a no-op
        assert!(!store.add_bookmark("https://example.com", "Example").unwrap());
        assert_eq!(store.bookmarks().unwrap().len(), 1);
    }

    #[test]
    fn test_clones_share_records() {
        let store = PersistenceStore::open_in_memory().unwrap();
        let panel = store.clone();

        store.add_bookmark("https://docs.rs", "Docs").unwrap();
        assert_eq!(panel.bookmarks().unwrap().len(), 1);

        panel.clear_bookmarks().unwrap();
        assert!(store.bookmarks().unwrap().is_empty());
    }

    #[test]
    fn test_search_history() {
        let store = PersistenceStore::open_in_memory().unwrap();
        store.add_history_entry("https://example.com", "Example").unwrap();
        store.add_history_entry("https://docs.rs", "Docs").unwrap();

        let hits = store.search_history("docs", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].address, "https://docs.rs");

        store.clear_history().unwrap();
        assert!(store.recent_history(HISTORY_LIMIT).unwrap().is_empty());
    }
}
