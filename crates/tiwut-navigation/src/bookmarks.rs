//! Bookmark management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::{parse_timestamp, timestamp};
use crate::Result;
use tiwut_storage::Database;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub address: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

pub struct BookmarkManager {
    db: Database,
}

impl BookmarkManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add a bookmark. An address that is already bookmarked is left as is
    /// and `false` is returned.
    pub fn add(&self, address: &str, title: &str) -> Result<bool> {
        let inserted = self.db.transaction(|conn| {
            Ok(conn.execute(
                "INSERT OR IGNORE INTO bookmarks (url, title, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![address, title, timestamp(Utc::now())],
            )?)
        })?;

        if inserted > 0 {
            tracing::info!(address = %address, "Bookmark added");
        } else {
            tracing::debug!(address = %address, "Already bookmarked");
        }
        Ok(inserted > 0)
    }

    /// All bookmarks, alphabetical by title
    pub fn list(&self) -> Result<Vec<Bookmark>> {
        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT url, title, created_at FROM bookmarks ORDER BY title ASC, id ASC",
            )?;

            let bookmarks = stmt
                .query_map([], |row| {
                    let created: String = row.get(2)?;
                    Ok(Bookmark {
                        address: row.get(0)?,
                        title: row.get(1)?,
                        created_at: parse_timestamp(&created),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(bookmarks)
        })?)
    }

    pub fn contains(&self, address: &str) -> Result<bool> {
        Ok(self.db.with_connection(|conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM bookmarks WHERE url = ?1)",
                [address],
                |row| row.get(0),
            )?;
            Ok(found)
        })?)
    }

    /// Returns whether a bookmark was removed.
    pub fn delete(&self, address: &str) -> Result<bool> {
        let removed = self.db.transaction(|conn| {
            Ok(conn.execute("DELETE FROM bookmarks WHERE url = ?1", [address])?)
        })?;
        Ok(removed > 0)
    }

    pub fn clear_all(&self) -> Result<()> {
        let removed = self.db.transaction(|conn| Ok(conn.execute("DELETE FROM bookmarks", [])?))?;
        tracing::info!(removed, "Bookmarks cleared");
        Ok(())
    }
}

impl Clone for BookmarkManager {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> BookmarkManager {
        BookmarkManager::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_duplicate_address_is_ignored() {
        let manager = manager();

        assert!(manager.add("https://example.com", "Example").unwrap());
        assert!(!manager.add("https://example.com", "Renamed").unwrap());

        let bookmarks = manager.list().unwrap();
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].title, "Example");
    }

    #[test]
    fn test_sorted_by_title() {
        let manager = manager();
        manager.add("https://z.example", "Zebra").unwrap();
        manager.add("https://a.example", "Apple").unwrap();
        manager.add("https://m.example", "Mango").unwrap();

        let titles: Vec<_> = manager.list().unwrap().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Apple", "Mango", "Zebra"]);
    }

    #[test]
    fn test_delete_and_clear() {
        let manager = manager();
        manager.add("https://a.example", "A").unwrap();
        manager.add("https://b.example", "B").unwrap();

        assert!(manager.contains("https://a.example").unwrap());
        assert!(manager.delete("https://a.example").unwrap());
        assert!(!manager.delete("https://a.example").unwrap());
        assert!(!manager.contains("https://a.example").unwrap());

        manager.clear_all().unwrap();
        assert!(manager.list().unwrap().is_empty());
    }
}
