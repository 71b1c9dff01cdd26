//! History management

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::Result;
use tiwut_storage::Database;

/// Size of the most-recent-first history view.
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub address: String,
    pub title: String,
    pub visited_at: DateTime<Utc>,
}

impl HistoryEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let visited: String = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            address: row.get(1)?,
            title: row.get(2)?,
            visited_at: parse_timestamp(&visited),
        })
    }
}

/// Append-only visit log. Addresses under `excluded_prefix` (the search
/// engine) are never written.
pub struct HistoryManager {
    db: Database,
    excluded_prefix: String,
}

impl HistoryManager {
    pub fn new(db: Database, excluded_prefix: impl Into<String>) -> Self {
        Self {
            db,
            excluded_prefix: excluded_prefix.into(),
        }
    }

    /// Record a visit. Returns `false` when the address was filtered out.
    pub fn append(&self, address: &str, title: &str) -> Result<bool> {
        if !self.excluded_prefix.is_empty() && address.starts_with(&self.excluded_prefix) {
            tracing::trace!(address = %address, "Search address not recorded");
            return Ok(false);
        }

        self.db.transaction(|conn| {
            conn.execute(
                "INSERT INTO history (url, title, visited_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![address, title, timestamp(Utc::now())],
            )?;
            Ok(())
        })?;

        tracing::debug!(address = %address, "Recorded visit");
        Ok(true)
    }

    /// Newest first; visits with the same timestamp come back in reverse
    /// insertion order.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, url, title, visited_at FROM history
                 ORDER BY visited_at DESC, id DESC
                 LIMIT ?1",
            )?;

            let entries = stmt
                .query_map([sql_limit(limit)], HistoryEntry::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(entries)
        })?)
    }

    /// Case-insensitive substring match on address or title
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let needle = query.trim().to_lowercase();

        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, url, title, visited_at FROM history
                 WHERE instr(LOWER(url), ?1) > 0 OR instr(LOWER(title), ?1) > 0
                 ORDER BY visited_at DESC, id DESC
                 LIMIT ?2",
            )?;

            let entries = stmt
                .query_map(
                    rusqlite::params![needle, sql_limit(limit)],
                    HistoryEntry::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(entries)
        })?)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.db.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
            Ok(count as usize)
        })?)
    }

    /// Clear all history
    pub fn clear_all(&self) -> Result<()> {
        let removed = self.db.transaction(|conn| Ok(conn.execute("DELETE FROM history", [])?))?;
        tracing::info!(removed, "History cleared");
        Ok(())
    }
}

impl Clone for HistoryManager {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            excluded_prefix: self.excluded_prefix.clone(),
        }
    }
}

/// Fixed-width RFC 3339 so that text order is time order.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!(value = %raw, error = %e, "Unreadable timestamp");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
