//! SQLite-backed ledger of previously observed items.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::models::ParsedItem;

/// A persisted record of a previously observed item.
#[derive(Debug, Clone)]
pub struct SeenRecord {
    pub id: i64,
    pub title: String,
    pub link: Option<String>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Durable ledger of item identities, keyed by link or content hash.
///
/// An owned resource: open one per process and pass it to the poll loop.
pub struct SeenStore {
    conn: Connection,
}

impl SeenStore {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS seen_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                link TEXT,
                content_hash TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_seen_items_link ON seen_items(link);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_seen_items_hash ON seen_items(content_hash);
            "#,
        )?;
        Ok(())
    }

    /// True iff no records exist.
    pub fn is_empty(&self) -> Result<bool> {
        let row: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM seen_items LIMIT 1", [], |row| row.get(0))
            .optional()?;
        Ok(row.is_none())
    }

    /// Membership test: by exact link when the item has one, by content hash
    /// otherwise. Link lookup never falls through to the hash, and vice versa.
    pub fn is_seen(&self, item: &ParsedItem) -> Result<bool> {
        let row: Option<i64> = match &item.link {
            Some(link) => self
                .conn
                .query_row(
                    "SELECT 1 FROM seen_items WHERE link = ?1",
                    params![link],
                    |row| row.get(0),
                )
                .optional()?,
            None => self
                .conn
                .query_row(
                    "SELECT 1 FROM seen_items WHERE content_hash = ?1",
                    params![item.identity_hash],
                    |row| row.get(0),
                )
                .optional()?,
        };
        Ok(row.is_some())
    }

    /// Record an item as seen.
    ///
    /// Idempotent: inserting an item whose link or hash already exists is a
    /// no-op. The existence check and insert resolve in one statement against
    /// the unique indexes.
    pub fn mark_seen(&self, item: &ParsedItem) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO seen_items (title, link, content_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![item.title, item.link, item.identity_hash, Utc::now()],
        )?;
        Ok(())
    }

    /// Delete all but the `n` most recently created records.
    ///
    /// Creation-time ties are broken by the primary key sequence, so the
    /// survivors are always the latest inserts. No-op when count <= n.
    pub fn prune_keep_latest(&self, n: usize) -> Result<()> {
        self.conn.execute(
            "DELETE FROM seen_items WHERE id NOT IN (
                 SELECT id FROM seen_items ORDER BY created_at DESC, id DESC LIMIT ?1
             )",
            params![n as i64],
        )?;
        Ok(())
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM seen_items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// All records, newest first.
    pub fn records(&self) -> Result<Vec<SeenRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, link, content_hash, created_at
             FROM seen_items ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SeenRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                link: row.get(2)?,
                content_hash: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_item(title: &str, link: Option<&str>, hash: &str) -> ParsedItem {
        ParsedItem {
            title: title.to_string(),
            link: link.map(str::to_string),
            content: format!("{title} body"),
            identity_hash: hash.to_string(),
        }
    }

    #[test]
    fn test_empty_store() {
        let store = SeenStore::open_in_memory().unwrap();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_mark_and_lookup_by_link() {
        let store = SeenStore::open_in_memory().unwrap();
        let item = make_item("A", Some("https://example.com/a"), "hash-a");

        assert!(!store.is_seen(&item).unwrap());
        store.mark_seen(&item).unwrap();
        assert!(store.is_seen(&item).unwrap());
        assert!(!store.is_empty().unwrap());
    }

    #[test]
    fn test_mark_and_lookup_by_hash() {
        let store = SeenStore::open_in_memory().unwrap();
        let item = make_item("A", None, "hash-a");

        assert!(!store.is_seen(&item).unwrap());
        store.mark_seen(&item).unwrap();
        assert!(store.is_seen(&item).unwrap());
    }

    #[test]
    fn test_link_lookup_ignores_hash_collision() {
        let store = SeenStore::open_in_memory().unwrap();

        // A linkless record holding the colliding hash.
        store
            .mark_seen(&make_item("A", None, "shared-hash"))
            .unwrap();

        // An item with a link is matched by link only.
        let linked = make_item("B", Some("https://example.com/b"), "shared-hash");
        assert!(!store.is_seen(&linked).unwrap());

        // Inserting it is a no-op against the hash index, not an error.
        store.mark_seen(&linked).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_hash_lookup_ignores_link_records() {
        let store = SeenStore::open_in_memory().unwrap();
        store
            .mark_seen(&make_item("A", Some("https://example.com/a"), "hash-a"))
            .unwrap();

        // Same hash but no link: matched by hash, which does exist.
        let linkless = make_item("B", None, "hash-a");
        assert!(store.is_seen(&linkless).unwrap());
    }

    #[test]
    fn test_duplicate_link_insert_is_noop() {
        let store = SeenStore::open_in_memory().unwrap();
        let url = Some("https://example.com/a");

        store.mark_seen(&make_item("A", url, "hash-1")).unwrap();
        store.mark_seen(&make_item("A2", url, "hash-2")).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_hash_insert_is_noop() {
        let store = SeenStore::open_in_memory().unwrap();

        store.mark_seen(&make_item("A", None, "hash-1")).unwrap();
        store.mark_seen(&make_item("B", None, "hash-1")).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_linkless_records_do_not_collide_on_null() {
        let store = SeenStore::open_in_memory().unwrap();

        store.mark_seen(&make_item("A", None, "hash-1")).unwrap();
        store.mark_seen(&make_item("B", None, "hash-2")).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_prune_keeps_latest() {
        let store = SeenStore::open_in_memory().unwrap();
        for i in 0..5 {
            let link = format!("https://example.com/{i}");
            store
                .mark_seen(&make_item(
                    &format!("item-{i}"),
                    Some(link.as_str()),
                    &format!("hash-{i}"),
                ))
                .unwrap();
        }

        store.prune_keep_latest(3).unwrap();
        assert_eq!(store.count().unwrap(), 3);

        let titles: Vec<String> = store
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["item-4", "item-3", "item-2"]);
    }

    #[test]
    fn test_prune_larger_than_count_is_noop() {
        let store = SeenStore::open_in_memory().unwrap();
        store
            .mark_seen(&make_item("A", None, "hash-a"))
            .unwrap();

        store.prune_keep_latest(30).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("state.db");
        let item = make_item("A", Some("https://example.com/a"), "hash-a");

        {
            let store = SeenStore::open(&db_path).unwrap();
            store.mark_seen(&item).unwrap();
        }

        let store = SeenStore::open(&db_path).unwrap();
        assert!(store.is_seen(&item).unwrap());
        assert!(!store.is_empty().unwrap());
    }
}
