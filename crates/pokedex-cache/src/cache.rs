use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// A stored value plus when it was written
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub value: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.cached_at
    }
}

/// Last-known-good store using SQLite
///
/// List pages are keyed by the query string that produced them, records by id.
/// Values are stored as JSON so the store doesn't care about the model shape.
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        // Initialize schema on first run
        Self::init_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Throwaway store, handy for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS list_pages (
                query_key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub fn put_page<T: Serialize>(&self, query_key: &str, page: &T) -> Result<()> {
        let data = serde_json::to_string(page)?;
        self.conn.execute(
            "INSERT INTO list_pages (query_key, data, cached_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(query_key) DO UPDATE SET data = excluded.data, cached_at = excluded.cached_at",
            params![query_key, data, Utc::now().timestamp()],
        )?;
        debug!("Stored page snapshot for '{}'", query_key);
        Ok(())
    }

    pub fn get_page<T: DeserializeOwned>(&self, query_key: &str) -> Result<Option<Snapshot<T>>> {
        let row = self
            .conn
            .query_row(
                "SELECT data, cached_at FROM list_pages WHERE query_key = ?1",
                params![query_key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        row.map(|(data, cached_at)| decode(&data, cached_at)).transpose()
    }

    pub fn put_record<T: Serialize>(&self, id: u32, record: &T) -> Result<()> {
        let data = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO records (id, data, cached_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, cached_at = excluded.cached_at",
            params![id, data, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn get_record<T: DeserializeOwned>(&self, id: u32) -> Result<Option<Snapshot<T>>> {
        let row = self
            .conn
            .query_row(
                "SELECT data, cached_at FROM records WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        row.map(|(data, cached_at)| decode(&data, cached_at)).transpose()
    }

    /// Drop a deleted record; list pages mentioning it are dropped too
    /// because they would resurrect it on the next offline read
    pub fn remove_record(&self, id: u32) -> Result<()> {
        self.conn
            .execute("DELETE FROM records WHERE id = ?1", params![id])?;
        self.conn.execute("DELETE FROM list_pages", [])?;
        debug!("Removed snapshot for record {}", id);
        Ok(())
    }

    /// Delete everything written before `cutoff`, returns rows removed
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let ts = cutoff.timestamp();
        let pages = self
            .conn
            .execute("DELETE FROM list_pages WHERE cached_at < ?1", params![ts])?;
        let records = self
            .conn
            .execute("DELETE FROM records WHERE cached_at < ?1", params![ts])?;
        Ok(pages + records)
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM list_pages", [])?;
        self.conn.execute("DELETE FROM records", [])?;
        Ok(())
    }

    /// (pages, records) currently stored
    pub fn counts(&self) -> Result<(usize, usize)> {
        let pages: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM list_pages", [], |row| row.get(0))?;
        let records: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok((pages as usize, records as usize))
    }
}

fn decode<T: DeserializeOwned>(data: &str, cached_at: i64) -> Result<Snapshot<T>> {
    let value = serde_json::from_str(data)?;
    let cached_at = Utc
        .timestamp_opt(cached_at, 0)
        .single()
        .unwrap_or_else(Utc::now);
    Ok(Snapshot { value, cached_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: u32,
        name: String,
    }

    fn entry(id: u32, name: &str) -> Entry {
        Entry { id, name: name.to_string() }
    }

    #[test]
    fn test_page_roundtrip_and_overwrite() {
        let store = SnapshotStore::in_memory().unwrap();
        store.put_page("page=1&limit=12", &vec![entry(1, "Bulbasaur")]).unwrap();
        store.put_page("page=1&limit=12", &vec![entry(4, "Charmander")]).unwrap();

        let snapshot: Snapshot<Vec<Entry>> = store.get_page("page=1&limit=12").unwrap().unwrap();
        assert_eq!(snapshot.value, vec![entry(4, "Charmander")]);
        assert_eq!(store.counts().unwrap(), (1, 0));
    }

    #[test]
    fn test_missing_keys_are_none() {
        let store = SnapshotStore::in_memory().unwrap();
        assert!(store.get_page::<Vec<Entry>>("nope").unwrap().is_none());
        assert!(store.get_record::<Entry>(99).unwrap().is_none());
    }

    #[test]
    fn test_remove_record_drops_pages_too() {
        let store = SnapshotStore::in_memory().unwrap();
        store.put_record(25, &entry(25, "Pikachu")).unwrap();
        store.put_page("page=1", &vec![entry(25, "Pikachu")]).unwrap();

        store.remove_record(25).unwrap();

        assert!(store.get_record::<Entry>(25).unwrap().is_none());
        assert_eq!(store.counts().unwrap(), (0, 0));
    }

    #[test]
    fn test_prune_keeps_recent_rows() {
        let store = SnapshotStore::in_memory().unwrap();
        store.put_record(1, &entry(1, "Bulbasaur")).unwrap();

        let removed = store.prune_older_than(Utc::now() - Duration::hours(1)).unwrap();
        assert_eq!(removed, 0);

        let removed = store.prune_older_than(Utc::now() + Duration::hours(1)).unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.db");
        let path = path.to_str().unwrap();

        {
            let store = SnapshotStore::new(path).unwrap();
            store.put_record(7, &entry(7, "Squirtle")).unwrap();
        }

        let store = SnapshotStore::new(path).unwrap();
        let snapshot: Snapshot<Entry> = store.get_record(7).unwrap().unwrap();
        assert_eq!(snapshot.value.name, "Squirtle");
        assert!(snapshot.age(Utc::now()) >= Duration::zero());
    }
}
