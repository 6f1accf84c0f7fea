use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// A string key/value area, modelled on the browser's `storage.local` and
/// `storage.sync`.
#[async_trait]
pub trait StorageArea: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Write all items or none.
    async fn set(&self, items: &[(&str, String)]) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed area. Queries run inline on the calling task; each call is
/// a few single-row statements.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;
        Ok(SqliteStorage {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl StorageArea for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    async fn set(&self, items: &[(&str, String)]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp_millis();
        for (key, value) in items {
            tx.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, value, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.conn.lock().execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// Process-local area. Stands in for the remote area when no sync backend is
/// attached, and for both areas in tests.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageArea for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    async fn set(&self, items: &[(&str, String)]) -> Result<()> {
        let mut map = self.items.lock();
        for (key, value) in items {
            map.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}
