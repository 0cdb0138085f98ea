//! Key-value backend implementations.

use super::{KvBackend, StoreResult};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Session-only backend.
#[derive(Debug, Default)]
pub struct MemoryKvBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl KvBackend for MemoryKvBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// SQLite-backed durable backend over the `kv_entries` table.
pub struct SqliteKvBackend {
    conn: Connection,
}

impl SqliteKvBackend {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a migrated in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }
}

impl KvBackend for SqliteKvBackend {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{KvBackend, MemoryKvBackend, SqliteKvBackend};

    fn exercise(backend: &dyn KvBackend) {
        assert_eq!(backend.get("k").unwrap(), None);
        backend.set("k", "v1").unwrap();
        backend.set("k", "v2").unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("v2"));
        backend.delete("k").unwrap();
        backend.delete("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
    }

    #[test]
    fn memory_backend_overwrites_and_deletes() {
        exercise(&MemoryKvBackend::default());
    }

    #[test]
    fn sqlite_backend_overwrites_and_deletes() {
        exercise(&SqliteKvBackend::open_in_memory().unwrap());
    }
}
