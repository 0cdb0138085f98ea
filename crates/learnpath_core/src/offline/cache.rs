//! Named response caches.
//!
//! # Responsibility
//! - Store successful responses per `(cache name, url)`.
//! - Enumerate and delete whole caches for lifecycle cleanup.
//!
//! # Invariants
//! - `put_all` writes every entry or none.
//! - `match_any` checks caches in name order.

use super::http::Response;
use crate::db::{open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "cache storage error: {err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for named response caches.
pub trait CacheStorage: Send + Sync {
    /// Names of caches holding at least one entry, sorted.
    fn cache_names(&self) -> CacheResult<Vec<String>>;
    /// Deletes one cache. Returns whether it existed.
    fn delete_cache(&self, cache_name: &str) -> CacheResult<bool>;
    fn put(&self, cache_name: &str, url: &str, response: &Response) -> CacheResult<()>;
    fn put_all(&self, cache_name: &str, entries: &[(String, Response)]) -> CacheResult<()>;
    fn match_in(&self, cache_name: &str, url: &str) -> CacheResult<Option<Response>>;

    fn match_any(&self, url: &str) -> CacheResult<Option<Response>> {
        for name in self.cache_names()? {
            if let Some(response) = self.match_in(&name, url)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

/// Process-local cache storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: Mutex<BTreeMap<String, BTreeMap<String, Response>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn cache_names(&self) -> CacheResult<Vec<String>> {
        Ok(lock(&self.caches)
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn delete_cache(&self, cache_name: &str) -> CacheResult<bool> {
        Ok(lock(&self.caches).remove(cache_name).is_some())
    }

    fn put(&self, cache_name: &str, url: &str, response: &Response) -> CacheResult<()> {
        lock(&self.caches)
            .entry(cache_name.to_string())
            .or_default()
            .insert(url.to_string(), response.clone());
        Ok(())
    }

    fn put_all(&self, cache_name: &str, entries: &[(String, Response)]) -> CacheResult<()> {
        let mut caches = lock(&self.caches);
        let cache = caches.entry(cache_name.to_string()).or_default();
        for (url, response) in entries {
            cache.insert(url.clone(), response.clone());
        }
        Ok(())
    }

    fn match_in(&self, cache_name: &str, url: &str) -> CacheResult<Option<Response>> {
        Ok(lock(&self.caches)
            .get(cache_name)
            .and_then(|cache| cache.get(url))
            .cloned())
    }
}

/// SQLite-backed cache storage over the `cache_entries` table.
pub struct SqliteCacheStorage {
    conn: Mutex<Connection>,
}

impl SqliteCacheStorage {
    pub fn open(path: impl AsRef<Path>) -> CacheResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> CacheResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl CacheStorage for SqliteCacheStorage {
    fn cache_names(&self) -> CacheResult<Vec<String>> {
        let conn = lock(&self.conn);
        let mut stmt =
            conn.prepare("SELECT DISTINCT cache_name FROM cache_entries ORDER BY cache_name ASC;")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn delete_cache(&self, cache_name: &str) -> CacheResult<bool> {
        let removed = lock(&self.conn).execute(
            "DELETE FROM cache_entries WHERE cache_name = ?1;",
            [cache_name],
        )?;
        Ok(removed > 0)
    }

    fn put(&self, cache_name: &str, url: &str, response: &Response) -> CacheResult<()> {
        let conn = lock(&self.conn);
        upsert_entry(&conn, cache_name, url, response)?;
        Ok(())
    }

    fn put_all(&self, cache_name: &str, entries: &[(String, Response)]) -> CacheResult<()> {
        let mut conn = lock(&self.conn);
        let tx = conn.transaction()?;
        for (url, response) in entries {
            upsert_entry(&tx, cache_name, url, response)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn match_in(&self, cache_name: &str, url: &str) -> CacheResult<Option<Response>> {
        let response = lock(&self.conn)
            .query_row(
                "SELECT status, content_type, body
                 FROM cache_entries
                 WHERE cache_name = ?1 AND url = ?2;",
                params![cache_name, url],
                |row| {
                    Ok(Response {
                        status: row.get(0)?,
                        content_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        body: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(response)
    }
}

fn upsert_entry(
    conn: &Connection,
    cache_name: &str,
    url: &str,
    response: &Response,
) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO cache_entries (cache_name, url, status, content_type, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, (strftime('%s', 'now') * 1000))
         ON CONFLICT(cache_name, url) DO UPDATE SET
            status = excluded.status,
            content_type = excluded.content_type,
            body = excluded.body,
            stored_at = excluded.stored_at;",
        params![
            cache_name,
            url,
            response.status,
            response.content_type,
            response.body
        ],
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{CacheStorage, MemoryCacheStorage, SqliteCacheStorage};
    use crate::offline::http::Response;

    fn exercise(storage: &dyn CacheStorage) {
        assert!(storage.cache_names().unwrap().is_empty());
        storage
            .put("static-v1", "/", &Response::ok("text/html", "<html>"))
            .unwrap();
        storage
            .put_all(
                "content-v1",
                &[
                    ("/content/a.md".to_string(), Response::ok("text/markdown", "# A")),
                    ("/content/b.md".to_string(), Response::ok("text/markdown", "# B")),
                ],
            )
            .unwrap();

        assert_eq!(
            storage.cache_names().unwrap(),
            vec!["content-v1".to_string(), "static-v1".to_string()]
        );
        let hit = storage.match_in("content-v1", "/content/b.md").unwrap().unwrap();
        assert_eq!(hit.body_text(), "# B");
        assert_eq!(hit.content_type, "text/markdown");
        assert!(storage.match_in("static-v1", "/content/b.md").unwrap().is_none());
        assert_eq!(storage.match_any("/").unwrap().unwrap().body_text(), "<html>");

        storage
            .put("static-v1", "/", &Response::ok("text/html", "<html v2>"))
            .unwrap();
        assert_eq!(
            storage.match_in("static-v1", "/").unwrap().unwrap().body_text(),
            "<html v2>"
        );

        assert!(storage.delete_cache("static-v1").unwrap());
        assert!(!storage.delete_cache("static-v1").unwrap());
        assert_eq!(storage.cache_names().unwrap(), vec!["content-v1".to_string()]);
    }

    #[test]
    fn memory_storage_contract() {
        exercise(&MemoryCacheStorage::new());
    }

    #[test]
    fn sqlite_storage_contract() {
        exercise(&SqliteCacheStorage::open_in_memory().unwrap());
    }
}
