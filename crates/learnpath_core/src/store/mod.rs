//! Durable key-value store with same-process change notification.
//!
//! # Responsibility
//! - Wrap one injectable persistence backend (`get`, `set`, `delete`).
//! - Decide durable vs. degraded mode once, at construction time.
//! - Notify subscribers synchronously after each state-changing write.
//!
//! # Invariants
//! - Callers never branch on backend availability; a degraded store keeps
//!   working in memory for the session.
//! - Corrupt JSON values load as the type's default and are logged, never
//!   surfaced as errors.
//! - Observers run after the write is applied, before the write call returns.

mod backend;

pub use backend::{MemoryKvBackend, SqliteKvBackend};

use crate::db::DbError;
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value persistence error.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Value cannot be encoded for persistence.
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode { key, source } => write!(f, "failed to encode `{key}`: {source}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode { source, .. } => Some(source),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence backend contract.
pub trait KvBackend: Send {
    /// Short backend label used in diagnostics.
    fn kind(&self) -> &'static str;
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Kind of state change reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Set,
    Deleted,
}

/// One applied write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
    pub kind: ChangeKind,
}

type Observer = Box<dyn Fn(&StoreChange) + Send>;

/// Explicitly constructed store shared by reference with its consumers.
pub struct KvStore {
    backend: Box<dyn KvBackend>,
    durable: bool,
    observers: RefCell<Vec<Observer>>,
    /// Observers registered while a notification is running.
    pending: RefCell<Vec<Observer>>,
}

impl KvStore {
    /// Creates a store over a caller-provided backend.
    pub fn new(backend: Box<dyn KvBackend>, durable: bool) -> Self {
        Self {
            backend,
            durable,
            observers: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Creates a session-only store.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryKvBackend::default()), false)
    }

    /// Opens a durable SQLite store at `path`, or degrades to memory.
    ///
    /// `None` selects the in-memory mode directly.
    pub fn open(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::in_memory();
        };

        match SqliteKvBackend::open(path) {
            Ok(backend) => Self::new(Box::new(backend), true),
            Err(err) => {
                warn!(
                    "event=store_open module=store status=degraded backend=memory path={} error={}",
                    path.display(),
                    err
                );
                Self::in_memory()
            }
        }
    }

    /// Whether writes survive the session.
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Backend label (`sqlite`, `memory`).
    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// Registers a synchronous change observer.
    ///
    /// Observers added from inside a notification start with the next write.
    pub fn subscribe(&self, observer: impl Fn(&StoreChange) + Send + 'static) {
        let observer: Observer = Box::new(observer);
        match self.observers.try_borrow_mut() {
            Ok(mut observers) => observers.push(observer),
            Err(_) => self.pending.borrow_mut().push(observer),
        }
    }

    /// Reads a raw value. Backend failures read as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                error!(
                    "event=store_get module=store status=error backend={} key={} error={}",
                    self.backend.kind(),
                    key,
                    err
                );
                None
            }
        }
    }

    /// Writes a raw value and notifies observers.
    pub fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.backend.set(key, value)?;
        self.notify(key, ChangeKind::Set);
        Ok(())
    }

    /// Removes a key and notifies observers. Missing keys are not an error.
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        self.backend.delete(key)?;
        self.notify(key, ChangeKind::Deleted);
        Ok(())
    }

    /// Loads a JSON value, falling back to `T::default()` when absent or corrupt.
    pub fn get_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.get(key) else {
            return T::default();
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                error!(
                    "event=store_load module=store status=error key={} error_code=corrupt_json error={}",
                    key, err
                );
                T::default()
            }
        }
    }

    /// Encodes and writes a JSON value.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &encoded)
    }

    fn notify(&self, key: &str, kind: ChangeKind) {
        let change = StoreChange {
            key: key.to_string(),
            kind,
        };
        for observer in self.observers.borrow().iter() {
            observer(&change);
        }
        self.flush_pending();
    }

    fn flush_pending(&self) {
        // Still inside an outer notification; the outermost one flushes.
        let Ok(mut observers) = self.observers.try_borrow_mut() else {
            return;
        };
        observers.extend(self.pending.borrow_mut().drain(..));
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeKind, KvStore};
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn missing_key_reads_as_none() {
        let store = KvStore::in_memory();
        assert_eq!(store.get("nothing"), None);
        assert!(!store.is_durable());
    }

    #[test]
    fn observers_see_writes_synchronously() {
        let store = KvStore::in_memory();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |change| sink.lock().unwrap().push(change.clone()));

        store.set("a", "1").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
        store.delete("a").unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].key, "a");
        assert_eq!(seen[0].kind, ChangeKind::Set);
        assert_eq!(seen[1].kind, ChangeKind::Deleted);
    }

    #[test]
    fn corrupt_json_loads_as_default() {
        let store = KvStore::in_memory();
        store.set("favorites", "{not json").unwrap();
        let value: Vec<String> = store.get_json("favorites");
        assert!(value.is_empty());

        let map: BTreeMap<String, String> = store.get_json("missing");
        assert!(map.is_empty());
    }

    #[test]
    fn json_values_round_trip_through_backend() {
        let store = KvStore::in_memory();
        store.set_json("list", &vec!["x", "y"]).unwrap();
        let list: Vec<String> = store.get_json("list");
        assert_eq!(list, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn open_without_path_is_in_memory() {
        let store = KvStore::open(None);
        assert_eq!(store.backend_kind(), "memory");
    }

    #[test]
    fn subscribing_from_an_observer_takes_effect_on_the_next_write() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        thread_local! {
            static STORE: KvStore = KvStore::in_memory();
        }

        let late_calls = Arc::new(AtomicUsize::new(0));
        let registered = Arc::clone(&late_calls);
        STORE.with(|store| {
            store.subscribe(move |change| {
                if change.key != "first" {
                    return;
                }
                let counter = Arc::clone(&registered);
                STORE.with(|inner| {
                    inner.subscribe(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                });
            });

            store.set("first", "1").unwrap();
            assert_eq!(late_calls.load(Ordering::SeqCst), 0);
            store.set("second", "2").unwrap();
            assert_eq!(late_calls.load(Ordering::SeqCst), 1);
        });
    }
}
