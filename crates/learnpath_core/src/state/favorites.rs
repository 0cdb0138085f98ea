//! Favorite leaves, persisted as one JSON array.

use super::now_millis;
use crate::store::{KvStore, StoreResult};
use serde::{Deserialize, Serialize};

/// Storage key of the favorites list.
pub const FAVORITES_KEY: &str = "favorites";

/// One favorite entry, unique by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub path: String,
    pub title: String,
    /// Epoch milliseconds.
    pub added_at: i64,
}

/// Favorites view over a shared store.
pub struct FavoritesStore<'s> {
    store: &'s KvStore,
}

impl<'s> FavoritesStore<'s> {
    pub fn new(store: &'s KvStore) -> Self {
        Self { store }
    }

    /// Favorites in display (insertion) order.
    pub fn list(&self) -> Vec<Favorite> {
        self.store.get_json(FAVORITES_KEY)
    }

    pub fn is_favorite(&self, path: &str) -> bool {
        self.list().iter().any(|favorite| favorite.path == path)
    }

    /// Appends a favorite. Returns `false` when `path` was already present.
    pub fn add(&self, path: &str, title: &str) -> StoreResult<bool> {
        let mut favorites = self.list();
        if favorites.iter().any(|favorite| favorite.path == path) {
            return Ok(false);
        }
        favorites.push(Favorite {
            path: path.to_string(),
            title: title.to_string(),
            added_at: now_millis(),
        });
        self.store.set_json(FAVORITES_KEY, &favorites)?;
        Ok(true)
    }

    /// Removes a favorite. Returns `false` when `path` was absent.
    pub fn remove(&self, path: &str) -> StoreResult<bool> {
        let mut favorites = self.list();
        let before = favorites.len();
        favorites.retain(|favorite| favorite.path != path);
        if favorites.len() == before {
            return Ok(false);
        }
        self.store.set_json(FAVORITES_KEY, &favorites)?;
        Ok(true)
    }

    /// Adds or removes `path`; returns whether it is a favorite afterwards.
    pub fn toggle(&self, path: &str, title: &str) -> StoreResult<bool> {
        if self.remove(path)? {
            return Ok(false);
        }
        self.add(path, title)?;
        Ok(true)
    }
}
