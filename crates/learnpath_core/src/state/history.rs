//! Last visited leaf and a short most-recent-first visit list.

use super::now_millis;
use crate::store::{KvStore, StoreResult};
use serde::{Deserialize, Serialize};

/// Storage key of the visit history document.
pub const HISTORY_KEY: &str = "learning-progress";
/// Maximum number of recent visits kept.
pub const MAX_RECENT: usize = 5;

/// One recorded visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub path: String,
    pub title: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// Persisted visit history document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitHistory {
    #[serde(default)]
    pub last_visited: Option<Visit>,
    #[serde(default)]
    pub recent_sections: Vec<Visit>,
}

/// History view over a shared store.
pub struct HistoryStore<'s> {
    store: &'s KvStore,
}

impl<'s> HistoryStore<'s> {
    pub fn new(store: &'s KvStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> VisitHistory {
        self.store.get_json(HISTORY_KEY)
    }

    /// Records a visit at the head of the recent list.
    pub fn record_visit(&self, path: &str, title: &str) -> StoreResult<Visit> {
        let visit = Visit {
            path: path.to_string(),
            title: title.to_string(),
            timestamp: now_millis(),
        };

        let mut history = self.load();
        let mut recent = Vec::with_capacity(MAX_RECENT);
        recent.push(visit.clone());
        recent.extend(
            history
                .recent_sections
                .into_iter()
                .filter(|previous| previous.path != path)
                .take(MAX_RECENT - 1),
        );
        history.recent_sections = recent;
        history.last_visited = Some(visit.clone());

        self.store.set_json(HISTORY_KEY, &history)?;
        Ok(visit)
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryStore, MAX_RECENT};
    use crate::store::KvStore;

    #[test]
    fn keeps_most_recent_first_and_unique() {
        let store = KvStore::in_memory();
        let history = HistoryStore::new(&store);
        history.record_visit("/a", "A").unwrap();
        history.record_visit("/b", "B").unwrap();
        history.record_visit("/a", "A").unwrap();

        let loaded = history.load();
        let paths = loaded
            .recent_sections
            .iter()
            .map(|visit| visit.path.as_str())
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["/a", "/b"]);
        assert_eq!(loaded.last_visited.unwrap().path, "/a");
    }

    #[test]
    fn caps_recent_list() {
        let store = KvStore::in_memory();
        let history = HistoryStore::new(&store);
        for i in 0..8 {
            history.record_visit(&format!("/p{i}"), "P").unwrap();
        }
        let loaded = history.load();
        assert_eq!(loaded.recent_sections.len(), MAX_RECENT);
        assert_eq!(loaded.recent_sections[0].path, "/p7");
    }
}
