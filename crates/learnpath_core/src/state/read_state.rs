//! Per-leaf read flags and progress aggregation.
//!
//! # Invariants
//! - A read flag is stored as the `"true"` sentinel under `LeafKey::read_key`.
//! - Progress only counts leaves present in the given tree.

use crate::model::structure::{ContentTree, LeafKey};
use crate::navigation::flatten;
use crate::store::{KvStore, StoreResult};
use log::debug;
use serde::Serialize;

const READ_SENTINEL: &str = "true";

/// Aggregated progress over one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressStats {
    pub completed: usize,
    pub total: usize,
    /// `round(100 * completed / total)`, 0 for an empty tree.
    pub percentage: u8,
}

/// Read-state view over a shared store.
pub struct ReadStateStore<'s> {
    store: &'s KvStore,
}

impl<'s> ReadStateStore<'s> {
    pub fn new(store: &'s KvStore) -> Self {
        Self { store }
    }

    /// Marks one leaf as read. Idempotent.
    pub fn mark_read(&self, key: &LeafKey) -> StoreResult<()> {
        if self.is_read(key) {
            return Ok(());
        }
        debug!("event=mark_read module=read_state status=ok leaf={key}");
        self.store.set(&key.read_key(), READ_SENTINEL)
    }

    /// Clears the read flag of one leaf.
    pub fn mark_unread(&self, key: &LeafKey) -> StoreResult<()> {
        self.store.delete(&key.read_key())
    }

    /// Whether the leaf was marked read. Unknown keys read as `false`.
    pub fn is_read(&self, key: &LeafKey) -> bool {
        self.store.get(&key.read_key()).as_deref() == Some(READ_SENTINEL)
    }

    /// Progress over every leaf of `tree`.
    pub fn progress_stats(&self, tree: &ContentTree) -> ProgressStats {
        let items = flatten(tree);
        let total = items.len();
        let completed = items
            .iter()
            .filter(|item| self.is_read(&item.key()))
            .count();

        ProgressStats {
            completed,
            total,
            percentage: percentage(completed, total),
        }
    }

    /// Rounded read percentage in `0..=100`.
    pub fn progress_percentage(&self, tree: &ContentTree) -> u8 {
        self.progress_stats(tree).percentage
    }
}

/// `round(100 * part / total)`; 0 when `total == 0`.
///
/// 100 is reserved for `part >= total`, so an incomplete set caps at 99.
pub fn percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = ((part as f64 / total as f64) * 100.0).round();
    let ceiling = if part < total { 99.0 } else { 100.0 };
    rounded.clamp(0.0, ceiling) as u8
}

#[cfg(test)]
mod tests {
    use super::{percentage, ReadStateStore};
    use crate::model::structure::{Axis, Chapter, ContentTree, LeafKey, Section};
    use crate::navigation::flatten;
    use crate::store::KvStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tree_with(count: usize) -> ContentTree {
        ContentTree {
            axes: vec![Axis {
                id: "a".to_string(),
                name: "A".to_string(),
                chapters: vec![Chapter {
                    id: "c".to_string(),
                    name: "C".to_string(),
                    sections: (0..count)
                        .map(|i| Section::leaf(format!("s{i}"), format!("S{i}"), format!("a/c/s{i}.md")))
                        .collect(),
                }],
            }],
        }
    }

    #[test]
    fn unknown_leaf_is_unread() {
        let store = KvStore::in_memory();
        let reads = ReadStateStore::new(&store);
        assert!(!reads.is_read(&LeafKey::section("x", "y", "z")));
    }

    #[test]
    fn mark_read_is_idempotent_and_uses_sentinel_key() {
        let store = KvStore::in_memory();
        let writes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&writes);
        store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let reads = ReadStateStore::new(&store);
        let key = LeafKey::subsection("a", "c", "s", "x");
        reads.mark_read(&key).unwrap();
        reads.mark_read(&key).unwrap();

        assert!(reads.is_read(&key));
        assert_eq!(store.get("read_a_c_s_x").as_deref(), Some("true"));
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn progress_is_zero_for_empty_tree() {
        let store = KvStore::in_memory();
        let reads = ReadStateStore::new(&store);
        assert_eq!(reads.progress_percentage(&ContentTree::default()), 0);
    }

    #[test]
    fn progress_grows_monotonically_to_full() {
        let store = KvStore::in_memory();
        let reads = ReadStateStore::new(&store);
        let tree = tree_with(3);

        let mut last = reads.progress_percentage(&tree);
        assert_eq!(last, 0);
        for item in flatten(&tree) {
            reads.mark_read(&item.key()).unwrap();
            let current = reads.progress_percentage(&tree);
            assert!(current >= last);
            last = current;
        }
        assert_eq!(last, 100);
        assert_eq!(reads.progress_stats(&tree).completed, 3);
    }

    #[test]
    fn stale_keys_do_not_inflate_progress() {
        let store = KvStore::in_memory();
        let reads = ReadStateStore::new(&store);
        reads.mark_read(&LeafKey::section("gone", "c", "s")).unwrap();

        let tree = tree_with(2);
        assert_eq!(reads.progress_percentage(&tree), 0);
        reads.mark_read(&LeafKey::section("a", "c", "s0")).unwrap();
        assert_eq!(reads.progress_percentage(&tree), 50);
    }

    #[test]
    fn mark_unread_clears_flag() {
        let store = KvStore::in_memory();
        let reads = ReadStateStore::new(&store);
        let key = LeafKey::section("a", "c", "s0");
        reads.mark_read(&key).unwrap();
        reads.mark_unread(&key).unwrap();
        assert!(!reads.is_read(&key));
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn percentage_reaches_full_only_when_every_leaf_is_read() {
        assert_eq!(percentage(199, 200), 99);
        assert_eq!(percentage(995, 1000), 99);
        assert_eq!(percentage(200, 200), 100);

        let store = KvStore::in_memory();
        let reads = ReadStateStore::new(&store);
        let tree = tree_with(200);
        for item in flatten(&tree).iter().skip(1) {
            reads.mark_read(&item.key()).unwrap();
        }
        let stats = reads.progress_stats(&tree);
        assert_eq!((stats.completed, stats.percentage), (199, 99));
    }
}
