//! User-owned learning state persisted through [`crate::store::KvStore`].
//!
//! # Responsibility
//! - Read flags and progress aggregation per navigable leaf.
//! - Favorites, section notes and visit history.
//!
//! # Invariants
//! - Each store owns a disjoint set of keys.
//! - Reads never fail; missing or corrupt values read as empty state.

pub mod favorites;
pub mod history;
pub mod notes;
pub mod read_state;

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
