//! Core domain logic for the learnpath learning portal.
//! This crate is the single source of truth for navigation, progress and
//! offline caching rules.

pub mod config;
pub mod db;
pub mod document;
pub mod glossary;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod offline;
pub mod quiz;
pub mod search;
pub mod service;
pub mod state;
pub mod store;

pub use config::{ConfigError, PortalConfig};
pub use glossary::{group_by_letter, Glossary, GlossaryError, GlossaryTerm, LetterGroup};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::structure::{
    Axis, Chapter, ContentTree, LeafKey, NavigationItem, Section, SectionBody, StructureError,
    Subsection,
};
pub use navigation::{adjacent, count_leaves, file_url_map, find, flatten, Adjacent};
pub use quiz::parser::{parse_document, DocumentPart, QuizDocument};
pub use quiz::session::{Grade, Outcome, QuizPhase, QuizSession};
pub use quiz::{QuizOption, QuizQuestion};
pub use search::scan::{ContentSearcher, SearchHit, SearchSettings};
pub use service::portal::{Portal, PortalError, SectionView};
pub use state::read_state::ProgressStats;
pub use store::{KvBackend, KvStore, StoreError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
