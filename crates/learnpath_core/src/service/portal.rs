//! Learning portal facade.
//!
//! # Responsibility
//! - Open one portal from configuration.
//! - Assemble section views from the structure, content and user state.
//! - Route user-state writes to the matching store.
//!
//! # Invariants
//! - Every leaf operation checks the key against the loaded structure first.
//! - Content is always read through the offline worker.
//! - A store that cannot be opened degrades to memory; it never fails `open`.

use crate::config::PortalConfig;
use crate::document::{reading_time_minutes, table_of_contents, TocEntry};
use crate::glossary::{Glossary, GlossaryError};
use crate::model::structure::{ContentTree, LeafKey, NavigationItem, StructureError};
use crate::navigation::{adjacent, find, flatten};
use crate::offline::{
    ActivationReport, CacheStorage, InstallReport, LocalOrigin, MemoryCacheStorage, Network,
    NetworkError, OfflineWorker, Request, SqliteCacheStorage, TaskSpawner, ThreadSpawner,
    WorkerError,
};
use crate::quiz::parser::{parse_document, QuizDocument};
use crate::search::scan::{ContentSearcher, SearchHit};
use crate::state::favorites::{Favorite, FavoritesStore};
use crate::state::history::{HistoryStore, Visit, VisitHistory};
use crate::state::notes::NotesStore;
use crate::state::read_state::{ProgressStats, ReadStateStore};
use crate::store::{KvStore, StoreError};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum PortalError {
    Structure(StructureError),
    Glossary(GlossaryError),
    /// No leaf matches the requested key or path.
    SectionNotFound(String),
    /// The leaf exists but its content file does not.
    ContentNotFound(String),
    /// Content fetch returned a non-success status other than 404.
    ContentUnavailable { file: String, status: u16 },
    Network(NetworkError),
    Store(StoreError),
    Worker(WorkerError),
}

impl Display for PortalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structure(err) => write!(f, "{err}"),
            Self::Glossary(err) => write!(f, "{err}"),
            Self::SectionNotFound(path) => write!(f, "section not found: {path}"),
            Self::ContentNotFound(file) => write!(f, "content not found: {file}"),
            Self::ContentUnavailable { file, status } => {
                write!(f, "content unavailable: {file} (status {status})")
            }
            Self::Network(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Worker(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PortalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Structure(err) => Some(err),
            Self::Glossary(err) => Some(err),
            Self::Network(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Worker(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StructureError> for PortalError {
    fn from(value: StructureError) -> Self {
        Self::Structure(value)
    }
}

impl From<GlossaryError> for PortalError {
    fn from(value: GlossaryError) -> Self {
        Self::Glossary(value)
    }
}

impl From<NetworkError> for PortalError {
    fn from(value: NetworkError) -> Self {
        Self::Network(value)
    }
}

impl From<StoreError> for PortalError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<WorkerError> for PortalError {
    fn from(value: WorkerError) -> Self {
        Self::Worker(value)
    }
}

/// Everything a shell needs to display one leaf.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub item: NavigationItem,
    pub path: String,
    pub markdown: String,
    pub document: QuizDocument,
    pub toc: Vec<TocEntry>,
    pub reading_time_minutes: usize,
    pub prev: Option<NavigationItem>,
    pub next: Option<NavigationItem>,
    pub is_read: bool,
    pub is_favorite: bool,
    /// Empty when the section has no note.
    pub note: String,
}

/// Portal facade owned by one shell.
pub struct Portal {
    config: PortalConfig,
    tree: ContentTree,
    store: KvStore,
    worker: OfflineWorker,
    searcher: ContentSearcher,
}

impl Portal {
    /// Opens the portal described by `config`.
    ///
    /// # Errors
    /// - Structure file missing, unreadable or invalid.
    pub fn open(config: PortalConfig) -> Result<Self, PortalError> {
        let tree = ContentTree::load(&config.structure_file)?;
        let store = KvStore::open(config.database_path.as_deref());
        let caches = open_cache_storage(&config);
        let origin = LocalOrigin::new(
            config.content_root.clone(),
            config.public_root.clone(),
            config.structure_file.clone(),
            config.search.clone(),
        );
        let worker = OfflineWorker::new(
            Arc::new(origin),
            caches,
            Arc::new(ThreadSpawner),
            config.cache.clone(),
        );

        info!(
            "event=portal_open module=service status=ok axes={} leaves={} store={} durable={}",
            tree.axes.len(),
            flatten(&tree).len(),
            store.backend_kind(),
            store.is_durable()
        );
        Ok(Self::from_parts(config, tree, store, worker))
    }

    /// Builds a portal from already constructed parts.
    pub fn from_parts(
        config: PortalConfig,
        tree: ContentTree,
        store: KvStore,
        worker: OfflineWorker,
    ) -> Self {
        let searcher = ContentSearcher::new(config.content_root.clone(), config.search.clone());
        Self {
            config,
            tree,
            store,
            worker,
            searcher,
        }
    }

    /// Portal over explicit network, caches and spawner, with in-memory state.
    pub fn with_network(
        config: PortalConfig,
        network: Arc<dyn Network>,
        caches: Arc<dyn CacheStorage>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> Result<Self, PortalError> {
        let tree = ContentTree::load(&config.structure_file)?;
        let worker = OfflineWorker::new(network, caches, spawner, config.cache.clone());
        Ok(Self::from_parts(config, tree, KvStore::in_memory(), worker))
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn worker(&self) -> &OfflineWorker {
        &self.worker
    }

    pub fn navigation(&self) -> Vec<NavigationItem> {
        flatten(&self.tree)
    }

    /// Resolves a key to its leaf.
    pub fn item(&self, key: &LeafKey) -> Result<NavigationItem, PortalError> {
        find(&self.tree, key).ok_or_else(|| PortalError::SectionNotFound(key.url_path()))
    }

    /// Resolves a `/axis/chapter/section[/sub]` path to its leaf.
    pub fn item_by_path(&self, path: &str) -> Result<NavigationItem, PortalError> {
        let key = LeafKey::parse_path(path)
            .ok_or_else(|| PortalError::SectionNotFound(path.to_string()))?;
        self.item(&key)
    }

    /// Assembles the view of one leaf.
    pub fn section(&self, key: &LeafKey) -> Result<SectionView, PortalError> {
        let item = self.item(key)?;
        let markdown = self.fetch_content(&item.file)?;
        let neighbours = adjacent(&self.tree, &item);
        let path = item.url_path();

        Ok(SectionView {
            document: parse_document(&markdown),
            toc: table_of_contents(&markdown),
            reading_time_minutes: reading_time_minutes(&markdown),
            prev: neighbours.prev,
            next: neighbours.next,
            is_read: ReadStateStore::new(&self.store).is_read(key),
            is_favorite: FavoritesStore::new(&self.store).is_favorite(&path),
            note: NotesStore::new(&self.store).get(&key.section_path()),
            markdown,
            path,
            item,
        })
    }

    /// Opens a leaf and records the visit.
    pub fn visit(&self, key: &LeafKey) -> Result<SectionView, PortalError> {
        let view = self.section(key)?;
        HistoryStore::new(&self.store).record_visit(&view.path, view.item.title())?;
        Ok(view)
    }

    pub fn mark_read(&self, key: &LeafKey) -> Result<(), PortalError> {
        self.item(key)?;
        ReadStateStore::new(&self.store).mark_read(key)?;
        Ok(())
    }

    pub fn mark_unread(&self, key: &LeafKey) -> Result<(), PortalError> {
        self.item(key)?;
        ReadStateStore::new(&self.store).mark_unread(key)?;
        Ok(())
    }

    pub fn is_read(&self, key: &LeafKey) -> bool {
        ReadStateStore::new(&self.store).is_read(key)
    }

    pub fn progress(&self) -> ProgressStats {
        ReadStateStore::new(&self.store).progress_stats(&self.tree)
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.searcher.search(&self.tree, query)
    }

    /// Reads the glossary listing from disk.
    pub fn glossary(&self) -> Result<Glossary, PortalError> {
        Ok(Glossary::load(&self.config.glossary_file)?)
    }

    /// Flips the favorite flag of one leaf. Returns whether it is now a favorite.
    pub fn toggle_favorite(&self, key: &LeafKey) -> Result<bool, PortalError> {
        let item = self.item(key)?;
        let now_favorite =
            FavoritesStore::new(&self.store).toggle(&item.url_path(), item.title())?;
        Ok(now_favorite)
    }

    pub fn favorites(&self) -> Vec<Favorite> {
        FavoritesStore::new(&self.store).list()
    }

    /// Replaces the note of the leaf's section. Blank text deletes it.
    pub fn set_note(&self, key: &LeafKey, text: &str) -> Result<(), PortalError> {
        self.item(key)?;
        NotesStore::new(&self.store).set(&key.section_path(), text)?;
        Ok(())
    }

    pub fn note(&self, key: &LeafKey) -> String {
        NotesStore::new(&self.store).get(&key.section_path())
    }

    pub fn record_visit(&self, key: &LeafKey) -> Result<Visit, PortalError> {
        let item = self.item(key)?;
        Ok(HistoryStore::new(&self.store).record_visit(&item.url_path(), item.title())?)
    }

    pub fn history(&self) -> VisitHistory {
        HistoryStore::new(&self.store).load()
    }

    /// Caches the static shell. All-or-nothing.
    pub fn install_shell(&self) -> Result<InstallReport, PortalError> {
        Ok(self.worker.install()?)
    }

    /// Cleans stale caches and pre-fetches every content file.
    pub fn prefetch_content(&self) -> Result<ActivationReport, PortalError> {
        Ok(self.worker.activate()?)
    }

    fn fetch_content(&self, file: &str) -> Result<String, PortalError> {
        let response = self
            .worker
            .handle(&Request::get(self.worker.content_url(file)))?;
        match response.status {
            200..=299 => Ok(response.body_text()),
            404 => Err(PortalError::ContentNotFound(file.to_string())),
            status => Err(PortalError::ContentUnavailable {
                file: file.to_string(),
                status,
            }),
        }
    }
}

fn open_cache_storage(config: &PortalConfig) -> Arc<dyn CacheStorage> {
    let Some(path) = config.cache_path.as_deref() else {
        return Arc::new(MemoryCacheStorage::new());
    };
    match SqliteCacheStorage::open(path) {
        Ok(storage) => Arc::new(storage),
        Err(err) => {
            warn!(
                "event=cache_open module=service status=degraded backend=memory path={} error={}",
                path.display(),
                err
            );
            Arc::new(MemoryCacheStorage::new())
        }
    }
}
