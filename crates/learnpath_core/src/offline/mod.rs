//! Offline fetch layer: cache policies, cache storage and a local origin.
//!
//! # Responsibility
//! - Intercept portal requests and apply the cache policy table.
//! - Own the static shell cache and the content cache lifecycle.
//!
//! # Invariants
//! - All network access goes through [`network::Network`].
//! - Background work goes through [`tasks::TaskSpawner`].

pub mod cache;
pub mod http;
pub mod network;
pub mod origin;
pub mod policy;
pub mod tasks;
pub mod worker;

pub use cache::{CacheError, CacheStorage, MemoryCacheStorage, SqliteCacheStorage};
pub use http::{Method, Request, RequestMode, Response};
pub use network::{Network, NetworkError, UnreachableNetwork};
pub use origin::LocalOrigin;
pub use policy::{FetchPolicy, PolicyTable};
pub use tasks::{QueuedSpawner, TaskSpawner, ThreadSpawner};
pub use worker::{ActivationReport, InstallReport, OfflineWorker, WorkerError, WorkerSettings};
