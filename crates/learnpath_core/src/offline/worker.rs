//! Request interceptor with install/activate lifecycle.
//!
//! # Responsibility
//! - Route each request through the policy table.
//! - Keep the static shell cache and the content cache current.
//! - Clean stale cache versions and pre-fetch content on activation.
//!
//! # Invariants
//! - Background refresh never changes a response already returned.
//! - Install writes all static assets or nothing.
//! - Activation never fails because of one content file.

use super::cache::{CacheError, CacheStorage};
use super::http::{Request, Response};
use super::network::{Network, NetworkError};
use super::policy::{FetchPolicy, PolicyTable};
use super::tasks::TaskSpawner;
use crate::model::structure::{ContentTree, StructureError};
use crate::navigation::flatten;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Cache names and routes used by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub static_name: String,
    pub content_name: String,
    pub static_assets: Vec<String>,
    pub content_prefix: String,
    pub structure_path: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            static_name: "prog-web-v2".to_string(),
            content_name: "prog-web-content-v1".to_string(),
            static_assets: vec![
                "/".to_string(),
                "/manifest.json".to_string(),
                "/glossaire".to_string(),
            ],
            content_prefix: "/content/".to_string(),
            structure_path: "/api/structure".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum WorkerError {
    Network { url: String, source: NetworkError },
    Status { url: String, status: u16 },
    Cache(CacheError),
    Structure(StructureError),
}

impl Display for WorkerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network { url, source } => write!(f, "fetch `{url}` failed: {source}"),
            Self::Status { url, status } => write!(f, "fetch `{url}` returned status {status}"),
            Self::Cache(err) => write!(f, "{err}"),
            Self::Structure(err) => write!(f, "invalid structure listing: {err}"),
        }
    }
}

impl Error for WorkerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Network { source, .. } => Some(source),
            Self::Status { .. } => None,
            Self::Cache(err) => Some(err),
            Self::Structure(err) => Some(err),
        }
    }
}

impl From<CacheError> for WorkerError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<StructureError> for WorkerError {
    fn from(value: StructureError) -> Self {
        Self::Structure(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    pub cached: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub deleted_caches: Vec<String>,
    pub cached: Vec<String>,
    pub failed: Vec<String>,
    /// `false` when the structure listing could not be fetched or parsed.
    pub structure_loaded: bool,
}

/// Offline-capable fetch front.
pub struct OfflineWorker {
    network: Arc<dyn Network>,
    caches: Arc<dyn CacheStorage>,
    spawner: Arc<dyn TaskSpawner>,
    policies: PolicyTable,
    settings: WorkerSettings,
}

impl OfflineWorker {
    pub fn new(
        network: Arc<dyn Network>,
        caches: Arc<dyn CacheStorage>,
        spawner: Arc<dyn TaskSpawner>,
        settings: WorkerSettings,
    ) -> Self {
        let policies = PolicyTable::portal_default(&settings.content_prefix, &settings.structure_path);
        Self {
            network,
            caches,
            spawner,
            policies,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn caches(&self) -> &Arc<dyn CacheStorage> {
        &self.caches
    }

    pub fn policy_for(&self, request: &Request) -> FetchPolicy {
        self.policies.policy_for(request)
    }

    /// Serves one request.
    ///
    /// Errors only when a cache-first or passthrough request misses the cache
    /// and the network fails. Network-first requests degrade to a cached copy
    /// or a synthesized `503`.
    pub fn handle(&self, request: &Request) -> Result<Response, NetworkError> {
        let policy = self.policies.policy_for(request);
        debug!(
            "event=worker_fetch module=offline status=start method={} url={} policy={}",
            request.method,
            request.url,
            policy.as_str()
        );
        match policy {
            FetchPolicy::Passthrough => self.network.fetch(request),
            FetchPolicy::CacheFirst => self.cache_first(request),
            FetchPolicy::NetworkFirst => Ok(self.network_first(request)),
        }
    }

    /// Fetches every static asset and stores them together.
    pub fn install(&self) -> Result<InstallReport, WorkerError> {
        let started_at = Instant::now();
        info!(
            "event=worker_install module=offline status=start cache={} assets={}",
            self.settings.static_name,
            self.settings.static_assets.len()
        );

        let result = self.fetch_static_assets().and_then(|entries| {
            self.caches.put_all(&self.settings.static_name, &entries)?;
            Ok(entries.len())
        });

        match result {
            Ok(cached) => {
                info!(
                    "event=worker_install module=offline status=ok cache={} cached={} duration_ms={}",
                    self.settings.static_name,
                    cached,
                    started_at.elapsed().as_millis()
                );
                Ok(InstallReport {
                    cache_name: self.settings.static_name.clone(),
                    cached,
                })
            }
            Err(err) => {
                warn!(
                    "event=worker_install module=offline status=error cache={} error={}",
                    self.settings.static_name, err
                );
                Err(err)
            }
        }
    }

    /// Deletes stale caches, then pre-fetches all content files.
    pub fn activate(&self) -> Result<ActivationReport, WorkerError> {
        let started_at = Instant::now();
        let mut report = ActivationReport::default();

        for name in self.caches.cache_names()? {
            if name == self.settings.static_name || name == self.settings.content_name {
                continue;
            }
            if self.caches.delete_cache(&name)? {
                report.deleted_caches.push(name);
            }
        }

        match self.fetch_structure() {
            Ok(tree) => {
                report.structure_loaded = true;
                self.prefetch_content(&tree, &mut report);
            }
            Err(err) => warn!(
                "event=worker_prefetch module=offline status=error url={} error={}",
                self.settings.structure_path, err
            ),
        }

        info!(
            "event=worker_activate module=offline status=ok deleted={} cached={} failed={} duration_ms={}",
            report.deleted_caches.len(),
            report.cached.len(),
            report.failed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// URL of one content file relative to the content root.
    pub fn content_url(&self, file: &str) -> String {
        format!("{}{}", self.settings.content_prefix, file.trim_start_matches('/'))
    }

    fn cache_first(&self, request: &Request) -> Result<Response, NetworkError> {
        let cache_name = &self.settings.content_name;
        match self.caches.match_in(cache_name, &request.url) {
            Ok(Some(cached)) => {
                self.spawn_refresh(request.clone());
                return Ok(cached);
            }
            Ok(None) => {}
            Err(err) => warn!(
                "event=cache_match module=offline status=error cache={} url={} error={}",
                cache_name, request.url, err
            ),
        }

        let response = self.network.fetch(request)?;
        if response.is_success() {
            self.store(cache_name, &request.url, &response);
        }
        Ok(response)
    }

    fn network_first(&self, request: &Request) -> Response {
        match self.network.fetch(request) {
            Ok(response) => {
                if response.status == 200 {
                    self.store(&self.settings.static_name, &request.url, &response);
                }
                response
            }
            Err(err) => {
                debug!(
                    "event=worker_fetch module=offline status=fallback url={} error={}",
                    request.url, err
                );
                if let Some(cached) = self.match_any(&request.url) {
                    return cached;
                }
                if request.is_navigation() {
                    if let Some(home) = self.match_any("/") {
                        return home;
                    }
                }
                Response::offline()
            }
        }
    }

    fn spawn_refresh(&self, request: Request) {
        let network = Arc::clone(&self.network);
        let caches = Arc::clone(&self.caches);
        let cache_name = self.settings.content_name.clone();
        self.spawner.spawn(Box::new(move || {
            match network.fetch(&request) {
                Ok(response) if response.is_success() => {
                    if let Err(err) = caches.put(&cache_name, &request.url, &response) {
                        debug!(
                            "event=cache_refresh module=offline status=error url={} error={}",
                            request.url, err
                        );
                    }
                }
                Ok(response) => debug!(
                    "event=cache_refresh module=offline status=skipped url={} http_status={}",
                    request.url, response.status
                ),
                Err(err) => debug!(
                    "event=cache_refresh module=offline status=error url={} error={}",
                    request.url, err
                ),
            }
        }));
    }

    fn store(&self, cache_name: &str, url: &str, response: &Response) {
        if let Err(err) = self.caches.put(cache_name, url, response) {
            warn!(
                "event=cache_put module=offline status=error cache={} url={} error={}",
                cache_name, url, err
            );
        }
    }

    fn match_any(&self, url: &str) -> Option<Response> {
        match self.caches.match_any(url) {
            Ok(found) => found,
            Err(err) => {
                warn!(
                    "event=cache_match module=offline status=error url={} error={}",
                    url, err
                );
                None
            }
        }
    }

    fn fetch_static_assets(&self) -> Result<Vec<(String, Response)>, WorkerError> {
        self.settings
            .static_assets
            .iter()
            .map(|url| -> Result<(String, Response), WorkerError> {
                let response = self.fetch_ok(url)?;
                Ok((url.clone(), response))
            })
            .collect()
    }

    fn fetch_structure(&self) -> Result<ContentTree, WorkerError> {
        let response = self.fetch_ok(&self.settings.structure_path)?;
        Ok(ContentTree::from_json(&response.body_text())?)
    }

    fn prefetch_content(&self, tree: &ContentTree, report: &mut ActivationReport) {
        for item in flatten(tree) {
            let url = self.content_url(&item.file);
            match self
                .fetch_ok(&url)
                .and_then(|response| Ok(self.caches.put(&self.settings.content_name, &url, &response)?))
            {
                Ok(()) => report.cached.push(url),
                Err(err) => {
                    warn!(
                        "event=worker_prefetch module=offline status=error url={} error={}",
                        url, err
                    );
                    report.failed.push(url);
                }
            }
        }
    }

    fn fetch_ok(&self, url: &str) -> Result<Response, WorkerError> {
        let response = self
            .network
            .fetch(&Request::get(url))
            .map_err(|source| WorkerError::Network {
                url: url.to_string(),
                source,
            })?;
        if !response.is_success() {
            return Err(WorkerError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response)
    }
}
