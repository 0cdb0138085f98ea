//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose portal use-cases to Dart through FRB as plain envelopes.
//! - Resolve portal configuration once per process.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Failures come back as `ok = false` plus a message, never as a throw.

use learnpath_core::{
    core_version as core_version_inner, group_by_letter, init_logging as init_logging_inner,
    parse_document, ping as ping_inner, LeafKey, Portal, PortalConfig, PortalError, SearchHit,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;

const CONFIG_ENV: &str = "LEARNPATH_CONFIG";
static CONFIG_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Health-check for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Starts Rust core logging once per process.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`.
/// - Returns an empty string on success, the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Pins the config file used by every later call.
///
/// Returns an empty string on success. Only the first call takes effect;
/// later calls with another path return an error message.
#[flutter_rust_bridge::frb(sync)]
pub fn portal_configure(config_path: String) -> String {
    let requested = normalize_config_path(&config_path);
    let active = CONFIG_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!(
            "portal already configured with `{}`",
            active
                .as_ref()
                .map_or_else(|| "<defaults>".to_string(), |p| p.display().to_string())
        )
    }
}

/// Generic action envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Flag result of toggle-style actions (`true` = now active).
    pub active: bool,
    pub message: String,
}

impl ActionResponse {
    fn success(active: bool, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            active,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            active: false,
            message: message.into(),
        }
    }
}

/// JSON payload envelope for structured views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonResponse {
    pub ok: bool,
    /// Serialized payload; empty on failure.
    pub json: String,
    pub message: String,
}

impl JsonResponse {
    fn from_result(result: Result<String, String>) -> Self {
        match result {
            Ok(json) => Self {
                ok: true,
                json,
                message: String::new(),
            },
            Err(message) => Self {
                ok: false,
                json: String::new(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressResponse {
    pub ok: bool,
    pub completed: u32,
    pub total: u32,
    pub percentage: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub title: String,
    pub path: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
    pub message: String,
}

/// Flattened navigation as JSON (`NavigationItem[]`).
#[flutter_rust_bridge::frb(sync)]
pub fn navigation_items() -> JsonResponse {
    JsonResponse::from_result(with_portal(|portal| to_json(&portal.navigation())))
}

/// Opens one leaf by path, records the visit, returns the section view JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn section_open(path: String) -> JsonResponse {
    JsonResponse::from_result(with_portal(|portal| {
        let key = parse_key(&path)?;
        let view = portal.visit(&key).map_err(|err| describe("section_open", &err))?;
        to_json(&view)
    }))
}

#[flutter_rust_bridge::frb(sync)]
pub fn section_mark_read(path: String, read: bool) -> ActionResponse {
    let result = with_portal(|portal| {
        let key = parse_key(&path)?;
        let outcome = if read {
            portal.mark_read(&key)
        } else {
            portal.mark_unread(&key)
        };
        outcome.map_err(|err| describe("section_mark_read", &err))
    });
    match result {
        Ok(()) => ActionResponse::success(read, "Read state saved."),
        Err(message) => ActionResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn progress_get() -> ProgressResponse {
    match with_portal(|portal| Ok(portal.progress())) {
        Ok(stats) => ProgressResponse {
            ok: true,
            completed: clamp_u32(stats.completed),
            total: clamp_u32(stats.total),
            percentage: stats.percentage,
            message: String::new(),
        },
        Err(message) => ProgressResponse {
            ok: false,
            completed: 0,
            total: 0,
            percentage: 0,
            message,
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn content_search(query: String) -> SearchResponse {
    match with_portal(|portal| Ok(portal.search(&query))) {
        Ok(hits) => {
            let message = if hits.is_empty() {
                "No results.".to_string()
            } else {
                format!("Found {} result(s).", hits.len())
            };
            SearchResponse {
                items: hits.into_iter().map(to_search_item).collect(),
                message,
            }
        }
        Err(message) => SearchResponse {
            items: Vec::new(),
            message,
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn favorite_toggle(path: String) -> ActionResponse {
    let result = with_portal(|portal| {
        let key = parse_key(&path)?;
        portal
            .toggle_favorite(&key)
            .map_err(|err| describe("favorite_toggle", &err))
    });
    match result {
        Ok(true) => ActionResponse::success(true, "Added to favorites."),
        Ok(false) => ActionResponse::success(false, "Removed from favorites."),
        Err(message) => ActionResponse::failure(message),
    }
}

/// Replaces the section note. Blank text deletes it.
#[flutter_rust_bridge::frb(sync)]
pub fn note_set(path: String, text: String) -> ActionResponse {
    let result = with_portal(|portal| {
        let key = parse_key(&path)?;
        portal
            .set_note(&key, &text)
            .map_err(|err| describe("note_set", &err))
    });
    match result {
        Ok(()) => ActionResponse::success(!text.trim().is_empty(), "Note saved."),
        Err(message) => ActionResponse::failure(message),
    }
}

/// Glossary terms filtered by text and category, grouped by initial (`LetterGroup[]`).
///
/// An empty `category` keeps every category.
#[flutter_rust_bridge::frb(sync)]
pub fn glossary_search(query: String, category: String) -> JsonResponse {
    JsonResponse::from_result(with_portal(|portal| {
        let glossary = portal
            .glossary()
            .map_err(|err| describe("glossary_search", &err))?;
        let category = Some(category.trim()).filter(|category| !category.is_empty());
        to_json(&group_by_letter(glossary.filter(&query, category)))
    }))
}

/// Splits markdown into markdown and quiz parts, as JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn quiz_parse(markdown: String) -> JsonResponse {
    JsonResponse::from_result(to_json(&parse_document(&markdown)))
}

fn with_portal<T>(f: impl FnOnce(&Portal) -> Result<T, String>) -> Result<T, String> {
    let config = PortalConfig::load(resolve_config_path().as_deref())
        .map_err(|err| format!("portal config failed: {err}"))?;
    let portal = Portal::open(config).map_err(|err| describe("portal_open", &err))?;
    f(&portal)
}

fn resolve_config_path() -> Option<PathBuf> {
    CONFIG_PATH
        .get_or_init(|| {
            std::env::var(CONFIG_ENV)
                .ok()
                .and_then(|raw| normalize_config_path(&raw))
        })
        .clone()
}

fn normalize_config_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

fn parse_key(path: &str) -> Result<LeafKey, String> {
    LeafKey::parse_path(path).ok_or_else(|| format!("invalid section path `{path}`"))
}

fn describe(operation: &str, err: &PortalError) -> String {
    if !matches!(
        err,
        PortalError::SectionNotFound(_) | PortalError::ContentNotFound(_)
    ) {
        warn!(
            "event=ffi_call module=ffi status=error op={} error={}",
            operation, err
        );
    }
    format!("{operation} failed: {err}")
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|err| format!("serialization failed: {err}"))
}

fn to_search_item(hit: SearchHit) -> SearchItem {
    SearchItem {
        title: hit.title,
        path: hit.path,
        excerpt: hit.excerpt,
    }
}

fn clamp_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
