//! Per-query scan over markdown files on disk.
//!
//! # Responsibility
//! - Walk the configured content scope with `walkdir` and match documents case-insensitively.
//! - Resolve each document to its navigable path through the structure.
//!
//! # Invariants
//! - Queries shorter than the minimum never touch the disk.
//! - Documents without a structure entry are never returned.
//! - Hits are ordered by navigation order and capped at `max_results`.

use crate::document::{collapse_whitespace, extract_title};
use crate::model::structure::ContentTree;
use crate::navigation::file_url_map;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Title used when a document has no level-1 heading.
pub const UNTITLED: &str = "Untitled";

/// Search behavior knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Axis directories to scan. Empty scans the whole content root.
    pub axes: Vec<String>,
    pub max_results: usize,
    pub min_query_chars: usize,
    /// Characters kept on each side of the match.
    pub excerpt_radius: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            axes: Vec::new(),
            max_results: 20,
            min_query_chars: 2,
            excerpt_radius: 100,
        }
    }
}

/// Single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub title: String,
    pub path: String,
    pub excerpt: String,
    pub axis_id: String,
    pub chapter_id: String,
    pub section_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection_id: Option<String>,
}

/// Searches markdown files under one content root.
#[derive(Debug, Clone)]
pub struct ContentSearcher {
    content_root: PathBuf,
    settings: SearchSettings,
}

impl ContentSearcher {
    pub fn new(content_root: impl Into<PathBuf>, settings: SearchSettings) -> Self {
        Self {
            content_root: content_root.into(),
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Runs one query against the current files.
    pub fn search(&self, tree: &ContentTree, query: &str) -> Vec<SearchHit> {
        if query.chars().count() < self.settings.min_query_chars.max(1) {
            return Vec::new();
        }

        let started_at = Instant::now();
        let targets = file_url_map(tree);
        let mut ranked = Vec::new();

        for relative in self.scoped_files() {
            let Some(target) = targets.get(&relative) else {
                continue;
            };
            let absolute = self.content_root.join(&relative);
            let content = match std::fs::read_to_string(&absolute) {
                Ok(content) => content,
                Err(err) => {
                    warn!(
                        "event=search_read module=search status=error file={} error={}",
                        relative, err
                    );
                    continue;
                }
            };
            let Some(excerpt) = find_excerpt(&content, query, self.settings.excerpt_radius) else {
                continue;
            };

            let key = &target.key;
            ranked.push((
                target.position,
                SearchHit {
                    title: extract_title(&content).unwrap_or_else(|| UNTITLED.to_string()),
                    path: target.url.clone(),
                    excerpt,
                    axis_id: key.axis_id.clone(),
                    chapter_id: key.chapter_id.clone(),
                    section_id: key.section_id.clone(),
                    subsection_id: key.subsection_id.clone(),
                },
            ));
        }

        ranked.sort_by_key(|(position, _)| *position);
        let hits = ranked
            .into_iter()
            .map(|(_, hit)| hit)
            .take(self.settings.max_results)
            .collect::<Vec<_>>();

        debug!(
            "event=search module=search status=ok query_chars={} hits={} duration_ms={}",
            query.chars().count(),
            hits.len(),
            started_at.elapsed().as_millis()
        );
        hits
    }

    /// Relative (`/`-separated) paths of markdown files in scope.
    fn scoped_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        if self.settings.axes.is_empty() {
            collect_markdown_files(&self.content_root, &self.content_root, &mut files);
        } else {
            for axis in &self.settings.axes {
                collect_markdown_files(
                    &self.content_root,
                    &self.content_root.join(axis),
                    &mut files,
                );
            }
        }
        files
    }
}

/// Collects `.md` files below `dir` as paths relative to `root`.
fn collect_markdown_files(root: &Path, dir: &Path, files: &mut Vec<String>) {
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    "event=search_scan module=search status=error dir={} error={}",
                    dir.display(),
                    err
                );
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_markdown = entry
            .path()
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension == "md");
        if !is_markdown {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(relative);
    }
}

/// Finds the first case-insensitive match and returns its excerpt.
///
/// The excerpt keeps `radius` characters on each side of the match, collapses
/// whitespace, and is wrapped in `...` on each truncated side.
pub fn find_excerpt(content: &str, query: &str, radius: usize) -> Option<String> {
    let haystack = content.chars().collect::<Vec<_>>();
    let needle = query.chars().map(fold_char).collect::<Vec<_>>();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    let index = (0..=haystack.len() - needle.len()).find(|&start| {
        haystack[start..start + needle.len()]
            .iter()
            .zip(&needle)
            .all(|(c, q)| fold_char(*c) == *q)
    })?;

    let start = index.saturating_sub(radius);
    let end = (index + needle.len() + radius).min(haystack.len());
    let raw = haystack[start..end].iter().collect::<String>();

    let mut excerpt = collapse_whitespace(&raw);
    if start > 0 {
        excerpt.insert_str(0, "...");
    }
    if end < haystack.len() {
        excerpt.push_str("...");
    }
    Some(excerpt)
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}
