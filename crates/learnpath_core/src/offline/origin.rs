//! Portal HTTP surface served from local directories.
//!
//! # Responsibility
//! - Answer `/api/structure`, `/api/search` and `/content/*` from disk.
//! - Serve static shell files from the public directory.
//!
//! # Invariants
//! - Paths containing `..` segments are rejected with `400`.
//! - The structure listing is re-read on every request.

use super::http::{Request, Response};
use super::network::{Network, NetworkError};
use crate::model::structure::ContentTree;
use crate::search::scan::{ContentSearcher, SearchSettings};
use log::{debug, error};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const STRUCTURE_PATH: &str = "/api/structure";
const SEARCH_PATH: &str = "/api/search";
const CONTENT_PREFIX: &str = "/content/";

/// Local stand-in for the portal web server.
#[derive(Debug, Clone)]
pub struct LocalOrigin {
    content_root: PathBuf,
    public_root: PathBuf,
    structure_file: PathBuf,
    searcher: ContentSearcher,
}

impl LocalOrigin {
    pub fn new(
        content_root: impl Into<PathBuf>,
        public_root: impl Into<PathBuf>,
        structure_file: impl Into<PathBuf>,
        search: SearchSettings,
    ) -> Self {
        let content_root = content_root.into();
        Self {
            searcher: ContentSearcher::new(content_root.clone(), search),
            content_root,
            public_root: public_root.into(),
            structure_file: structure_file.into(),
        }
    }

    fn serve(&self, request: &Request) -> Response {
        let path = request.path();
        if path == STRUCTURE_PATH {
            return self.serve_structure();
        }
        if path == SEARCH_PATH {
            return self.serve_search(request);
        }
        if let Some(relative) = path.strip_prefix(CONTENT_PREFIX) {
            return self.serve_content(relative);
        }
        self.serve_static(path)
    }

    fn serve_structure(&self) -> Response {
        match self.load_tree().and_then(|tree| {
            tree.to_json().map_err(|err| err.to_string())
        }) {
            Ok(json) => Response::json(json),
            Err(err) => internal_error("structure", &err),
        }
    }

    fn serve_search(&self, request: &Request) -> Response {
        let query = request.query_param("q").unwrap_or_default();
        let tree = match self.load_tree() {
            Ok(tree) => tree,
            Err(err) => return internal_error("search", &err),
        };
        let results = self.searcher.search(&tree, &query);
        match serde_json::to_string(&serde_json::json!({ "results": results })) {
            Ok(body) => Response::json(body),
            Err(err) => internal_error("search", &err.to_string()),
        }
    }

    fn serve_content(&self, relative: &str) -> Response {
        let Some(path) = safe_join(&self.content_root, relative) else {
            return Response::text(400, "Invalid path");
        };
        match std::fs::read(&path) {
            Ok(body) => Response::ok("text/markdown; charset=utf-8", body),
            Err(err) if err.kind() == ErrorKind::NotFound => Response::not_found(),
            Err(err) => internal_error("content", &err.to_string()),
        }
    }

    fn serve_static(&self, path: &str) -> Response {
        let relative = path.trim_start_matches('/');
        let Some(base) = safe_join(&self.public_root, relative) else {
            return Response::text(400, "Invalid path");
        };

        let mut candidates = Vec::with_capacity(3);
        if relative.is_empty() {
            candidates.push(base.join("index.html"));
        } else {
            candidates.push(base.clone());
            candidates.push(base.with_extension("html"));
            candidates.push(base.join("index.html"));
        }

        for candidate in candidates {
            if !candidate.is_file() {
                continue;
            }
            return match std::fs::read(&candidate) {
                Ok(body) => Response::ok(content_type_for(&candidate), body),
                Err(err) => internal_error("static", &err.to_string()),
            };
        }
        Response::not_found()
    }

    fn load_tree(&self) -> Result<ContentTree, String> {
        ContentTree::load(&self.structure_file).map_err(|err| err.to_string())
    }
}

impl Network for LocalOrigin {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let response = self.serve(request);
        debug!(
            "event=origin_fetch module=offline status=ok method={} path={} http_status={}",
            request.method,
            request.path(),
            response.status
        );
        Ok(response)
    }
}

/// Joins a `/`-separated relative path, refusing `..` and absolute segments.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            _ if segment.contains('\\') || segment.contains(':') => return None,
            _ => path.push(segment),
        }
    }
    Some(path)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("md") => "text/markdown; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn internal_error(route: &str, message: &str) -> Response {
    error!(
        "event=origin_fetch module=offline status=error route={} error={}",
        route, message
    );
    Response::text(500, "Internal error")
}
