//! Ordered request → fetch policy table.

use super::http::{Method, Request};
use serde::Serialize;

/// How one request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPolicy {
    /// Straight to the network, no caching.
    Passthrough,
    /// Cached copy first, refreshed in the background.
    CacheFirst,
    /// Network first, cache as fallback.
    NetworkFirst,
}

impl FetchPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::CacheFirst => "cache_first",
            Self::NetworkFirst => "network_first",
        }
    }
}

/// Request matcher for one table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    /// Any method other than GET.
    NonGet,
    /// Path prefix, minus explicitly exempted paths.
    PathPrefix { prefix: String, except: Vec<String> },
    Any,
}

impl RouteMatch {
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            Self::NonGet => request.method != Method::Get,
            Self::PathPrefix { prefix, except } => {
                let path = request.path();
                path.starts_with(prefix.as_str()) && !except.iter().any(|exempt| exempt == path)
            }
            Self::Any => true,
        }
    }
}

/// First matching row wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    rules: Vec<(RouteMatch, FetchPolicy)>,
}

impl PolicyTable {
    pub fn new(rules: Vec<(RouteMatch, FetchPolicy)>) -> Self {
        Self { rules }
    }

    /// Portal routing: API passthrough except the structure listing,
    /// content cache-first, everything else network-first.
    pub fn portal_default(content_prefix: &str, structure_path: &str) -> Self {
        Self::new(vec![
            (RouteMatch::NonGet, FetchPolicy::Passthrough),
            (
                RouteMatch::PathPrefix {
                    prefix: "/api/".to_string(),
                    except: vec![structure_path.to_string()],
                },
                FetchPolicy::Passthrough,
            ),
            (
                RouteMatch::PathPrefix {
                    prefix: content_prefix.to_string(),
                    except: Vec::new(),
                },
                FetchPolicy::CacheFirst,
            ),
            (RouteMatch::Any, FetchPolicy::NetworkFirst),
        ])
    }

    /// Policy for one request. Falls back to passthrough if no row matches.
    pub fn policy_for(&self, request: &Request) -> FetchPolicy {
        self.rules
            .iter()
            .find(|(route, _)| route.matches(request))
            .map_or(FetchPolicy::Passthrough, |(_, policy)| *policy)
    }
}

#[cfg(test)]
mod tests {
    use super::{FetchPolicy, PolicyTable};
    use crate::offline::http::{Method, Request, RequestMode};

    #[test]
    fn portal_routing_order() {
        let table = PolicyTable::portal_default("/content/", "/api/structure");
        let cases = [
            (Request::new(Method::Post, "/content/a.md", RequestMode::Fetch), FetchPolicy::Passthrough),
            (Request::get("/api/search?q=css"), FetchPolicy::Passthrough),
            (Request::get("/api/structure"), FetchPolicy::NetworkFirst),
            (Request::get("/content/html/intro.md"), FetchPolicy::CacheFirst),
            (Request::navigate("/html/basics/tags"), FetchPolicy::NetworkFirst),
            (Request::get("/manifest.json"), FetchPolicy::NetworkFirst),
        ];
        for (request, expected) in cases {
            assert_eq!(table.policy_for(&request), expected, "{}", request.url);
        }
    }

    #[test]
    fn prefix_match_is_anchored() {
        let table = PolicyTable::portal_default("/content/", "/api/structure");
        let request = Request::get("/docs/content/a.md");
        assert_eq!(table.policy_for(&request), FetchPolicy::NetworkFirst);
    }

    #[test]
    fn empty_table_passes_through() {
        let table = PolicyTable::new(Vec::new());
        assert_eq!(table.policy_for(&Request::get("/")), FetchPolicy::Passthrough);
    }
}
