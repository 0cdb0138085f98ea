//! Glossary of technical terms.
//!
//! # Responsibility
//! - Load the `glossary.json` listing (`{ "terms": [...] }`).
//! - Filter terms by free text and category, then group them by initial.
//!
//! # Invariants
//! - Filtered terms are sorted by term, case-insensitively.
//! - [`ALL_CATEGORIES`] is always the first category and matches every term.
//! - Terms with a blank name are dropped at load time.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Category label that disables category filtering.
pub const ALL_CATEGORIES: &str = "Tous";

#[derive(Debug)]
pub enum GlossaryError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
}

impl Display for GlossaryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read glossary `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid glossary listing: {err}"),
        }
    }
}

impl Error for GlossaryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for GlossaryError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
    pub category: String,
}

/// Terms sharing one upper-cased initial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LetterGroup {
    pub letter: String,
    pub terms: Vec<GlossaryTerm>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glossary {
    pub terms: Vec<GlossaryTerm>,
}

impl Glossary {
    pub fn from_json(json: &str) -> Result<Self, GlossaryError> {
        let mut glossary: Self = serde_json::from_str(json)?;
        let before = glossary.terms.len();
        glossary.terms.retain(|term| !term.term.trim().is_empty());
        if glossary.terms.len() != before {
            warn!(
                "event=glossary_load module=glossary status=partial dropped={}",
                before - glossary.terms.len()
            );
        }
        Ok(glossary)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GlossaryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| GlossaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let glossary = Self::from_json(&json)?;
        debug!(
            "event=glossary_load module=glossary status=ok terms={}",
            glossary.terms.len()
        );
        Ok(glossary)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// [`ALL_CATEGORIES`] followed by every distinct category, sorted.
    pub fn categories(&self) -> Vec<String> {
        let distinct = self
            .terms
            .iter()
            .map(|term| term.category.as_str())
            .collect::<BTreeSet<_>>();
        std::iter::once(ALL_CATEGORIES)
            .chain(distinct)
            .map(str::to_string)
            .collect()
    }

    /// Terms whose name or definition contains `query` (case-insensitive)
    /// and whose category matches. `None` or [`ALL_CATEGORIES`] keeps all
    /// categories; an empty query keeps all terms.
    pub fn filter(&self, query: &str, category: Option<&str>) -> Vec<GlossaryTerm> {
        let needle = query.to_lowercase();
        let category = category.filter(|category| *category != ALL_CATEGORIES);

        let mut matches = self
            .terms
            .iter()
            .filter(|term| category.map_or(true, |category| term.category == category))
            .filter(|term| {
                term.term.to_lowercase().contains(&needle)
                    || term.definition.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| {
            a.term
                .to_lowercase()
                .cmp(&b.term.to_lowercase())
                .then_with(|| a.term.cmp(&b.term))
        });
        matches
    }
}

/// Groups already sorted terms by their upper-cased first character.
pub fn group_by_letter(terms: Vec<GlossaryTerm>) -> Vec<LetterGroup> {
    let mut groups = BTreeMap::<String, Vec<GlossaryTerm>>::new();
    for term in terms {
        let Some(first) = term.term.trim_start().chars().next() else {
            continue;
        };
        groups
            .entry(first.to_uppercase().collect())
            .or_default()
            .push(term);
    }
    groups
        .into_iter()
        .map(|(letter, terms)| LetterGroup { letter, terms })
        .collect()
}
