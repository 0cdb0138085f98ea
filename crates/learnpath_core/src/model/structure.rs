//! Content tree model and structure listing loader.
//!
//! # Responsibility
//! - Deserialize the `structure.json` listing into a typed tree.
//! - Reject listings that break leaf identity invariants at load time.
//!
//! # Invariants
//! - `SectionBody` makes "leaf vs. subsections" an exhaustive variant.
//! - Every leaf `file` is unique across the tree.
//! - `id` values are unique within their parent scope.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Errors raised while loading or validating a structure listing.
#[derive(Debug)]
pub enum StructureError {
    /// Listing file cannot be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Listing is not valid JSON or does not match the tree shape.
    Json(serde_json::Error),
    /// Two leaves point at the same body file.
    DuplicateFile(String),
    /// Two siblings share one id.
    DuplicateId { scope: String, id: String },
    /// A node carries an empty id.
    EmptyId { scope: String },
}

impl Display for StructureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read structure `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid structure listing: {err}"),
            Self::DuplicateFile(file) => write!(f, "content file listed twice: `{file}`"),
            Self::DuplicateId { scope, id } => write!(f, "duplicate id `{id}` under `{scope}`"),
            Self::EmptyId { scope } => write!(f, "empty id under `{scope}`"),
        }
    }
}

impl Error for StructureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::DuplicateFile(_) => None,
            Self::DuplicateId { .. } => None,
            Self::EmptyId { .. } => None,
        }
    }
}

impl From<serde_json::Error> for StructureError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Root of the content hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTree {
    pub axes: Vec<Axis>,
}

/// Top-level subject area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

/// Subdivision of an axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// One section of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SectionRecord", into = "SectionRecord")]
pub struct Section {
    pub id: String,
    pub name: String,
    pub body: SectionBody,
}

/// Navigable shape of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    /// Section is itself a leaf with one body file.
    Leaf { file: String },
    /// Section fans out into subsections; the section is not navigable.
    WithSubsections(Vec<Subsection>),
}

/// Leaf below a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    pub id: String,
    pub name: String,
    pub file: String,
}

/// Wire shape of a section in the structure listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SectionRecord {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subsections: Option<Vec<Subsection>>,
}

impl TryFrom<SectionRecord> for Section {
    type Error = String;

    fn try_from(value: SectionRecord) -> Result<Self, Self::Error> {
        let body = match (value.subsections, value.file) {
            (Some(subsections), _) if !subsections.is_empty() => {
                SectionBody::WithSubsections(subsections)
            }
            (_, Some(file)) if !file.trim().is_empty() => SectionBody::Leaf { file },
            _ => {
                return Err(format!(
                    "section `{}` has neither a file nor subsections",
                    value.id
                ))
            }
        };

        Ok(Self {
            id: value.id,
            name: value.name,
            body,
        })
    }
}

impl From<Section> for SectionRecord {
    fn from(value: Section) -> Self {
        let (file, subsections) = match value.body {
            SectionBody::Leaf { file } => (Some(file), None),
            SectionBody::WithSubsections(subsections) => (None, Some(subsections)),
        };
        Self {
            id: value.id,
            name: value.name,
            file,
            subsections,
        }
    }
}

impl Section {
    /// Creates a leaf section.
    pub fn leaf(id: impl Into<String>, name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            body: SectionBody::Leaf { file: file.into() },
        }
    }

    /// Creates a section that fans out into subsections.
    pub fn with_subsections(
        id: impl Into<String>,
        name: impl Into<String>,
        subsections: Vec<Subsection>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            body: SectionBody::WithSubsections(subsections),
        }
    }

    /// Number of navigable leaves produced by this section.
    pub fn leaf_count(&self) -> usize {
        match &self.body {
            SectionBody::Leaf { .. } => 1,
            SectionBody::WithSubsections(subsections) => subsections.len(),
        }
    }
}

impl ContentTree {
    /// Parses and validates a structure listing.
    pub fn from_json(json: &str) -> Result<Self, StructureError> {
        let tree: ContentTree = serde_json::from_str(json)?;
        tree.validate()?;
        Ok(tree)
    }

    /// Reads, parses and validates a structure listing file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StructureError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| StructureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Serializes the tree back into the listing shape.
    pub fn to_json(&self) -> Result<String, StructureError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Checks id scoping and leaf file uniqueness.
    pub fn validate(&self) -> Result<(), StructureError> {
        let mut files = HashSet::new();
        ensure_unique_ids("structure", self.axes.iter().map(|axis| axis.id.as_str()))?;

        for axis in &self.axes {
            ensure_unique_ids(&axis.id, axis.chapters.iter().map(|c| c.id.as_str()))?;
            for chapter in &axis.chapters {
                let scope = format!("{}/{}", axis.id, chapter.id);
                ensure_unique_ids(&scope, chapter.sections.iter().map(|s| s.id.as_str()))?;
                for section in &chapter.sections {
                    match &section.body {
                        SectionBody::Leaf { file } => claim_file(&mut files, file)?,
                        SectionBody::WithSubsections(subsections) => {
                            let scope = format!("{scope}/{}", section.id);
                            ensure_unique_ids(&scope, subsections.iter().map(|s| s.id.as_str()))?;
                            for subsection in subsections {
                                claim_file(&mut files, &subsection.file)?;
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Looks up one axis by id.
    pub fn axis(&self, axis_id: &str) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.id == axis_id)
    }
}

fn ensure_unique_ids<'a>(
    scope: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), StructureError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(StructureError::EmptyId {
                scope: scope.to_string(),
            });
        }
        if !seen.insert(id) {
            return Err(StructureError::DuplicateId {
                scope: scope.to_string(),
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn claim_file<'a>(files: &mut HashSet<&'a str>, file: &'a str) -> Result<(), StructureError> {
    if !files.insert(file) {
        return Err(StructureError::DuplicateFile(file.to_string()));
    }
    Ok(())
}

/// Identity of one navigable leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafKey {
    pub axis_id: String,
    pub chapter_id: String,
    pub section_id: String,
    pub subsection_id: Option<String>,
}

impl LeafKey {
    /// Key for a section-level leaf.
    pub fn section(
        axis_id: impl Into<String>,
        chapter_id: impl Into<String>,
        section_id: impl Into<String>,
    ) -> Self {
        Self {
            axis_id: axis_id.into(),
            chapter_id: chapter_id.into(),
            section_id: section_id.into(),
            subsection_id: None,
        }
    }

    /// Key for a subsection leaf.
    pub fn subsection(
        axis_id: impl Into<String>,
        chapter_id: impl Into<String>,
        section_id: impl Into<String>,
        subsection_id: impl Into<String>,
    ) -> Self {
        Self {
            axis_id: axis_id.into(),
            chapter_id: chapter_id.into(),
            section_id: section_id.into(),
            subsection_id: Some(subsection_id.into()),
        }
    }

    /// Parses `/axis/chapter/section[/subsection]` (leading slash optional).
    pub fn parse_path(path: &str) -> Option<Self> {
        let parts = path
            .trim()
            .trim_matches('/')
            .split('/')
            .collect::<Vec<_>>();
        if parts.iter().any(|part| part.is_empty()) {
            return None;
        }
        match parts.as_slice() {
            [axis, chapter, section] => Some(Self::section(*axis, *chapter, *section)),
            [axis, chapter, section, subsection] => {
                Some(Self::subsection(*axis, *chapter, *section, *subsection))
            }
            _ => None,
        }
    }

    /// Persisted read-state key: `read_<axis>_<chapter>_<section>[_<sub>]`.
    pub fn read_key(&self) -> String {
        match &self.subsection_id {
            Some(sub) => format!(
                "read_{}_{}_{}_{}",
                self.axis_id, self.chapter_id, self.section_id, sub
            ),
            None => format!(
                "read_{}_{}_{}",
                self.axis_id, self.chapter_id, self.section_id
            ),
        }
    }

    /// Navigable URL path: `/<axis>/<chapter>/<section>[/<sub>]`.
    pub fn url_path(&self) -> String {
        match &self.subsection_id {
            Some(sub) => format!(
                "/{}/{}/{}/{}",
                self.axis_id, self.chapter_id, self.section_id, sub
            ),
            None => format!("/{}/{}/{}", self.axis_id, self.chapter_id, self.section_id),
        }
    }

    /// Section-granular path used by notes (`axis/chapter/section`).
    pub fn section_path(&self) -> String {
        format!("{}/{}/{}", self.axis_id, self.chapter_id, self.section_id)
    }
}

impl Display for LeafKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url_path())
    }
}

/// Flattened, displayable view of one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub axis_id: String,
    pub chapter_id: String,
    pub section_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection_id: Option<String>,
    pub axis_name: String,
    pub chapter_name: String,
    pub section_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection_name: Option<String>,
    pub file: String,
}

impl NavigationItem {
    /// Identity of this leaf.
    pub fn key(&self) -> LeafKey {
        LeafKey {
            axis_id: self.axis_id.clone(),
            chapter_id: self.chapter_id.clone(),
            section_id: self.section_id.clone(),
            subsection_id: self.subsection_id.clone(),
        }
    }

    /// Whether this item is identified by `key`.
    pub fn matches(&self, key: &LeafKey) -> bool {
        self.axis_id == key.axis_id
            && self.chapter_id == key.chapter_id
            && self.section_id == key.section_id
            && self.subsection_id == key.subsection_id
    }

    /// Most specific display label (subsection name when present).
    pub fn title(&self) -> &str {
        self.subsection_name
            .as_deref()
            .unwrap_or(self.section_name.as_str())
    }

    /// Navigable URL path of this leaf.
    pub fn url_path(&self) -> String {
        self.key().url_path()
    }
}
