//! Structure resolver over the content tree.
//!
//! # Responsibility
//! - Flatten the tree into navigable leaves in document order.
//! - Resolve leaf lookups, prev/next adjacency and file → URL mapping.
//!
//! # Invariants
//! - Flatten order is depth-first: axis, chapter, section, subsection.
//! - A section with subsections is never itself a navigation item.
//! - Lookups match subsection presence exactly.

use crate::model::structure::{ContentTree, LeafKey, NavigationItem, SectionBody};
use std::collections::HashMap;

/// Neighbours of one item in flattened order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacent {
    pub prev: Option<NavigationItem>,
    pub next: Option<NavigationItem>,
}

/// Resolved navigation target of one content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub key: LeafKey,
    pub url: String,
    /// Position of the leaf in flattened order.
    pub position: usize,
}

/// Flattens the tree into leaves in depth-first document order.
pub fn flatten(tree: &ContentTree) -> Vec<NavigationItem> {
    let mut items = Vec::with_capacity(count_leaves(tree));

    for axis in &tree.axes {
        for chapter in &axis.chapters {
            for section in &chapter.sections {
                match &section.body {
                    SectionBody::Leaf { file } => items.push(NavigationItem {
                        axis_id: axis.id.clone(),
                        chapter_id: chapter.id.clone(),
                        section_id: section.id.clone(),
                        subsection_id: None,
                        axis_name: axis.name.clone(),
                        chapter_name: chapter.name.clone(),
                        section_name: section.name.clone(),
                        subsection_name: None,
                        file: file.clone(),
                    }),
                    SectionBody::WithSubsections(subsections) => {
                        for subsection in subsections {
                            items.push(NavigationItem {
                                axis_id: axis.id.clone(),
                                chapter_id: chapter.id.clone(),
                                section_id: section.id.clone(),
                                subsection_id: Some(subsection.id.clone()),
                                axis_name: axis.name.clone(),
                                chapter_name: chapter.name.clone(),
                                section_name: section.name.clone(),
                                subsection_name: Some(subsection.name.clone()),
                                file: subsection.file.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    items
}

/// Number of navigable leaves in the tree.
pub fn count_leaves(tree: &ContentTree) -> usize {
    tree.axes
        .iter()
        .flat_map(|axis| axis.chapters.iter())
        .flat_map(|chapter| chapter.sections.iter())
        .map(|section| section.leaf_count())
        .sum()
}

/// Finds the leaf identified by `key`.
///
/// Returns `None` when no leaf matches; a section-level key never matches a
/// subsection leaf and vice versa.
pub fn find(tree: &ContentTree, key: &LeafKey) -> Option<NavigationItem> {
    flatten(tree).into_iter().find(|item| item.matches(key))
}

/// Returns the flattened neighbours of `item`.
///
/// Both sides are `None` when `item` is not part of the tree.
pub fn adjacent(tree: &ContentTree, item: &NavigationItem) -> Adjacent {
    let items = flatten(tree);
    let key = item.key();
    let Some(index) = items.iter().position(|candidate| candidate.matches(&key)) else {
        return Adjacent::default();
    };

    Adjacent {
        prev: index
            .checked_sub(1)
            .and_then(|prev| items.get(prev))
            .cloned(),
        next: items.get(index + 1).cloned(),
    }
}

/// Maps every leaf body file to its navigation target.
pub fn file_url_map(tree: &ContentTree) -> HashMap<String, FileTarget> {
    flatten(tree)
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let key = item.key();
            let url = key.url_path();
            (
                item.file,
                FileTarget {
                    key,
                    url,
                    position,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{adjacent, count_leaves, file_url_map, find, flatten};
    use crate::model::structure::{
        Axis, Chapter, ContentTree, LeafKey, NavigationItem, Section, Subsection,
    };

    fn sample_tree() -> ContentTree {
        ContentTree {
            axes: vec![
                Axis {
                    id: "web".to_string(),
                    name: "Web".to_string(),
                    chapters: vec![Chapter {
                        id: "html".to_string(),
                        name: "HTML".to_string(),
                        sections: vec![
                            Section::leaf("intro", "Intro", "web/html/intro.md"),
                            Section::with_subsections(
                                "forms",
                                "Forms",
                                vec![
                                    Subsection {
                                        id: "inputs".to_string(),
                                        name: "Inputs".to_string(),
                                        file: "web/html/forms/inputs.md".to_string(),
                                    },
                                    Subsection {
                                        id: "labels".to_string(),
                                        name: "Labels".to_string(),
                                        file: "web/html/forms/labels.md".to_string(),
                                    },
                                ],
                            ),
                        ],
                    }],
                },
                Axis {
                    id: "db".to_string(),
                    name: "Databases".to_string(),
                    chapters: vec![Chapter {
                        id: "sql".to_string(),
                        name: "SQL".to_string(),
                        sections: vec![Section::leaf("select", "Select", "db/sql/select.md")],
                    }],
                },
            ],
        }
    }

    #[test]
    fn flatten_orders_leaves_depth_first() {
        let items = flatten(&sample_tree());
        let urls = items.iter().map(NavigationItem::url_path).collect::<Vec<_>>();
        assert_eq!(
            urls,
            vec![
                "/web/html/intro",
                "/web/html/forms/inputs",
                "/web/html/forms/labels",
                "/db/sql/select",
            ]
        );
        assert_eq!(items.len(), count_leaves(&sample_tree()));
    }

    #[test]
    fn flatten_of_empty_tree_is_empty() {
        assert!(flatten(&ContentTree::default()).is_empty());
        assert_eq!(count_leaves(&ContentTree::default()), 0);
    }

    #[test]
    fn find_requires_exact_subsection_presence() {
        let tree = sample_tree();
        assert!(find(&tree, &LeafKey::section("web", "html", "intro")).is_some());
        assert!(find(&tree, &LeafKey::section("web", "html", "forms")).is_none());
        assert!(find(&tree, &LeafKey::subsection("web", "html", "intro", "x")).is_none());

        let item = find(&tree, &LeafKey::subsection("web", "html", "forms", "labels")).unwrap();
        assert_eq!(item.subsection_name.as_deref(), Some("Labels"));
        assert_eq!(item.title(), "Labels");
    }

    #[test]
    fn adjacent_matches_flattened_neighbours() {
        let tree = sample_tree();
        let items = flatten(&tree);
        for (index, item) in items.iter().enumerate() {
            let found = find(&tree, &item.key()).unwrap();
            let around = adjacent(&tree, &found);
            assert_eq!(around.prev.as_ref(), index.checked_sub(1).and_then(|i| items.get(i)));
            assert_eq!(around.next.as_ref(), items.get(index + 1));
        }
    }

    #[test]
    fn adjacent_of_stale_item_is_empty() {
        let tree = sample_tree();
        let mut stale = flatten(&tree).remove(0);
        stale.section_id = "removed".to_string();
        let around = adjacent(&tree, &stale);
        assert!(around.prev.is_none());
        assert!(around.next.is_none());
    }

    #[test]
    fn file_url_map_resolves_every_leaf() {
        let map = file_url_map(&sample_tree());
        assert_eq!(map.len(), 4);
        let target = &map["web/html/forms/labels.md"];
        assert_eq!(target.url, "/web/html/forms/labels");
        assert_eq!(target.position, 2);
        assert!(!map.contains_key("web/html/forms.md"));
    }
}
