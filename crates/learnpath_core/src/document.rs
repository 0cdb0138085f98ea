//! Markdown document helpers used by search and section views.
//!
//! # Invariants
//! - Fenced code blocks never contribute headings or reading words.
//! - Heading anchors are deterministic for the same heading text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*$").expect("valid title regex"));
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]+(.+?)[ \t]*$").expect("valid heading regex"));
static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("valid code fence regex"));
static ANCHOR_STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid anchor strip regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static DASH_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid dash regex"));

const WORDS_PER_MINUTE: usize = 180;

/// One table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub anchor: String,
    pub text: String,
    pub level: u8,
}

/// Returns the first level-1 heading text.
pub fn extract_title(markdown: &str) -> Option<String> {
    TITLE_RE
        .captures(markdown)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Anchor id for one heading text.
pub fn heading_anchor(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = ANCHOR_STRIP_RE.replace_all(&lowered, "");
    let dashed = WHITESPACE_RE.replace_all(&stripped, "-");
    DASH_RUN_RE.replace_all(&dashed, "-").trim().to_string()
}

/// Level 2 and 3 headings outside fenced code.
pub fn table_of_contents(markdown: &str) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some(caps) = HEADING_RE.captures(line) else {
            continue;
        };
        let level = caps[1].len() as u8;
        if !(2..=3).contains(&level) {
            continue;
        }
        let text = caps[2].trim().to_string();
        entries.push(TocEntry {
            anchor: heading_anchor(&text),
            text,
            level,
        });
    }

    entries
}

/// Estimated reading time in whole minutes, at least 1.
pub fn reading_time_minutes(markdown: &str) -> usize {
    let prose = CODE_FENCE_RE.replace_all(markdown, "");
    let words = prose.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// Collapses whitespace runs (newlines included) to single spaces and trims.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        collapse_whitespace, extract_title, heading_anchor, reading_time_minutes,
        table_of_contents,
    };

    #[test]
    fn title_is_first_level_one_heading() {
        let doc = "intro text\n## Not this\n# Real Title \n# Second";
        assert_eq!(extract_title(doc).as_deref(), Some("Real Title"));
        assert_eq!(extract_title("## only h2"), None);
    }

    #[test]
    fn anchors_match_slug_rules() {
        assert_eq!(heading_anchor("Les Sélecteurs CSS"), "les-slecteurs-css");
        assert_eq!(heading_anchor("A  --  B"), "a-b");
    }

    #[test]
    fn toc_keeps_h2_h3_outside_code() {
        let doc = "# Title\n## First\n```\n## not heading\n```\n### Nested\n#### Deep";
        let toc = table_of_contents(doc);
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].anchor, "first");
        assert_eq!(toc[1].level, 3);
    }

    #[test]
    fn reading_time_ignores_code_and_has_floor() {
        assert_eq!(reading_time_minutes(""), 1);
        let words = "word ".repeat(181);
        assert_eq!(reading_time_minutes(&words), 2);
        let with_code = format!("```\n{}\n```\nshort", "code ".repeat(500));
        assert_eq!(reading_time_minutes(&with_code), 1);
    }

    #[test]
    fn collapses_newlines_and_runs() {
        assert_eq!(collapse_whitespace("  a\n\n b\t c "), "a b c");
    }
}
