//! Quiz micro-syntax parser.
//!
//! ```text
//! ::: quiz
//! Q: Which tag starts a paragraph?
//! - [x] <p>
//! - [ ] <div>
//! > `<p>` is the paragraph element.
//! :::
//! ```
//!
//! # Invariants
//! - Markdown parts and quiz parts keep source order.
//! - A quiz part is never empty.
//! - An unterminated block stays plain markdown.

use super::{QuizOption, QuizQuestion};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static QUIZ_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*:::[ \t]*quiz[ \t]*\n((?s:.*?))^[ \t]*:::[ \t]*$")
        .expect("valid quiz block regex")
});
static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^-\s*\[(x| )\]\s*(.+)$").expect("valid option regex"));

const QUESTION_MARKER: &str = "Q:";
const EXPLANATION_MARKER: char = '>';

/// One ordered part of a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DocumentPart {
    Markdown(String),
    Quiz(Vec<QuizQuestion>),
}

/// Document body split into markdown and quiz parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuizDocument {
    pub parts: Vec<DocumentPart>,
}

impl QuizDocument {
    /// Quizzes in source order.
    pub fn quizzes(&self) -> impl Iterator<Item = &[QuizQuestion]> {
        self.parts.iter().filter_map(|part| match part {
            DocumentPart::Quiz(questions) => Some(questions.as_slice()),
            DocumentPart::Markdown(_) => None,
        })
    }

    /// Markdown segments in source order.
    pub fn markdown_segments(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            DocumentPart::Markdown(text) => Some(text.as_str()),
            DocumentPart::Quiz(_) => None,
        })
    }

    pub fn quiz_count(&self) -> usize {
        self.quizzes().count()
    }
}

/// Splits a markdown body into markdown and quiz parts.
pub fn parse_document(markdown: &str) -> QuizDocument {
    let normalized = markdown.replace("\r\n", "\n");
    let mut parts = Vec::new();
    let mut last_index = 0;

    for caps in QUIZ_BLOCK_RE.captures_iter(&normalized) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        parts.push(DocumentPart::Markdown(
            normalized[last_index..whole.start()].to_string(),
        ));

        let questions = parse_quiz_block(body.as_str());
        if !questions.is_empty() {
            parts.push(DocumentPart::Quiz(questions));
        }
        last_index = whole.end();
    }

    parts.push(DocumentPart::Markdown(normalized[last_index..].to_string()));
    QuizDocument { parts }
}

/// Parses the inside of one quiz block.
pub fn parse_quiz_block(body: &str) -> Vec<QuizQuestion> {
    let mut questions = Vec::new();
    let mut current: Option<QuestionDraft> = None;

    for line in body.lines() {
        let line = line.trim();
        if let Some(prompt) = line.strip_prefix(QUESTION_MARKER) {
            if let Some(draft) = current.take() {
                questions.extend(draft.finish());
            }
            current = Some(QuestionDraft::new(prompt.trim()));
            continue;
        }

        let Some(draft) = current.as_mut() else {
            continue;
        };
        if let Some(caps) = OPTION_RE.captures(line) {
            draft.options.push(QuizOption {
                is_correct: caps[1].eq_ignore_ascii_case("x"),
                text: caps[2].trim().to_string(),
            });
        } else if let Some(explanation) = line.strip_prefix(EXPLANATION_MARKER) {
            draft.explanation = Some(explanation.trim().to_string());
        }
    }

    if let Some(draft) = current {
        questions.extend(draft.finish());
    }
    questions
}

struct QuestionDraft {
    prompt: String,
    options: Vec<QuizOption>,
    explanation: Option<String>,
}

impl QuestionDraft {
    fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            options: Vec::new(),
            explanation: None,
        }
    }

    fn finish(self) -> Option<QuizQuestion> {
        if self.prompt.is_empty() || self.options.is_empty() {
            return None;
        }
        Some(QuizQuestion {
            question: self.prompt,
            options: self.options,
            explanation: self.explanation.filter(|text| !text.is_empty()),
        })
    }
}
