//! Embedded quiz support.
//!
//! # Responsibility
//! - Parse `:::quiz` blocks out of markdown bodies.
//! - Run one quiz as a linear select/validate/next state machine.
//!
//! # Invariants
//! - Parsing never fails a document; malformed questions are dropped.
//! - Shuffling works on a copy and keeps each option's correctness flag.

pub mod parser;
pub mod session;

use serde::{Deserialize, Serialize};

/// One answer option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub text: String,
    pub is_correct: bool,
}

/// One parsed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<QuizOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}
