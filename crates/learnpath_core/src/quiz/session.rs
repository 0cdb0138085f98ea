//! Linear quiz state machine.
//!
//! # Invariants
//! - Question and option order is fixed at construction; `reset` keeps it.
//! - A validated question never changes its selection.
//! - Moving between questions never erases answers.

use super::QuizQuestion;
use crate::state::read_state::percentage;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Session-level phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    Active,
    Completed,
    Reviewing,
}

/// Per-question phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPhase {
    Answering,
    Validated,
}

/// Result of one question as shown to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pending,
    Correct,
    Incorrect,
}

/// Closing message band for a finished quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    KeepPracticing,
}

impl Grade {
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            80.. => Self::Excellent,
            50..=79 => Self::Good,
            _ => Self::KeepPracticing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::KeepPracticing => "keep_practicing",
        }
    }
}

/// One run through a quiz.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    selections: Vec<Option<usize>>,
    validated: Vec<bool>,
    current: usize,
    phase: QuizPhase,
}

impl QuizSession {
    /// Starts a session with thread-local randomness.
    pub fn new(questions: &[QuizQuestion]) -> Self {
        Self::with_rng(questions, &mut rand::rng())
    }

    /// Starts a session shuffled by `rng`.
    ///
    /// Questions are shuffled once, then each question's options once.
    pub fn with_rng<R: Rng + ?Sized>(questions: &[QuizQuestion], rng: &mut R) -> Self {
        let mut questions = questions.to_vec();
        questions.shuffle(rng);
        for question in &mut questions {
            question.options.shuffle(rng);
        }
        Self::in_order(questions)
    }

    /// Starts a session keeping the given order.
    pub fn in_order(questions: Vec<QuizQuestion>) -> Self {
        let count = questions.len();
        Self {
            questions,
            selections: vec![None; count],
            validated: vec![false; count],
            current: 0,
            phase: if count == 0 {
                QuizPhase::Completed
            } else {
                QuizPhase::Active
            },
        }
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub fn question_phase(&self, index: usize) -> Option<QuestionPhase> {
        self.validated.get(index).map(|validated| {
            if *validated {
                QuestionPhase::Validated
            } else {
                QuestionPhase::Answering
            }
        })
    }

    pub fn selection(&self, index: usize) -> Option<usize> {
        self.selections.get(index).copied().flatten()
    }

    /// Selects an option on the current question.
    ///
    /// Returns `false` when the question is validated, the session is not
    /// active, or the index is out of range.
    pub fn select_option(&mut self, option: usize) -> bool {
        if self.phase != QuizPhase::Active || self.validated[self.current] {
            return false;
        }
        if option >= self.questions[self.current].options.len() {
            return false;
        }
        self.selections[self.current] = Some(option);
        true
    }

    /// Locks the current answer. No-op without a selection.
    pub fn validate(&mut self) -> bool {
        if self.phase != QuizPhase::Active
            || self.validated[self.current]
            || self.selections[self.current].is_none()
        {
            return false;
        }
        self.validated[self.current] = true;
        true
    }

    /// Moves forward from a validated question.
    ///
    /// Completes the quiz from the last question. While reviewing, moving past
    /// the last question returns to [`QuizPhase::Completed`].
    pub fn next(&mut self) -> bool {
        match self.phase {
            QuizPhase::Completed => false,
            QuizPhase::Active if !self.validated[self.current] => false,
            QuizPhase::Active | QuizPhase::Reviewing => {
                if self.current + 1 < self.questions.len() {
                    self.current += 1;
                } else {
                    self.phase = QuizPhase::Completed;
                }
                true
            }
        }
    }

    /// Moves the display back one question.
    pub fn previous(&mut self) -> bool {
        if self.phase == QuizPhase::Completed || self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Re-enters the question view of a completed quiz, answers kept.
    pub fn review(&mut self) -> bool {
        if self.phase != QuizPhase::Completed || self.questions.is_empty() {
            return false;
        }
        self.phase = QuizPhase::Reviewing;
        true
    }

    pub fn finish_review(&mut self) -> bool {
        if self.phase != QuizPhase::Reviewing {
            return false;
        }
        self.phase = QuizPhase::Completed;
        true
    }

    /// Clears answers and restarts with the same order.
    pub fn reset(&mut self) {
        self.selections.iter_mut().for_each(|selection| *selection = None);
        self.validated.iter_mut().for_each(|validated| *validated = false);
        self.current = 0;
        self.phase = if self.questions.is_empty() {
            QuizPhase::Completed
        } else {
            QuizPhase::Active
        };
    }

    /// Number of questions whose selected option is correct.
    pub fn score(&self) -> usize {
        (0..self.questions.len())
            .filter(|index| self.is_selection_correct(*index))
            .count()
    }

    pub fn percentage(&self) -> u8 {
        percentage(self.score(), self.questions.len())
    }

    pub fn grade(&self) -> Grade {
        Grade::from_percentage(self.percentage())
    }

    pub fn outcome(&self, index: usize) -> Outcome {
        if !self.validated.get(index).copied().unwrap_or(false) {
            return Outcome::Pending;
        }
        if self.is_selection_correct(index) {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }

    fn is_selection_correct(&self, index: usize) -> bool {
        let Some(question) = self.questions.get(index) else {
            return false;
        };
        self.selection(index)
            .and_then(|option| question.options.get(option))
            .is_some_and(|option| option.is_correct)
    }
}

#[cfg(test)]
mod tests {
    use super::{Grade, Outcome, QuizPhase, QuizSession};
    use crate::quiz::{QuizOption, QuizQuestion};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn question(prompt: &str, correct: usize, count: usize) -> QuizQuestion {
        QuizQuestion {
            question: prompt.to_string(),
            options: (0..count)
                .map(|index| QuizOption {
                    text: format!("{prompt}-{index}"),
                    is_correct: index == correct,
                })
                .collect(),
            explanation: None,
        }
    }

    fn correct_index(session: &QuizSession) -> usize {
        session
            .current_question()
            .unwrap()
            .options
            .iter()
            .position(|option| option.is_correct)
            .unwrap()
    }

    fn wrong_index(session: &QuizSession) -> usize {
        session
            .current_question()
            .unwrap()
            .options
            .iter()
            .position(|option| !option.is_correct)
            .unwrap()
    }

    fn two_questions() -> Vec<QuizQuestion> {
        vec![question("q1", 0, 3), question("q2", 2, 3)]
    }

    #[test]
    fn all_correct_scores_full() {
        let mut session = QuizSession::with_rng(&two_questions(), &mut StdRng::seed_from_u64(7));
        for _ in 0..2 {
            assert!(session.select_option(correct_index(&session)));
            assert!(session.validate());
            assert!(session.next());
        }
        assert_eq!(session.phase(), QuizPhase::Completed);
        assert_eq!(session.score(), 2);
        assert_eq!(session.percentage(), 100);
        assert_eq!(session.grade(), Grade::Excellent);
    }

    #[test]
    fn all_wrong_scores_zero() {
        let mut session = QuizSession::with_rng(&two_questions(), &mut StdRng::seed_from_u64(3));
        for _ in 0..2 {
            session.select_option(wrong_index(&session));
            session.validate();
            session.next();
        }
        assert_eq!(session.score(), 0);
        assert_eq!(session.grade(), Grade::KeepPracticing);
        assert_eq!(session.outcome(0), Outcome::Incorrect);
    }

    #[test]
    fn navigating_back_keeps_answers_and_score() {
        let mut session = QuizSession::in_order(two_questions());
        session.select_option(0);
        session.validate();
        session.next();
        session.select_option(1);
        session.validate();

        assert!(session.previous());
        assert_eq!(session.current_index(), 0);
        assert!(!session.select_option(2));
        assert_eq!(session.selection(0), Some(0));
        assert_eq!(session.outcome(0), Outcome::Correct);
        assert!(session.next());
        assert_eq!(session.selection(1), Some(1));
        assert_eq!(session.score(), 1);
        assert_eq!(session.percentage(), 50);
        assert_eq!(session.grade(), Grade::Good);
    }

    #[test]
    fn gates_on_selection_and_validation() {
        let mut session = QuizSession::in_order(two_questions());
        assert!(!session.validate());
        assert!(!session.next());
        assert!(!session.select_option(9));
        assert!(session.select_option(1));
        assert!(session.select_option(0));
        assert_eq!(session.selection(0), Some(0));
        assert_eq!(session.outcome(0), Outcome::Pending);
        assert!(session.validate());
        assert!(!session.validate());
    }

    #[test]
    fn shuffle_keeps_option_correctness_pairs() {
        let source = vec![question("a", 1, 4), question("b", 3, 4), question("c", 0, 2)];
        for seed in 0..20 {
            let session = QuizSession::with_rng(&source, &mut StdRng::seed_from_u64(seed));
            assert_eq!(session.len(), source.len());
            for shuffled in session.questions() {
                let original = source
                    .iter()
                    .find(|question| question.question == shuffled.question)
                    .unwrap();
                let mut expected = original.options.clone();
                let mut actual = shuffled.options.clone();
                expected.sort();
                actual.sort();
                assert_eq!(expected, actual);
            }
        }
        assert_eq!(source[0].options[1].text, "a-1");
    }

    #[test]
    fn review_and_reset() {
        let mut session = QuizSession::in_order(two_questions());
        for _ in 0..2 {
            session.select_option(0);
            session.validate();
            session.next();
        }
        assert!(session.review());
        assert_eq!(session.phase(), QuizPhase::Reviewing);
        assert!(!session.select_option(1));
        assert!(session.previous());
        assert!(session.next());
        assert!(session.next());
        assert_eq!(session.phase(), QuizPhase::Completed);
        assert_eq!(session.score(), 1);

        let order = session.questions().to_vec();
        session.reset();
        assert_eq!(session.phase(), QuizPhase::Active);
        assert_eq!(session.score(), 0);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.questions(), order.as_slice());
    }

    #[test]
    fn empty_quiz_starts_completed() {
        let mut session = QuizSession::new(&[]);
        assert_eq!(session.phase(), QuizPhase::Completed);
        assert!(!session.select_option(0));
        assert!(!session.review());
        assert_eq!(session.percentage(), 0);
    }
}
