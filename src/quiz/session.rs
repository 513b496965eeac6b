//! Interactive answer capture for a generated quiz.
//!
//! A session is `Active(index)` until it is finalized by submitting the last question or
//! by the countdown reaching zero. Every input, including timer ticks, is applied through
//! [`QuizSession::apply`], so the timer always observes the live answer state.

use std::collections::HashMap;
use std::fmt;
use std::mem;

use tracing::{debug, info};

use crate::error::SessionError;

use super::encoder::{encode_matching, encode_sequence};
use super::model::{Question, QuestionType, UserAnswer};
use super::normalizer::{apply_permutation, Shuffler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active(usize),
    Finalized,
}

/// Input accepted by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Free-text answer for the active simple question.
    Answer(String),
    /// Choose option `n` (zero-based) of a multiple-choice or true/false question.
    Pick(usize),
    /// Swap the sequencing item at this position with its predecessor.
    MoveUp(usize),
    /// Swap the sequencing item at this position with its successor.
    MoveDown(usize),
    Match { left: String, right: String },
    /// Pair by zero-based position in the active question's left items and right choices.
    MatchAt { left: usize, right: usize },
    Next,
    Previous,
    /// One second of the countdown has elapsed.
    Tick,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Submitted,
    TimedOut,
}

/// The immutable answer set produced when a session is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalization {
    pub reason: FinishReason,
    /// One answer per question, in question order.
    pub answers: Vec<UserAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The input had no effect (boundary move, tick without a timer).
    Unchanged,
    /// Answer state of the active question changed.
    Updated,
    Moved { index: usize },
    Ticked { remaining: u64 },
    Finalized(Finalization),
}

/// Per-question state that only lives while the question is active.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Transient {
    None,
    Sequencing(Vec<String>),
    /// Left item → chosen right item, in insertion order.
    Matching(Vec<(String, String)>),
}

pub struct QuizSession {
    questions: Vec<Question>,
    state: SessionState,
    answers: HashMap<i64, String>,
    transient: Transient,
    remaining_seconds: Option<u64>,
    shuffler: Box<dyn Shuffler>,
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("questions", &self.questions.len())
            .field("state", &self.state)
            .field("answers", &self.answers)
            .field("transient", &self.transient)
            .field("remaining_seconds", &self.remaining_seconds)
            .finish()
    }
}

/// Read-only snapshot of the active question for rendering.
#[derive(Debug, Clone)]
pub struct QuestionView<'a> {
    pub index: usize,
    pub total: usize,
    pub question: &'a Question,
    /// Recorded answer for simple questions; the last committed encoding for structured ones.
    pub answer: Option<&'a str>,
    pub choices: Vec<String>,
    pub sequence: Option<&'a [String]>,
    pub selections: Option<&'a [(String, String)]>,
    pub right_choices: Vec<String>,
    pub remaining_seconds: Option<u64>,
}

impl QuizSession {
    /// Start a session at the first question. A zero time limit disables the countdown.
    pub fn new(questions: Vec<Question>, time_limit_minutes: u32, shuffler: Box<dyn Shuffler>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let remaining_seconds = (time_limit_minutes > 0).then(|| u64::from(time_limit_minutes) * 60);
        let mut session = Self {
            questions,
            state: SessionState::Active(0),
            answers: HashMap::new(),
            transient: Transient::None,
            remaining_seconds,
            shuffler,
        };
        session.enter(0);
        info!(
            target: "quizsmith::session",
            questions = session.questions.len(),
            time_limit_secs = ?session.remaining_seconds,
            "Quiz session started"
        );
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == SessionState::Finalized
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn has_timer(&self) -> bool {
        self.remaining_seconds.is_some()
    }

    pub fn remaining_seconds(&self) -> Option<u64> {
        self.remaining_seconds
    }

    fn active(&self) -> Result<usize, SessionError> {
        match self.state {
            SessionState::Active(index) => Ok(index),
            SessionState::Finalized => Err(SessionError::Finalized),
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.active().ok().map(|index| &self.questions[index])
    }

    pub fn view(&self) -> Option<QuestionView<'_>> {
        let index = self.active().ok()?;
        let question = &self.questions[index];
        let (sequence, selections) = match &self.transient {
            Transient::Sequencing(items) => (Some(items.as_slice()), None),
            Transient::Matching(pairs) => (None, Some(pairs.as_slice())),
            Transient::None => (None, None),
        };
        Some(QuestionView {
            index,
            total: self.questions.len(),
            question,
            answer: self.answers.get(&question.id).map(String::as_str),
            choices: question.choices(),
            sequence,
            selections,
            right_choices: question.right_choices(),
            remaining_seconds: self.remaining_seconds,
        })
    }

    /// Apply one input event.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Transition, SessionError> {
        debug!(target: "quizsmith::session", ?event, state = ?self.state, "Applying event");
        match event {
            SessionEvent::Answer(text) => self.record_answer(text),
            SessionEvent::Pick(option) => self.pick(option),
            SessionEvent::MoveUp(position) => self.move_up(position),
            SessionEvent::MoveDown(position) => self.move_down(position),
            SessionEvent::Match { left, right } => self.select_match(left, right),
            SessionEvent::MatchAt { left, right } => self.select_match_at(left, right),
            SessionEvent::Next => self.advance(),
            SessionEvent::Previous => self.retreat(),
            SessionEvent::Tick => self.tick(),
            SessionEvent::Timeout => self.timeout(),
        }
    }

    pub fn record_answer(&mut self, text: impl Into<String>) -> Result<Transition, SessionError> {
        let question = &self.questions[self.active()?];
        if question.question_type.is_structured() {
            return Err(SessionError::WrongInput(question.question_type.tag()));
        }
        self.answers.insert(question.id, text.into());
        Ok(Transition::Updated)
    }

    pub fn pick(&mut self, option: usize) -> Result<Transition, SessionError> {
        let question = &self.questions[self.active()?];
        if !matches!(question.question_type, QuestionType::MultipleChoice | QuestionType::TrueFalse) {
            return Err(SessionError::WrongInput(question.question_type.tag()));
        }
        let choices = question.choices();
        let choice = choices
            .get(option)
            .cloned()
            .ok_or(SessionError::OptionOutOfRange { index: option, len: choices.len() })?;
        self.answers.insert(question.id, choice);
        Ok(Transition::Updated)
    }

    fn sequence_mut(&mut self) -> Result<&mut Vec<String>, SessionError> {
        let index = self.active()?;
        match &mut self.transient {
            Transient::Sequencing(items) => Ok(items),
            _ => Err(SessionError::WrongInput(self.questions[index].question_type.tag())),
        }
    }

    pub fn move_up(&mut self, position: usize) -> Result<Transition, SessionError> {
        let items = self.sequence_mut()?;
        if position >= items.len() {
            return Err(SessionError::OptionOutOfRange { index: position, len: items.len() });
        }
        if position == 0 {
            return Ok(Transition::Unchanged);
        }
        items.swap(position, position - 1);
        Ok(Transition::Updated)
    }

    pub fn move_down(&mut self, position: usize) -> Result<Transition, SessionError> {
        let items = self.sequence_mut()?;
        if position >= items.len() {
            return Err(SessionError::OptionOutOfRange { index: position, len: items.len() });
        }
        if position + 1 == items.len() {
            return Ok(Transition::Unchanged);
        }
        items.swap(position, position + 1);
        Ok(Transition::Updated)
    }

    /// Choose `right` for `left`. The same right item may be chosen for several left items.
    pub fn select_match(&mut self, left: String, right: String) -> Result<Transition, SessionError> {
        let question = &self.questions[self.active()?];
        if question.question_type != QuestionType::Matching {
            return Err(SessionError::WrongInput(question.question_type.tag()));
        }
        if !question.left_items().contains(&left) {
            return Err(SessionError::UnknownItem(left));
        }
        if !question.right_choices().contains(&right) {
            return Err(SessionError::UnknownItem(right));
        }

        let Transient::Matching(selections) = &mut self.transient else {
            return Err(SessionError::WrongInput(QuestionType::Matching.tag()));
        };
        match selections.iter_mut().find(|(l, _)| *l == left) {
            Some(existing) => existing.1 = right,
            None => selections.push((left, right)),
        }
        Ok(Transition::Updated)
    }

    /// Like [`select_match`](Self::select_match), with positions resolved against the
    /// question that is active when the event is applied.
    pub fn select_match_at(&mut self, left: usize, right: usize) -> Result<Transition, SessionError> {
        let question = &self.questions[self.active()?];
        if question.question_type != QuestionType::Matching {
            return Err(SessionError::WrongInput(question.question_type.tag()));
        }
        let lefts = question.left_items();
        let rights = question.right_choices();
        let left_item = lefts
            .get(left)
            .cloned()
            .ok_or(SessionError::OptionOutOfRange { index: left, len: lefts.len() })?;
        let right_item = rights
            .get(right)
            .cloned()
            .ok_or(SessionError::OptionOutOfRange { index: right, len: rights.len() })?;
        self.select_match(left_item, right_item)
    }

    /// Commit the active question and move on, finalizing after the last question.
    pub fn advance(&mut self) -> Result<Transition, SessionError> {
        let index = self.active()?;
        self.commit(index);
        if index + 1 < self.questions.len() {
            self.enter(index + 1);
            Ok(Transition::Moved { index: index + 1 })
        } else {
            Ok(Transition::Finalized(self.finalize(FinishReason::Submitted)))
        }
    }

    /// Step back one question. Structured questions are re-initialized on entry rather
    /// than restored, and the question being left is not committed.
    pub fn retreat(&mut self) -> Result<Transition, SessionError> {
        let index = self.active()?;
        if index == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        self.enter(index - 1);
        Ok(Transition::Moved { index: index - 1 })
    }

    pub fn tick(&mut self) -> Result<Transition, SessionError> {
        self.active()?;
        let Some(remaining) = self.remaining_seconds.as_mut() else {
            return Ok(Transition::Unchanged);
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            return self.timeout();
        }
        Ok(Transition::Ticked { remaining: *remaining })
    }

    /// Finalize immediately, committing the in-progress structured answer first.
    pub fn timeout(&mut self) -> Result<Transition, SessionError> {
        let index = self.active()?;
        info!(target: "quizsmith::session", index, "Time limit reached");
        self.commit(index);
        Ok(Transition::Finalized(self.finalize(FinishReason::TimedOut)))
    }

    fn enter(&mut self, index: usize) {
        self.state = SessionState::Active(index);
        let question = &self.questions[index];
        self.transient = match question.question_type {
            QuestionType::Sequencing => {
                let items = question.sequencing_items.as_deref().unwrap_or_default();
                Transient::Sequencing(apply_permutation(self.shuffler.as_mut(), items))
            }
            QuestionType::Matching => Transient::Matching(Vec::new()),
            _ => Transient::None,
        };
    }

    fn commit(&mut self, index: usize) {
        let id = self.questions[index].id;
        let encoded = match &self.transient {
            Transient::Sequencing(items) => encode_sequence(items),
            Transient::Matching(selections) => encode_matching(selections),
            Transient::None => return,
        };
        debug!(target: "quizsmith::session", id, answer = %encoded, "Committed structured answer");
        self.answers.insert(id, encoded);
    }

    fn finalize(&mut self, reason: FinishReason) -> Finalization {
        self.state = SessionState::Finalized;
        self.remaining_seconds = None;
        self.transient = Transient::None;

        let mut recorded = mem::take(&mut self.answers);
        let answers: Vec<UserAnswer> = self
            .questions
            .iter()
            .map(|q| UserAnswer::new(q.id, recorded.remove(&q.id).unwrap_or_default()))
            .collect();

        info!(
            target: "quizsmith::session",
            ?reason,
            answered = answers.iter().filter(|a| !a.answer.is_empty()).count(),
            total = answers.len(),
            "Quiz session finalized"
        );
        Finalization { reason, answers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::model::MatchingPair;
    use crate::quiz::normalizer::tests::Reverse;

    fn question(id: i64, question_type: QuestionType) -> Question {
        let mut q = Question {
            id,
            question_type,
            text: format!("question {id}"),
            options: None,
            correct_answer: None,
            matching_pairs: None,
            sequencing_items: None,
        };
        match question_type {
            QuestionType::MultipleChoice => {
                q.options = Some(vec!["x".into(), "y".into(), "z".into()]);
                q.correct_answer = Some("y".into());
            }
            QuestionType::Sequencing => {
                q.sequencing_items = Some(vec!["a".into(), "b".into(), "c".into()]);
            }
            QuestionType::Matching => {
                q.matching_pairs = Some(vec![
                    MatchingPair { left: "Paris".into(), right: "France".into() },
                    MatchingPair { left: "Berlin".into(), right: "Germany".into() },
                ]);
            }
            _ => q.correct_answer = Some("answer".into()),
        }
        q
    }

    fn session(types: &[QuestionType], minutes: u32) -> QuizSession {
        let questions = types
            .iter()
            .enumerate()
            .map(|(i, t)| question(i as i64 + 1, *t))
            .collect();
        QuizSession::new(questions, minutes, Box::new(Reverse)).unwrap()
    }

    fn finalization(transition: Transition) -> Finalization {
        match transition {
            Transition::Finalized(f) => f,
            other => panic!("expected finalization, got {other:?}"),
        }
    }

    #[test]
    fn unvisited_questions_default_to_empty_answers() {
        let mut s = session(&[QuestionType::ShortAnswer, QuestionType::FillInBlank, QuestionType::TrueFalse], 0);
        s.record_answer("photosynthesis").unwrap();
        let f = finalization(s.timeout().unwrap());

        assert_eq!(f.reason, FinishReason::TimedOut);
        assert_eq!(f.answers.len(), 3);
        assert_eq!(f.answers[0], UserAnswer::new(1, "photosynthesis"));
        assert_eq!(f.answers[1], UserAnswer::new(2, ""));
        assert_eq!(f.answers[2], UserAnswer::new(3, ""));
        assert!(s.is_finalized());
    }

    #[test]
    fn advancing_past_the_last_question_submits() {
        let mut s = session(&[QuestionType::MultipleChoice, QuestionType::TrueFalse], 0);
        s.pick(2).unwrap();
        assert_eq!(s.advance().unwrap(), Transition::Moved { index: 1 });
        s.pick(1).unwrap();
        let f = finalization(s.advance().unwrap());

        assert_eq!(f.reason, FinishReason::Submitted);
        assert_eq!(f.answers[0].answer, "z");
        assert_eq!(f.answers[1].answer, "False");
        assert_eq!(s.advance(), Err(SessionError::Finalized));
        assert_eq!(s.tick(), Err(SessionError::Finalized));
    }

    #[test]
    fn sequencing_is_shuffled_on_entry_and_committed_on_advance() {
        let mut s = session(&[QuestionType::Sequencing, QuestionType::ShortAnswer], 0);
        assert_eq!(s.view().unwrap().sequence.unwrap(), ["c", "b", "a"]);

        assert_eq!(s.move_up(0).unwrap(), Transition::Unchanged);
        assert_eq!(s.move_down(2).unwrap(), Transition::Unchanged);
        s.move_down(0).unwrap();
        assert_eq!(s.view().unwrap().sequence.unwrap(), ["b", "c", "a"]);
        s.move_up(2).unwrap();
        assert_eq!(s.view().unwrap().sequence.unwrap(), ["b", "a", "c"]);
        assert!(s.move_up(3).is_err());

        s.advance().unwrap();
        let f = finalization(s.advance().unwrap());
        assert_eq!(f.answers[0].answer, "b || a || c");
    }

    #[test]
    fn matching_selections_overwrite_and_encode_in_insertion_order() {
        let mut s = session(&[QuestionType::Matching], 0);
        let view = s.view().unwrap();
        assert_eq!(view.right_choices, ["France", "Germany"]);
        assert!(view.selections.unwrap().is_empty());

        s.select_match("Paris".into(), "Germany".into()).unwrap();
        s.select_match("Berlin".into(), "Germany".into()).unwrap();
        s.select_match("Paris".into(), "France".into()).unwrap();
        assert!(matches!(
            s.select_match("Rome".into(), "Italy".into()),
            Err(SessionError::UnknownItem(_))
        ));

        let f = finalization(s.advance().unwrap());
        assert_eq!(f.answers[0].answer, "Paris -> France, Berlin -> Germany");
    }

    #[test]
    fn positional_matches_resolve_against_the_active_question() {
        let mut s = session(&[QuestionType::ShortAnswer, QuestionType::Matching], 0);
        assert_eq!(s.apply(SessionEvent::MatchAt { left: 0, right: 0 }), Err(SessionError::WrongInput("short-answer")));

        s.apply(SessionEvent::Next).unwrap();
        s.apply(SessionEvent::MatchAt { left: 1, right: 1 }).unwrap();
        s.apply(SessionEvent::MatchAt { left: 0, right: 1 }).unwrap();
        assert_eq!(
            s.apply(SessionEvent::MatchAt { left: 2, right: 0 }),
            Err(SessionError::OptionOutOfRange { index: 2, len: 2 })
        );

        let f = finalization(s.apply(SessionEvent::Next).unwrap());
        assert_eq!(f.answers[1].answer, "Berlin -> Germany, Paris -> Germany");
    }

    #[test]
    fn retreat_reinitializes_structured_state() {
        let mut s = session(&[QuestionType::Matching, QuestionType::ShortAnswer], 0);
        s.select_match("Paris".into(), "France".into()).unwrap();
        s.advance().unwrap();
        assert_eq!(s.view().unwrap().index, 1);

        s.retreat().unwrap();
        let view = s.view().unwrap();
        assert!(view.selections.unwrap().is_empty());
        // The earlier commit is still recorded until the question is left forward again.
        assert_eq!(view.answer, Some("Paris -> France"));

        s.advance().unwrap();
        let f = finalization(s.advance().unwrap());
        assert_eq!(f.answers[0].answer, "");
        assert_eq!(s.retreat(), Err(SessionError::Finalized));
    }

    #[test]
    fn retreat_from_the_first_question_is_refused() {
        let mut s = session(&[QuestionType::ShortAnswer], 0);
        assert_eq!(s.retreat(), Err(SessionError::AtFirstQuestion));
    }

    #[test]
    fn retreat_does_not_commit_the_question_being_left() {
        let mut s = session(&[QuestionType::ShortAnswer, QuestionType::Sequencing], 0);
        s.advance().unwrap();
        s.move_down(0).unwrap();
        s.retreat().unwrap();
        let f = finalization(s.timeout().unwrap());
        assert_eq!(f.answers[1].answer, "");
    }

    #[test]
    fn input_kind_must_match_question_type() {
        let mut s = session(&[QuestionType::Sequencing, QuestionType::ShortAnswer], 0);
        assert_eq!(s.record_answer("text"), Err(SessionError::WrongInput("sequencing")));
        assert_eq!(s.pick(0), Err(SessionError::WrongInput("sequencing")));
        s.advance().unwrap();
        assert_eq!(s.move_up(1), Err(SessionError::WrongInput("short-answer")));
        assert_eq!(s.pick(0), Err(SessionError::WrongInput("short-answer")));
    }

    #[test]
    fn countdown_times_out_once_and_commits_active_state() {
        let mut s = session(&[QuestionType::ShortAnswer, QuestionType::Sequencing, QuestionType::TrueFalse], 1);
        assert_eq!(s.remaining_seconds(), Some(60));
        s.record_answer("first").unwrap();
        s.advance().unwrap();

        for expected in (1..60).rev() {
            assert_eq!(s.apply(SessionEvent::Tick).unwrap(), Transition::Ticked { remaining: expected });
        }
        let f = finalization(s.apply(SessionEvent::Tick).unwrap());
        assert_eq!(f.reason, FinishReason::TimedOut);
        assert_eq!(f.answers.len(), 3);
        assert_eq!(f.answers[1].answer, "c || b || a");
        assert_eq!(f.answers[2].answer, "");

        assert_eq!(s.remaining_seconds(), None);
        assert_eq!(s.apply(SessionEvent::Tick), Err(SessionError::Finalized));
        assert_eq!(s.apply(SessionEvent::Timeout), Err(SessionError::Finalized));
    }

    #[test]
    fn ticks_without_a_timer_do_nothing() {
        let mut s = session(&[QuestionType::ShortAnswer], 0);
        assert!(!s.has_timer());
        assert_eq!(s.tick().unwrap(), Transition::Unchanged);
    }

    #[test]
    fn empty_question_list_is_rejected() {
        assert_eq!(QuizSession::new(vec![], 0, Box::new(Reverse)).unwrap_err(), SessionError::Empty);
    }
}
