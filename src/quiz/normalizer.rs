use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::error::QuizError;

use super::model::{Question, QuestionType};
use super::request::GenerationEnvelope;

/// Source of permutations for option lists and sequencing items.
pub trait Shuffler: Send {
    /// A permutation of `0..len`; element `i` is the source index placed at position `i`.
    fn permutation(&mut self, len: usize) -> Vec<usize>;
}

/// Reorder `items` with a permutation from `shuffler`.
///
/// Anything other than a permutation of `0..items.len()` leaves `items` in their
/// original order.
pub fn apply_permutation<T: Clone>(shuffler: &mut (impl Shuffler + ?Sized), items: &[T]) -> Vec<T> {
    let order = shuffler.permutation(items.len());
    if !is_permutation(&order, items.len()) {
        warn!(target: "quizsmith::normalizer", len = items.len(), "Shuffler returned an invalid permutation; keeping order");
        return items.to_vec();
    }
    order.into_iter().map(|i| items[i].clone()).collect()
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    let mut seen = vec![false; len];
    order.len() == len && order.iter().all(|&i| i < len && !std::mem::replace(&mut seen[i], true))
}

/// Uniform Fisher-Yates shuffling backed by a `rand` RNG.
#[derive(Debug, Clone)]
pub struct RandomShuffler {
    rng: StdRng,
}

impl RandomShuffler {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for RandomShuffler {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Shuffler for RandomShuffler {
    fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut self.rng);
        order
    }
}

/// Post-process a generated question set.
///
/// Rejects an empty set or a question missing a field its type requires. Duplicate or
/// non-positive ids are replaced by sequential ids. Multiple-choice options are shuffled;
/// `correct_answer` is left untouched.
pub fn normalize(envelope: GenerationEnvelope, shuffler: &mut (impl Shuffler + ?Sized)) -> Result<Vec<Question>, QuizError> {
    let mut questions = envelope.questions;
    if questions.is_empty() {
        return Err(QuizError::MalformedQuestionSet("the service returned no questions".to_string()));
    }

    for question in &questions {
        if let Some(field) = question.missing_field() {
            return Err(QuizError::MalformedQuestionSet(format!(
                "question {} ({}) is missing '{}'",
                question.id,
                question.question_type.tag(),
                field
            )));
        }
    }

    let mut seen = HashSet::new();
    let ids_valid = questions.iter().all(|q| q.id > 0 && seen.insert(q.id));
    if !ids_valid {
        warn!(target: "quizsmith::normalizer", "Generated ids are not unique; renumbering");
        for (index, question) in questions.iter_mut().enumerate() {
            question.id = index as i64 + 1;
        }
    }

    for question in questions.iter_mut().filter(|q| q.question_type == QuestionType::MultipleChoice) {
        if let Some(options) = question.options.as_mut() {
            *options = apply_permutation(&mut *shuffler, options.as_slice());
        }
    }

    info!(target: "quizsmith::normalizer", count = questions.len(), "Question set normalized");
    Ok(questions)
}
