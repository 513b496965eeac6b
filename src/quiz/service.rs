use tracing::{info, instrument, warn};

use crate::core::{LowLevelClient, QueryResolver};
use crate::error::{QueryResolverError, QuizError};

use super::grading::{aggregate, GradingRequest, GradingResponse};
use super::inflight::InFlight;
use super::model::{Question, QuizConfig, QuizResult, UserAnswer};
use super::normalizer::{normalize, Shuffler};
use super::request::{GenerationEnvelope, GenerationRequest};
use super::tutor::{TutorQuery, TUTOR_FALLBACK};

/// Remote half of the quiz lifecycle: generation, grading and tutor follow-ups.
///
/// Each call is sent once. A second generation or grading call made while the first is
/// still outstanding is refused with [`QuizError::RequestInFlight`]; tutor calls are
/// refused the same way per question id.
#[derive(Debug, Clone)]
pub struct QuizService<C: LowLevelClient> {
    resolver: QueryResolver<C>,
    generation: InFlight<()>,
    grading: InFlight<()>,
    tutor: InFlight<i64>,
}

impl<C: LowLevelClient> QuizService<C> {
    pub fn new(resolver: QueryResolver<C>) -> Self {
        Self {
            resolver,
            generation: InFlight::default(),
            grading: InFlight::default(),
            tutor: InFlight::default(),
        }
    }

    pub fn resolver(&self) -> &QueryResolver<C> {
        &self.resolver
    }

    /// Generate and normalize a question set for `config`.
    #[instrument(target = "quizsmith::service", skip_all, fields(documents = config.files.len(), count = config.question_count))]
    pub async fn generate(
        &self,
        config: &QuizConfig,
        shuffler: &mut (impl Shuffler + ?Sized),
    ) -> Result<Vec<Question>, QuizError> {
        let request = GenerationRequest::build(config)?;
        let _permit = self.generation.try_begin(()).ok_or(QuizError::RequestInFlight("generation"))?;

        let envelope = self
            .resolver
            .query_root::<GenerationEnvelope>(request.into_prompt())
            .await
            .map_err(|e| match e {
                QueryResolverError::Ai(e) => QuizError::Remote(e),
                other => QuizError::MalformedQuestionSet(other.to_string()),
            })?;

        let questions = normalize(envelope, shuffler)?;
        if questions.len() != config.question_count as usize {
            warn!(
                requested = config.question_count,
                received = questions.len(),
                "Question count differs from the request"
            );
        }
        info!(count = questions.len(), "Quiz generated");
        Ok(questions)
    }

    /// Grade finalized answers against the generated questions.
    #[instrument(target = "quizsmith::service", skip_all, fields(questions = questions.len()))]
    pub async fn grade(&self, questions: &[Question], answers: Vec<UserAnswer>) -> Result<QuizResult, QuizError> {
        let _permit = self.grading.try_begin(()).ok_or(QuizError::RequestInFlight("grading"))?;

        let prompt = GradingRequest::build(questions, answers.clone()).into_prompt()?;
        let response = self
            .resolver
            .query_root::<GradingResponse>(prompt)
            .await
            .map_err(|e| match e {
                QueryResolverError::Ai(e) => QuizError::Remote(e),
                other => QuizError::MalformedGrading(other.to_string()),
            })?;

        aggregate(questions, &answers, response)
    }

    /// Ask the tutor about one question. Remote failures degrade to [`TUTOR_FALLBACK`].
    #[instrument(target = "quizsmith::service", skip(self, query))]
    pub async fn ask_tutor(&self, question_id: i64, query: TutorQuery) -> Result<String, QuizError> {
        let _permit = self.tutor.try_begin(question_id).ok_or(QuizError::RequestInFlight("tutor"))?;

        match self.resolver.ask(query.into_prompt()).await {
            Ok(reply) => Ok(reply.trim().to_string()),
            Err(e) => {
                warn!(error = %e, "Tutor request failed");
                Ok(TUTOR_FALLBACK.to_string())
            }
        }
    }
}
