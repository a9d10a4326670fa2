use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::{
    models::question::Question, repositories::question_repository::QuestionRepository,
    services::errors::question_service_errors::QuestionServiceError,
};

/// Where a question set came from. Only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSource {
    Primary,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct QuestionSelection {
    pub questions: Vec<Question>,
    pub source: QuestionSource,
}

#[derive(Clone)]
pub struct QuestionService {
    primary: Arc<dyn QuestionRepository + Send + Sync>,
    fallback: Arc<dyn QuestionRepository + Send + Sync>,
    min_questions: usize,
}

impl QuestionService {
    pub fn new(
        primary: Arc<dyn QuestionRepository + Send + Sync>,
        fallback: Arc<dyn QuestionRepository + Send + Sync>,
    ) -> Self {
        QuestionService {
            primary,
            fallback,
            min_questions: 1,
        }
    }

    /// Minimum number of playable questions the primary store must return
    /// before the fallback set is used instead.
    pub fn with_min_questions(mut self, min_questions: usize) -> Self {
        self.min_questions = min_questions.max(1);
        self
    }

    /// Picks up to `count` distinct questions in random order.
    pub async fn select(
        &self,
        count: usize,
        subject_id: Option<&str>,
    ) -> Result<QuestionSelection, QuestionServiceError> {
        let subject = subject_id.map(str::to_string);
        let threshold = self.min_questions.min(count).max(1);

        match self.primary.fetch_questions(subject.clone()).await {
            Ok(questions) => {
                let questions = playable(questions);
                if questions.len() >= threshold {
                    return Ok(QuestionSelection {
                        questions: pick_random(questions, count),
                        source: QuestionSource::Primary,
                    });
                }
                debug!(
                    "Question store returned {} playable questions for subject {:?}, need {}",
                    questions.len(),
                    subject,
                    threshold
                );
            }
            Err(e) => {
                warn!("Failed to fetch questions for subject {:?}: {}", subject, e);
            }
        }

        let questions = self.fallback_questions(count, subject.clone()).await;
        if questions.is_empty() {
            return Err(QuestionServiceError::NoQuestionsAvailable(subject));
        }

        Ok(QuestionSelection {
            questions: pick_random(questions, count),
            source: QuestionSource::Fallback,
        })
    }

    async fn fallback_questions(&self, count: usize, subject: Option<String>) -> Vec<Question> {
        let filtered_by_subject = subject.is_some();
        let questions = match self.fallback.fetch_questions(subject).await {
            Ok(questions) => playable(questions),
            Err(e) => {
                warn!("Fallback question set unavailable: {}", e);
                return Vec::new();
            }
        };

        if !filtered_by_subject || questions.len() >= count {
            return questions;
        }

        // Too few for this subject; a full duel on mixed subjects beats a short one
        match self.fallback.fetch_questions(None).await {
            Ok(all) => {
                let all = playable(all);
                if all.len() > questions.len() {
                    all
                } else {
                    questions
                }
            }
            Err(e) => {
                warn!("Fallback question set unavailable: {}", e);
                questions
            }
        }
    }
}

/// Drops malformed questions and duplicate ids, keeping first occurrences.
fn playable(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|question| question.is_playable())
        .filter(|question| seen.insert(question.question_id.clone()))
        .collect()
}

fn pick_random(mut questions: Vec<Question>, count: usize) -> Vec<Question> {
    let mut rng = rand::thread_rng();
    questions.shuffle(&mut rng);
    questions.truncate(count);
    questions
}
