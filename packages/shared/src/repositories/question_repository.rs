use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::from_item;
use tracing::warn;

use crate::models::question::Question;
use crate::repositories::errors::question_repository_errors::QuestionRepositoryError;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Every stored question, optionally restricted to one subject.
    async fn fetch_questions(
        &self,
        subject_id: Option<String>,
    ) -> Result<Vec<Question>, QuestionRepositoryError>;
}

pub struct DynamoDbQuestionRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbQuestionRepository {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }
}

#[async_trait]
impl QuestionRepository for DynamoDbQuestionRepository {
    async fn fetch_questions(
        &self,
        subject_id: Option<String>,
    ) -> Result<Vec<Question>, QuestionRepositoryError> {
        let mut questions = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take());

            if let Some(subject_id) = &subject_id {
                request = request
                    .filter_expression("subject_id = :subject_id")
                    .expression_attribute_values(
                        ":subject_id",
                        AttributeValue::S(subject_id.clone()),
                    );
            }

            let scan_result = request
                .send()
                .await
                .map_err(|e| QuestionRepositoryError::DynamoDb(e.to_string()))?;

            if let Some(items) = scan_result.items {
                questions.extend(decode_questions(items));
            }

            match scan_result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(questions)
    }
}

/// Decodes scanned rows. Rows that do not form a question are skipped so one
/// bad row cannot push every duel onto the fallback set.
fn decode_questions(items: Vec<HashMap<String, AttributeValue>>) -> Vec<Question> {
    items
        .into_iter()
        .filter_map(|item| {
            let question_id = match item.get("question_id") {
                Some(AttributeValue::S(id)) => id.clone(),
                Some(AttributeValue::N(id)) => id.clone(),
                _ => "<missing>".to_string(),
            };
            let decoded: Result<Question, _> = from_item(item);
            match decoded {
                Ok(question) => Some(question),
                Err(e) => {
                    warn!("Skipping undecodable question row {}: {}", question_id, e);
                    None
                }
            }
        })
        .collect()
}

const BUNDLED_QUESTIONS: &str = include_str!("../../data/fallback_questions.json");

/// Fixed question list served when the question table cannot fill a duel.
#[derive(Debug, Clone, Default)]
pub struct StaticQuestionRepository {
    questions: Vec<Question>,
}

impl StaticQuestionRepository {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Reads a JSON array of questions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QuestionRepositoryError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QuestionRepositoryError::Io(format!("{}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// The question set shipped with the crate.
    pub fn bundled() -> Result<Self, QuestionRepositoryError> {
        Self::parse(BUNDLED_QUESTIONS)
    }

    fn parse(contents: &str) -> Result<Self, QuestionRepositoryError> {
        let questions: Vec<Question> = serde_json::from_str(contents)
            .map_err(|e| QuestionRepositoryError::Serialization(e.to_string()))?;
        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[async_trait]
impl QuestionRepository for StaticQuestionRepository {
    async fn fetch_questions(
        &self,
        subject_id: Option<String>,
    ) -> Result<Vec<Question>, QuestionRepositoryError> {
        Ok(self
            .questions
            .iter()
            .filter(|question| match &subject_id {
                Some(subject_id) => question.subject_id.as_ref() == Some(subject_id),
                None => true,
            })
            .cloned()
            .collect())
    }
}
