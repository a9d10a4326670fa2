use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client;
use chrono::Utc;
use serde_dynamo::aws_sdk_dynamodb_1::to_item;
use tracing::debug;

use crate::models::duel::{DuelRecord, DuelStatus, NewDuel, ParticipantRecord, ParticipantScore};
use crate::repositories::errors::duel_repository_errors::DuelRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Durable storage for duel rows and their participant rows.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DuelRepository: Send + Sync {
    /// Writes a new duel row and returns its id.
    async fn create_duel(&self, duel: &NewDuel) -> Result<String, DuelRepositoryError>;

    async fn create_participants(
        &self,
        duel_id: &str,
        first_user_id: &str,
        second_user_id: &str,
    ) -> Result<(), DuelRepositoryError>;

    /// Marks the duel finished, records the winner and writes every participant score.
    async fn finalize_duel(
        &self,
        duel_id: &str,
        winner_user_id: Option<String>,
        scores: Vec<ParticipantScore>,
    ) -> Result<(), DuelRepositoryError>;

    /// Marks the duel cancelled. Does nothing if the duel already finished.
    async fn cancel_duel(&self, duel_id: &str) -> Result<(), DuelRepositoryError>;
}

pub struct DynamoDbDuelRepository {
    pub client: Client,
    pub duels_table: String,
    pub participants_table: String,
}

impl DynamoDbDuelRepository {
    pub fn new(client: Client, duels_table: &str, participants_table: &str) -> Self {
        Self {
            client,
            duels_table: duels_table.to_string(),
            participants_table: participants_table.to_string(),
        }
    }

    fn put_participant(
        &self,
        duel_id: &str,
        user_id: &str,
    ) -> Result<TransactWriteItem, DuelRepositoryError> {
        let record = ParticipantRecord::new(duel_id, user_id);
        let item =
            to_item(&record).map_err(|e| DuelRepositoryError::Serialization(e.to_string()))?;

        let put = Put::builder()
            .table_name(&self.participants_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(user_id)")
            .build()
            .map_err(|e| DuelRepositoryError::TransactionError(e.to_string()))?;

        Ok(TransactWriteItem::builder().put(put).build())
    }
}

#[async_trait]
impl DuelRepository for DynamoDbDuelRepository {
    async fn create_duel(&self, duel: &NewDuel) -> Result<String, DuelRepositoryError> {
        let record = DuelRecord::new(duel);
        let item =
            to_item(&record).map_err(|e| DuelRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.duels_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(duel_id)")
            .send()
            .await
            .map_err(|e| DuelRepositoryError::DynamoDb(e.to_string()))?;

        Ok(record.duel_id)
    }

    async fn create_participants(
        &self,
        duel_id: &str,
        first_user_id: &str,
        second_user_id: &str,
    ) -> Result<(), DuelRepositoryError> {
        let transaction_items = vec![
            self.put_participant(duel_id, first_user_id)?,
            self.put_participant(duel_id, second_user_id)?,
        ];

        self.client
            .transact_write_items()
            .set_transact_items(Some(transaction_items))
            .send()
            .await
            .map_err(|e| DuelRepositoryError::TransactionError(e.to_string()))?;

        Ok(())
    }

    async fn finalize_duel(
        &self,
        duel_id: &str,
        winner_user_id: Option<String>,
        scores: Vec<ParticipantScore>,
    ) -> Result<(), DuelRepositoryError> {
        let winner = match winner_user_id {
            Some(user_id) => AttributeValue::S(user_id),
            None => AttributeValue::Null(true),
        };

        let duel_update = Update::builder()
            .table_name(&self.duels_table)
            .key("duel_id", AttributeValue::S(duel_id.to_string()))
            .update_expression(
                "SET #status = :finished, winner_user_id = :winner, finished_at = :finished_at",
            )
            .condition_expression("attribute_exists(duel_id)")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(
                ":finished",
                AttributeValue::S(DuelStatus::Finished.as_str().to_string()),
            )
            .expression_attribute_values(":winner", winner)
            .expression_attribute_values(
                ":finished_at",
                AttributeValue::S(Utc::now().to_rfc3339()),
            )
            .build()
            .map_err(|e| DuelRepositoryError::TransactionError(e.to_string()))?;

        let mut transaction_items = vec![TransactWriteItem::builder().update(duel_update).build()];

        for participant in scores {
            let score_update = Update::builder()
                .table_name(&self.participants_table)
                .key("duel_id", AttributeValue::S(duel_id.to_string()))
                .key("user_id", AttributeValue::S(participant.user_id))
                .update_expression("SET score = :score")
                .condition_expression("attribute_exists(user_id)")
                .expression_attribute_values(
                    ":score",
                    AttributeValue::N(participant.score.to_string()),
                )
                .build()
                .map_err(|e| DuelRepositoryError::TransactionError(e.to_string()))?;

            transaction_items.push(TransactWriteItem::builder().update(score_update).build());
        }

        self.client
            .transact_write_items()
            .set_transact_items(Some(transaction_items))
            .send()
            .await
            .map_err(|e| DuelRepositoryError::TransactionError(e.to_string()))?;

        Ok(())
    }

    async fn cancel_duel(&self, duel_id: &str) -> Result<(), DuelRepositoryError> {
        let update_result = self
            .client
            .update_item()
            .table_name(&self.duels_table)
            .key("duel_id", AttributeValue::S(duel_id.to_string()))
            .update_expression("SET #status = :cancelled, finished_at = :finished_at")
            .condition_expression("attribute_exists(duel_id) AND #status <> :finished")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(
                ":cancelled",
                AttributeValue::S(DuelStatus::Cancelled.as_str().to_string()),
            )
            .expression_attribute_values(
                ":finished",
                AttributeValue::S(DuelStatus::Finished.as_str().to_string()),
            )
            .expression_attribute_values(
                ":finished_at",
                AttributeValue::S(Utc::now().to_rfc3339()),
            )
            .send()
            .await;

        match update_result {
            Ok(_) => Ok(()),
            Err(e) => {
                // Already finished (or never written): nothing to cancel
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        debug!("Duel {} not cancellable, leaving as is", duel_id);
                        return Ok(());
                    }
                }
                Err(DuelRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }
}

/// Process-local duel store for running the server without DynamoDB.
/// Applies the same status guards as the DynamoDB implementation.
#[derive(Default)]
pub struct InMemoryDuelRepository {
    duels: Mutex<HashMap<String, DuelRecord>>,
    participants: Mutex<HashMap<(String, String), ParticipantRecord>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryDuelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duel(&self, duel_id: &str) -> Option<DuelRecord> {
        lock(&self.duels).get(duel_id).cloned()
    }

    pub fn participant(&self, duel_id: &str, user_id: &str) -> Option<ParticipantRecord> {
        lock(&self.participants)
            .get(&(duel_id.to_string(), user_id.to_string()))
            .cloned()
    }

    pub fn duel_count(&self) -> usize {
        lock(&self.duels).len()
    }
}

#[async_trait]
impl DuelRepository for InMemoryDuelRepository {
    async fn create_duel(&self, duel: &NewDuel) -> Result<String, DuelRepositoryError> {
        let record = DuelRecord::new(duel);
        let duel_id = record.duel_id.clone();
        lock(&self.duels).insert(duel_id.clone(), record);
        Ok(duel_id)
    }

    async fn create_participants(
        &self,
        duel_id: &str,
        first_user_id: &str,
        second_user_id: &str,
    ) -> Result<(), DuelRepositoryError> {
        if !lock(&self.duels).contains_key(duel_id) {
            return Err(DuelRepositoryError::TransactionError(format!(
                "duel {} does not exist",
                duel_id
            )));
        }
        if first_user_id == second_user_id {
            return Err(DuelRepositoryError::TransactionError(format!(
                "duplicate participant {} in duel {}",
                first_user_id, duel_id
            )));
        }

        let mut participants = lock(&self.participants);
        for user_id in [first_user_id, second_user_id] {
            participants.insert(
                (duel_id.to_string(), user_id.to_string()),
                ParticipantRecord::new(duel_id, user_id),
            );
        }
        Ok(())
    }

    async fn finalize_duel(
        &self,
        duel_id: &str,
        winner_user_id: Option<String>,
        scores: Vec<ParticipantScore>,
    ) -> Result<(), DuelRepositoryError> {
        let mut duels = lock(&self.duels);
        let record = duels.get_mut(duel_id).ok_or_else(|| {
            DuelRepositoryError::TransactionError(format!("duel {} does not exist", duel_id))
        })?;

        let mut participants = lock(&self.participants);
        for participant in &scores {
            if !participants.contains_key(&(duel_id.to_string(), participant.user_id.clone())) {
                return Err(DuelRepositoryError::TransactionError(format!(
                    "participant {} missing from duel {}",
                    participant.user_id, duel_id
                )));
            }
        }
        for participant in scores {
            if let Some(row) = participants.get_mut(&(duel_id.to_string(), participant.user_id)) {
                row.score = participant.score;
            }
        }

        record.status = DuelStatus::Finished;
        record.winner_user_id = winner_user_id;
        record.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn cancel_duel(&self, duel_id: &str) -> Result<(), DuelRepositoryError> {
        let mut duels = lock(&self.duels);
        match duels.get_mut(duel_id) {
            Some(record) if record.status != DuelStatus::Finished => {
                record.status = DuelStatus::Cancelled;
                record.finished_at = Some(Utc::now());
            }
            _ => debug!("Duel {} not cancellable, leaving as is", duel_id),
        }
        Ok(())
    }
}
