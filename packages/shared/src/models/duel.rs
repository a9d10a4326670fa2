use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuelStatus {
    InProgress,
    Finished,
    Cancelled,
}

impl DuelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuelStatus::InProgress => "in-progress",
            DuelStatus::Finished => "finished",
            DuelStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuelType {
    Classic,
}

/// Parameters for a duel row about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDuel {
    pub duel_type: DuelType,
    pub subject_id: Option<String>,
    pub status: DuelStatus,
    pub wager: u32,
}

impl NewDuel {
    pub fn classic(subject_id: Option<String>, wager: u32) -> Self {
        NewDuel {
            duel_type: DuelType::Classic,
            subject_id,
            status: DuelStatus::InProgress,
            wager,
        }
    }
}

/// Duel row in the duels table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelRecord {
    pub duel_id: String,
    pub duel_type: DuelType,
    pub subject_id: Option<String>,
    pub status: DuelStatus,
    pub wager: u32,
    pub winner_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DuelRecord {
    pub fn new(duel: &NewDuel) -> Self {
        DuelRecord {
            duel_id: Uuid::new_v4().to_string(),
            duel_type: duel.duel_type,
            subject_id: duel.subject_id.clone(),
            status: duel.status,
            wager: duel.wager,
            winner_user_id: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Participant row, keyed by (duel_id, user_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub duel_id: String,
    pub user_id: String,
    pub score: u32,
    pub joined_at: DateTime<Utc>,
}

impl ParticipantRecord {
    pub fn new(duel_id: &str, user_id: &str) -> Self {
        ParticipantRecord {
            duel_id: duel_id.to_string(),
            user_id: user_id.to_string(),
            score: 0,
            joined_at: Utc::now(),
        }
    }
}

/// Final score of a participant that has a persisted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantScore {
    pub user_id: String,
    pub score: u32,
}

/// Identity of an in-memory duel.
///
/// `Persisted` sessions are backed by a duel row and get finalized or cancelled
/// in storage; `Ephemeral` sessions exist only in memory because the duel row
/// could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionId {
    Persisted(String),
    Ephemeral(String),
}

impl SessionId {
    pub fn ephemeral(first_connection: &str, second_connection: &str) -> Self {
        SessionId::Ephemeral(format!("local-{}-{}", first_connection, second_connection))
    }

    pub fn as_str(&self) -> &str {
        match self {
            SessionId::Persisted(id) | SessionId::Ephemeral(id) => id,
        }
    }

    pub fn duel_id(&self) -> Option<&str> {
        match self {
            SessionId::Persisted(id) => Some(id),
            SessionId::Ephemeral(_) => None,
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
