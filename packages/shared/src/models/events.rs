use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::player::PlayerProfile;
use crate::models::question::QuestionView;

/// Connection id -> score.
pub type ScoreBoard = BTreeMap<String, u32>;

/// Everything the server pushes down a connection.
/// Wire format: `{"event": "<snake_case name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DuelEvent {
    DuelFound(DuelFound),
    AnswerResult(AnswerResult),
    DuelEnd(DuelEnd),
    DuelUnavailable(DuelUnavailable),
    Pong(Pong),
    Error(ErrorMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelFound {
    pub session_id: String,
    pub players: BTreeMap<String, PlayerProfile>,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: String,
    pub correct_answer_id: Option<String>,
    pub correct_player_id: Option<String>,
    pub scores: ScoreBoard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelEnd {
    pub winner_id: Option<String>,
    pub tie: bool,
    pub final_scores: ScoreBoard,
    pub player_names: BTreeMap<String, String>,
    /// Null when the duel ran to completion.
    #[serde(default)]
    pub reason: Option<EndReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelUnavailable {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pong {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl DuelEvent {
    pub fn pong() -> Self {
        DuelEvent::Pong(Pong {
            timestamp: Utc::now(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        DuelEvent::Error(ErrorMessage {
            message: message.into(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            DuelEvent::DuelFound(_) => "duel_found",
            DuelEvent::AnswerResult(_) => "answer_result",
            DuelEvent::DuelEnd(_) => "duel_end",
            DuelEvent::DuelUnavailable(_) => "duel_unavailable",
            DuelEvent::Pong(_) => "pong",
            DuelEvent::Error(_) => "error",
        }
    }
}
