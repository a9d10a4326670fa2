use serde::Deserialize;
use serde_json::{Map, Value};

use shared::models::player::PlayerProfile;
use shared::services::duel_coordinator::AnswerSubmission;

use crate::error::ApiError;

const USER_ID_KEYS: [&str; 4] = ["userId", "user_id", "id", "id_usuario"];
const DISPLAY_NAME_KEYS: [&str; 3] = ["displayName", "name", "username"];
const SUBJECT_KEYS: [&str; 3] = ["preferredSubjectId", "subjectId", "subject_id"];
const WAGER_KEYS: [&str; 2] = ["wager", "bet"];

/// Frames a client may send, tagged by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinQueue {
        #[serde(default)]
        profile: RawProfile,
    },
    LeaveQueue,
    SubmitAnswer(RawAnswer),
    Ping,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ApiError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Identifier that clients send either as a string or as a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnswer {
    #[serde(alias = "session_id")]
    pub session_id: RawId,
    #[serde(alias = "question_id")]
    pub question_id: RawId,
    #[serde(default, alias = "answer_id")]
    pub answer_id: Option<RawId>,
}

impl From<RawAnswer> for AnswerSubmission {
    fn from(raw: RawAnswer) -> Self {
        AnswerSubmission {
            session_id: raw.session_id.into(),
            question_id: raw.question_id.into(),
            answer_id: raw
                .answer_id
                .map(String::from)
                .filter(|answer_id| !answer_id.is_empty()),
        }
    }
}

/// Profile object exactly as the client sent it.
///
/// Field names vary between clients, so the first present alias wins.
#[derive(Debug, Default, Deserialize)]
pub struct RawProfile(Map<String, Value>);

impl RawProfile {
    fn first(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find(|value| !value.is_null())
    }

    fn text(&self, keys: &[&str]) -> Option<String> {
        match self.first(keys)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    fn wager(&self) -> u32 {
        let amount = match self.first(&WAGER_KEYS) {
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64)),
            Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        amount
            .filter(|amount| *amount > 0)
            .map(|amount| u32::try_from(amount).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }
}

impl From<RawProfile> for PlayerProfile {
    fn from(raw: RawProfile) -> Self {
        let user_id = raw.text(&USER_ID_KEYS);
        let display_name = raw.text(&DISPLAY_NAME_KEYS).unwrap_or_default();
        let subject_id = raw.text(&SUBJECT_KEYS);

        PlayerProfile::new(user_id.as_deref(), &display_name)
            .with_subject(subject_id.as_deref())
            .with_wager(raw.wager())
    }
}
