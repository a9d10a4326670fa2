use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DISPLAY_NAME: &str = "Player";

/// Normalized view of whoever is behind a connection.
/// Built once at the transport boundary; the coordinator never looks at raw payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub user_id: Option<String>,
    pub display_name: String,
    pub preferred_subject_id: Option<String>,
    pub wager: u32,
}

impl PlayerProfile {
    pub fn new(user_id: Option<&str>, display_name: &str) -> Self {
        let display_name = display_name.trim();
        PlayerProfile {
            user_id: user_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            display_name: if display_name.is_empty() {
                DEFAULT_DISPLAY_NAME.to_string()
            } else {
                display_name.to_string()
            },
            preferred_subject_id: None,
            wager: 0,
        }
    }

    pub fn with_subject(mut self, subject_id: Option<&str>) -> Self {
        self.preferred_subject_id = subject_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_wager(mut self, wager: u32) -> Self {
        self.wager = wager;
        self
    }
}

/// A connection waiting in the matchmaking queue.
#[derive(Debug, Clone)]
pub struct WaitingEntry {
    pub connection_id: String,
    pub profile: PlayerProfile,
    pub joined_at: DateTime<Utc>,
}

impl WaitingEntry {
    pub fn new(connection_id: &str, profile: PlayerProfile) -> Self {
        WaitingEntry {
            connection_id: connection_id.to_string(),
            profile,
            joined_at: Utc::now(),
        }
    }
}

/// One side of an active duel.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub connection_id: String,
    pub profile: PlayerProfile,
}

impl Participant {
    pub fn user_id(&self) -> Option<&str> {
        self.profile.user_id.as_deref()
    }
}

impl From<WaitingEntry> for Participant {
    fn from(entry: WaitingEntry) -> Self {
        Participant {
            connection_id: entry.connection_id,
            profile: entry.profile,
        }
    }
}
