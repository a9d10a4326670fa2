use std::net::SocketAddr;
use std::path::PathBuf;

use shared::services::duel_coordinator::DEFAULT_QUESTIONS_PER_DUEL;
use tracing::Level;

use crate::error::ConfigError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    DynamoDb,
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    pub duels_table: String,
    pub participants_table: String,
    pub questions_table: String,
    /// When unset the question set bundled with the binary is used.
    pub fallback_questions_path: Option<PathBuf>,
    pub questions_per_duel: usize,
    pub min_questions: usize,
    pub log_level: Level,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let number = |key: &str| -> Result<Option<usize>, ConfigError> {
            var(key)
                .map(|value| {
                    value.parse::<usize>().map_err(|_| ConfigError::InvalidNumber {
                        key: key.to_string(),
                        value,
                    })
                })
                .transpose()
        };

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(bind_addr))?;

        let storage = match var("STORAGE_BACKEND").as_deref() {
            None | Some("dynamodb") => StorageBackend::DynamoDb,
            Some("memory") => StorageBackend::Memory,
            Some(other) => return Err(ConfigError::UnknownStorageBackend(other.to_string())),
        };

        let questions_per_duel = number("QUESTIONS_PER_DUEL")?
            .unwrap_or(DEFAULT_QUESTIONS_PER_DUEL)
            .max(1);
        let min_questions = number("MIN_QUESTIONS")?
            .unwrap_or(questions_per_duel)
            .max(1);

        // Unknown levels fall back to INFO rather than refusing to start
        let log_level = var("LOG_LEVEL")
            .and_then(|level| level.parse().ok())
            .unwrap_or(Level::INFO);

        Ok(ServerConfig {
            bind_addr,
            storage,
            duels_table: var("DUELS_TABLE").unwrap_or_else(|| "duels".to_string()),
            participants_table: var("DUEL_PARTICIPANTS_TABLE")
                .unwrap_or_else(|| "duel_participants".to_string()),
            questions_table: var("QUESTIONS_TABLE").unwrap_or_else(|| "questions".to_string()),
            fallback_questions_path: var("QUESTIONS_FALLBACK_PATH").map(PathBuf::from),
            questions_per_duel,
            min_questions,
            log_level,
        })
    }
}
