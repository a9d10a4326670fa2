use std::fmt;

use shared::models::events::DuelEvent;

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    InvalidNumber { key: String, value: String },
    InvalidAddress(String),
    UnknownStorageBackend(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{} must be a non-negative integer, got {:?}", key, value)
            }
            ConfigError::InvalidAddress(addr) => write!(f, "Invalid bind address: {}", addr),
            ConfigError::UnknownStorageBackend(backend) => {
                write!(f, "Unknown storage backend: {}", backend)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Problems with a frame received from a client. Reported back as an `error` event.
#[derive(Debug, PartialEq)]
pub enum ApiError {
    InvalidJson(String),
    InvalidMessage(String),
    UnsupportedFrame,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidJson(msg) => write!(f, "Invalid JSON: {}", msg),
            ApiError::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            ApiError::UnsupportedFrame => write!(f, "Only text frames are supported"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        if error.is_syntax() || error.is_eof() {
            ApiError::InvalidJson(error.to_string())
        } else {
            ApiError::InvalidMessage(error.to_string())
        }
    }
}

impl From<ApiError> for DuelEvent {
    fn from(error: ApiError) -> Self {
        DuelEvent::error(error.to_string())
    }
}
