use shared::models::events::DuelEvent;
use shared::services::notifier::DuelNotifier;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

pub fn handle_ping(connection_id: &str, state: &AppState) {
    state.hub.send(connection_id, &DuelEvent::pong());
}

/// Reports a frame that could not be handled back to its sender only.
pub fn handle_invalid_message(connection_id: &str, error: ApiError, state: &AppState) {
    debug!("Rejecting frame from {}: {}", connection_id, error);
    state.hub.send(connection_id, &DuelEvent::from(error));
}
