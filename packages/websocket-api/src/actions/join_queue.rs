use shared::models::events::DuelEvent;
use shared::models::player::PlayerProfile;
use shared::services::duel_coordinator::QueueStatus;
use shared::services::notifier::DuelNotifier;
use tracing::{debug, info};

use crate::state::AppState;

pub async fn handle_join_queue(connection_id: &str, profile: PlayerProfile, state: &AppState) {
    info!(
        "Connection {} joining queue as {:?}",
        connection_id, profile.user_id
    );

    match state.coordinator.join_queue(connection_id, profile).await {
        QueueStatus::Waiting => debug!("Connection {} is waiting", connection_id),
        QueueStatus::Matched(session_id) => {
            debug!("Connection {} matched into {}", connection_id, session_id)
        }
        QueueStatus::Unavailable => {
            debug!("No duel could be prepared for {}", connection_id)
        }
        QueueStatus::AlreadyQueued => state.hub.send(
            connection_id,
            &DuelEvent::error("Already waiting for an opponent"),
        ),
        QueueStatus::AlreadyInDuel => state
            .hub
            .send(connection_id, &DuelEvent::error("Already in a duel")),
    }
}
