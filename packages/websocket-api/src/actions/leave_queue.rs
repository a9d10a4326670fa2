use tracing::debug;

use crate::state::AppState;

pub async fn handle_leave_queue(connection_id: &str, state: &AppState) {
    if !state.coordinator.leave_queue(connection_id).await {
        debug!("Connection {} was not waiting", connection_id);
    }
}
