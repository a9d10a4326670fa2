use tracing::info;

use crate::state::AppState;

/// Ends whatever the connection was doing, then forgets the socket.
pub async fn handle_disconnect(connection_id: &str, state: &AppState) {
    info!("WebSocket connection disconnected: {}", connection_id);

    state.coordinator.disconnect(connection_id).await;
    state.hub.unregister(connection_id);
}
