use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use tracing::{debug, error, info};

use crate::actions::{self, default::handle_invalid_message, disconnect::handle_disconnect};
use crate::error::ApiError;
use crate::models::ClientMessage;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(websocket_handler))
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one connection until either side closes it.
pub async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (connection_id, mut rx) = state.hub.register();
    info!("WebSocket connection established: {}", connection_id);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize {} event: {}", event.name(), e);
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!("Failed to write to {}, closing", connection_id);
                    break;
                }
            }
            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received message from connection {}: {}", connection_id, text.as_str());
                        match ClientMessage::parse(text.as_str()) {
                            Ok(message) => actions::dispatch(&connection_id, message, &state).await,
                            Err(e) => handle_invalid_message(&connection_id, e, &state),
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        handle_invalid_message(&connection_id, ApiError::UnsupportedFrame, &state)
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!("WebSocket error on {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    }

    handle_disconnect(&connection_id, &state).await;
}
