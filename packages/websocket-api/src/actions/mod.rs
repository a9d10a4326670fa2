pub mod default;
pub mod disconnect;
pub mod join_queue;
pub mod leave_queue;
pub mod submit_answer;

use crate::models::ClientMessage;
use crate::state::AppState;

/// Routes one parsed client frame to its handler.
pub async fn dispatch(connection_id: &str, message: ClientMessage, state: &AppState) {
    match message {
        ClientMessage::JoinQueue { profile } => {
            join_queue::handle_join_queue(connection_id, profile.into(), state).await
        }
        ClientMessage::LeaveQueue => leave_queue::handle_leave_queue(connection_id, state).await,
        ClientMessage::SubmitAnswer(answer) => {
            submit_answer::handle_submit_answer(connection_id, answer.into(), state).await
        }
        ClientMessage::Ping => default::handle_ping(connection_id, state),
    }
}
