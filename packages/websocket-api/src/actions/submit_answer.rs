use shared::services::duel_coordinator::AnswerSubmission;
use tracing::debug;

use crate::state::AppState;

pub async fn handle_submit_answer(
    connection_id: &str,
    submission: AnswerSubmission,
    state: &AppState,
) {
    let session_id = submission.session_id.clone();
    if !state
        .coordinator
        .submit_answer(connection_id, submission)
        .await
    {
        debug!(
            "Answer from {} for {} was not applied",
            connection_id, session_id
        );
    }
}
