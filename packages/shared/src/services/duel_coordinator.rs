use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    models::{
        duel::{NewDuel, SessionId},
        duel_session::{DuelOutcome, DuelSession},
        events::{DuelEvent, DuelUnavailable},
        player::{PlayerProfile, WaitingEntry},
    },
    repositories::duel_repository::DuelRepository,
    services::{
        background::BackgroundTasks, errors::question_service_errors::QuestionServiceError,
        notifier::DuelNotifier, question_service::QuestionService,
    },
};

pub const DEFAULT_QUESTIONS_PER_DUEL: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    pub questions_per_duel: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        CoordinatorSettings {
            questions_per_duel: DEFAULT_QUESTIONS_PER_DUEL,
        }
    }
}

/// Result of a join-queue request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    Waiting,
    Matched(String),
    Unavailable,
    AlreadyQueued,
    AlreadyInDuel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub session_id: String,
    pub question_id: String,
    pub answer_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorStats {
    pub waiting: usize,
    pub matching: usize,
    pub active_duels: usize,
}

#[derive(Default)]
struct CoordinatorState {
    waiting: VecDeque<WaitingEntry>,
    /// Connections popped from the queue whose duel is still being prepared.
    matching: HashSet<String>,
    sessions: HashMap<String, DuelSession>,
    /// Connection id -> key of the session it plays in.
    connections: HashMap<String, String>,
}

impl CoordinatorState {
    fn is_waiting(&self, connection_id: &str) -> bool {
        self.waiting
            .iter()
            .any(|entry| entry.connection_id == connection_id)
    }

    fn remove_waiting(&mut self, connection_id: &str) -> bool {
        let before = self.waiting.len();
        self.waiting
            .retain(|entry| entry.connection_id != connection_id);
        self.waiting.len() != before
    }

    fn remove_session(&mut self, key: &str) -> Option<DuelSession> {
        let session = self.sessions.remove(key)?;
        for connection_id in session.connection_ids() {
            self.connections.remove(connection_id);
        }
        Some(session)
    }
}

/// Owns the waiting queue and every running duel.
///
/// All state transitions happen under one lock. Persistence and question
/// lookups are awaited with the lock released; finalize and cancel writes run
/// as background tasks and never hold up the players.
pub struct DuelCoordinator {
    state: Mutex<CoordinatorState>,
    questions: QuestionService,
    duels: Arc<dyn DuelRepository + Send + Sync>,
    notifier: Arc<dyn DuelNotifier>,
    tasks: BackgroundTasks,
    settings: CoordinatorSettings,
}

impl DuelCoordinator {
    pub fn new(
        questions: QuestionService,
        duels: Arc<dyn DuelRepository + Send + Sync>,
        notifier: Arc<dyn DuelNotifier>,
        settings: CoordinatorSettings,
    ) -> Self {
        DuelCoordinator {
            state: Mutex::new(CoordinatorState::default()),
            questions,
            duels,
            notifier,
            tasks: BackgroundTasks::new(),
            settings,
        }
    }

    /// Queues the connection, or pairs it with the longest-waiting player.
    pub async fn join_queue(&self, connection_id: &str, profile: PlayerProfile) -> QueueStatus {
        let requester = WaitingEntry::new(connection_id, profile);

        let opponent = {
            let mut state = self.state.lock().await;
            if state.connections.contains_key(connection_id) {
                debug!("Connection {} is already in a duel", connection_id);
                return QueueStatus::AlreadyInDuel;
            }
            if state.matching.contains(connection_id) || state.is_waiting(connection_id) {
                debug!("Connection {} is already queued", connection_id);
                return QueueStatus::AlreadyQueued;
            }

            match state.waiting.pop_front() {
                Some(opponent) => {
                    state.matching.insert(opponent.connection_id.clone());
                    state.matching.insert(connection_id.to_string());
                    opponent
                }
                None => {
                    info!("Connection {} is waiting for an opponent", connection_id);
                    state.waiting.push_back(requester);
                    return QueueStatus::Waiting;
                }
            }
        };

        info!(
            "Matched {} with {} after {}s in queue, preparing duel",
            opponent.connection_id,
            requester.connection_id,
            (Utc::now() - opponent.joined_at).num_seconds()
        );
        self.start_duel(opponent, requester).await
    }

    /// Removes a waiting connection from the queue. Returns whether it was queued.
    pub async fn leave_queue(&self, connection_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.remove_waiting(connection_id);
        if removed {
            info!("Connection {} left the queue", connection_id);
        }
        removed
    }

    async fn start_duel(&self, opponent: WaitingEntry, requester: WaitingEntry) -> QueueStatus {
        let preferred_subject = requester
            .profile
            .preferred_subject_id
            .clone()
            .or_else(|| opponent.profile.preferred_subject_id.clone());

        let questions = match self
            .questions
            .select(self.settings.questions_per_duel, preferred_subject.as_deref())
            .await
        {
            Ok(selection) => {
                debug!(
                    "Serving {} questions from {:?} source",
                    selection.questions.len(),
                    selection.source
                );
                selection.questions
            }
            Err(e) => {
                warn!(
                    "Cannot start duel between {} and {}: {}",
                    opponent.connection_id, requester.connection_id, e
                );
                self.reject_match(&opponent, &requester, &e).await;
                return QueueStatus::Unavailable;
            }
        };

        let subject_id = questions
            .first()
            .and_then(|question| question.subject_id.clone())
            .or(preferred_subject);
        let wager = if requester.profile.wager > 0 {
            requester.profile.wager
        } else {
            opponent.profile.wager
        };

        let (session_id, participants_recorded) = self
            .open_duel(&opponent, &requester, subject_id.clone(), wager)
            .await;

        let mut session = DuelSession::new(
            session_id,
            opponent.into(),
            requester.into(),
            questions,
            subject_id,
        );
        session.participants_recorded = participants_recorded;
        let key = session.key().to_string();

        let abandoned: Vec<String> = {
            let mut state = self.state.lock().await;
            let abandoned = session
                .connection_ids()
                .into_iter()
                .filter(|connection_id| !state.matching.remove(*connection_id))
                .map(str::to_string)
                .collect();

            for connection_id in session.connection_ids() {
                state
                    .connections
                    .insert(connection_id.to_string(), key.clone());
                self.notifier.join_channel(&key, connection_id);
            }
            self.notifier
                .broadcast(&key, &DuelEvent::DuelFound(session.duel_found()));

            info!(
                "Duel {} started with {} questions on subject {}",
                key,
                session.questions.len(),
                session.subject_id.as_deref().unwrap_or("any")
            );
            state.sessions.insert(key.clone(), session);
            abandoned
        };

        // A player who left while the duel was being prepared forfeits it right away
        for connection_id in abandoned {
            self.disconnect(&connection_id).await;
        }

        QueueStatus::Matched(key)
    }

    async fn reject_match(
        &self,
        first: &WaitingEntry,
        second: &WaitingEntry,
        reason: &QuestionServiceError,
    ) {
        let mut state = self.state.lock().await;
        let event = DuelEvent::DuelUnavailable(DuelUnavailable {
            reason: reason.to_string(),
        });
        for connection_id in [&first.connection_id, &second.connection_id] {
            if state.matching.remove(connection_id.as_str()) {
                self.notifier.send(connection_id, &event);
            }
        }
    }

    /// Writes the duel and participant rows. Falls back to an in-memory session
    /// when the duel row cannot be written.
    async fn open_duel(
        &self,
        first: &WaitingEntry,
        second: &WaitingEntry,
        subject_id: Option<String>,
        wager: u32,
    ) -> (SessionId, bool) {
        let duel_id = match self
            .duels
            .create_duel(&NewDuel::classic(subject_id, wager))
            .await
        {
            Ok(duel_id) => duel_id,
            Err(e) => {
                warn!(
                    "Failed to persist duel for {} and {}, continuing in memory only: {}",
                    first.connection_id, second.connection_id, e
                );
                return (
                    SessionId::ephemeral(&first.connection_id, &second.connection_id),
                    false,
                );
            }
        };

        let recorded = match (
            first.profile.user_id.as_deref(),
            second.profile.user_id.as_deref(),
        ) {
            (Some(first_user), Some(second_user)) => match self
                .duels
                .create_participants(&duel_id, first_user, second_user)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    error!("Failed to record participants for duel {}: {}", duel_id, e);
                    false
                }
            },
            _ => {
                warn!(
                    "Duel {} has a player without a user id, skipping participant rows",
                    duel_id
                );
                false
            }
        };

        (SessionId::Persisted(duel_id), recorded)
    }

    /// Scores an answer for the current question of a duel.
    ///
    /// Stale or foreign submissions are ignored and return `false`.
    pub async fn submit_answer(&self, connection_id: &str, submission: AnswerSubmission) -> bool {
        let mut state = self.state.lock().await;
        let key = submission.session_id.as_str();

        let Some(session) = state.sessions.get_mut(key) else {
            debug!("Answer from {} for unknown duel {}", connection_id, key);
            return false;
        };
        let Some(result) = session.answer(
            connection_id,
            &submission.question_id,
            submission.answer_id.as_deref(),
        ) else {
            debug!(
                "Ignoring answer from {} for question {} in duel {}",
                connection_id, submission.question_id, key
            );
            return false;
        };

        self.notifier
            .broadcast(key, &DuelEvent::AnswerResult(result));

        if session.is_complete() {
            if let Some(session) = state.remove_session(key) {
                self.complete(session);
            }
        }
        true
    }

    fn complete(&self, session: DuelSession) {
        let key = session.key();
        let outcome = session.outcome();

        self.notifier
            .broadcast(key, &DuelEvent::DuelEnd(session.completed_event(&outcome)));
        self.notifier.close_channel(key);

        match &outcome {
            DuelOutcome::Winner(connection_id) => {
                info!(
                    "Duel {} finished after {}s, winner {}",
                    key,
                    session.elapsed_seconds(),
                    connection_id
                )
            }
            DuelOutcome::Tie => info!(
                "Duel {} finished in a tie after {}s",
                key,
                session.elapsed_seconds()
            ),
        }

        let Some(duel_id) = session.id.duel_id() else {
            return;
        };
        let duels = self.duels.clone();
        let duel_id = duel_id.to_string();
        let winner_user_id = session.winner_user_id(&outcome);
        let scores = if session.participants_recorded {
            session.participant_scores()
        } else {
            Vec::new()
        };

        self.tasks.spawn(async move {
            if let Err(e) = duels.finalize_duel(&duel_id, winner_user_id, scores).await {
                error!("Failed to finalize duel {}: {}", duel_id, e);
            }
        });
    }

    /// Handles a closed connection: leaves the queue, or forfeits the running duel.
    pub async fn disconnect(&self, connection_id: &str) {
        let mut state = self.state.lock().await;

        if state.remove_waiting(connection_id) {
            info!("Connection {} disconnected while waiting", connection_id);
            return;
        }
        if state.matching.remove(connection_id) {
            info!(
                "Connection {} disconnected while its duel was being prepared",
                connection_id
            );
            return;
        }

        let Some(key) = state.connections.get(connection_id).cloned() else {
            debug!("Connection {} had no queue entry or duel", connection_id);
            return;
        };
        let Some(session) = state.remove_session(&key) else {
            return;
        };

        self.notifier
            .broadcast(&key, &DuelEvent::DuelEnd(session.abandoned_event()));
        self.notifier.close_channel(&key);
        info!(
            "Duel {} cancelled after {}s, {} disconnected",
            key,
            session.elapsed_seconds(),
            connection_id
        );

        if let Some(duel_id) = session.id.duel_id() {
            let duels = self.duels.clone();
            let duel_id = duel_id.to_string();
            self.tasks.spawn(async move {
                if let Err(e) = duels.cancel_duel(&duel_id).await {
                    error!("Failed to cancel duel {}: {}", duel_id, e);
                }
            });
        }
    }

    pub async fn stats(&self) -> CoordinatorStats {
        let state = self.state.lock().await;
        CoordinatorStats {
            waiting: state.waiting.len(),
            matching: state.matching.len(),
            active_duels: state.sessions.len(),
        }
    }

    /// Waits for pending finalize and cancel writes.
    pub async fn flush_background_tasks(&self) {
        self.tasks.flush().await;
    }
}
