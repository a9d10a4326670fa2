use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use shared::models::duel::{DuelStatus, NewDuel, ParticipantScore};
use shared::models::events::{DuelEnd, DuelEvent, EndReason};
use shared::models::player::PlayerProfile;
use shared::models::question::{Question, QuestionOption};
use shared::repositories::duel_repository::{DuelRepository, InMemoryDuelRepository};
use shared::repositories::errors::duel_repository_errors::DuelRepositoryError;
use shared::repositories::errors::question_repository_errors::QuestionRepositoryError;
use shared::repositories::question_repository::{QuestionRepository, StaticQuestionRepository};
use shared::services::duel_coordinator::{
    AnswerSubmission, CoordinatorSettings, DuelCoordinator, QueueStatus,
};
use shared::services::notifier::DuelNotifier;
use shared::services::question_service::QuestionService;

/// Delivers events into per-connection inboxes, the way the socket hub does.
#[derive(Default)]
struct RecordingNotifier {
    channels: Mutex<HashMap<String, Vec<String>>>,
    inboxes: Mutex<HashMap<String, Vec<DuelEvent>>>,
}

impl RecordingNotifier {
    fn events(&self, connection_id: &str) -> Vec<DuelEvent> {
        self.inboxes
            .lock()
            .unwrap()
            .get(connection_id)
            .cloned()
            .unwrap_or_default()
    }

    fn count(&self, connection_id: &str, name: &str) -> usize {
        self.events(connection_id)
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }

    fn last_duel_end(&self, connection_id: &str) -> Option<DuelEnd> {
        self.events(connection_id)
            .into_iter()
            .rev()
            .find_map(|event| match event {
                DuelEvent::DuelEnd(end) => Some(end),
                _ => None,
            })
    }
}

impl DuelNotifier for RecordingNotifier {
    fn send(&self, connection_id: &str, event: &DuelEvent) {
        self.inboxes
            .lock()
            .unwrap()
            .entry(connection_id.to_string())
            .or_default()
            .push(event.clone());
    }

    fn join_channel(&self, channel: &str, connection_id: &str) {
        self.channels
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .push(connection_id.to_string());
    }

    fn broadcast(&self, channel: &str, event: &DuelEvent) {
        let members = self
            .channels
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .unwrap_or_default();
        for member in members {
            self.send(&member, event);
        }
    }

    fn close_channel(&self, channel: &str) {
        self.channels.lock().unwrap().remove(channel);
    }
}

struct UnavailableDuelRepository;

#[async_trait]
impl DuelRepository for UnavailableDuelRepository {
    async fn create_duel(&self, _duel: &NewDuel) -> Result<String, DuelRepositoryError> {
        Err(DuelRepositoryError::DynamoDb("table unavailable".to_string()))
    }

    async fn create_participants(
        &self,
        _duel_id: &str,
        _first_user_id: &str,
        _second_user_id: &str,
    ) -> Result<(), DuelRepositoryError> {
        panic!("participants must not be written without a duel row")
    }

    async fn finalize_duel(
        &self,
        _duel_id: &str,
        _winner_user_id: Option<String>,
        _scores: Vec<ParticipantScore>,
    ) -> Result<(), DuelRepositoryError> {
        panic!("in-memory duels must not be finalized")
    }

    async fn cancel_duel(&self, _duel_id: &str) -> Result<(), DuelRepositoryError> {
        panic!("in-memory duels must not be cancelled")
    }
}

/// Holds every fetch until released, so a test can act while a match is being prepared.
struct GatedQuestionRepository {
    entered: Notify,
    release: Notify,
    questions: Vec<Question>,
}

#[async_trait]
impl QuestionRepository for GatedQuestionRepository {
    async fn fetch_questions(
        &self,
        _subject_id: Option<String>,
    ) -> Result<Vec<Question>, QuestionRepositoryError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.questions.clone())
    }
}

fn question(id: &str) -> Question {
    Question {
        question_id: id.to_string(),
        subject_id: Some("math".to_string()),
        prompt: format!("Question {}", id),
        options: ["a", "b", "c", "d"]
            .iter()
            .map(|suffix| QuestionOption {
                option_id: format!("{}-{}", id, suffix),
                text: suffix.to_uppercase(),
                is_correct: *suffix == "a",
            })
            .collect(),
    }
}

fn question_set(count: usize) -> Vec<Question> {
    (1..=count).map(|n| question(&format!("q{}", n))).collect()
}

fn profile(user_id: &str, name: &str) -> PlayerProfile {
    PlayerProfile::new(Some(user_id), name)
}

struct Harness {
    coordinator: Arc<DuelCoordinator>,
    notifier: Arc<RecordingNotifier>,
    duels: Arc<InMemoryDuelRepository>,
}

fn harness_with(
    questions: Vec<Question>,
    fallback: Vec<Question>,
    questions_per_duel: usize,
) -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let duels = Arc::new(InMemoryDuelRepository::new());
    let service = QuestionService::new(
        Arc::new(StaticQuestionRepository::new(questions)),
        Arc::new(StaticQuestionRepository::new(fallback)),
    )
    .with_min_questions(questions_per_duel);
    let coordinator = DuelCoordinator::new(
        service,
        duels.clone(),
        notifier.clone(),
        CoordinatorSettings { questions_per_duel },
    );
    Harness {
        coordinator: Arc::new(coordinator),
        notifier,
        duels,
    }
}

fn harness() -> Harness {
    harness_with(question_set(5), Vec::new(), 5)
}

async fn start_duel(harness: &Harness) -> String {
    harness
        .coordinator
        .join_queue("a", profile("1", "Alice"))
        .await;
    match harness
        .coordinator
        .join_queue("b", profile("2", "Bob"))
        .await
    {
        QueueStatus::Matched(session_id) => session_id,
        other => panic!("expected a match, got {:?}", other),
    }
}

fn current_question(harness: &Harness, connection_id: &str, index: usize) -> Question {
    let found = harness
        .notifier
        .events(connection_id)
        .into_iter()
        .find_map(|event| match event {
            DuelEvent::DuelFound(found) => Some(found),
            _ => None,
        })
        .expect("duel_found delivered");
    question(&found.questions[index].id)
}

async fn answer(
    harness: &Harness,
    connection_id: &str,
    session_id: &str,
    index: usize,
    correct: bool,
) -> bool {
    let question = current_question(harness, connection_id, index);
    let suffix = if correct { "a" } else { "b" };
    harness
        .coordinator
        .submit_answer(
            connection_id,
            AnswerSubmission {
                session_id: session_id.to_string(),
                question_id: question.question_id.clone(),
                answer_id: Some(format!("{}-{}", question.question_id, suffix)),
            },
        )
        .await
}

#[tokio::test]
async fn test_first_two_players_are_paired_and_third_waits() {
    let harness = harness();

    let first = harness
        .coordinator
        .join_queue("a", profile("1", "Alice"))
        .await;
    let second = harness
        .coordinator
        .join_queue("b", profile("2", "Bob"))
        .await;
    let third = harness
        .coordinator
        .join_queue("c", profile("3", "Carol"))
        .await;

    assert_eq!(first, QueueStatus::Waiting);
    assert!(matches!(second, QueueStatus::Matched(_)));
    assert_eq!(third, QueueStatus::Waiting);
    assert_eq!(harness.notifier.count("a", "duel_found"), 1);
    assert_eq!(harness.notifier.count("b", "duel_found"), 1);
    assert!(harness.notifier.events("c").is_empty());

    let stats = harness.coordinator.stats().await;
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.active_duels, 1);
    assert_eq!(stats.matching, 0);
}

#[tokio::test]
async fn test_duel_found_hides_correct_answers() {
    let harness = harness();
    let session_id = start_duel(&harness).await;

    let event = harness.notifier.events("a").remove(0);
    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(json["event"], "duel_found");
    assert_eq!(json["data"]["sessionId"], session_id.as_str());
    assert_eq!(json["data"]["questions"].as_array().unwrap().len(), 5);
    assert!(!json.to_string().contains("is_correct"));
    assert_eq!(json["data"]["players"]["a"]["displayName"], "Alice");
}

#[tokio::test]
async fn test_full_duel_reports_every_answer_and_one_end() {
    let harness = harness();
    let session_id = start_duel(&harness).await;

    for index in 0..5 {
        let connection_id = if index % 2 == 0 { "a" } else { "b" };
        assert!(answer(&harness, connection_id, &session_id, index, true).await);
    }
    harness.coordinator.flush_background_tasks().await;

    for connection_id in ["a", "b"] {
        let names: Vec<&str> = harness
            .notifier
            .events(connection_id)
            .iter()
            .map(DuelEvent::name)
            .collect();
        assert_eq!(
            names,
            vec![
                "duel_found",
                "answer_result",
                "answer_result",
                "answer_result",
                "answer_result",
                "answer_result",
                "duel_end",
            ]
        );
    }

    let end = harness.notifier.last_duel_end("a").unwrap();
    assert_eq!(end.winner_id.as_deref(), Some("a"));
    assert!(!end.tie);
    assert_eq!(end.final_scores["a"], 3);
    assert_eq!(end.final_scores["b"], 2);
    assert_eq!(end.player_names["b"], "Bob");
    assert_eq!(end.reason, None);

    let duel = harness.duels.duel(&session_id).unwrap();
    assert_eq!(duel.status, DuelStatus::Finished);
    assert_eq!(duel.winner_user_id.as_deref(), Some("1"));
    assert!(duel.finished_at.is_some());
    assert_eq!(harness.duels.participant(&session_id, "1").unwrap().score, 3);
    assert_eq!(harness.duels.participant(&session_id, "2").unwrap().score, 2);
    assert_eq!(harness.coordinator.stats().await.active_duels, 0);
}

#[tokio::test]
async fn test_stale_answer_is_ignored() {
    let harness = harness();
    let session_id = start_duel(&harness).await;

    assert!(answer(&harness, "a", &session_id, 0, true).await);
    // Second answer to the same question arrives after the cursor moved on
    assert!(!answer(&harness, "b", &session_id, 0, false).await);

    assert_eq!(harness.notifier.count("b", "answer_result"), 1);
    let result = harness
        .notifier
        .events("b")
        .into_iter()
        .find_map(|event| match event {
            DuelEvent::AnswerResult(result) => Some(result),
            _ => None,
        })
        .unwrap();
    assert_eq!(result.correct_player_id.as_deref(), Some("a"));
    assert_eq!(result.scores["a"], 1);
    assert_eq!(result.scores["b"], 0);
}

#[tokio::test]
async fn test_answer_from_outsider_is_ignored() {
    let harness = harness();
    let session_id = start_duel(&harness).await;
    let question = current_question(&harness, "a", 0);

    let applied = harness
        .coordinator
        .submit_answer(
            "mallory",
            AnswerSubmission {
                session_id: session_id.clone(),
                question_id: question.question_id.clone(),
                answer_id: Some(format!("{}-a", question.question_id)),
            },
        )
        .await;

    assert!(!applied);
    assert_eq!(harness.notifier.count("a", "answer_result"), 0);
}

#[tokio::test]
async fn test_answer_for_unknown_session_is_ignored() {
    let harness = harness();
    start_duel(&harness).await;

    let applied = harness
        .coordinator
        .submit_answer(
            "a",
            AnswerSubmission {
                session_id: "no-such-duel".to_string(),
                question_id: "q1".to_string(),
                answer_id: None,
            },
        )
        .await;

    assert!(!applied);
}

#[tokio::test]
async fn test_missing_answer_counts_as_wrong_and_advances() {
    let harness = harness();
    let session_id = start_duel(&harness).await;
    let question = current_question(&harness, "a", 0);

    harness
        .coordinator
        .submit_answer(
            "a",
            AnswerSubmission {
                session_id: session_id.clone(),
                question_id: question.question_id.clone(),
                answer_id: None,
            },
        )
        .await;

    let result = harness
        .notifier
        .events("b")
        .into_iter()
        .find_map(|event| match event {
            DuelEvent::AnswerResult(result) => Some(result),
            _ => None,
        })
        .unwrap();
    assert_eq!(result.correct_player_id, None);
    assert_eq!(
        result.correct_answer_id,
        Some(format!("{}-a", question.question_id))
    );
    assert_eq!(result.scores["a"], 0);
    assert!(answer(&harness, "b", &session_id, 1, true).await);
}

#[tokio::test]
async fn test_tie_is_reported_without_winner() {
    let harness = harness_with(question_set(2), Vec::new(), 2);
    let session_id = start_duel(&harness).await;

    answer(&harness, "a", &session_id, 0, true).await;
    answer(&harness, "b", &session_id, 1, true).await;
    harness.coordinator.flush_background_tasks().await;

    let end = harness.notifier.last_duel_end("b").unwrap();
    assert!(end.tie);
    assert_eq!(end.winner_id, None);

    let duel = harness.duels.duel(&session_id).unwrap();
    assert_eq!(duel.status, DuelStatus::Finished);
    assert_eq!(duel.winner_user_id, None);
}

#[tokio::test]
async fn test_disconnect_mid_duel_cancels_it() {
    let harness = harness();
    let session_id = start_duel(&harness).await;

    answer(&harness, "a", &session_id, 0, true).await;
    answer(&harness, "b", &session_id, 1, false).await;
    harness.coordinator.disconnect("b").await;
    harness.coordinator.flush_background_tasks().await;

    let end = harness.notifier.last_duel_end("a").unwrap();
    assert_eq!(end.reason, Some(EndReason::Disconnect));
    assert_eq!(end.winner_id, None);
    assert_eq!(end.final_scores["a"], 1);

    let duel = harness.duels.duel(&session_id).unwrap();
    assert_eq!(duel.status, DuelStatus::Cancelled);
    assert_eq!(duel.winner_user_id, None);

    // The remaining player can no longer play the abandoned duel
    assert!(!answer(&harness, "a", &session_id, 2, true).await);
}

#[tokio::test]
async fn test_double_disconnect_ends_duel_once() {
    let harness = harness();
    start_duel(&harness).await;

    harness.coordinator.disconnect("a").await;
    harness.coordinator.disconnect("a").await;
    harness.coordinator.disconnect("b").await;
    harness.coordinator.flush_background_tasks().await;

    assert_eq!(harness.notifier.count("a", "duel_end"), 1);
    assert_eq!(harness.notifier.count("b", "duel_end"), 1);
    assert_eq!(harness.coordinator.stats().await.active_duels, 0);
}

#[tokio::test]
async fn test_disconnect_while_waiting_leaves_queue() {
    let harness = harness();

    harness
        .coordinator
        .join_queue("a", profile("1", "Alice"))
        .await;
    harness.coordinator.disconnect("a").await;
    let status = harness
        .coordinator
        .join_queue("b", profile("2", "Bob"))
        .await;

    assert_eq!(status, QueueStatus::Waiting);
    assert!(harness.notifier.events("a").is_empty());
}

#[tokio::test]
async fn test_player_in_duel_cannot_queue_again() {
    let harness = harness();
    start_duel(&harness).await;

    let status = harness
        .coordinator
        .join_queue("a", profile("1", "Alice"))
        .await;

    assert_eq!(status, QueueStatus::AlreadyInDuel);
    assert_eq!(harness.coordinator.stats().await.waiting, 0);
}

#[tokio::test]
async fn test_unpersisted_duel_runs_in_memory() {
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator = DuelCoordinator::new(
        QuestionService::new(
            Arc::new(StaticQuestionRepository::new(question_set(5))),
            Arc::new(StaticQuestionRepository::default()),
        ),
        Arc::new(UnavailableDuelRepository),
        notifier.clone(),
        CoordinatorSettings::default(),
    );
    let harness = Harness {
        coordinator: Arc::new(coordinator),
        notifier,
        duels: Arc::new(InMemoryDuelRepository::new()),
    };

    let session_id = start_duel(&harness).await;
    assert_eq!(session_id, "local-a-b");

    for index in 0..5 {
        answer(&harness, "a", &session_id, index, true).await;
    }
    harness.coordinator.flush_background_tasks().await;

    let end = harness.notifier.last_duel_end("b").unwrap();
    assert_eq!(end.winner_id.as_deref(), Some("a"));
    assert_eq!(end.final_scores["a"], 5);
}

#[tokio::test]
async fn test_fallback_questions_fill_the_duel() {
    let harness = harness_with(question_set(2), question_set(6), 5);

    let session_id = start_duel(&harness).await;

    let found = harness
        .notifier
        .events("a")
        .into_iter()
        .find_map(|event| match event {
            DuelEvent::DuelFound(found) => Some(found),
            _ => None,
        })
        .unwrap();
    assert_eq!(found.session_id, session_id);
    assert_eq!(found.questions.len(), 5);
}

#[tokio::test]
async fn test_no_questions_reports_unavailable() {
    let harness = harness_with(Vec::new(), Vec::new(), 5);

    harness
        .coordinator
        .join_queue("a", profile("1", "Alice"))
        .await;
    let status = harness
        .coordinator
        .join_queue("b", profile("2", "Bob"))
        .await;

    assert_eq!(status, QueueStatus::Unavailable);
    assert_eq!(harness.notifier.count("a", "duel_unavailable"), 1);
    assert_eq!(harness.notifier.count("b", "duel_unavailable"), 1);
    assert_eq!(harness.duels.duel_count(), 0);

    let stats = harness.coordinator.stats().await;
    assert_eq!(stats.waiting, 0);
    assert_eq!(stats.matching, 0);
    assert_eq!(stats.active_duels, 0);
}

#[tokio::test]
async fn test_disconnect_while_match_is_prepared_forfeits_duel() {
    let notifier = Arc::new(RecordingNotifier::default());
    let duels = Arc::new(InMemoryDuelRepository::new());
    let gate = Arc::new(GatedQuestionRepository {
        entered: Notify::new(),
        release: Notify::new(),
        questions: question_set(5),
    });
    let coordinator = Arc::new(DuelCoordinator::new(
        QuestionService::new(gate.clone(), Arc::new(StaticQuestionRepository::default())),
        duels.clone(),
        notifier.clone(),
        CoordinatorSettings::default(),
    ));

    coordinator.join_queue("a", profile("1", "Alice")).await;
    let pending = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.join_queue("b", profile("2", "Bob")).await })
    };
    gate.entered.notified().await;
    assert_eq!(coordinator.stats().await.matching, 2);

    coordinator.disconnect("a").await;
    gate.release.notify_one();
    let status = pending.await.unwrap();
    coordinator.flush_background_tasks().await;

    let QueueStatus::Matched(session_id) = status else {
        panic!("expected a match, got {:?}", status);
    };
    assert_eq!(notifier.count("b", "duel_found"), 1);
    let end = notifier.last_duel_end("b").unwrap();
    assert_eq!(end.reason, Some(EndReason::Disconnect));
    assert_eq!(duels.duel(&session_id).unwrap().status, DuelStatus::Cancelled);

    let stats = coordinator.stats().await;
    assert_eq!(stats.matching, 0);
    assert_eq!(stats.active_duels, 0);
}
