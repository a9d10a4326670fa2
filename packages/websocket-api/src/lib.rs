pub mod actions;
pub mod config;
pub mod error;
pub mod hub;
pub mod models;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use shared::repositories::duel_repository::{
    DuelRepository, DynamoDbDuelRepository, InMemoryDuelRepository,
};
use shared::repositories::question_repository::{
    DynamoDbQuestionRepository, QuestionRepository, StaticQuestionRepository,
};
use shared::services::duel_coordinator::{CoordinatorSettings, DuelCoordinator};
use shared::services::question_service::QuestionService;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use config::{ServerConfig, StorageBackend};
use hub::ConnectionHub;
use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::websocket::routes())
        .layer(cors)
        .with_state(state)
}

/// Wires repositories, the question service and the coordinator for the configured backend.
pub async fn build_state(config: &ServerConfig) -> AppState {
    let duels: Arc<dyn DuelRepository + Send + Sync>;
    let primary: Arc<dyn QuestionRepository + Send + Sync>;
    match config.storage {
        StorageBackend::DynamoDb => {
            let aws_config = aws_config::load_from_env().await;
            let client = aws_sdk_dynamodb::Client::new(&aws_config);
            duels = Arc::new(DynamoDbDuelRepository::new(
                client.clone(),
                &config.duels_table,
                &config.participants_table,
            ));
            primary = Arc::new(DynamoDbQuestionRepository::new(
                client,
                &config.questions_table,
            ));
        }
        StorageBackend::Memory => {
            info!("Using in-memory duel storage, results will not survive a restart");
            duels = Arc::new(InMemoryDuelRepository::new());
            primary = Arc::new(StaticQuestionRepository::default());
        }
    }

    let questions = QuestionService::new(primary, Arc::new(fallback_questions(config)))
        .with_min_questions(config.min_questions);

    let hub = Arc::new(ConnectionHub::new());
    let coordinator = Arc::new(DuelCoordinator::new(
        questions,
        duels,
        hub.clone(),
        CoordinatorSettings {
            questions_per_duel: config.questions_per_duel,
        },
    ));

    AppState { coordinator, hub }
}

/// An unreadable fallback set never stops the server; it only leaves duels
/// dependent on the question table.
pub fn fallback_questions(config: &ServerConfig) -> StaticQuestionRepository {
    let loaded = match &config.fallback_questions_path {
        Some(path) => StaticQuestionRepository::load(path),
        None => StaticQuestionRepository::bundled(),
    };

    match loaded {
        Ok(repository) => {
            info!("Loaded {} fallback questions", repository.len());
            repository
        }
        Err(e) => {
            warn!("Fallback questions unavailable: {}", e);
            StaticQuestionRepository::default()
        }
    }
}
