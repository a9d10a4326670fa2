use std::sync::Arc;

use shared::services::duel_coordinator::DuelCoordinator;

use crate::hub::ConnectionHub;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DuelCoordinator>,
    pub hub: Arc<ConnectionHub>,
}
