pub mod background;
pub mod duel_coordinator;
pub mod errors;
pub mod notifier;
pub mod question_service;
