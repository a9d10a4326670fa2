pub mod duel_repository;
pub mod errors;
pub mod question_repository;
