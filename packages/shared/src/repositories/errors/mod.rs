pub mod duel_repository_errors;
pub mod question_repository_errors;
