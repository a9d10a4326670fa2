pub mod duel;
pub mod duel_session;
pub mod events;
pub mod player;
pub mod question;
