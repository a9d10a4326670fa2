pub mod health;
pub mod websocket;
