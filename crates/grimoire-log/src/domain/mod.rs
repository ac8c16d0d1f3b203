//! Data model and projection rules for a game log.

pub mod changes;
pub mod effects;
pub mod game;
pub mod history;
pub mod message;
pub mod state;
