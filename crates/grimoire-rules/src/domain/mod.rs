//! Domain layer of the rules context.

pub mod catalog;
pub mod definitions;
pub mod errors;
pub mod intents;
pub mod perception;
pub mod pipeline;
