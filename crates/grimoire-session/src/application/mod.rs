//! Application layer: command and query handlers over the game repository.

pub mod command_handlers;
pub mod query_handlers;
