//! Domain layer of the session context.

pub mod commands;
pub mod narrator;
pub mod night;
pub mod phases;
pub mod resolution;
pub mod setup;
pub mod victory;
pub mod voting;
