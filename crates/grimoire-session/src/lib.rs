//! Grimoire: Session & Phases.
//!
//! Drives a game from setup through nights, days and votes to its end,
//! resolving every action through the rules crate and committing the results
//! to the game log.

pub mod application;
pub mod domain;
