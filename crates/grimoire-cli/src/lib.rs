//! Grimoire: log replay tool.
//!
//! Loads a persisted game log, replays it from empty and reports the
//! projected state together with the log fingerprint.

pub mod config;
pub mod error;
pub mod replay;
