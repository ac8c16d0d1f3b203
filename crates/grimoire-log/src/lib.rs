//! Grimoire: Event Log & State Projection.
//!
//! A game is an append-only list of history entries. The current
//! [`GameState`](domain::state::GameState) is never stored on its own: it is
//! the snapshot carried by the last entry, and replaying every entry's delta
//! from the initial state must reproduce each snapshot exactly.

pub mod application;
pub mod domain;
