//! Grimoire Core: shared abstractions.
//!
//! This crate defines the traits and types every component of the rules
//! engine depends on: time and randomness seams, identifiers, the domain
//! error type and the persistence boundary. It contains no game rules.

pub mod clock;
pub mod command;
pub mod error;
pub mod ids;
pub mod repository;
pub mod rng;
