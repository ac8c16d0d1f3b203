//! Effect and role definitions.

pub mod catalog;
pub mod effects;
pub mod readings;
pub mod roles;
