//! Grimoire: built-in content.
//!
//! A small catalog of effects and roles written against the rules crate's
//! extension points. Frontends build it once with [`standard_catalog`] and
//! pass it by reference.

pub mod domain;

pub use domain::catalog::standard_catalog;
