//! Grimoire: Rules & Resolution.
//!
//! Responsible for the content catalog (effect and role definitions), for
//! computing what one player appears to be to another, and for resolving
//! proposed actions through the ordered chain of effect handlers.

pub mod domain;
