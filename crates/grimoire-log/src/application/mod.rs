//! Conversion between in-memory game logs and their stored form.

pub mod storage;
