//! Snapshot Mirror Library
//!
//! This library indexes the web archive captures of a single document and
//! mirrors the captured contents into PostgreSQL, one snapshot at a time.

pub mod catalog;
pub mod error;
pub mod fetch;
pub mod mirror;
pub mod store;
pub mod utils;
