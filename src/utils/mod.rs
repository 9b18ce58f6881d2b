//! # Utility Functions for the Snapshot Mirror
//!
//! This module provides general utility functions used throughout the application.
//!
//! ## Submodules
//!
//! - **digest**: Contains the SHA-256 digest recorded next to each fetched body.

mod digest;

pub use digest::compute_contents_digest;
