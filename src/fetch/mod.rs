//! # Fetching Archived Snapshot Contents
//!
//! This module retrieves the archived body of a single snapshot from the archive's replay
//! endpoint (`{archive_base}/web/{timestamp}/{original_url}`) and rejects responses that
//! cannot be a real capture: a non-success status, or a body shorter than
//! [`MIN_BODY_CHARS`] characters. It also provides the randomized pacing used between
//! consecutive fetches.
//!
//! ## Submodules
//!
//! - **replay**: Replay URL construction and the validated fetch.
//! - **pacing**: Jittered delays between fetches.

mod pacing;
mod replay;

pub use pacing::Pacing;
pub use replay::{fetch_snapshot, replay_url, DEFAULT_ARCHIVE_BASE, MIN_BODY_CHARS};
