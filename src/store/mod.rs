//! Durable index of archive snapshots.
//!
//! This module defines the [`SnapshotStore`] trait the mirror reads and writes through,
//! and its PostgreSQL implementation. The index holds one row per `(timestamp, urlkey)`
//! pair: rows are created by the catalog sync, filled exactly once by the content fetcher,
//! and never deleted.
//!
//! ## Submodules
//!
//! - **postgres**: PostgreSQL-backed store and schema.
//! - **memory**: In-process store with the same semantics, used by tests.

#[cfg(test)]
pub(crate) mod memory;
mod postgres;

pub use postgres::PostgresStore;

use crate::catalog::Snapshot;
use anyhow::Result as AnyhowResult;
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Result of offering a descriptor to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same `(timestamp, urlkey)` already exists; nothing was written.
    AlreadyPresent,
}

/// A descriptor whose contents have not been fetched yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSnapshot {
    pub timestamp: String,
    pub original_url: String,
}

/// A fetched body, ready to be stored against its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContents {
    pub body: String,
    /// Hex-encoded SHA-256 of `body`.
    pub digest: String,
    pub fetched_at: NaiveDateTime,
}

#[async_trait]
pub trait SnapshotStore {
    /// Inserts a descriptor unless its `(timestamp, urlkey)` pair is already indexed.
    /// Existing rows are never modified.
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> AnyhowResult<InsertOutcome>;

    /// All descriptors whose contents are still null, in no particular order.
    async fn pending_snapshots(&self) -> AnyhowResult<Vec<PendingSnapshot>>;

    /// Stores contents for the row keyed by `(timestamp, original_url)` only if its contents
    /// are still null. Returns whether a row was updated.
    async fn store_contents(
        &self,
        timestamp: &str,
        original_url: &str,
        contents: &FetchedContents,
    ) -> AnyhowResult<bool>;

    async fn snapshot_count(&self) -> AnyhowResult<u64>;

    async fn pending_count(&self) -> AnyhowResult<u64>;
}
