use super::{FetchedContents, InsertOutcome, PendingSnapshot, SnapshotStore};
use crate::catalog::Snapshot;
use anyhow::Result as AnyhowResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct MemoryRow {
    pub original_url: String,
    pub cdx_raw: String,
    pub contents: Option<FetchedContents>,
}

/// Keyed by `(timestamp, urlkey)`, mirroring the unique constraint of the SQL schema.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    rows: Mutex<BTreeMap<(String, String), MemoryRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, timestamp: &str, url_key: &str) -> Option<MemoryRow> {
        self.rows
            .lock()
            .unwrap()
            .get(&(timestamp.to_string(), url_key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> AnyhowResult<InsertOutcome> {
        let mut rows = self.rows.lock().unwrap();
        let key = (snapshot.timestamp.clone(), snapshot.url_key.clone());
        if rows.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        rows.insert(
            key,
            MemoryRow {
                original_url: snapshot.original_url.clone(),
                cdx_raw: snapshot.raw_json(),
                contents: None,
            },
        );
        Ok(InsertOutcome::Inserted)
    }

    async fn pending_snapshots(&self) -> AnyhowResult<Vec<PendingSnapshot>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|(_, row)| row.contents.is_none())
            .map(|((timestamp, _), row)| PendingSnapshot {
                timestamp: timestamp.clone(),
                original_url: row.original_url.clone(),
            })
            .collect())
    }

    async fn store_contents(
        &self,
        timestamp: &str,
        original_url: &str,
        contents: &FetchedContents,
    ) -> AnyhowResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let mut updated = false;
        for ((row_timestamp, _), row) in rows.iter_mut() {
            if row_timestamp == timestamp && row.original_url == original_url && row.contents.is_none() {
                row.contents = Some(contents.clone());
                updated = true;
            }
        }
        Ok(updated)
    }

    async fn snapshot_count(&self) -> AnyhowResult<u64> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }

    async fn pending_count(&self) -> AnyhowResult<u64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.values().filter(|row| row.contents.is_none()).count() as u64)
    }
}
