use super::{FetchedContents, InsertOutcome, PendingSnapshot, SnapshotStore};
use crate::catalog::Snapshot;
use anyhow::{Context, Result as AnyhowResult};
use async_trait::async_trait;
use log::error;
use tokio_postgres::{Client, NoTls};

/// Snapshot index stored in the `archives` table of a PostgreSQL database.
///
/// Every statement runs on its own (autocommit), so each stored body is durable as soon as
/// `store_contents` returns and an interrupted run loses at most the fetch in flight.
pub struct PostgresStore {
  client: Client,
}

impl PostgresStore {
  /// Connects to PostgreSQL and makes sure the schema exists.
  ///
  /// # Arguments
  ///
  /// * `db_params` - PostgreSQL connection string (e.g., "host=localhost user=postgres dbname=snapshot_mirror").
  ///
  /// # Returns
  ///
  /// * `Ok(PostgresStore)` - Connected store with the `archives` table in place.
  /// * `Err(anyhow::Error)` - Connection or schema creation failed.
  ///
  /// # Examples
  ///
  /// ```rust,no_run
  /// use snapshot_mirror::store::{PostgresStore, SnapshotStore};
  ///
  /// #[tokio::main]
  /// async fn main() -> anyhow::Result<()> {
  ///     let store = PostgresStore::connect("host=localhost user=postgres dbname=snapshot_mirror").await?;
  ///     println!("{} snapshots still to fetch", store.pending_count().await?);
  ///     Ok(())
  /// }
  /// ```
  pub async fn connect(db_params: &str) -> AnyhowResult<Self> {
    let (client, connection) = tokio_postgres::connect(db_params, NoTls)
      .await
      .context("Failed to connect to PostgreSQL")?;
    tokio::spawn(async move {
      if let Err(e) = connection.await {
        error!("Database connection error: {}", e);
      }
    });

    let store = PostgresStore { client };
    store.create_tables().await.context("Failed to create tables")?;
    Ok(store)
  }

  /// Creates the `archives` table and its backlog index if they don't already exist.
  ///
  /// The `(timestamp, urlkey)` pair is unique; the partial index keeps the backlog scan
  /// cheap once most rows have been fetched.
  async fn create_tables(&self) -> AnyhowResult<()> {
    self
      .client
      .execute(
        "CREATE TABLE IF NOT EXISTS archives (
          urlkey TEXT NOT NULL,
          \"timestamp\" TEXT NOT NULL,
          original_url TEXT NOT NULL,
          cdx_raw TEXT NOT NULL,
          contents TEXT,
          contents_digest TEXT,
          fetched_at TIMESTAMP WITHOUT TIME ZONE,
          CONSTRAINT urlkey_timestamp UNIQUE (\"timestamp\", urlkey)
        )",
        &[],
      )
      .await
      .context("Failed to create archives table")?;

    self
      .client
      .execute(
        "CREATE INDEX IF NOT EXISTS archives_pending
        ON archives (\"timestamp\") WHERE contents IS NULL",
        &[],
      )
      .await
      .context("Failed to create pending index on archives")?;

    Ok(())
  }
}

#[async_trait]
impl SnapshotStore for PostgresStore {
  async fn insert_snapshot(&self, snapshot: &Snapshot) -> AnyhowResult<InsertOutcome> {
    let cdx_raw = snapshot.raw_json();
    let inserted = self
      .client
      .execute(
        "INSERT INTO archives (urlkey, \"timestamp\", original_url, cdx_raw)
        VALUES ($1, $2, $3, $4) ON CONFLICT ON CONSTRAINT urlkey_timestamp DO NOTHING",
        &[&snapshot.url_key, &snapshot.timestamp, &snapshot.original_url, &cdx_raw],
      )
      .await
      .context("Failed to insert into archives")?;

    Ok(if inserted == 0 {
      InsertOutcome::AlreadyPresent
    } else {
      InsertOutcome::Inserted
    })
  }

  async fn pending_snapshots(&self) -> AnyhowResult<Vec<PendingSnapshot>> {
    let rows = self
      .client
      .query(
        "SELECT \"timestamp\", original_url FROM archives WHERE contents IS NULL",
        &[],
      )
      .await
      .context("Failed to select pending snapshots")?;

    Ok(rows
      .iter()
      .map(|row| PendingSnapshot {
        timestamp: row.get(0),
        original_url: row.get(1),
      })
      .collect())
  }

  async fn store_contents(
    &self,
    timestamp: &str,
    original_url: &str,
    contents: &FetchedContents,
  ) -> AnyhowResult<bool> {
    let updated = self
      .client
      .execute(
        "UPDATE archives
        SET contents = $1, contents_digest = $2, fetched_at = $3
        WHERE \"timestamp\" = $4 AND original_url = $5 AND contents IS NULL",
        &[
          &contents.body,
          &contents.digest,
          &contents.fetched_at,
          &timestamp,
          &original_url,
        ],
      )
      .await
      .context("Failed to store snapshot contents")?;
    Ok(updated > 0)
  }

  async fn snapshot_count(&self) -> AnyhowResult<u64> {
    let row = self
      .client
      .query_one("SELECT COUNT(*) FROM archives", &[])
      .await
      .context("Failed to count snapshots")?;
    let count: i64 = row.get(0);
    Ok(count as u64)
  }

  async fn pending_count(&self) -> AnyhowResult<u64> {
    let row = self
      .client
      .query_one("SELECT COUNT(*) FROM archives WHERE contents IS NULL", &[])
      .await
      .context("Failed to count pending snapshots")?;
    let count: i64 = row.get(0);
    Ok(count as u64)
  }
}
