//! Snapshot Mirror: Index and Fetch Web Archive Captures into PostgreSQL
//!
//! This application keeps a local copy of every archived capture of a single document
//! (by default the IANA registrar ID registry). It asks the archive's CDX catalog which
//! captures exist, records them in a PostgreSQL table, and then fetches the archived body
//! of each capture that has not been fetched yet.
//!
//! ## Design Overview
//! - **Catalog**: Lists captures of the source URL via the `catalog` module.
//! - **Fetching**: Retrieves archived bodies from the replay endpoint via the `fetch` module.
//! - **Storing**: Keeps descriptors and bodies in PostgreSQL via the `store` module.
//! - **Mirroring**: Sequences the steps above via the `mirror` module.
//!
//! ## Usage
//! 1. Ensure a PostgreSQL database is running (e.g., database `snapshot_mirror`, user `postgres`).
//! 2. Configure the application using either a `.env` file or command-line arguments:
//!    ```env
//!    SOURCE_URL=https://www.iana.org/assignments/registrar-ids/registrar-ids.xml
//!    DB_PARAMS=host=localhost user=postgres dbname=snapshot_mirror
//!    ```
//! 3. Refresh the index and fetch the backlog:
//!    ```sh
//!    cargo run -- --sync
//!    ```
//! 4. Later runs can skip the catalog and only drain what is left:
//!    ```sh
//!    cargo run
//!    ```
//! 5. Logs are controlled by the `RUST_LOG` environment variable:
//!    ```sh
//!    RUST_LOG=info cargo run
//!    ```

use anyhow::{Context, Result as AnyhowResult};
use clap::{Parser, ValueEnum};
use log::info;
use snapshot_mirror::fetch::{Pacing, DEFAULT_ARCHIVE_BASE};
use snapshot_mirror::mirror::{run, FailurePolicy, MirrorConfig};
use snapshot_mirror::store::PostgresStore;
use std::time::Duration;

/// Command-line names for [`FailurePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnFetchError {
  /// Stop at the first snapshot that cannot be fetched
  Abort,
  /// Log the failure and continue with the next snapshot
  Skip,
}

impl From<OnFetchError> for FailurePolicy {
  fn from(value: OnFetchError) -> Self {
    match value {
      OnFetchError::Abort => FailurePolicy::Abort,
      OnFetchError::Skip => FailurePolicy::Skip,
    }
  }
}

/// Command-line arguments for configuring the snapshot mirror.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
  /// URL of the document whose archived captures are mirrored.
  #[clap(
    long,
    env = "SOURCE_URL",
    default_value = "https://www.iana.org/assignments/registrar-ids/registrar-ids.xml"
  )]
  source_url: String,

  /// Base URL of the web archive (e.g., "https://web.archive.org").
  #[clap(long, env = "ARCHIVE_BASE", default_value = DEFAULT_ARCHIVE_BASE)]
  archive_base: String,

  /// PostgreSQL connection string (e.g., "host=localhost user=postgres password=your_password dbname=snapshot_mirror").
  #[clap(long, env = "DB_PARAMS", default_value = "host=localhost user=postgres dbname=snapshot_mirror")]
  db_params: String,

  /// Refresh the index from the archive catalog before fetching
  #[clap(long, overrides_with = "no_sync")]
  sync: bool,

  /// Only fetch snapshots already in the index (default)
  #[clap(long, overrides_with = "sync")]
  no_sync: bool,

  /// Lower bound, in seconds, of the random pause between fetches.
  #[clap(long, env = "MIN_DELAY_SECS", default_value_t = 0.0)]
  min_delay_secs: f64,

  /// Upper bound, in seconds, of the random pause between fetches.
  #[clap(long, env = "MAX_DELAY_SECS", default_value_t = 5.0)]
  max_delay_secs: f64,

  /// What to do when a snapshot cannot be fetched.
  #[clap(long, env = "ON_FETCH_ERROR", value_enum, default_value_t = OnFetchError::Abort)]
  on_fetch_error: OnFetchError,

  /// Extra attempts per snapshot after a failed fetch.
  #[clap(long, env = "FETCH_RETRIES", default_value_t = 0)]
  retries: usize,

  /// Initial backoff between attempts, in milliseconds.
  #[clap(long, env = "FETCH_RETRY_DELAY_MS", default_value_t = 1000)]
  retry_delay_ms: u64,
}

impl Args {
  fn into_config(self) -> AnyhowResult<MirrorConfig> {
    let pacing = Pacing::from_secs_f64(self.min_delay_secs, self.max_delay_secs)?;
    Ok(MirrorConfig {
      source_url: self.source_url,
      archive_base: self.archive_base,
      sync: self.sync && !self.no_sync,
      pacing,
      on_fetch_error: self.on_fetch_error.into(),
      retries: self.retries,
      retry_delay: Duration::from_millis(self.retry_delay_ms),
    })
  }
}

/// Connects to the index, runs the mirror once and logs what it did.
///
/// # Returns
/// - `Ok(())` if the run completes.
/// - `Err(anyhow::Error)` if the catalog query, a fetch (under the `abort` policy) or the database fails;
///   the process then exits with a non-zero status.
#[tokio::main]
async fn main() -> AnyhowResult<()> {
  // Load environment variables from .env file (if present)
  dotenvy::dotenv().ok();

  env_logger::init();

  let args = Args::parse();
  let db_params = args.db_params.clone();
  let config = args.into_config()?;
  info!(
    "Starting snapshot mirror for {} via {}",
    config.source_url, config.archive_base
  );

  let store = PostgresStore::connect(&db_params).await?;
  let client = reqwest::Client::builder()
    .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
    .build()
    .context("Failed to build HTTP client")?;

  let summary = run(&client, &config, &store).await?;
  if let Some(sync) = summary.sync {
    info!(
      "Catalog listed {} snapshots: {} new, {} already indexed",
      sync.received, sync.inserted, sync.duplicates
    );
  }
  info!(
    "Fetched {} of {} pending snapshots ({} failed)",
    summary.drain.fetched, summary.drain.selected, summary.drain.failed
  );
  info!(
    "{} snapshots indexed, {} still pending",
    summary.indexed, summary.pending
  );

  Ok(())
}
