//! Keeping the snapshot index current and draining its backlog.
//!
//! A mirror run has two steps. The optional sync step asks the archive catalog for every
//! capture of the source URL and adds the ones the index does not know yet. The drain step
//! then fetches the contents of every indexed capture that still has none, in random
//! order, pausing between fetches. Each stored body is committed on its own, so a run that
//! stops early is resumed by simply running again.

use crate::catalog::query_catalog;
use crate::fetch::{fetch_snapshot, Pacing, DEFAULT_ARCHIVE_BASE};
use crate::store::{FetchedContents, InsertOutcome, PendingSnapshot, SnapshotStore};
use crate::utils::compute_contents_digest;
use anyhow::{Context, Result as AnyhowResult};
use backon::{ExponentialBuilder, Retryable as _};
use chrono::Utc;
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// What the drain step does when a snapshot cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run at the first failed fetch and report it.
    #[default]
    Abort,
    /// Log the failure, leave the snapshot in the backlog and continue with the next one.
    Skip,
}

/// Settings for one mirror run.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// The document whose captures are mirrored.
    pub source_url: String,
    /// Base URL of the archive serving both the catalog and the replays.
    pub archive_base: String,
    /// Refresh the index from the catalog before draining the backlog.
    pub sync: bool,
    pub pacing: Pacing,
    pub on_fetch_error: FailurePolicy,
    /// Extra attempts per snapshot after the first one fails.
    pub retries: usize,
    /// Initial backoff between attempts; it grows exponentially with jitter.
    pub retry_delay: Duration,
}

impl MirrorConfig {
    /// Default settings for `source_url`: no sync, 5 second pacing, single attempt, abort on failure.
    pub fn new(source_url: impl Into<String>) -> Self {
        MirrorConfig {
            source_url: source_url.into(),
            archive_base: DEFAULT_ARCHIVE_BASE.to_string(),
            sync: false,
            pacing: Pacing::default(),
            on_fetch_error: FailurePolicy::default(),
            retries: 0,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Descriptors listed by the catalog.
    pub received: usize,
    pub inserted: usize,
    /// Descriptors skipped because their `(timestamp, urlkey)` pair was already indexed.
    pub duplicates: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Size of the backlog when the run started.
    pub selected: usize,
    pub fetched: usize,
    /// Fetched, but the row already had contents by the time it was updated.
    pub already_fetched: usize,
    /// Failed and skipped; only non-zero under [`FailurePolicy::Skip`].
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// `None` when the sync step was disabled.
    pub sync: Option<SyncSummary>,
    pub drain: DrainSummary,
    /// Rows in the index once the run finished.
    pub indexed: u64,
    /// Rows still without contents once the run finished.
    pub pending: u64,
}

/// Runs the sync step (if enabled) and then drains the backlog.
///
/// # Arguments
///
/// * `client` - Shared HTTP client for catalog and replay requests.
/// * `config` - Settings for this run.
/// * `store` - The durable snapshot index.
///
/// # Returns
///
/// * `Ok(RunSummary)` - Counts for both steps and the index totals after them.
/// * `Err(anyhow::Error)` - The catalog query failed, a fetch failed under [`FailurePolicy::Abort`],
///   or the store failed. Contents stored before the failure stay stored.
///
/// # Examples
///
/// ```rust,no_run
/// use snapshot_mirror::mirror::{run, MirrorConfig};
/// use snapshot_mirror::store::PostgresStore;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///   let store = PostgresStore::connect("host=localhost user=postgres dbname=snapshot_mirror").await?;
///   let mut config = MirrorConfig::new("https://www.iana.org/assignments/registrar-ids/registrar-ids.xml");
///   config.sync = true;
///   let summary = run(&reqwest::Client::new(), &config, &store).await?;
///   println!("Fetched {} snapshots", summary.drain.fetched);
///   Ok(())
/// }
/// ```
pub async fn run<S>(
    client: &reqwest::Client,
    config: &MirrorConfig,
    store: &S,
) -> AnyhowResult<RunSummary>
where
    S: SnapshotStore + ?Sized,
{
    let sync = if config.sync {
        Some(sync_index(client, &config.archive_base, &config.source_url, store).await?)
    } else {
        info!("Skipping refresh");
        None
    };
    let drain = drain_backlog(client, config, store).await?;
    let indexed = store
        .snapshot_count()
        .await
        .context("Failed to count indexed snapshots")?;
    let pending = store
        .pending_count()
        .await
        .context("Failed to count pending snapshots")?;
    Ok(RunSummary {
        sync,
        drain,
        indexed,
        pending,
    })
}

/// Adds every catalog capture of `source_url` that the index does not hold yet.
///
/// Re-running is safe: descriptors whose `(timestamp, urlkey)` pair is already indexed are
/// logged and skipped, and existing rows are never touched. A failed catalog query is
/// returned before anything is written.
pub async fn sync_index<S>(
    client: &reqwest::Client,
    archive_base: &str,
    source_url: &str,
    store: &S,
) -> AnyhowResult<SyncSummary>
where
    S: SnapshotStore + ?Sized,
{
    info!("Fetching history of {}", source_url);
    let snapshots = query_catalog(client, archive_base, source_url)
        .await
        .context("Failed to query snapshot catalog")?;

    info!("Updating history");
    let mut summary = SyncSummary {
        received: snapshots.len(),
        ..SyncSummary::default()
    };
    for snapshot in &snapshots {
        let outcome = store
            .insert_snapshot(snapshot)
            .await
            .context(format!(
                "Failed to index snapshot {} of {}",
                snapshot.timestamp, snapshot.url_key
            ))?;
        match outcome {
            InsertOutcome::Inserted => {
                match snapshot.captured_at() {
                    Some(captured_at) => debug!(
                        "Indexed {} captured at {}",
                        snapshot.original_url, captured_at
                    ),
                    None => debug!("Indexed {} from {}", snapshot.original_url, snapshot.timestamp),
                }
                summary.inserted += 1;
            }
            InsertOutcome::AlreadyPresent => {
                warn!(
                    "Record may already exist: {} {} {}",
                    snapshot.url_key, snapshot.timestamp, snapshot.original_url
                );
                summary.duplicates += 1;
            }
        }
    }

    info!(
        "Indexed {} new snapshots, {} already present",
        summary.inserted, summary.duplicates
    );
    Ok(summary)
}

/// Fetches and stores contents for every indexed snapshot that has none yet.
///
/// The backlog is shuffled once per run. After each attempted snapshot the run pauses for
/// a delay drawn from `config.pacing`.
pub async fn drain_backlog<S>(
    client: &reqwest::Client,
    config: &MirrorConfig,
    store: &S,
) -> AnyhowResult<DrainSummary>
where
    S: SnapshotStore + ?Sized,
{
    let mut backlog = store
        .pending_snapshots()
        .await
        .context("Failed to load backlog")?;
    shuffle_backlog(&mut backlog, &mut rand::thread_rng());
    info!("{} snapshots awaiting contents", backlog.len());

    let mut summary = DrainSummary {
        selected: backlog.len(),
        ..DrainSummary::default()
    };
    for pending in &backlog {
        info!("Updating {} from {}", pending.original_url, pending.timestamp);
        match fetch_with_retry(client, config, pending).await {
            Ok(body) => {
                let contents = FetchedContents {
                    digest: compute_contents_digest(&body),
                    body,
                    fetched_at: Utc::now().naive_utc(),
                };
                let updated = store
                    .store_contents(&pending.timestamp, &pending.original_url, &contents)
                    .await
                    .context(format!(
                        "Failed to store contents of {} from {}",
                        pending.original_url, pending.timestamp
                    ))?;
                if updated {
                    summary.fetched += 1;
                } else {
                    debug!(
                        "{} from {} already has contents",
                        pending.original_url, pending.timestamp
                    );
                    summary.already_fetched += 1;
                }
            }
            Err(e) => match config.on_fetch_error {
                FailurePolicy::Abort => {
                    return Err(e.context(format!(
                        "Failed to fetch {} from {}",
                        pending.original_url, pending.timestamp
                    )));
                }
                FailurePolicy::Skip => {
                    error!(
                        "Skipping {} from {}: {:#}",
                        pending.original_url, pending.timestamp, e
                    );
                    summary.failed += 1;
                }
            },
        }
        config.pacing.pause().await;
    }

    info!(
        "Fetched {} snapshots, {} already fetched, {} failed",
        summary.fetched, summary.already_fetched, summary.failed
    );
    Ok(summary)
}

/// Puts the backlog in a fresh random order so no capture is always fetched first.
pub fn shuffle_backlog<R: Rng + ?Sized>(backlog: &mut [PendingSnapshot], rng: &mut R) {
    backlog.shuffle(rng);
}

async fn fetch_with_retry(
    client: &reqwest::Client,
    config: &MirrorConfig,
    pending: &PendingSnapshot,
) -> AnyhowResult<String> {
    let attempt = || {
        fetch_snapshot(
            client,
            &config.archive_base,
            &pending.timestamp,
            &pending.original_url,
        )
    };
    attempt
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(config.retry_delay)
                .with_max_times(config.retries)
                .with_jitter(),
        )
        .notify(|err: &anyhow::Error, dur: Duration| {
            warn!(
                "Retrying {} from {} in {:?}: {:#}",
                pending.original_url, pending.timestamp, dur, err
            );
        })
        .await
}
