use crate::error::MirrorError;
use anyhow::{Context, Result as AnyhowResult};
use log::debug;

/// Archive used when no other base URL is configured.
pub const DEFAULT_ARCHIVE_BASE: &str = "https://web.archive.org";

/// Bodies shorter than this are error pages or placeholders, never real captures.
pub const MIN_BODY_CHARS: usize = 100;

/// Builds the replay URL of a capture.
///
/// # Examples
///
/// ```rust
/// use snapshot_mirror::fetch::replay_url;
/// assert_eq!(
///   replay_url("https://web.archive.org", "20230101000000", "http://example.com/page"),
///   "https://web.archive.org/web/20230101000000/http://example.com/page"
/// );
/// ```
pub fn replay_url(archive_base: &str, timestamp: &str, original_url: &str) -> String {
    format!(
        "{}/web/{}/{}",
        archive_base.trim_end_matches('/'),
        timestamp,
        original_url
    )
}

/// Fetches the archived body of one capture.
///
/// # Arguments
///
/// * `client` - Shared HTTP client.
/// * `archive_base` - Base URL of the archive.
/// * `timestamp` - Capture timestamp from the index.
/// * `original_url` - Captured URL from the index.
///
/// # Returns
///
/// * `Ok(String)` - The body, at least [`MIN_BODY_CHARS`] characters long.
/// * `Err(anyhow::Error)` - Transport failure, non-success status, or [`MirrorError::BodyTooShort`].
pub async fn fetch_snapshot(
    client: &reqwest::Client,
    archive_base: &str,
    timestamp: &str,
    original_url: &str,
) -> AnyhowResult<String> {
    let url = replay_url(archive_base, timestamp, original_url);
    debug!("Fetching {}", url);
    let resp = client
        .get(&url)
        .send()
        .await
        .context(format!("Failed to get {}", url))?
        .error_for_status()
        .context(format!("Archive returned an error status for {}", url))?;
    let text = resp
        .text()
        .await
        .context(format!("Failed to read body of {}", url))?;

    let len = text.chars().count();
    if len < MIN_BODY_CHARS {
        return Err(MirrorError::BodyTooShort { url, len }.into());
    }
    Ok(text)
}
