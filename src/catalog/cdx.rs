use super::types::Snapshot;
use crate::error::MirrorError;
use anyhow::{Context, Result as AnyhowResult};
use log::{debug, info};
use serde_json::{Map, Value};

/// Queries the archive catalog for every capture of `source_url`.
///
/// Sends `GET {archive_base}/cdx/search/cdx?output=json&url=<source_url>` and pairs the
/// header row of the response with each data row. There is no retry here: a transport
/// failure, a non-success status or a malformed body ends the call.
///
/// # Arguments
///
/// * `client` - Shared HTTP client.
/// * `archive_base` - Base URL of the archive (e.g., "https://web.archive.org").
/// * `source_url` - The document whose captures should be listed.
///
/// # Returns
///
/// * `Ok(Vec<Snapshot>)` - One descriptor per catalog data row, in catalog order.
/// * `Err(anyhow::Error)` - The request failed or the response could not be paired.
///
/// # Examples
///
/// ```rust,no_run
/// use snapshot_mirror::catalog::query_catalog;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///   let client = reqwest::Client::new();
///   let snapshots = query_catalog(
///     &client,
///     "https://web.archive.org",
///     "https://www.iana.org/assignments/registrar-ids/registrar-ids.xml",
///   ).await?;
///   println!("Catalog lists {} captures", snapshots.len());
///   Ok(())
/// }
/// ```
pub async fn query_catalog(
    client: &reqwest::Client,
    archive_base: &str,
    source_url: &str,
) -> AnyhowResult<Vec<Snapshot>> {
    let url = catalog_url(archive_base);
    debug!("Querying catalog {} for {}", url, source_url);
    let resp = client
        .get(&url)
        .query(&[("output", "json"), ("url", source_url)])
        .send()
        .await
        .context("Failed to query catalog")?
        .error_for_status()
        .context("Catalog returned an error status")?;
    let raw: Value = resp
        .json()
        .await
        .context("Failed to decode catalog response")?;
    let snapshots = parse_catalog(raw)?;
    info!("Catalog lists {} captures of {}", snapshots.len(), source_url);
    Ok(snapshots)
}

/// Location of the CDX search endpoint under `archive_base`.
pub fn catalog_url(archive_base: &str) -> String {
    format!("{}/cdx/search/cdx", archive_base.trim_end_matches('/'))
}

/// Pairs the header row of a decoded catalog response with each data row.
///
/// The whole response is checked before any descriptor is returned, so a single
/// malformed row fails the call without yielding a partial result. An empty array (the
/// catalog's answer when nothing was captured) and a header-only array both yield no
/// descriptors.
///
/// # Errors
///
/// * [`MirrorError::MalformedCatalog`] - The response is not an array of arrays, or the header holds a non-string name.
/// * [`MirrorError::CatalogArity`] - A data row's length differs from the header's.
/// * [`MirrorError::InvalidField`] - A row lacks one of the key fields.
pub fn parse_catalog(raw: Value) -> Result<Vec<Snapshot>, MirrorError> {
    let Value::Array(rows) = raw else {
        return Err(MirrorError::MalformedCatalog);
    };
    let mut rows = rows.into_iter();
    let header: Vec<String> = match rows.next() {
        None => return Ok(Vec::new()),
        Some(Value::Array(names)) => names
            .into_iter()
            .map(|name| match name {
                Value::String(name) => Ok(name),
                _ => Err(MirrorError::MalformedCatalog),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(MirrorError::MalformedCatalog),
    };

    let mut snapshots = Vec::new();
    for (i, row) in rows.enumerate() {
        let Value::Array(values) = row else {
            return Err(MirrorError::MalformedCatalog);
        };
        if values.len() != header.len() {
            return Err(MirrorError::CatalogArity {
                row: i + 1,
                expected: header.len(),
                actual: values.len(),
            });
        }
        let record: Map<String, Value> = header.iter().cloned().zip(values).collect();
        snapshots.push(Snapshot::from_record(record)?);
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header() -> Value {
        json!([
            "urlkey",
            "timestamp",
            "original",
            "mimetype",
            "statuscode",
            "digest",
            "length"
        ])
    }

    #[test]
    fn test_catalog_url() {
        assert_eq!(
            catalog_url("https://web.archive.org"),
            "https://web.archive.org/cdx/search/cdx"
        );
        assert_eq!(
            catalog_url("https://web.archive.org/"),
            "https://web.archive.org/cdx/search/cdx"
        );
    }

    #[test]
    fn test_parse_catalog_pairs_header_with_rows() {
        let raw = json!([
            header(),
            ["org,iana)/registrar-ids.xml", "20150101000000", "http://www.iana.org/registrar-ids.xml", "text/xml", "200", "AAAA", "1234"],
            ["org,iana)/registrar-ids.xml", "20160101000000", "https://www.iana.org/registrar-ids.xml", "text/xml", "200", "BBBB", "2345"]
        ]);
        let snapshots = parse_catalog(raw).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].timestamp, "20150101000000");
        assert_eq!(snapshots[1].original_url, "https://www.iana.org/registrar-ids.xml");
        assert_eq!(snapshots[1].raw["digest"], "BBBB");
        assert_eq!(snapshots[1].raw.keys().next().map(String::as_str), Some("urlkey"));
    }

    #[test]
    fn test_parse_catalog_empty_and_header_only() {
        assert!(parse_catalog(json!([])).unwrap().is_empty());
        assert!(parse_catalog(json!([header()])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_catalog_rejects_arity_mismatch() {
        let raw = json!([
            header(),
            ["org,iana)/registrar-ids.xml", "20150101000000", "http://www.iana.org/registrar-ids.xml", "text/xml", "200", "AAAA", "1234"],
            ["org,iana)/registrar-ids.xml", "20160101000000", "http://www.iana.org/registrar-ids.xml"]
        ]);
        let err = parse_catalog(raw).unwrap_err();
        assert!(matches!(
            err,
            MirrorError::CatalogArity { row: 2, expected: 7, actual: 3 }
        ));
    }

    #[test]
    fn test_parse_catalog_rejects_non_array() {
        let err = parse_catalog(json!({ "error": "rate limited" })).unwrap_err();
        assert!(matches!(err, MirrorError::MalformedCatalog));
    }
}
