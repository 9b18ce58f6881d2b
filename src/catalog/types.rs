use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::error::MirrorError;

/// Format of the 14-digit capture timestamps used by the archive.
const CAPTURE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One cataloged capture of a URL at a point in time.
///
/// The descriptor keeps the three fields the index is keyed and fetched by, plus the
/// complete catalog record so fields the mirror does not model (mimetype, statuscode,
/// digest, length, ...) survive in `cdx_raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Canonicalized form of the captured URL (SURT), e.g. "org,iana)/assignments/registrar-ids/registrar-ids.xml".
    pub url_key: String,
    /// Capture time as reported by the catalog, e.g. "20230101000000".
    pub timestamp: String,
    /// The URL as it was captured.
    pub original_url: String,
    /// The full catalog record, in header order.
    pub raw: Map<String, Value>,
}

impl Snapshot {
    /// Builds a descriptor from a catalog record keyed by header names.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::InvalidField`] when `urlkey`, `timestamp` or `original` is
    /// absent or not a string.
    pub fn from_record(raw: Map<String, Value>) -> Result<Self, MirrorError> {
        let url_key = string_field(&raw, "urlkey")?;
        let timestamp = string_field(&raw, "timestamp")?;
        let original_url = string_field(&raw, "original")?;
        Ok(Snapshot {
            url_key,
            timestamp,
            original_url,
            raw,
        })
    }

    /// The catalog record serialized as a JSON object.
    pub fn raw_json(&self) -> String {
        Value::Object(self.raw.clone()).to_string()
    }

    /// Capture time parsed from the timestamp, if it has the usual 14-digit form.
    pub fn captured_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, CAPTURE_TIMESTAMP_FORMAT).ok()
    }
}

fn string_field(raw: &Map<String, Value>, name: &'static str) -> Result<String, MirrorError> {
    raw.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(MirrorError::InvalidField(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_from_record_keeps_raw_fields() {
        let raw = record(json!({
            "urlkey": "com,example)/page",
            "timestamp": "20230101000000",
            "original": "http://example.com/page",
            "mimetype": "text/html",
            "statuscode": "200"
        }));
        let snapshot = Snapshot::from_record(raw).unwrap();
        assert_eq!(snapshot.url_key, "com,example)/page");
        assert_eq!(snapshot.timestamp, "20230101000000");
        assert_eq!(snapshot.original_url, "http://example.com/page");
        assert_eq!(snapshot.raw["mimetype"], "text/html");
        assert_eq!(
            snapshot.raw_json(),
            r#"{"urlkey":"com,example)/page","timestamp":"20230101000000","original":"http://example.com/page","mimetype":"text/html","statuscode":"200"}"#
        );
    }

    #[test]
    fn test_from_record_rejects_missing_original() {
        let raw = record(json!({ "urlkey": "com,example)/", "timestamp": "20230101000000" }));
        let err = Snapshot::from_record(raw).unwrap_err();
        assert!(matches!(err, MirrorError::InvalidField("original")));
    }

    #[test]
    fn test_captured_at() {
        let raw = record(json!({
            "urlkey": "com,example)/",
            "timestamp": "20230215123045",
            "original": "http://example.com/"
        }));
        let snapshot = Snapshot::from_record(raw).unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 2, 15)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(12, 30, 45).unwrap());
        assert_eq!(snapshot.captured_at(), Some(expected));
    }
}
