use thiserror::Error;

/// Failures the mirror can name precisely.
///
/// Transport and database errors travel as `anyhow::Error` with context; the
/// variants here are the domain checks layered on top of them.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("catalog response is not a JSON array of rows")]
    MalformedCatalog,
    #[error("catalog row {row} has {actual} fields but the header has {expected}")]
    CatalogArity {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("catalog record field `{0}` is missing or not a string")]
    InvalidField(&'static str),
    #[error("snapshot body from {url} is too short ({len} characters)")]
    BodyTooShort { url: String, len: usize },
    #[error("invalid pacing delay: {0}")]
    InvalidDelay(String),
}
