//! # Querying the Archive Snapshot Catalog
//!
//! This module queries the CDX search endpoint of a web archive
//! (e.g., "https://web.archive.org/cdx/search/cdx") for every capture of a source URL.
//! The catalog answers with a header row of field names followed by data rows; each data
//! row is paired positionally with the header and turned into a [`Snapshot`] descriptor
//! ready for the durable index.
//!
//! ## Usage
//!
//! The primary entry point is `query_catalog`, which takes an HTTP client, the archive base
//! URL and the source URL. `parse_catalog` does the pairing on an already decoded response.
//!
//! ## Submodules
//!
//! - **cdx**: Contains the catalog request and response pairing logic.
//! - **types**: Defines the snapshot descriptor.

mod cdx;
mod types;

pub use cdx::{catalog_url, parse_catalog, query_catalog};
pub use types::Snapshot;
