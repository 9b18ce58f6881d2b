use sha2::{Digest, Sha256};

/// Computes the digest stored alongside a fetched snapshot body.
///
/// Identical captures taken at different times share a digest, which makes unchanged
/// revisions of the document easy to spot in the index.
///
/// # Arguments
///
/// * `body` - The fetched snapshot body.
///
/// # Returns
///
/// A hexadecimal string representation of the SHA-256 digest.
pub fn compute_contents_digest(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_contents_digest() {
        let digest = compute_contents_digest("<registry id=\"registrar-ids\"/>");
        assert_eq!(digest.len(), 64); // SHA-256 produces a 32-byte (64 hex char) digest
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            compute_contents_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_identical_bodies_share_digest() {
        let a = compute_contents_digest("same body");
        let b = compute_contents_digest("same body");
        let c = compute_contents_digest("other body");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
