//! Request cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// The method is uppercased; the URL is used verbatim, query string included.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", "https://example.com/");
        let hash2 = compute_cache_key("GET", "https://example.com/");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case_insensitive() {
        assert_eq!(compute_cache_key("get", "https://example.com/"), compute_cache_key("GET", "https://example.com/"));
    }

    #[test]
    fn test_hash_different_method() {
        assert_ne!(compute_cache_key("GET", "https://example.com/"), compute_cache_key("HEAD", "https://example.com/"));
    }

    #[test]
    fn test_hash_query_is_significant() {
        let plain = compute_cache_key("GET", "https://example.com/properties");
        let query = compute_cache_key("GET", "https://example.com/properties?x=1");
        assert_ne!(plain, query);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", "https://example.com/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
