//! Request key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key identifying a request: method plus URL.
///
/// The method is case-insensitive; the URL is used as given, so callers
/// should canonicalize it first.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
