//! Cache key derivation.

use sha2::{Digest, Sha256};
use tandem_sql::Value;
use uuid::Uuid;

/// Derives the cache key of a hybrid entity.
///
/// The key is the first 16 bytes of `sha256("<table>:<primary key>")`
/// formatted as a UUID, so the same row always maps to the same entry.
pub fn derive_key(table: &str, primary_key: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(table.as_bytes());
    hasher.update(b":");
    hasher.update(primary_key.to_string().as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

/// Generates a random key for a cache-only entity.
pub fn random_key() -> String {
    Uuid::new_v4().to_string()
}
