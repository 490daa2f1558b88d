//! BLAKE3 hashing for resources and bundle digests

use blake3::Hasher;

/// Hash prefix for BLAKE3 hashes
pub const HASH_PREFIX: &str = "blake3:";

/// Calculate BLAKE3 hash of a byte slice
pub fn hash_bytes(content: &[u8]) -> String {
    format!("{}{}", HASH_PREFIX, blake3::hash(content).to_hex())
}

/// Calculate BLAKE3 hash over a sequence of `(path, content)` pairs
///
/// The caller is responsible for ordering; the same pairs in the same order
/// always produce the same hash.
pub fn hash_entries<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut hasher = Hasher::new();

    for (path, content) in entries {
        // Include relative path in hash for uniqueness
        hasher.update(path.as_bytes());
        hasher.update(b"\0"); // null separator
        hasher.update(&(content.len() as u64).to_le_bytes());
        hasher.update(content);
        hasher.update(b"\0"); // null separator between files
    }

    format!("{}{}", HASH_PREFIX, hasher.finalize().to_hex())
}
