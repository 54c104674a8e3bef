//! Client-key hashing.
//!
//! Rate-limit buckets and log fields carry a BLAKE3-derived 64-bit id instead of the raw
//! client address.

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Collisions merge two clients into one admission bucket, which only makes the limiter
/// stricter for them. At 64 bits the chance is negligible for realistic key counts
/// (`P ≈ n² / 2^65`).
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Bucket id for a client key (forwarded address, real address or `"unknown"`).
#[inline]
pub fn hash_client_key(client_key: &str) -> u64 {
    hash_to_u64(client_key.as_bytes())
}

/// Hex form of [`hash_client_key`] for log fields.
#[inline]
pub fn client_log_id(client_key: &str) -> String {
    format!("{:016x}", hash_client_key(client_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hash_to_u64_determinism() {
        let data = b"203.0.113.7";

        let hash1 = hash_to_u64(data);
        let hash2 = hash_to_u64(data);

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_client_key_uniqueness() {
        let inputs = ["203.0.113.7", "203.0.113.8", "2001:db8::1", "unknown"];

        let hashes: HashSet<_> = inputs.iter().map(|i| hash_client_key(i)).collect();

        assert_eq!(hashes.len(), inputs.len());
    }

    #[test]
    fn test_hash_client_key_equals_hash_to_u64() {
        let key = "198.51.100.23";
        assert_eq!(hash_client_key(key), hash_to_u64(key.as_bytes()));
    }

    #[test]
    fn test_client_log_id_hides_address() {
        let id = client_log_id("198.51.100.23");
        assert_eq!(id.len(), 16);
        assert!(!id.contains('.'));
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
