//! Shared SHA-256 hex digest utility.
//!
//! Device tokens and cache keys are logged by fingerprint rather than value.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Short, log-safe fingerprint of a secret-ish value (first 12 hex chars).
pub fn fingerprint(value: &str) -> String {
    sha256_hex(value.as_bytes())[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        let hash = sha256_hex(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fingerprint_is_short_and_stable() {
        let a = fingerprint("device-token-abc");
        assert_eq!(a.len(), 12);
        assert_eq!(a, fingerprint("device-token-abc"));
        assert_ne!(a, fingerprint("device-token-abd"));
    }
}
