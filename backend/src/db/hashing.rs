//! One-way hashing for values that must not be stored in clear.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of the given parts, fed to the hasher in order.
pub fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Digest stored in place of a visitor's IP address.
pub fn hash_ip(ip: &str) -> String {
    sha256_hex(&[ip.trim().as_bytes()])
}
