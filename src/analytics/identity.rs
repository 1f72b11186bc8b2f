//! Pseudonymous visitor identity
//!
//! Both hashes are SHA-256 over UTF-8 input with a fixed salt, hex encoded and
//! truncated to 32 characters (128 bits). The salts are public constants: the
//! output pseudonymizes a visitor for deduplication, it does not anonymize
//! them and must never be used to authenticate anything.

use sha2::{Digest, Sha256};

/// Salt appended to client IPs before hashing
pub const IP_HASH_SALT: &str = "linkpulse-ip-salt-v1";

/// Salt appended to `ip:user_agent` before hashing
pub const IDENTITY_HASH_SALT: &str = "linkpulse-identity-salt-v1";

/// Stored hash length in hex characters
pub const HASH_HEX_LEN: usize = 32;

fn truncated_sha256(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    let mut encoded = hex::encode(hasher.finalize());
    encoded.truncate(HASH_HEX_LEN);
    encoded
}

/// `SHA256(ip || IP_HASH_SALT)`, truncated
pub fn hash_ip(ip: &str) -> String {
    truncated_sha256(&[ip, IP_HASH_SALT])
}

/// `SHA256(ip || ":" || ua || ":" || IDENTITY_HASH_SALT)`, truncated
pub fn create_identity_hash(ip: &str, user_agent: &str) -> String {
    truncated_sha256(&[ip, ":", user_agent, ":", IDENTITY_HASH_SALT])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[test]
    fn test_hashes_are_deterministic_and_truncated() {
        let a = create_identity_hash("203.0.113.7", "Mozilla/5.0");
        let b = create_identity_hash("203.0.113.7", "Mozilla/5.0");
        assert_eq!(a, b);
        assert_eq!(a.len(), HASH_HEX_LEN);
        assert!(is_lower_hex(&a));

        let ip = hash_ip("203.0.113.7");
        assert_eq!(ip, hash_ip("203.0.113.7"));
        assert_eq!(ip.len(), HASH_HEX_LEN);
        assert!(is_lower_hex(&ip));
    }

    #[test]
    fn test_inputs_change_the_hash() {
        assert_ne!(
            create_identity_hash("203.0.113.7", "Mozilla/5.0"),
            create_identity_hash("203.0.113.8", "Mozilla/5.0")
        );
        assert_ne!(
            create_identity_hash("203.0.113.7", "Mozilla/5.0"),
            create_identity_hash("203.0.113.7", "curl/8.0")
        );
        assert_ne!(hash_ip("203.0.113.7"), create_identity_hash("203.0.113.7", ""));
    }

    #[test]
    fn test_matches_manual_digest() {
        let expected = hex::encode(Sha256::digest(
            format!("10.0.0.1:ua:{IDENTITY_HASH_SALT}").as_bytes(),
        ));
        assert_eq!(create_identity_hash("10.0.0.1", "ua"), expected[..32]);
    }
}
