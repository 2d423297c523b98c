//! Device fingerprint derivation.
//!
//! A fingerprint binds a session to one physical device. It is derived
//! deterministically from a host-provided machine identifier and the
//! per-installation salt written at setup time, so the same installation
//! reproduces the same fingerprint on every process start while two
//! installations on identical hardware still differ.
//!
//! Detecting the machine identifier itself is the host integration's job;
//! this module only performs the derivation. The server never computes
//! fingerprints, it only compares them for equality.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derives the device fingerprint for a (machine, installation) pair.
///
/// HMAC-SHA256 keyed by the installation salt over the machine identifier,
/// hex encoded. Keying by the salt means a machine identifier alone is not
/// enough to forge another installation's fingerprint.
pub fn derive_fingerprint(machine_id: &str, salt: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC key length is valid");
    mac.update(machine_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Generate a fresh per-installation salt.
///
/// # Output
///
/// 64 hex characters (32 random bytes). Written to local configuration
/// once at setup time and reused for the installation's lifetime.
pub fn generate_salt() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_fingerprint("machine-0001", "73616c74");
        let b = derive_fingerprint("machine-0001", "73616c74");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_salts_give_different_fingerprints() {
        let a = derive_fingerprint("machine-0001", "salt-one");
        let b = derive_fingerprint("machine-0001", "salt-two");
        assert_ne!(a, b);
    }

    #[test]
    fn different_machines_give_different_fingerprints() {
        let a = derive_fingerprint("machine-0001", "salt");
        let b = derive_fingerprint("machine-0002", "salt");
        assert_ne!(a, b);
    }

    #[test]
    fn salts_are_unique_and_hex() {
        let a = generate_salt();
        let b = generate_salt();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
