// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! WireGuard key material

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};

/// Base64-encoded X25519 key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

/// Generates a fresh WireGuard key pair
#[must_use]
pub fn generate_keypair() -> KeyPair {
    let mut private_key_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut private_key_bytes);

    // Curve25519 clamping
    private_key_bytes[0] &= 248;
    private_key_bytes[31] &= 127;
    private_key_bytes[31] |= 64;

    let secret = StaticSecret::from(private_key_bytes);
    let public = PublicKey::from(&secret);

    KeyPair {
        private_key: STANDARD.encode(private_key_bytes),
        public_key: STANDARD.encode(public.as_bytes()),
    }
}

/// Derives the public key for a base64 private key
#[must_use]
pub fn public_key_for(private_key: &str) -> Option<String> {
    let bytes: [u8; 32] = STANDARD.decode(private_key.trim()).ok()?.try_into().ok()?;
    let public = PublicKey::from(&StaticSecret::from(bytes));
    Some(STANDARD.encode(public.as_bytes()))
}

/// Generates a 32-byte preshared key
#[must_use]
pub fn generate_preshared_key() -> String {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    STANDARD.encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_shape() {
        let pair = generate_keypair();
        let private = STANDARD.decode(&pair.private_key).unwrap();
        let public = STANDARD.decode(&pair.public_key).unwrap();

        assert_eq!(private.len(), 32);
        assert_eq!(public.len(), 32);
        assert_eq!(pair.private_key.len(), 44);
        assert_eq!(private[0] & 7, 0);
        assert_eq!(private[31] & 0xC0, 0x40);
    }

    #[test]
    fn test_public_key_matches_private() {
        let pair = generate_keypair();
        assert_eq!(public_key_for(&pair.private_key), Some(pair.public_key));
    }

    #[test]
    fn test_public_key_for_rejects_garbage() {
        assert_eq!(public_key_for("not base64!"), None);
        assert_eq!(public_key_for("c2hvcnQ="), None);
    }

    #[test]
    fn test_keys_are_random() {
        assert_ne!(generate_keypair(), generate_keypair());
        assert_ne!(generate_preshared_key(), generate_preshared_key());
        assert_eq!(STANDARD.decode(generate_preshared_key()).unwrap().len(), 32);
    }

    #[test]
    fn test_rfc7748_public_key() {
        // Alice's key pair from RFC 7748 section 6.1
        let private = hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
            .unwrap();
        let public = hex::decode("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a")
            .unwrap();

        assert_eq!(
            public_key_for(&STANDARD.encode(private)),
            Some(STANDARD.encode(public))
        );
    }
}
