//! X25519 Diffie-Hellman key agreement, used to derive per-session keys
//! between two peers whose long-term identity is an Ed25519 keypair.

use anyhow::Result;
use x25519_dalek::{PublicKey as X25519PublicKey, SharedSecret, StaticSecret as X25519StaticSecret};

/// Perform X25519 key agreement, returning the raw shared secret.
///
/// Callers should not use this directly as a symmetric key; pass it through
/// HKDF (see [`crate::kdf::derive_keys`]) to produce a uniformly random
/// session key bound to both peers' identities.
pub fn agree(our_secret: &X25519StaticSecret, their_public: &X25519PublicKey) -> SharedSecret {
    our_secret.diffie_hellman(their_public)
}

pub fn public_key_from_bytes(bytes: &[u8]) -> Result<X25519PublicKey> {
    if bytes.len() != 32 {
        return Err(anyhow::anyhow!("x25519 public key must be 32 bytes, got {}", bytes.len()));
    }
    let mut buf = [0u8; 32];
    buf.copy_from_slice(bytes);
    Ok(X25519PublicKey::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrivateKey;

    #[test]
    fn agreement_is_symmetric() {
        let alice = PrivateKey::from_bytes([1u8; 32]);
        let bob = PrivateKey::from_bytes([2u8; 32]);

        let alice_secret = alice.x25519_static_secret();
        let bob_secret = bob.x25519_static_secret();

        let alice_shared = agree(&alice_secret, &bob.x25519_public());
        let bob_shared = agree(&bob_secret, &alice.x25519_public());

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }
}
