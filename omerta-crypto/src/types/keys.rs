//! Key type definitions for Ed25519 identity and X25519 session agreement
//!
//! Every peer in the mesh holds a single long-term Ed25519 keypair. Session
//! agreement keys are derived from that same keypair rather than generated
//! and announced separately, so a peer only ever needs to publish one public
//! key.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{compiler_fence, Ordering};
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret as X25519StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hashing::hash_blake3;
use crate::traits::ZeroizingKey;
use crate::types::Signature;
use crate::verification::verify_signature;

/// Ed25519 public key plus the peer's announced X25519 agreement key.
///
/// The X25519 key cannot be recovered from the Ed25519 key alone (deriving
/// it requires the private signing seed, see [`PrivateKey::x25519_static_secret`]),
/// so every peer announcement carries both keys together.
#[repr(C)]
#[derive(Debug, Clone, Serialize, Deserialize, Hash)]
pub struct PublicKey {
    /// Raw Ed25519 verifying key bytes (32 bytes).
    pub ed25519_pk: [u8; 32],
    /// X25519 agreement public key derived and announced by the key owner.
    pub x25519_pk: [u8; 32],
}

impl PartialEq for PublicKey {
    /// Constant-time equality, independent of where the keys first differ.
    #[inline(never)]
    fn eq(&self, other: &Self) -> bool {
        compiler_fence(Ordering::SeqCst);
        let ed_eq = self.ed25519_pk.ct_eq(&other.ed25519_pk);
        let x_eq = self.x25519_pk.ct_eq(&other.x25519_pk);
        let result: bool = (ed_eq & x_eq).into();
        compiler_fence(Ordering::SeqCst);
        result
    }
}

impl Eq for PublicKey {}

impl Drop for PublicKey {
    fn drop(&mut self) {
        self.ed25519_pk.zeroize();
        self.x25519_pk.zeroize();
    }
}

impl ZeroizingKey for PublicKey {}

impl PublicKey {
    pub fn new(ed25519_pk: [u8; 32], x25519_pk: [u8; 32]) -> Self {
        PublicKey { ed25519_pk, x25519_pk }
    }

    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() != 32 {
            return Err(anyhow::anyhow!("ed25519 public key must be 32 bytes, got {}", bytes.len()));
        }
        let mut ed25519_pk = [0u8; 32];
        ed25519_pk.copy_from_slice(bytes);
        Ok(PublicKey { ed25519_pk, x25519_pk: [0u8; 32] })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.ed25519_pk
    }

    /// peerId = hex(blake3(publicKey)[0..8])
    pub fn peer_id(&self) -> String {
        let digest = hash_blake3(&self.ed25519_pk);
        hex::encode(&digest[..8])
    }

    pub fn x25519_public(&self) -> X25519PublicKey {
        X25519PublicKey::from(self.x25519_pk)
    }

    /// Verify a signature allegedly produced by this key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> anyhow::Result<bool> {
        verify_signature(message, &signature.signature, &self.ed25519_pk)
    }
}

/// Ed25519 signing key plus the seed it was constructed from (zeroized on drop).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    /// Raw Ed25519 signing key bytes (32 bytes).
    pub ed25519_sk: [u8; 32],
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").field("ed25519_sk", &"<redacted>").finish()
    }
}

impl ZeroizingKey for PrivateKey {}

impl PrivateKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PrivateKey { ed25519_sk: bytes }
    }

    /// Derive the X25519 static secret used for session key agreement.
    ///
    /// The Ed25519 signing key and the derived X25519 key are deliberately
    /// different scalars (derived via a domain-separated hash of the signing
    /// seed rather than clamping the Ed25519 scalar directly), which avoids
    /// the key-reuse pitfalls of sharing one scalar between a signature
    /// scheme and a Diffie-Hellman scheme. Only the holder of the Ed25519
    /// private key can compute this; peers exchange the resulting X25519
    /// public key out of band via [`PublicKey`].
    pub fn x25519_static_secret(&self) -> X25519StaticSecret {
        let mut hasher = blake3::Hasher::new_derive_key("omerta-ed25519-to-x25519-v1");
        hasher.update(&self.ed25519_sk);
        let mut scalar = [0u8; 32];
        hasher.finalize_xof().fill(&mut scalar);
        X25519StaticSecret::from(scalar)
    }

    pub fn x25519_public(&self) -> X25519PublicKey {
        X25519PublicKey::from(&self.x25519_static_secret())
    }
}
