//! Signature type definitions for Ed25519-signed messages

use serde::{Deserialize, Serialize};

use crate::types::PublicKey;

/// An Ed25519 signature bound to the public key that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    /// Raw 64-byte Ed25519 signature.
    pub signature: Vec<u8>,
    /// Public key used for verification.
    pub public_key: PublicKey,
    /// Timestamp of signature creation (unix seconds).
    pub timestamp: u64,
}

impl Signature {
    pub fn from_bytes_with_key(signature_bytes: &[u8], public_key: PublicKey) -> Self {
        Signature {
            signature: signature_bytes.to_vec(),
            public_key,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.signature
    }
}
