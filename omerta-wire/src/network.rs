//! Network-id / network-key registry.
//!
//! `NetworkId` is a plaintext routing tag carried outside the encrypted
//! payload so a receiver can select the right symmetric key before
//! attempting decryption. It is deliberately not confidential.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{WireError, WireResult};

/// Maximum length, in bytes, of a `NetworkId` on the wire.
pub const MAX_NETWORK_ID_LEN: usize = 255;

/// 32-byte symmetric key shared out-of-band, used as the ChaCha20-Poly1305
/// key for all traffic tagged with its `NetworkId`.
#[derive(Clone)]
pub struct NetworkKey(pub [u8; 32]);

impl NetworkKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        NetworkKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Validate a network id's length is within the wire's single-byte length
/// prefix (0..=255).
pub fn validate_network_id(network_id: &str) -> WireResult<()> {
    if network_id.as_bytes().len() > MAX_NETWORK_ID_LEN {
        return Err(WireError::InvalidFraming);
    }
    Ok(())
}

/// In-memory registry mapping `NetworkId -> NetworkKey`, shared across the
/// transport and codec layers.
#[derive(Clone, Default)]
pub struct NetworkRegistry {
    inner: Arc<RwLock<HashMap<String, NetworkKey>>>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        NetworkRegistry::default()
    }

    pub fn insert(&self, network_id: impl Into<String>, key: NetworkKey) -> WireResult<()> {
        let network_id = network_id.into();
        validate_network_id(&network_id)?;
        self.inner.write().insert(network_id, key);
        Ok(())
    }

    pub fn get(&self, network_id: &str) -> WireResult<NetworkKey> {
        self.inner
            .read()
            .get(network_id)
            .cloned()
            .ok_or_else(|| WireError::UnknownNetwork(network_id.to_string()))
    }

    pub fn remove(&self, network_id: &str) {
        self.inner.write().remove(network_id);
    }

    pub fn contains(&self, network_id: &str) -> bool {
        self.inner.read().contains_key(network_id)
    }
}
