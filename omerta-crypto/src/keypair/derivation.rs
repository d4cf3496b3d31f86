//! Hierarchical key derivation

use anyhow::Result;

use super::KeyPair;

impl KeyPair {
    /// Derive a child keypair from this one, keyed by an index.
    ///
    /// Used to mint short-lived per-session or per-purpose identities
    /// without persisting additional seed material.
    pub fn derive_child_key(&self, index: u32) -> Result<KeyPair> {
        let mut input = Vec::with_capacity(36);
        input.extend_from_slice(&self.private_key.ed25519_sk);
        input.extend_from_slice(&index.to_be_bytes());

        let child_seed = crate::hashing::hash_blake3(&input);
        Self::from_seed(&child_seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_keys_are_deterministic_and_distinct() {
        let root = KeyPair::from_seed(&[5u8; 32]).unwrap();
        let child1 = root.derive_child_key(0).unwrap();
        let child1_again = root.derive_child_key(0).unwrap();
        let child2 = root.derive_child_key(1).unwrap();

        assert_eq!(child1.public_key, child1_again.public_key);
        assert_ne!(child1.public_key, child2.public_key);
        assert_ne!(child1.public_key, root.public_key);
    }
}
