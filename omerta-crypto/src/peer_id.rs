//! Peer identifier derivation: `peerId = hex(blake3(publicKey)[0..8])`.

use crate::types::PublicKey;

/// 16-character lowercase hex peer identifier derived from a public key.
pub type PeerId = String;

/// Derive the canonical peer id for a public key.
pub fn derive_peer_id(public_key: &PublicKey) -> PeerId {
    public_key.peer_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::KeyPair;

    #[test]
    fn peer_id_matches_public_key_method() {
        let keypair = KeyPair::generate().unwrap();
        assert_eq!(derive_peer_id(&keypair.public_key), keypair.public_key.peer_id());
    }

    #[test]
    fn peer_id_is_lowercase_hex_of_length_16() {
        let keypair = KeyPair::generate().unwrap();
        let id = derive_peer_id(&keypair.public_key);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
