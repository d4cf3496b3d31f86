//! KeyPair generation

use anyhow::Result;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::types::{PrivateKey, PublicKey};

/// An identity keypair: Ed25519 for signing, with an X25519 agreement key
/// derivable from the same private material.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    /// Generate a new identity keypair using the OS CSPRNG.
    pub fn generate() -> Result<Self> {
        let mut rng = OsRng;
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_seed(&seed)
    }

    /// Deterministically construct a keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        let private_key = PrivateKey::from_bytes(*seed);
        let x25519_pk = private_key.x25519_public();

        let public_key = PublicKey::new(*verifying_key.as_bytes(), *x25519_pk.as_bytes());

        let keypair = KeyPair { public_key, private_key };
        keypair.validate()?;
        Ok(keypair)
    }

    /// Validate that the keypair is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.private_key.ed25519_sk.iter().all(|&x| x == 0) {
            return Err(anyhow::anyhow!("weak ed25519 private key detected"));
        }

        let test_message = b"omerta-keypair-validation";
        let signature = self.sign(test_message)?;
        let verified = self.public_key.verify(test_message, &signature)?;
        if !verified {
            return Err(anyhow::anyhow!("keypair validation failed: self-signature did not verify"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_valid_keypair() {
        let keypair = KeyPair::generate().expect("keypair generation should succeed");
        assert!(keypair.validate().is_ok());
    }

    #[test]
    fn from_seed_is_deterministic() {
        let seed = [9u8; 32];
        let a = KeyPair::from_seed(&seed).unwrap();
        let b = KeyPair::from_seed(&seed).unwrap();
        assert_eq!(a.public_key, b.public_key);
    }

    #[test]
    fn different_seeds_yield_different_peer_ids() {
        let a = KeyPair::from_seed(&[1u8; 32]).unwrap();
        let b = KeyPair::from_seed(&[2u8; 32]).unwrap();
        assert_ne!(a.public_key.peer_id(), b.public_key.peer_id());
    }
}
