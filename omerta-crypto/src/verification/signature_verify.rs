//! Ed25519 signature verification

use anyhow::Result;
use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey};

/// Verify an Ed25519 signature against a message and public key.
pub fn verify_signature(message: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
    if signature.len() != 64 {
        return Ok(false);
    }
    if public_key.len() != 32 {
        return Ok(false);
    }

    let sig = match Ed25519Signature::try_from(signature) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };

    let mut pk_bytes = [0u8; 32];
    pk_bytes.copy_from_slice(public_key);
    let verifying_key = match VerifyingKey::from_bytes(&pk_bytes) {
        Ok(key) => key,
        Err(_) => return Ok(false),
    };

    Ok(verifying_key.verify(message, &sig).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::KeyPair;

    #[test]
    fn verify_accepts_valid_signature() -> Result<()> {
        let keypair = KeyPair::generate()?;
        let message = b"omerta witness attestation";
        let signature = keypair.sign(message)?;

        assert!(verify_signature(
            message,
            signature.as_bytes(),
            keypair.public_key.as_bytes()
        )?);
        Ok(())
    }

    #[test]
    fn verify_rejects_tampered_message() -> Result<()> {
        let keypair = KeyPair::generate()?;
        let signature = keypair.sign(b"original")?;

        assert!(!verify_signature(
            b"tampered",
            signature.as_bytes(),
            keypair.public_key.as_bytes()
        )?);
        Ok(())
    }
}
