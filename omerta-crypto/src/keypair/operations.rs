//! KeyPair signing and authenticated encryption

use anyhow::Result;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use ed25519_dalek::{Signer, SigningKey};

use crate::classical::x25519;
use crate::kdf::derive_keys;
use crate::random::generate_nonce;
use crate::types::{PublicKey, Signature};

use super::KeyPair;

const SESSION_KEY_INFO: &[u8] = b"omerta-session-key-v1";

impl KeyPair {
    /// Sign a message with this identity's Ed25519 key.
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let signing_key = SigningKey::from_bytes(&self.private_key.ed25519_sk);
        let signature = signing_key.sign(message);

        Ok(Signature {
            signature: signature.to_bytes().to_vec(),
            public_key: self.public_key.clone(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        })
    }

    /// Verify a signature against this identity's own public key.
    pub fn verify(&self, signature: &Signature, message: &[u8]) -> Result<bool> {
        self.public_key.verify(message, signature)
    }

    /// Derive a session key shared with `their_public` via X25519 + HKDF.
    fn session_key(&self, their_public: &PublicKey) -> Result<[u8; 32]> {
        let our_secret = self.private_key.x25519_static_secret();
        let shared = x25519::agree(&our_secret, &their_public.x25519_public());

        let derived = derive_keys(shared.as_bytes(), SESSION_KEY_INFO, 32)?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&derived);
        Ok(key)
    }

    /// Encrypt `plaintext` for `recipient`, authenticating `associated_data`.
    ///
    /// The wire format is `nonce(12) || ciphertext`, matching
    /// [`crate::symmetric::encrypt_data_with_ad`].
    pub fn encrypt_for(
        &self,
        recipient: &PublicKey,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>> {
        let session_key = self.session_key(recipient)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&session_key));

        let nonce_bytes = generate_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let payload = Payload { msg: plaintext, aad: associated_data };
        let ciphertext = cipher
            .encrypt(nonce, payload)
            .map_err(|_| anyhow::anyhow!("encryption failed"))?;

        let mut out = Vec::with_capacity(12 + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a message previously produced by [`KeyPair::encrypt_for`],
    /// where `sender` is the counterparty's public key.
    pub fn decrypt_from(
        &self,
        sender: &PublicKey,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>> {
        if ciphertext.len() < 12 {
            return Err(anyhow::anyhow!("ciphertext too short"));
        }

        let session_key = self.session_key(sender)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&session_key));

        let nonce = Nonce::from_slice(&ciphertext[..12]);
        let payload = Payload { msg: &ciphertext[12..], aad: associated_data };

        cipher
            .decrypt(nonce, payload)
            .map_err(|_| anyhow::anyhow!("decryption failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() -> Result<()> {
        let keypair = KeyPair::generate()?;
        let message = b"omerta vm-request payload";
        let signature = keypair.sign(message)?;
        assert!(keypair.verify(&signature, message)?);
        Ok(())
    }

    #[test]
    fn tampered_message_fails_verification() -> Result<()> {
        let keypair = KeyPair::generate()?;
        let signature = keypair.sign(b"original")?;
        assert!(!keypair.verify(&signature, b"tampered")?);
        Ok(())
    }

    #[test]
    fn encrypt_decrypt_round_trip_between_peers() -> Result<()> {
        let alice = KeyPair::generate()?;
        let bob = KeyPair::generate()?;

        let plaintext = b"escrow-lock witness share";
        let ad = b"omerta-network-id";

        let ciphertext = alice.encrypt_for(&bob.public_key, plaintext, ad)?;
        let decrypted = bob.decrypt_from(&alice.public_key, &ciphertext, ad)?;

        assert_eq!(decrypted, plaintext);
        Ok(())
    }

    #[test]
    fn decrypt_rejects_wrong_associated_data() -> Result<()> {
        let alice = KeyPair::generate()?;
        let bob = KeyPair::generate()?;

        let ciphertext = alice.encrypt_for(&bob.public_key, b"payload", b"correct-ad")?;
        let result = bob.decrypt_from(&alice.public_key, &ciphertext, b"wrong-ad");

        assert!(result.is_err());
        Ok(())
    }
}
