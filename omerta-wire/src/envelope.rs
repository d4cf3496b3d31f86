//! `MeshEnvelope`: the signed, typed message carried inside the encrypted
//! wire payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use omerta_crypto::types::Signature;
use omerta_crypto::KeyPair;

/// Replay window: a decrypted envelope's timestamp must be within this many
/// seconds of the local clock, in either direction.
pub const REPLAY_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshEnvelope {
    pub from_peer: String,
    pub to_peer: Option<String>,
    pub payload: Value,
    pub timestamp: u64,
    pub signature: Vec<u8>,
}

/// Fields signed over: everything except `signature` itself.
#[derive(Serialize)]
struct SignedFields<'a> {
    from_peer: &'a str,
    to_peer: &'a Option<String>,
    payload: &'a Value,
    timestamp: u64,
}

impl MeshEnvelope {
    /// Build and sign a new envelope.
    pub fn new_signed(
        keypair: &KeyPair,
        from_peer: String,
        to_peer: Option<String>,
        payload: Value,
        timestamp: u64,
    ) -> anyhow::Result<Self> {
        let canonical = canonical_bytes(&from_peer, &to_peer, &payload, timestamp)?;
        let signature = keypair.sign(&canonical)?;

        Ok(MeshEnvelope {
            from_peer,
            to_peer,
            payload,
            timestamp,
            signature: signature.signature,
        })
    }

    /// Canonical bytes this envelope's signature was computed over.
    pub fn canonical_bytes(&self) -> anyhow::Result<Vec<u8>> {
        canonical_bytes(&self.from_peer, &self.to_peer, &self.payload, self.timestamp)
    }

    /// Verify the embedded signature against `from_public_key`.
    pub fn verify_signature(&self, from_public_key: &omerta_crypto::PublicKey) -> anyhow::Result<bool> {
        let canonical = self.canonical_bytes()?;
        let signature = Signature {
            signature: self.signature.clone(),
            public_key: from_public_key.clone(),
            timestamp: self.timestamp,
        };
        from_public_key.verify(&canonical, &signature)
    }

    /// Check the embedded timestamp falls within [`REPLAY_WINDOW_SECS`] of
    /// `now` (unix seconds). Exactly ±60s is rejected; ±59s is accepted.
    pub fn is_fresh(&self, now: u64) -> bool {
        let delta = (now as i64) - (self.timestamp as i64);
        delta.abs() < REPLAY_WINDOW_SECS
    }
}

fn canonical_bytes(
    from_peer: &str,
    to_peer: &Option<String>,
    payload: &Value,
    timestamp: u64,
) -> anyhow::Result<Vec<u8>> {
    let fields = SignedFields { from_peer, to_peer, payload, timestamp };
    serde_json::to_vec(&fields).map_err(|e| anyhow::anyhow!("envelope canonicalization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sign_and_verify_round_trip() {
        let keypair = KeyPair::generate().unwrap();
        let envelope = MeshEnvelope::new_signed(
            &keypair,
            keypair.public_key.peer_id(),
            None,
            json!({"channel": "vm-request", "vmId": "abc"}),
            1_700_000_000,
        )
        .unwrap();

        assert!(envelope.verify_signature(&keypair.public_key).unwrap());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let keypair = KeyPair::generate().unwrap();
        let mut envelope = MeshEnvelope::new_signed(
            &keypair,
            keypair.public_key.peer_id(),
            None,
            json!({"amount": 10}),
            1_700_000_000,
        )
        .unwrap();

        envelope.payload = json!({"amount": 1000});
        assert!(!envelope.verify_signature(&keypair.public_key).unwrap());
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        let keypair = KeyPair::generate().unwrap();
        let envelope =
            MeshEnvelope::new_signed(&keypair, "peer".into(), None, json!({}), 1000).unwrap();

        assert!(envelope.is_fresh(1059)); // +59s accepted
        assert!(envelope.is_fresh(941)); // -59s accepted
        assert!(!envelope.is_fresh(1060)); // +60s rejected
        assert!(!envelope.is_fresh(940)); // -60s rejected
    }
}
