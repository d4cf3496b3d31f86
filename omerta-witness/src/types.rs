//! Shared data types for the witness-consensus protocols (§3, §4.8, §4.9).

use serde::{Deserialize, Serialize};

use omerta_crypto::types::Signature;
use omerta_crypto::PeerId;

pub type SessionId = String;

/// Outcome of the escrow-lock protocol as seen by any participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    Accepted,
    Rejected,
}

/// `WitnessLockResult` (§3): the multi-signed outcome of a Transaction 00
/// round. "Final" iff `witness_signatures.len() >= WITNESS_THRESHOLD` and
/// `consumer_signature` verifies (§3 invariant, §8 property 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessLockResult {
    pub session_id: SessionId,
    pub consumer: PeerId,
    pub provider: PeerId,
    pub amount: u64,
    pub status: LockStatus,
    pub observed_balance: u64,
    pub witnesses: Vec<PeerId>,
    pub witness_signatures: Vec<Signature>,
    pub consumer_signature: Option<Signature>,
    pub timestamp: u64,
}

impl WitnessLockResult {
    /// Bytes the witness and consumer signatures are computed over: every
    /// field except the signature collections themselves.
    pub fn signed_bytes(&self) -> anyhow::Result<Vec<u8>> {
        #[derive(Serialize)]
        struct Fields<'a> {
            session_id: &'a str,
            consumer: &'a str,
            provider: &'a str,
            amount: u64,
            status: LockStatus,
            observed_balance: u64,
            witnesses: &'a [PeerId],
            timestamp: u64,
        }
        let fields = Fields {
            session_id: &self.session_id,
            consumer: &self.consumer,
            provider: &self.provider,
            amount: self.amount,
            status: self.status,
            observed_balance: self.observed_balance,
            witnesses: &self.witnesses,
            timestamp: self.timestamp,
        };
        Ok(serde_json::to_vec(&fields)?)
    }

    /// §3 invariant / §8 property 5: at least `threshold` valid witness
    /// signatures from distinct participants in `witnesses`, plus a valid
    /// consumer counter-signature.
    pub fn is_final(&self, threshold: usize) -> anyhow::Result<bool> {
        let message = self.signed_bytes()?;

        let mut verified = std::collections::HashSet::new();
        for sig in &self.witness_signatures {
            if !self.witnesses.contains(&sig.public_key.peer_id()) {
                continue;
            }
            if sig.public_key.verify(&message, sig)? {
                verified.insert(sig.public_key.peer_id());
            }
        }
        if verified.len() < threshold {
            return Ok(false);
        }

        let Some(consumer_sig) = &self.consumer_signature else { return Ok(false) };
        if consumer_sig.public_key.peer_id() != self.consumer {
            return Ok(false);
        }
        consumer_sig.public_key.verify(&message, consumer_sig)
    }
}

/// Why a Transaction 01 session ended (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    CompletedNormal,
    ConsumerTerminatedEarly,
    ProviderTerminated,
    SessionFailed,
    ConsumerMisuse,
    ConnectivityFailed,
    Timeout,
}

/// `CABAL_ATTESTATION` (§4.9): the witnesses' collaborative, multi-signed
/// statement that a session ran (or didn't) as claimed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CabalAttestation {
    pub session_id: SessionId,
    pub reason: TerminationReason,
    pub actual_duration_seconds: u64,
    pub signatures: Vec<Signature>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use omerta_crypto::KeyPair;

    fn make_result(witnesses: &[KeyPair], signers: usize, consumer: &KeyPair) -> WitnessLockResult {
        let mut result = WitnessLockResult {
            session_id: "sess-1".to_string(),
            consumer: consumer.public_key.peer_id(),
            provider: "provider1".to_string(),
            amount: 1000,
            status: LockStatus::Accepted,
            observed_balance: 5000,
            witnesses: witnesses.iter().map(|k| k.public_key.peer_id()).collect(),
            witness_signatures: Vec::new(),
            consumer_signature: None,
            timestamp: 1_700_000_000,
        };
        let message = result.signed_bytes().unwrap();
        for witness in witnesses.iter().take(signers) {
            result.witness_signatures.push(witness.sign(&message).unwrap());
        }
        result.consumer_signature = Some(consumer.sign(&message).unwrap());
        result
    }

    #[test]
    fn final_with_threshold_signatures_and_consumer_signature() {
        let witnesses: Vec<KeyPair> = (0..5).map(|i| KeyPair::from_seed(&[i; 32]).unwrap()).collect();
        let consumer = KeyPair::from_seed(&[200; 32]).unwrap();

        let result = make_result(&witnesses, 3, &consumer);
        assert!(result.is_final(3).unwrap());
    }

    #[test]
    fn not_final_below_threshold() {
        let witnesses: Vec<KeyPair> = (0..5).map(|i| KeyPair::from_seed(&[i; 32]).unwrap()).collect();
        let consumer = KeyPair::from_seed(&[200; 32]).unwrap();

        let result = make_result(&witnesses, 2, &consumer);
        assert!(!result.is_final(3).unwrap());
    }

    #[test]
    fn not_final_without_consumer_signature() {
        let witnesses: Vec<KeyPair> = (0..5).map(|i| KeyPair::from_seed(&[i; 32]).unwrap()).collect();
        let consumer = KeyPair::from_seed(&[200; 32]).unwrap();

        let mut result = make_result(&witnesses, 3, &consumer);
        result.consumer_signature = None;
        assert!(!result.is_final(3).unwrap());
    }
}
