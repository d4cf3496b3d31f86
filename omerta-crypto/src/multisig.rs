//! Threshold multi-signature aggregation for witness consensus.
//!
//! A cabal of witnesses jointly attests to an outcome (an escrow lock or a
//! cabal attestation) by each signing the same message independently; a
//! result is accepted once `threshold` of the `participants` have produced
//! a valid signature over it. There is no signature aggregation scheme here
//! (Ed25519 does not support one without cooperative nonce generation) -
//! `MultiSig` is simply a verified collection of individual signatures.

use serde::{Deserialize, Serialize};

use crate::types::{PublicKey, Signature};

/// A set of signatures collected toward a threshold over a fixed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiSig {
    pub threshold: usize,
    pub participants: Vec<PublicKey>,
    pub signatures: Vec<Signature>,
}

impl MultiSig {
    pub fn new(threshold: usize, participants: Vec<PublicKey>) -> Self {
        MultiSig { threshold, participants, signatures: Vec::new() }
    }

    /// Add a signature if it comes from a known participant and verifies
    /// against `message`. Duplicate signatures from the same participant are
    /// ignored rather than double-counted toward the threshold.
    pub fn add_signature(&mut self, signature: Signature, message: &[u8]) -> anyhow::Result<bool> {
        if !self.participants.contains(&signature.public_key) {
            return Ok(false);
        }
        if self
            .signatures
            .iter()
            .any(|s| s.public_key == signature.public_key)
        {
            return Ok(false);
        }
        if !signature.public_key.verify(message, &signature)? {
            return Ok(false);
        }
        self.signatures.push(signature);
        Ok(true)
    }

    pub fn is_satisfied(&self) -> bool {
        self.signatures.len() >= self.threshold
    }

    /// Verify every collected signature against `message` and confirm the
    /// threshold is met. Used when consuming a `MultiSig` received over the
    /// wire, where signatures may not have been individually checked yet.
    pub fn verify(&self, message: &[u8]) -> anyhow::Result<bool> {
        if self.signatures.len() < self.threshold {
            return Ok(false);
        }

        let mut seen = std::collections::HashSet::new();
        for sig in &self.signatures {
            if !self.participants.contains(&sig.public_key) {
                return Ok(false);
            }
            if !seen.insert(sig.public_key.peer_id()) {
                return Ok(false);
            }
            if !sig.public_key.verify(message, sig)? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::KeyPair;

    #[test]
    fn threshold_is_met_after_enough_signatures() {
        let witnesses: Vec<KeyPair> = (0..5).map(|i| KeyPair::from_seed(&[i; 32]).unwrap()).collect();
        let participants: Vec<PublicKey> = witnesses.iter().map(|k| k.public_key.clone()).collect();

        let message = b"escrow-lock:txn-00:deterministic-payload";
        let mut multisig = MultiSig::new(3, participants);

        for witness in &witnesses[..2] {
            let sig = witness.sign(message).unwrap();
            assert!(multisig.add_signature(sig, message).unwrap());
        }
        assert!(!multisig.is_satisfied());

        let sig = witnesses[2].sign(message).unwrap();
        assert!(multisig.add_signature(sig, message).unwrap());
        assert!(multisig.is_satisfied());
        assert!(multisig.verify(message).unwrap());
    }

    #[test]
    fn non_participant_signature_is_rejected() {
        let witnesses: Vec<KeyPair> = (0..5).map(|i| KeyPair::from_seed(&[i; 32]).unwrap()).collect();
        let participants: Vec<PublicKey> = witnesses[..4].iter().map(|k| k.public_key.clone()).collect();
        let outsider = &witnesses[4];

        let message = b"cabal-attestation:txn-01";
        let mut multisig = MultiSig::new(3, participants);

        let sig = outsider.sign(message).unwrap();
        assert!(!multisig.add_signature(sig, message).unwrap());
        assert!(multisig.signatures.is_empty());
    }

    #[test]
    fn duplicate_signature_does_not_double_count() {
        let witnesses: Vec<KeyPair> = (0..5).map(|i| KeyPair::from_seed(&[i; 32]).unwrap()).collect();
        let participants: Vec<PublicKey> = witnesses.iter().map(|k| k.public_key.clone()).collect();

        let message = b"escrow-lock:duplicate-test";
        let mut multisig = MultiSig::new(3, participants);

        let sig_a = witnesses[0].sign(message).unwrap();
        let sig_a_again = witnesses[0].sign(message).unwrap();

        assert!(multisig.add_signature(sig_a, message).unwrap());
        assert!(!multisig.add_signature(sig_a_again, message).unwrap());
        assert_eq!(multisig.signatures.len(), 1);
    }
}
