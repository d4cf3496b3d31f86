//! Checkpoint verification capability port.
//!
//! The provider's append-only record chain is external to this crate (it
//! belongs to settlement/ledger machinery out of scope per spec.md §1).
//! What the escrow-lock protocol needs from it is narrow: given a
//! checkpoint hash the consumer recorded *before* this interaction,
//! confirm it is contained in the chain segment the provider now presents,
//! and read back the chain state at that point so witness selection can be
//! reproduced (§4.8 "Consumer").

use serde::{Deserialize, Serialize};

/// A hash of a peer's chain at a past point in time (GLOSSARY
/// "Checkpoint").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint(pub omerta_crypto::types::Hash);

/// The slice of chain state `SELECT_WITNESSES` reads: whatever a deployment
/// considers "chain state at checkpoint" (validator set, balances,
/// reputation...). Left opaque here; this crate only needs it as
/// selection-seed material, and to pass to [`ChainSegment::verify_segment`]
/// for the consumer's checkpoint-containment check.
pub type ChainStateAtCheckpoint = Vec<u8>;

/// A contiguous run of chain entries a provider presents to prove the
/// consumer's remembered checkpoint is genuinely in its history, rather
/// than fabricated for this interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSegment {
    pub entries: Vec<ChainEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntry {
    pub hash: omerta_crypto::types::Hash,
    pub state: ChainStateAtCheckpoint,
}

impl ChainSegment {
    /// §4.8 "Consumer": "(a) chain segment verifies, (b) checkpoint exists
    /// in segment". This crate cannot validate chain-internal hash linkage
    /// (that's the ledger's job); it can confirm containment, which is all
    /// `VALIDATING_CHECKPOINT`/`VERIFYING_PROVIDER_CHAIN` need.
    pub fn contains_checkpoint(&self, checkpoint: &Checkpoint) -> Option<&ChainStateAtCheckpoint> {
        self.entries.iter().find(|e| &e.hash == &checkpoint.0).map(|e| &e.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omerta_crypto::types::Hash;

    #[test]
    fn checkpoint_found_returns_its_state() {
        let segment = ChainSegment {
            entries: vec![
                ChainEntry { hash: Hash::from_bytes(b"entry-0"), state: vec![1, 2, 3] },
                ChainEntry { hash: Hash::from_bytes(b"entry-1"), state: vec![4, 5, 6] },
            ],
        };
        let checkpoint = Checkpoint(Hash::from_bytes(b"entry-1"));
        assert_eq!(segment.contains_checkpoint(&checkpoint), Some(&vec![4, 5, 6]));
    }

    #[test]
    fn missing_checkpoint_returns_none() {
        let segment = ChainSegment { entries: vec![ChainEntry { hash: Hash::from_bytes(b"entry-0"), state: vec![1] }] };
        let checkpoint = Checkpoint(Hash::from_bytes(b"not-present"));
        assert!(segment.contains_checkpoint(&checkpoint).is_none());
    }
}
