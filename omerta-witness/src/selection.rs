//! `SELECT_WITNESSES(seed, chainStateAtCheckpoint, criteria)` (§4.8):
//! deterministic cabal selection. Given the same three inputs, every
//! caller - the provider proposing a cabal, the consumer reproducing the
//! proposal to validate it, a recruiting witness picking a replacement -
//! must compute the identical ordered list (§8 property 6).

use omerta_crypto::{hash_blake3, PeerId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::chain::ChainStateAtCheckpoint;

/// A peer eligible to be selected as a witness, along with the facts
/// [`SelectionCriteria`] filters on. Trust level and prior-interaction
/// count are read from the caller's peer registry / reputation tracking;
/// this crate only consumes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessCandidate {
    pub peer_id: PeerId,
    pub high_trust: bool,
    pub prior_interactions_with_consumer: u32,
}

/// Constraints a selection must satisfy (§4.8 "Provider":
/// `{count=5, minHighTrust=2, maxPriorInteractionsWithConsumer=5,
/// exclude={self, consumer}}`).
#[derive(Debug, Clone)]
pub struct SelectionCriteria {
    pub count: usize,
    pub min_high_trust: usize,
    pub max_prior_interactions_with_consumer: u32,
    pub exclude: HashSet<PeerId>,
}

impl SelectionCriteria {
    pub fn standard(exclude: HashSet<PeerId>) -> Self {
        SelectionCriteria {
            count: crate::params::WITNESS_COUNT,
            min_high_trust: crate::params::PROVIDER_SELECTION_MIN_HIGH_TRUST,
            max_prior_interactions_with_consumer: crate::params::PROVIDER_SELECTION_MAX_PRIOR_INTERACTIONS,
            exclude,
        }
    }
}

/// Build the selection seed `H(sessionId|providerNonce|consumerNonce)`
/// (§4.8 "Consumer").
pub fn selection_seed(session_id: &str, provider_nonce: &[u8], consumer_nonce: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(session_id.len() + provider_nonce.len() + consumer_nonce.len() + 2);
    buf.extend_from_slice(session_id.as_bytes());
    buf.push(b'|');
    buf.extend_from_slice(provider_nonce);
    buf.push(b'|');
    buf.extend_from_slice(consumer_nonce);
    hash_blake3(&buf)
}

/// Deterministic per-candidate ranking key: `H(seed | chainState | peerId)`,
/// compared as raw bytes so there is no locale- or float-dependent
/// ordering.
fn rank_key(seed: &[u8; 32], chain_state: &ChainStateAtCheckpoint, peer_id: &str) -> [u8; 32] {
    let mut buf = Vec::with_capacity(32 + chain_state.len() + peer_id.len());
    buf.extend_from_slice(seed);
    buf.extend_from_slice(chain_state);
    buf.extend_from_slice(peer_id.as_bytes());
    hash_blake3(&buf)
}

/// Select a cabal. Candidates are sorted by `peer_id` first so that
/// iteration order of whatever collection the caller built from a
/// `HashMap` can never leak into the result (mirrors the teacher's
/// "sort before selecting" validator-selection pattern), then ranked by
/// [`rank_key`], then filtered to [`SelectionCriteria`].
///
/// Returns an error if the constraints cannot be satisfied by the
/// candidate pool (too few eligible peers, or not enough high-trust ones
/// among the top-ranked `count`).
pub fn select_witnesses(
    seed: &[u8; 32],
    chain_state: &ChainStateAtCheckpoint,
    criteria: &SelectionCriteria,
    candidates: &[WitnessCandidate],
) -> anyhow::Result<Vec<PeerId>> {
    let mut eligible: Vec<&WitnessCandidate> = candidates
        .iter()
        .filter(|c| !criteria.exclude.contains(&c.peer_id))
        .filter(|c| c.prior_interactions_with_consumer <= criteria.max_prior_interactions_with_consumer)
        .collect();

    eligible.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
    eligible.sort_by(|a, b| rank_key(seed, chain_state, &a.peer_id).cmp(&rank_key(seed, chain_state, &b.peer_id)));

    if eligible.len() < criteria.count {
        anyhow::bail!("only {} eligible candidates, need {}", eligible.len(), criteria.count);
    }

    let selected: Vec<&WitnessCandidate> = eligible.into_iter().take(criteria.count).collect();
    let high_trust_count = selected.iter().filter(|c| c.high_trust).count();
    if high_trust_count < criteria.min_high_trust {
        anyhow::bail!("selected cabal has {} high-trust members, need {}", high_trust_count, criteria.min_high_trust);
    }

    Ok(selected.into_iter().map(|c| c.peer_id.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, high_trust: bool, prior: u32) -> WitnessCandidate {
        WitnessCandidate { peer_id: id.to_string(), high_trust, prior_interactions_with_consumer: prior }
    }

    fn pool() -> Vec<WitnessCandidate> {
        (0..10)
            .map(|i| candidate(&format!("peer{i:02}"), i % 2 == 0, u32::from(i)))
            .collect()
    }

    #[test]
    fn same_inputs_reproduce_the_identical_ordered_list() {
        let seed = selection_seed("session-1", b"provider-nonce", b"consumer-nonce");
        let chain_state = vec![1, 2, 3];
        let criteria = SelectionCriteria::standard(HashSet::new());
        let candidates = pool();

        let a = select_witnesses(&seed, &chain_state, &criteria, &candidates).unwrap();
        let b = select_witnesses(&seed, &chain_state, &criteria, &candidates).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn excluded_peers_never_appear() {
        let seed = selection_seed("session-1", b"p", b"c");
        let chain_state = vec![9];
        let mut exclude = HashSet::new();
        exclude.insert("peer00".to_string());
        exclude.insert("peer01".to_string());
        let criteria = SelectionCriteria::standard(exclude);
        let candidates = pool();

        let selected = select_witnesses(&seed, &chain_state, &criteria, &candidates).unwrap();
        assert!(!selected.contains(&"peer00".to_string()));
        assert!(!selected.contains(&"peer01".to_string()));
    }

    #[test]
    fn too_few_eligible_candidates_is_an_error() {
        let seed = selection_seed("s", b"p", b"c");
        let criteria = SelectionCriteria::standard(HashSet::new());
        let candidates = vec![candidate("only-one", true, 0)];
        assert!(select_witnesses(&seed, &vec![], &criteria, &candidates).is_err());
    }

    #[test]
    fn insufficient_high_trust_members_is_an_error() {
        let seed = selection_seed("s", b"p", b"c");
        let criteria = SelectionCriteria::standard(HashSet::new());
        let candidates: Vec<WitnessCandidate> = (0..5).map(|i| candidate(&format!("peer{i}"), false, 0)).collect();
        assert!(select_witnesses(&seed, &vec![], &criteria, &candidates).is_err());
    }

    #[test]
    fn different_seed_changes_the_ordering() {
        let chain_state = vec![1];
        let criteria = SelectionCriteria { count: 10, min_high_trust: 0, max_prior_interactions_with_consumer: 999, exclude: HashSet::new() };
        let candidates = pool();

        let seed_a = selection_seed("session-a", b"p", b"c");
        let seed_b = selection_seed("session-b", b"p", b"c");
        let a = select_witnesses(&seed_a, &chain_state, &criteria, &candidates).unwrap();
        let b = select_witnesses(&seed_b, &chain_state, &criteria, &candidates).unwrap();
        assert_ne!(a, b);
    }
}
