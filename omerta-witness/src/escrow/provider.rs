//! Provider-side escrow-lock state machine (§4.8 "Provider").

use std::collections::HashSet;

use omerta_crypto::PeerId;

use crate::chain::{ChainSegment, ChainStateAtCheckpoint, Checkpoint};
use crate::escrow::messages::{LockIntent, WitnessCommitment};
use crate::selection::{select_witnesses, selection_seed, SelectionCriteria, WitnessCandidate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderState {
    Idle,
    ValidatingCheckpoint,
    SelectingWitnesses,
    SendingCommitment,
    WaitingForLock,
    ServicePhase,
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum ProviderEvent {
    LockIntentReceived(LockIntent),
    /// The provider's own chain segment covering `checkpoint`, plus the
    /// cabal already selected from it via [`ProviderLockSession::select_cabal`]
    /// - selection needs the candidate pool, which this pure transition
    /// function does not carry, so the caller runs it first.
    CheckpointSegmentReady { segment: ChainSegment, witnesses: Vec<PeerId> },
    CheckpointNotFound,
    LockReceived,
    LockTimeout,
}

#[derive(Debug, Clone)]
pub enum ProviderAction {
    LoadCheckpointSegment(Checkpoint),
    SendCommitment(WitnessCommitment),
    EnterServicePhase,
    RecordAbandonment { session_id: String, reason: String },
}

pub struct ProviderLockSession {
    pub session_id: String,
    pub provider: PeerId,
    pub consumer: Option<PeerId>,
    pub state: ProviderState,
    provider_nonce: Vec<u8>,
    consumer_nonce: Vec<u8>,
}

impl ProviderLockSession {
    pub fn new(session_id: String, provider: PeerId, provider_nonce: Vec<u8>) -> Self {
        ProviderLockSession {
            session_id,
            provider,
            consumer: None,
            state: ProviderState::Idle,
            provider_nonce,
            consumer_nonce: Vec::new(),
        }
    }

    /// Deterministically select from `candidates` constrained by `{count=5,
    /// minHighTrust=2, maxPriorInteractionsWithConsumer=5,
    /// exclude={self, consumer}}` (§4.8 "Provider").
    pub fn select_cabal(
        &self,
        candidates: &[WitnessCandidate],
        chain_state: &ChainStateAtCheckpoint,
    ) -> anyhow::Result<Vec<PeerId>> {
        let consumer = self.consumer.as_ref().ok_or_else(|| anyhow::anyhow!("no consumer set"))?;
        let seed = selection_seed(&self.session_id, &self.provider_nonce, &self.consumer_nonce);
        let mut exclude = HashSet::new();
        exclude.insert(self.provider.clone());
        exclude.insert(consumer.clone());
        select_witnesses(&seed, chain_state, &SelectionCriteria::standard(exclude), candidates)
    }

    pub fn handle(&mut self, event: ProviderEvent) -> anyhow::Result<Vec<ProviderAction>> {
        match (self.state.clone(), event) {
            (ProviderState::Idle, ProviderEvent::LockIntentReceived(intent)) => {
                self.consumer = Some(intent.consumer.clone());
                self.consumer_nonce = intent.consumer_nonce.clone();
                self.state = ProviderState::ValidatingCheckpoint;
                Ok(vec![ProviderAction::LoadCheckpointSegment(intent.checkpoint)])
            }

            (ProviderState::ValidatingCheckpoint, ProviderEvent::CheckpointSegmentReady { segment, witnesses }) => {
                let commitment = WitnessCommitment {
                    session_id: self.session_id.clone(),
                    provider_nonce: self.provider_nonce.clone(),
                    chain_segment: segment,
                    proposed_witnesses: witnesses,
                };
                self.state = ProviderState::WaitingForLock;
                Ok(vec![ProviderAction::SendCommitment(commitment)])
            }

            (ProviderState::ValidatingCheckpoint, ProviderEvent::CheckpointNotFound) => {
                self.state = ProviderState::Failed("checkpoint not found in own chain".to_string());
                Ok(vec![ProviderAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "checkpoint_not_found".to_string(),
                }])
            }

            (ProviderState::WaitingForLock, ProviderEvent::LockReceived) => {
                self.state = ProviderState::ServicePhase;
                Ok(vec![ProviderAction::EnterServicePhase])
            }

            (ProviderState::WaitingForLock, ProviderEvent::LockTimeout) => {
                self.state = ProviderState::Failed("lock never committed".to_string());
                Ok(vec![ProviderAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "lock_timeout".to_string(),
                }])
            }

            (state, event) => anyhow::bail!("event {event:?} is not valid in state {state:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omerta_crypto::types::Hash;

    #[test]
    fn select_cabal_excludes_self_and_consumer() {
        let mut session = ProviderLockSession::new("sess-1".to_string(), "provider1".to_string(), vec![1, 2, 3]);
        session.consumer = Some("consumer1".to_string());
        session.consumer_nonce = vec![4, 5, 6];

        let candidates: Vec<WitnessCandidate> = (0..10)
            .map(|i| WitnessCandidate { peer_id: format!("peer{i:02}"), high_trust: true, prior_interactions_with_consumer: 0 })
            .chain(std::iter::once(WitnessCandidate {
                peer_id: "provider1".to_string(),
                high_trust: true,
                prior_interactions_with_consumer: 0,
            }))
            .collect();

        let cabal = session.select_cabal(&candidates, &vec![1]).unwrap();
        assert!(!cabal.contains(&"provider1".to_string()));
        assert!(!cabal.contains(&"consumer1".to_string()));
        assert_eq!(cabal.len(), 5);
    }

    #[test]
    fn checkpoint_not_found_fails_the_session() {
        let mut session = ProviderLockSession::new("sess-1".to_string(), "provider1".to_string(), vec![]);
        session.state = ProviderState::ValidatingCheckpoint;
        session.handle(ProviderEvent::CheckpointNotFound).unwrap();
        assert!(matches!(session.state, ProviderState::Failed(_)));
    }

    #[test]
    fn lock_intent_moves_to_validating_checkpoint() {
        let mut session = ProviderLockSession::new("sess-1".to_string(), "provider1".to_string(), vec![]);
        let intent = LockIntent {
            session_id: "sess-1".to_string(),
            consumer: "consumer1".to_string(),
            provider: "provider1".to_string(),
            amount: 500,
            checkpoint: Checkpoint(Hash::from_bytes(b"cp")),
            consumer_nonce: vec![7, 8],
        };
        session.handle(ProviderEvent::LockIntentReceived(intent)).unwrap();
        assert_eq!(session.state, ProviderState::ValidatingCheckpoint);
        assert_eq!(session.consumer, Some("consumer1".to_string()));
    }
}
