//! Consumer-side escrow-lock state machine (§4.8 "Consumer"): a pure tagged
//! enum plus transition function, per §9's design note ("keep I/O outside
//! the transition"). The owning actor drives this with events parsed off
//! its mesh channels and executes the returned [`ConsumerAction`]s.

use std::collections::HashSet;

use omerta_crypto::PeerId;

use crate::chain::{ChainStateAtCheckpoint, Checkpoint};
use crate::escrow::messages::{LockRequest, WitnessCommitment};
use crate::selection::{select_witnesses, selection_seed, SelectionCriteria, WitnessCandidate};
use crate::types::{SessionId, WitnessLockResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    SendingLockIntent,
    WaitingForWitnessCommitment,
    VerifyingProviderChain,
    VerifyingWitnesses,
    SendingRequests,
    WaitingForResult,
    ReviewingResult,
    SigningResult,
    Locked,
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum ConsumerEvent {
    StartLock { provider: PeerId, amount: u64, checkpoint: Checkpoint, consumer_nonce: Vec<u8> },
    /// The mesh send of `LOCK_INTENT` completed; advances past the
    /// transient `SendingLockIntent` state.
    LockIntentSent,
    /// A `WitnessCommitment` arrived off the wire, unverified.
    CommitmentReceived(WitnessCommitment),
    /// The caller checked the commitment's chain segment against its own
    /// recorded checkpoint (requirements a/b of §4.8 "Consumer").
    ChainVerified { valid: bool },
    /// The caller reran `SELECT_WITNESSES` and compared it to the
    /// commitment's proposed list (requirement c of §4.8 "Consumer"), via
    /// [`ConsumerLockSession::reproduces_witness_selection`].
    WitnessSelectionVerified { valid: bool },
    /// The mesh send of the lock requests completed.
    RequestsSent,
    CommitmentTimeout,
    ResultReceived(WitnessLockResult),
    ResultTimeout,
    ReviewAccepted,
    ReviewRejected(String),
    ResultSigned,
    ConsumerSignatureDeadlinePassed,
}

#[derive(Debug, Clone)]
pub enum ConsumerAction {
    SendLockIntent { provider: PeerId, amount: u64, checkpoint: Checkpoint, consumer_nonce: Vec<u8> },
    SendRequests(LockRequest),
    SignAndBroadcastResult(WitnessLockResult),
    RecordAbandonment { session_id: SessionId, reason: String },
}

/// One consumer's run through the protocol for a single `sessionId`.
pub struct ConsumerLockSession {
    pub session_id: SessionId,
    pub consumer: PeerId,
    pub provider: Option<PeerId>,
    pub amount: u64,
    pub state: ConsumerState,
    pub witnesses: Vec<PeerId>,
    pending_result: Option<WitnessLockResult>,
    pending_commitment: Option<WitnessCommitment>,
    consumer_nonce: Vec<u8>,
}

impl ConsumerLockSession {
    pub fn new(session_id: SessionId, consumer: PeerId) -> Self {
        ConsumerLockSession {
            session_id,
            consumer,
            provider: None,
            amount: 0,
            state: ConsumerState::Idle,
            witnesses: Vec::new(),
            pending_result: None,
            pending_commitment: None,
            consumer_nonce: Vec::new(),
        }
    }

    /// Reproduce `SELECT_WITNESSES` against a known candidate pool and
    /// compare it to the provider's proposal - requirement (c) of §4.8
    /// "Consumer". Callers combine this with `ChainSegment::contains_checkpoint`
    /// (requirements a/b) before emitting [`ConsumerEvent::WitnessSelectionVerified`].
    pub fn reproduces_witness_selection(
        &self,
        commitment: &WitnessCommitment,
        candidates: &[WitnessCandidate],
        chain_state: &ChainStateAtCheckpoint,
    ) -> anyhow::Result<bool> {
        let provider = self.provider.as_ref().ok_or_else(|| anyhow::anyhow!("no provider set"))?;
        let seed = selection_seed(&self.session_id, &commitment.provider_nonce, &self.consumer_nonce);
        let mut exclude = HashSet::new();
        exclude.insert(self.consumer.clone());
        exclude.insert(provider.clone());
        let criteria = SelectionCriteria::standard(exclude);

        let reproduced = select_witnesses(&seed, chain_state, &criteria, candidates)?;
        Ok(reproduced == commitment.proposed_witnesses)
    }

    pub fn handle(&mut self, event: ConsumerEvent) -> anyhow::Result<Vec<ConsumerAction>> {
        match (self.state.clone(), event) {
            (ConsumerState::Idle, ConsumerEvent::StartLock { provider, amount, checkpoint, consumer_nonce }) => {
                self.provider = Some(provider.clone());
                self.amount = amount;
                self.consumer_nonce = consumer_nonce.clone();
                self.state = ConsumerState::SendingLockIntent;
                Ok(vec![ConsumerAction::SendLockIntent { provider, amount, checkpoint, consumer_nonce }])
            }

            (ConsumerState::SendingLockIntent, ConsumerEvent::LockIntentSent) => {
                self.state = ConsumerState::WaitingForWitnessCommitment;
                Ok(vec![])
            }

            (ConsumerState::WaitingForWitnessCommitment, ConsumerEvent::CommitmentReceived(commitment)) => {
                self.pending_commitment = Some(commitment);
                self.state = ConsumerState::VerifyingProviderChain;
                Ok(vec![])
            }

            (ConsumerState::WaitingForWitnessCommitment, ConsumerEvent::CommitmentTimeout) => {
                self.state = ConsumerState::Failed("witness commitment timeout".to_string());
                Ok(vec![ConsumerAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "commitment_timeout".to_string(),
                }])
            }

            (ConsumerState::VerifyingProviderChain, ConsumerEvent::ChainVerified { valid }) => {
                if !valid {
                    self.pending_commitment = None;
                    self.state = ConsumerState::Failed("witness commitment failed verification".to_string());
                    return Ok(vec![ConsumerAction::RecordAbandonment {
                        session_id: self.session_id.clone(),
                        reason: "commitment_verification_failed".to_string(),
                    }]);
                }
                self.state = ConsumerState::VerifyingWitnesses;
                Ok(vec![])
            }

            (ConsumerState::VerifyingWitnesses, ConsumerEvent::WitnessSelectionVerified { valid }) => {
                if !valid {
                    self.pending_commitment = None;
                    self.state = ConsumerState::Failed("witness commitment failed verification".to_string());
                    return Ok(vec![ConsumerAction::RecordAbandonment {
                        session_id: self.session_id.clone(),
                        reason: "commitment_verification_failed".to_string(),
                    }]);
                }
                let commitment =
                    self.pending_commitment.take().ok_or_else(|| anyhow::anyhow!("no commitment staged for verification"))?;
                self.witnesses = commitment.proposed_witnesses.clone();
                let request = LockRequest {
                    session_id: self.session_id.clone(),
                    consumer: self.consumer.clone(),
                    provider: self.provider.clone().unwrap_or_default(),
                    amount: self.amount,
                    witnesses: self.witnesses.clone(),
                };
                self.state = ConsumerState::SendingRequests;
                Ok(vec![ConsumerAction::SendRequests(request)])
            }

            (ConsumerState::SendingRequests, ConsumerEvent::RequestsSent) => {
                self.state = ConsumerState::WaitingForResult;
                Ok(vec![])
            }

            (ConsumerState::WaitingForResult, ConsumerEvent::ResultReceived(result)) => {
                self.pending_result = Some(result);
                self.state = ConsumerState::ReviewingResult;
                Ok(vec![])
            }

            (ConsumerState::WaitingForResult, ConsumerEvent::ResultTimeout) => {
                self.state = ConsumerState::Failed("no response from witness cabal".to_string());
                Ok(vec![ConsumerAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "result_timeout".to_string(),
                }])
            }

            (ConsumerState::ReviewingResult, ConsumerEvent::ReviewAccepted) => {
                let result = self.pending_result.take().ok_or_else(|| anyhow::anyhow!("no result staged for review"))?;
                self.state = ConsumerState::SigningResult;
                Ok(vec![ConsumerAction::SignAndBroadcastResult(result)])
            }

            (ConsumerState::ReviewingResult, ConsumerEvent::ReviewRejected(reason)) => {
                self.pending_result = None;
                self.state = ConsumerState::Failed(reason.clone());
                Ok(vec![ConsumerAction::RecordAbandonment { session_id: self.session_id.clone(), reason }])
            }

            (ConsumerState::SigningResult, ConsumerEvent::ResultSigned) => {
                self.state = ConsumerState::Locked;
                Ok(vec![])
            }

            (ConsumerState::SigningResult, ConsumerEvent::ConsumerSignatureDeadlinePassed) => {
                self.state = ConsumerState::Failed("consumer_abandoned".to_string());
                Ok(vec![ConsumerAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "consumer_abandoned".to_string(),
                }])
            }

            (state, event) => anyhow::bail!("event {event:?} is not valid in state {state:?}"),
        }
    }
}
