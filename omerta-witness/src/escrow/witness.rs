//! Witness-side escrow-lock state machine (§4.8 "Witness"): chain-knowledge
//! check, preliminary opinion exchange, consensus evaluation, escalation
//! recruitment, and final multi-signed result - all as a pure tagged enum
//! plus transition function, per §9's design note.

use std::collections::HashMap;

use omerta_crypto::types::{PublicKey, Signature};
use omerta_crypto::{MultiSig, PeerId};

use crate::chain::{ChainStateAtCheckpoint, Checkpoint};
use crate::escrow::messages::{LockRequest, PreliminaryVerdict};
use crate::params::{consensus_votes_required, MAX_RECRUITMENT_ROUNDS};
use crate::types::{LockStatus, SessionId, WitnessLockResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessState {
    Idle,
    CheckingChainKnowledge,
    SyncingChainFromPeers,
    EvaluatingBalanceAndLocks,
    ExchangingPreliminaryVerdicts,
    EvaluatingConsensus,
    RecruitingReplacement,
    AwaitingRecruitmentResponses,
    FinalVoting,
    AggregatingSignatures,
    AwaitingConsumerSignature,
    Committed,
    Abandoned(String),
    MonitoringLiveness,
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum WitnessEvent {
    RequestReceived(LockRequest),
    ChainKnown { checkpoint: Checkpoint },
    ChainUnknown,
    ChainSynced { chain_state: ChainStateAtCheckpoint },
    ChainSyncFailed,
    BalanceAndLocksEvaluated { observed_balance: u64, accept: bool },
    PeerVerdictReceived(PreliminaryVerdict),
    PreliminaryTimeout,
    ConsensusReached { accept: bool },
    ConsensusUnreachable,
    ReplacementRequired { unresponsive: PeerId },
    RecruitmentAccepted,
    RecruitmentExhausted,
    FinalVoteReceived { witness: PeerId, signature: Signature },
    FinalVotingTimeout,
    ConsumerSignatureReceived(Signature),
    ConsumerSignatureTimeout,
    LivenessPingDue,
    LivenessPongMissed { from: PeerId },
}

#[derive(Debug, Clone)]
pub enum WitnessAction {
    RequestChainSync { from: PeerId, checkpoint: Checkpoint },
    EvaluateBalanceAndLocks { consumer: PeerId, amount: u64 },
    BroadcastPreliminaryVerdict(PreliminaryVerdict),
    CastFinalVote { accept: bool },
    BroadcastLockResult(WitnessLockResult),
    RequestRecruitment { round: u32, replacing: PeerId },
    SendLivenessPing,
    RecordAbandonment { session_id: SessionId, reason: String },
}

/// One witness's participation in a single session's cabal.
pub struct WitnessParticipation {
    pub session_id: SessionId,
    pub witness: PublicKey,
    pub cabal: Vec<PeerId>,
    pub consumer: PeerId,
    pub provider: PeerId,
    pub amount: u64,
    pub state: WitnessState,
    preliminary_verdicts: HashMap<PeerId, bool>,
    observed_balance: u64,
    own_accept: Option<bool>,
    recruitment_round: u32,
    multisig: Option<MultiSig>,
    consumer_signature: Option<Signature>,
}

impl WitnessParticipation {
    pub fn new(session_id: SessionId, witness: PublicKey, cabal: Vec<PeerId>) -> Self {
        WitnessParticipation {
            session_id,
            witness,
            cabal,
            consumer: PeerId::default(),
            provider: PeerId::default(),
            amount: 0,
            state: WitnessState::Idle,
            preliminary_verdicts: HashMap::new(),
            observed_balance: 0,
            own_accept: None,
            recruitment_round: 0,
            multisig: None,
            consumer_signature: None,
        }
    }

    /// `EVALUATING_CONSENSUS` (§4.8 "Witness"): count accepting preliminary
    /// verdicts (own included) against [`consensus_votes_required`] for the
    /// cabal size.
    fn consensus_accept(&self) -> bool {
        let accepting = self.preliminary_verdicts.values().filter(|v| **v).count()
            + usize::from(self.own_accept == Some(true));
        accepting >= consensus_votes_required(self.cabal.len())
    }

    fn lock_result(&self, status: LockStatus) -> WitnessLockResult {
        WitnessLockResult {
            session_id: self.session_id.clone(),
            consumer: self.consumer.clone(),
            provider: self.provider.clone(),
            amount: self.amount,
            status,
            observed_balance: self.observed_balance,
            witnesses: self.cabal.clone(),
            witness_signatures: self.multisig.as_ref().map(|m| m.signatures.clone()).unwrap_or_default(),
            consumer_signature: self.consumer_signature.clone(),
            timestamp: 0,
        }
    }

    pub fn handle(&mut self, event: WitnessEvent) -> anyhow::Result<Vec<WitnessAction>> {
        match (self.state.clone(), event) {
            (WitnessState::Idle, WitnessEvent::RequestReceived(request)) => {
                self.consumer = request.consumer;
                self.provider = request.provider;
                self.amount = request.amount;
                self.state = WitnessState::CheckingChainKnowledge;
                Ok(vec![])
            }

            (WitnessState::CheckingChainKnowledge, WitnessEvent::ChainKnown { .. }) => {
                self.state = WitnessState::EvaluatingBalanceAndLocks;
                Ok(vec![WitnessAction::EvaluateBalanceAndLocks { consumer: self.consumer.clone(), amount: self.amount }])
            }

            (WitnessState::CheckingChainKnowledge, WitnessEvent::ChainUnknown) => {
                self.state = WitnessState::SyncingChainFromPeers;
                Ok(vec![WitnessAction::RequestChainSync {
                    from: self.provider.clone(),
                    checkpoint: Checkpoint(omerta_crypto::types::Hash::from_bytes(self.session_id.as_bytes())),
                }])
            }

            (WitnessState::SyncingChainFromPeers, WitnessEvent::ChainSynced { .. }) => {
                self.state = WitnessState::EvaluatingBalanceAndLocks;
                Ok(vec![WitnessAction::EvaluateBalanceAndLocks { consumer: self.consumer.clone(), amount: self.amount }])
            }

            (WitnessState::SyncingChainFromPeers, WitnessEvent::ChainSyncFailed) => {
                self.state = WitnessState::Abandoned("chain_sync_failed".to_string());
                Ok(vec![WitnessAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "chain_sync_failed".to_string(),
                }])
            }

            (WitnessState::EvaluatingBalanceAndLocks, WitnessEvent::BalanceAndLocksEvaluated { observed_balance, accept }) => {
                self.observed_balance = observed_balance;
                self.own_accept = Some(accept);
                self.state = WitnessState::ExchangingPreliminaryVerdicts;
                Ok(vec![WitnessAction::BroadcastPreliminaryVerdict(PreliminaryVerdict {
                    session_id: self.session_id.clone(),
                    witness: self.witness.peer_id(),
                    accept,
                    observed_balance,
                })])
            }

            (WitnessState::ExchangingPreliminaryVerdicts, WitnessEvent::PeerVerdictReceived(verdict)) => {
                self.preliminary_verdicts.insert(verdict.witness, verdict.accept);
                if self.preliminary_verdicts.len() + 1 >= self.cabal.len() {
                    self.state = WitnessState::EvaluatingConsensus;
                }
                Ok(vec![])
            }

            (WitnessState::ExchangingPreliminaryVerdicts, WitnessEvent::PreliminaryTimeout) => {
                self.state = WitnessState::EvaluatingConsensus;
                Ok(vec![])
            }

            (WitnessState::EvaluatingConsensus, WitnessEvent::ConsensusReached { accept }) => {
                self.state = WitnessState::FinalVoting;
                let participants: Vec<PublicKey> = vec![self.witness.clone()];
                self.multisig = Some(MultiSig::new(crate::params::WITNESS_THRESHOLD, participants));
                Ok(vec![WitnessAction::CastFinalVote { accept }])
            }

            (WitnessState::EvaluatingConsensus, WitnessEvent::ConsensusUnreachable) => {
                self.state = WitnessState::Abandoned("consensus_unreachable".to_string());
                Ok(vec![WitnessAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "consensus_unreachable".to_string(),
                }])
            }

            (WitnessState::EvaluatingConsensus, WitnessEvent::ReplacementRequired { unresponsive }) => {
                if self.recruitment_round >= MAX_RECRUITMENT_ROUNDS {
                    self.state = WitnessState::Abandoned("recruitment_exhausted".to_string());
                    return Ok(vec![WitnessAction::RecordAbandonment {
                        session_id: self.session_id.clone(),
                        reason: "recruitment_exhausted".to_string(),
                    }]);
                }
                self.recruitment_round += 1;
                self.state = WitnessState::RecruitingReplacement;
                Ok(vec![WitnessAction::RequestRecruitment { round: self.recruitment_round, replacing: unresponsive }])
            }

            (WitnessState::RecruitingReplacement, WitnessEvent::RecruitmentAccepted) => {
                self.state = WitnessState::AwaitingRecruitmentResponses;
                Ok(vec![])
            }

            (WitnessState::RecruitingReplacement, WitnessEvent::RecruitmentExhausted) => {
                self.state = WitnessState::Abandoned("recruitment_exhausted".to_string());
                Ok(vec![WitnessAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "recruitment_exhausted".to_string(),
                }])
            }

            (WitnessState::AwaitingRecruitmentResponses, WitnessEvent::RecruitmentAccepted) => {
                self.state = WitnessState::ExchangingPreliminaryVerdicts;
                Ok(vec![])
            }

            (WitnessState::FinalVoting, WitnessEvent::FinalVoteReceived { witness: _, signature }) => {
                let message = self.lock_result(LockStatus::Accepted).signed_bytes()?;
                if let Some(multisig) = self.multisig.as_mut() {
                    if !multisig.participants.contains(&signature.public_key) {
                        multisig.participants.push(signature.public_key.clone());
                    }
                    multisig.add_signature(signature, &message)?;
                    if multisig.is_satisfied() {
                        self.state = WitnessState::AggregatingSignatures;
                        return Ok(vec![]);
                    }
                }
                Ok(vec![])
            }

            (WitnessState::FinalVoting, WitnessEvent::FinalVotingTimeout) => {
                self.state = WitnessState::Abandoned("final_voting_timeout".to_string());
                Ok(vec![WitnessAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "final_voting_timeout".to_string(),
                }])
            }

            (WitnessState::AggregatingSignatures, WitnessEvent::FinalVoteReceived { witness: _, signature }) => {
                let message = self.lock_result(LockStatus::Accepted).signed_bytes()?;
                if let Some(multisig) = self.multisig.as_mut() {
                    if !multisig.participants.contains(&signature.public_key) {
                        multisig.participants.push(signature.public_key.clone());
                    }
                    multisig.add_signature(signature, &message)?;
                }
                self.state = WitnessState::AwaitingConsumerSignature;
                let result = self.lock_result(LockStatus::Accepted);
                Ok(vec![WitnessAction::BroadcastLockResult(result)])
            }

            (WitnessState::AwaitingConsumerSignature, WitnessEvent::ConsumerSignatureReceived(signature)) => {
                self.consumer_signature = Some(signature);
                self.state = WitnessState::Committed;
                let result = self.lock_result(LockStatus::Accepted);
                Ok(vec![WitnessAction::BroadcastLockResult(result)])
            }

            (WitnessState::AwaitingConsumerSignature, WitnessEvent::ConsumerSignatureTimeout) => {
                self.state = WitnessState::Abandoned("consumer_abandoned".to_string());
                Ok(vec![WitnessAction::RecordAbandonment {
                    session_id: self.session_id.clone(),
                    reason: "consumer_abandoned".to_string(),
                }])
            }

            (WitnessState::Committed, WitnessEvent::LivenessPingDue) => {
                self.state = WitnessState::MonitoringLiveness;
                Ok(vec![WitnessAction::SendLivenessPing])
            }

            (WitnessState::MonitoringLiveness, WitnessEvent::LivenessPingDue) => Ok(vec![WitnessAction::SendLivenessPing]),

            (WitnessState::MonitoringLiveness, WitnessEvent::LivenessPongMissed { from }) => {
                Ok(vec![WitnessAction::RequestRecruitment { round: 0, replacing: from }])
            }

            (state, event) => anyhow::bail!("event {event:?} is not valid in state {state:?}"),
        }
    }
}
