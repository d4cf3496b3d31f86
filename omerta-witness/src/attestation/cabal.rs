//! Witness-side cabal-attestation state machine (§4.9): verify reachability
//! to the allocated VM, vote on connectivity, monitor, then collaboratively
//! attest to how the session ended.

use std::collections::HashMap;

use omerta_crypto::types::{PublicKey, Signature};
use omerta_crypto::{MultiSig, PeerId};

use crate::attestation::messages::VmConnectivityVote;
use crate::params::{connectivity_votes_required, ATTESTATION_THRESHOLD};
use crate::types::{CabalAttestation, SessionId, TerminationReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CabalAttestationState {
    Idle,
    VerifyingConnectivity,
    ExchangingConnectivityVotes,
    Monitoring,
    VotingAbort,
    AwaitingTermination,
    AggregatingAttestation,
    Committed,
}

#[derive(Debug, Clone)]
pub enum CabalAttestationEvent {
    VmAllocationReceived,
    ConnectivityChecked { can_reach_vm: bool, consumer_attached: bool },
    PeerVoteReceived(VmConnectivityVote),
    ConnectivityVotingTimeout,
    TerminationReceived { reason: TerminationReason, actual_duration_seconds: u64 },
    PeerAttestationSignatureReceived(Signature),
}

#[derive(Debug, Clone)]
pub enum CabalAttestationAction {
    BroadcastConnectivityVote(VmConnectivityVote),
    SignAndBroadcastAttestation(CabalAttestation),
}

pub struct CabalAttestationParticipation {
    pub session_id: SessionId,
    pub witness: PublicKey,
    pub cabal: Vec<PeerId>,
    pub state: CabalAttestationState,
    own_vote: Option<(bool, bool)>,
    peer_votes: HashMap<PeerId, (bool, bool)>,
    multisig: Option<MultiSig>,
}

impl CabalAttestationParticipation {
    pub fn new(session_id: SessionId, witness: PublicKey, cabal: Vec<PeerId>) -> Self {
        CabalAttestationParticipation {
            session_id,
            witness,
            cabal,
            state: CabalAttestationState::Idle,
            own_vote: None,
            peer_votes: HashMap::new(),
            multisig: None,
        }
    }

    /// `≥ CONNECTIVITY_THRESHOLD=0.67` of the cabal must see the VM reachable
    /// and the consumer attached (§4.9).
    fn connectivity_reached(&self) -> bool {
        let reachable = self.peer_votes.values().filter(|(reach, attached)| *reach && *attached).count()
            + usize::from(self.own_vote == Some((true, true)));
        reachable >= connectivity_votes_required(self.cabal.len())
    }

    pub fn handle(&mut self, event: CabalAttestationEvent) -> anyhow::Result<Vec<CabalAttestationAction>> {
        match (self.state.clone(), event) {
            (CabalAttestationState::Idle, CabalAttestationEvent::VmAllocationReceived) => {
                self.state = CabalAttestationState::VerifyingConnectivity;
                Ok(vec![])
            }

            (CabalAttestationState::VerifyingConnectivity, CabalAttestationEvent::ConnectivityChecked { can_reach_vm, consumer_attached }) => {
                self.own_vote = Some((can_reach_vm, consumer_attached));
                self.state = CabalAttestationState::ExchangingConnectivityVotes;
                Ok(vec![CabalAttestationAction::BroadcastConnectivityVote(VmConnectivityVote {
                    session_id: self.session_id.clone(),
                    witness: self.witness.peer_id(),
                    can_reach_vm,
                    consumer_attached,
                })])
            }

            (CabalAttestationState::ExchangingConnectivityVotes, CabalAttestationEvent::PeerVoteReceived(vote)) => {
                self.peer_votes.insert(vote.witness, (vote.can_reach_vm, vote.consumer_attached));
                if self.peer_votes.len() + 1 >= self.cabal.len() {
                    self.state = if self.connectivity_reached() {
                        CabalAttestationState::Monitoring
                    } else {
                        CabalAttestationState::VotingAbort
                    };
                }
                Ok(vec![])
            }

            (CabalAttestationState::ExchangingConnectivityVotes, CabalAttestationEvent::ConnectivityVotingTimeout) => {
                self.state = if self.connectivity_reached() { CabalAttestationState::Monitoring } else { CabalAttestationState::VotingAbort };
                Ok(vec![])
            }

            (CabalAttestationState::VotingAbort, CabalAttestationEvent::TerminationReceived { reason, actual_duration_seconds }) => {
                self.begin_attestation(reason, actual_duration_seconds)
            }

            (CabalAttestationState::Monitoring, CabalAttestationEvent::TerminationReceived { reason, actual_duration_seconds }) => {
                self.begin_attestation(reason, actual_duration_seconds)
            }

            (CabalAttestationState::AggregatingAttestation, CabalAttestationEvent::PeerAttestationSignatureReceived(signature)) => {
                if let Some(multisig) = self.multisig.as_mut() {
                    if !multisig.participants.contains(&signature.public_key) {
                        multisig.participants.push(signature.public_key.clone());
                    }
                    let message = self.attestation_message()?;
                    multisig.add_signature(signature, &message)?;
                    if multisig.is_satisfied() {
                        self.state = CabalAttestationState::Committed;
                    }
                }
                Ok(vec![])
            }

            (state, event) => anyhow::bail!("event {event:?} is not valid in state {state:?}"),
        }
    }

    fn begin_attestation(&mut self, reason: TerminationReason, actual_duration_seconds: u64) -> anyhow::Result<Vec<CabalAttestationAction>> {
        self.state = CabalAttestationState::AggregatingAttestation;
        self.multisig = Some(MultiSig::new(ATTESTATION_THRESHOLD, vec![self.witness.clone()]));
        let attestation = CabalAttestation {
            session_id: self.session_id.clone(),
            reason,
            actual_duration_seconds,
            signatures: Vec::new(),
        };
        Ok(vec![CabalAttestationAction::SignAndBroadcastAttestation(attestation)])
    }

    fn attestation_message(&self) -> anyhow::Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct Fields<'a> {
            session_id: &'a str,
        }
        Ok(serde_json::to_vec(&Fields { session_id: &self.session_id })?)
    }
}
