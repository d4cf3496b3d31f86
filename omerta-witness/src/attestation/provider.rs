//! Provider-side cabal-attestation state machine (§4.9): allocate a VM,
//! announce it to the cabal, monitor, and report termination.

use omerta_crypto::types::Hash;
use omerta_crypto::PeerId;

use crate::attestation::messages::{VmAllocated, VmCancelled};
use crate::types::{SessionId, TerminationReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderAttestationState {
    Idle,
    AllocatingVm,
    AwaitingConnectivityOutcome,
    Monitoring,
    Terminating,
    Done,
}

#[derive(Debug, Clone)]
pub enum ProviderAttestationEvent {
    LockFinalized { vm_wireguard_pubkey: Vec<u8>, consumer_endpoint: String, lock_result_hash: Hash },
    ConnectivityEstablished,
    ConnectivityAborted,
    SessionEnded { reason: TerminationReason, actual_duration_seconds: u64 },
    AttestationObserved,
}

#[derive(Debug, Clone)]
pub enum ProviderAttestationAction {
    SendVmAllocated(VmAllocated),
    SendVmCancelled(VmCancelled),
}

pub struct ProviderAttestationSession {
    pub session_id: SessionId,
    pub provider: PeerId,
    pub cabal: Vec<PeerId>,
    pub cabal_endpoints: Vec<String>,
    pub state: ProviderAttestationState,
}

impl ProviderAttestationSession {
    pub fn new(session_id: SessionId, provider: PeerId, cabal: Vec<PeerId>, cabal_endpoints: Vec<String>) -> Self {
        ProviderAttestationSession {
            session_id,
            provider,
            cabal,
            cabal_endpoints,
            state: ProviderAttestationState::Idle,
        }
    }

    pub fn handle(&mut self, event: ProviderAttestationEvent) -> anyhow::Result<Vec<ProviderAttestationAction>> {
        match (self.state.clone(), event) {
            (
                ProviderAttestationState::Idle,
                ProviderAttestationEvent::LockFinalized { vm_wireguard_pubkey, consumer_endpoint, lock_result_hash },
            ) => {
                self.state = ProviderAttestationState::AllocatingVm;
                let announcement = VmAllocated {
                    session_id: self.session_id.clone(),
                    vm_wireguard_pubkey,
                    consumer_endpoint,
                    cabal_endpoints: self.cabal_endpoints.clone(),
                    allocated_at: 0,
                    lock_result_hash,
                };
                self.state = ProviderAttestationState::AwaitingConnectivityOutcome;
                Ok(vec![ProviderAttestationAction::SendVmAllocated(announcement)])
            }

            (ProviderAttestationState::AwaitingConnectivityOutcome, ProviderAttestationEvent::ConnectivityEstablished) => {
                self.state = ProviderAttestationState::Monitoring;
                Ok(vec![])
            }

            (ProviderAttestationState::AwaitingConnectivityOutcome, ProviderAttestationEvent::ConnectivityAborted) => {
                self.state = ProviderAttestationState::Terminating;
                Ok(vec![ProviderAttestationAction::SendVmCancelled(VmCancelled {
                    session_id: self.session_id.clone(),
                    reason: TerminationReason::ConnectivityFailed,
                    actual_duration_seconds: 0,
                })])
            }

            (ProviderAttestationState::Monitoring, ProviderAttestationEvent::SessionEnded { reason, actual_duration_seconds }) => {
                self.state = ProviderAttestationState::Terminating;
                Ok(vec![ProviderAttestationAction::SendVmCancelled(VmCancelled {
                    session_id: self.session_id.clone(),
                    reason,
                    actual_duration_seconds,
                })])
            }

            (ProviderAttestationState::Terminating, ProviderAttestationEvent::AttestationObserved) => {
                self.state = ProviderAttestationState::Done;
                Ok(vec![])
            }

            (state, event) => anyhow::bail!("event {event:?} is not valid in state {state:?}"),
        }
    }
}
