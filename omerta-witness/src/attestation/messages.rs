//! Wire message schemas for Transaction 01 (cabal attestation), §4.9.

use serde::{Deserialize, Serialize};

use omerta_crypto::types::Signature;
use omerta_crypto::PeerId;

use crate::types::{SessionId, TerminationReason};

pub const CHANNEL_VM_ALLOCATED: &str = "witness-vm-allocated";
pub const CHANNEL_VM_CONNECTIVITY_VOTE: &str = "witness-vm-connectivity-vote";
pub const CHANNEL_VM_CANCELLED: &str = "witness-vm-cancelled";
pub const CHANNEL_CABAL_ATTESTATION: &str = "witness-cabal-attestation";

/// Provider → each witness: opens the attestation round once a lock is
/// final and a VM has been allocated for the session (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmAllocated {
    pub session_id: SessionId,
    pub vm_wireguard_pubkey: Vec<u8>,
    pub consumer_endpoint: String,
    pub cabal_endpoints: Vec<String>,
    pub allocated_at: u64,
    pub lock_result_hash: omerta_crypto::types::Hash,
}

/// Witness ↔ witness: opinion on VM reachability and consumer attachment,
/// tallied against [`crate::params::connectivity_votes_required`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmConnectivityVote {
    pub session_id: SessionId,
    pub witness: PeerId,
    pub can_reach_vm: bool,
    pub consumer_attached: bool,
}

/// Provider → witnesses: session end, on either party's action, a voted
/// abort, or expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmCancelled {
    pub session_id: SessionId,
    pub reason: TerminationReason,
    pub actual_duration_seconds: u64,
}

/// Witnesses → network: the collaborative, multi-signed statement that
/// settlement reads as required input (out of scope here, §4.9 final
/// sentence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CabalAttestationBroadcast {
    pub session_id: SessionId,
    pub reason: TerminationReason,
    pub actual_duration_seconds: u64,
    pub signatures: Vec<Signature>,
}
