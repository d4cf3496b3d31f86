//! Wire message schemas for Transaction 00 (escrow lock), §4.8. Channel
//! names are assigned by the node binary that wires these onto mesh
//! transport channels (§4.4's pattern, generalized); this crate only
//! defines the payloads.

use serde::{Deserialize, Serialize};

use omerta_crypto::types::Signature;
use omerta_crypto::PeerId;

use crate::chain::{ChainSegment, Checkpoint};
use crate::types::{SessionId, WitnessLockResult};

pub const CHANNEL_WITNESS_LOCK_INTENT: &str = "witness-lock-intent";
pub const CHANNEL_WITNESS_COMMITMENT: &str = "witness-commitment";
pub const CHANNEL_WITNESS_LOCK_REQUEST: &str = "witness-lock-request";
pub const CHANNEL_WITNESS_PRELIMINARY_VERDICT: &str = "witness-preliminary-verdict";
pub const CHANNEL_WITNESS_FINAL_VOTE: &str = "witness-final-vote";
pub const CHANNEL_WITNESS_LOCK_RESULT: &str = "witness-lock-result";
pub const CHANNEL_WITNESS_CONSUMER_SIGNED_LOCK: &str = "witness-consumer-signed-lock";
pub const CHANNEL_WITNESS_LIVENESS_PING: &str = "witness-liveness-ping";
pub const CHANNEL_WITNESS_LIVENESS_PONG: &str = "witness-liveness-pong";
pub const CHANNEL_WITNESS_RECRUITMENT: &str = "witness-recruitment";

/// Consumer → provider: opens a lock round, binding it to a checkpoint the
/// consumer recorded before this interaction (§4.8 "Consumer").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockIntent {
    pub session_id: SessionId,
    pub consumer: PeerId,
    pub provider: PeerId,
    pub amount: u64,
    pub checkpoint: Checkpoint,
    pub consumer_nonce: Vec<u8>,
}

/// Provider → consumer: proposes a cabal, reproducible via
/// `SELECT_WITNESSES(H(sessionId|providerNonce|consumerNonce), ...)`
/// (§4.8 "Provider").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessCommitment {
    pub session_id: SessionId,
    pub provider_nonce: Vec<u8>,
    pub chain_segment: ChainSegment,
    pub proposed_witnesses: Vec<PeerId>,
}

/// Consumer → each witness: `SENDING_REQUESTS` (§4.8 "Consumer" step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRequest {
    pub session_id: SessionId,
    pub consumer: PeerId,
    pub provider: PeerId,
    pub amount: u64,
    pub witnesses: Vec<PeerId>,
}

/// Witness ↔ witness: non-binding opinion exchanged before the consensus
/// evaluation (§4.8 "Witness").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreliminaryVerdict {
    pub session_id: SessionId,
    pub witness: PeerId,
    pub accept: bool,
    pub observed_balance: u64,
}

/// Witness ↔ witness: the binding vote collected into the multi-sig
/// `LOCK_RESULT` once consensus is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalVote {
    pub session_id: SessionId,
    pub witness: PeerId,
    pub accept: bool,
    pub signature: Signature,
}

/// Broadcast on the network once `WitnessLockResult::is_final` holds.
/// §3: "Never broadcast non-final results as `BALANCE_LOCK`."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceUpdateBroadcast {
    pub lock_result: WitnessLockResult,
}

/// Consumer → cabal: the counter-signature finality requires (§3, §8
/// scenario 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerSignedLock {
    pub session_id: SessionId,
    pub signature: Signature,
}

/// Periodic witness liveness check (§4.8 "Witness",
/// `LIVENESS_CHECK_INTERVAL=300s`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessPing {
    pub session_id: SessionId,
    pub from: PeerId,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessPong {
    pub session_id: SessionId,
    pub from: PeerId,
    pub timestamp: u64,
}

/// Recruitment of a replacement witness when one goes offline
/// (`MAX_RECRUITMENT_ROUNDS=3`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecruitmentRequest {
    pub session_id: SessionId,
    pub round: u32,
    pub replacing: PeerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecruitmentResponse {
    pub session_id: SessionId,
    pub round: u32,
    pub candidate: PeerId,
    pub accept: bool,
}
