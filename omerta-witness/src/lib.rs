//! Omerta witness consensus.
//!
//! Escrow lock (Transaction 00, §4.8) and cabal attestation (Transaction
//! 01, §4.9) expressed as tagged-enum state machines with pure transition
//! functions `(state, event) -> (state', actions[])`, per the §9 design
//! note — I/O (sending messages, waiting on timers) stays in the caller,
//! not in these types.

pub mod attestation;
pub mod chain;
pub mod escrow;
pub mod params;
pub mod selection;
pub mod types;

pub use chain::{ChainEntry, ChainSegment, ChainStateAtCheckpoint, Checkpoint};
pub use params::{
    consensus_votes_required, connectivity_votes_required, ATTESTATION_THRESHOLD, CONNECTIVITY_THRESHOLD,
    CONSENSUS_THRESHOLD, CONSENSUS_TIMEOUT_SECS, CONSUMER_SIGNATURE_TIMEOUT_SECS, LIVENESS_CHECK_INTERVAL_SECS,
    MAX_RECRUITMENT_ROUNDS, PRELIMINARY_TIMEOUT_SECS, PROVIDER_SELECTION_MAX_PRIOR_INTERACTIONS,
    PROVIDER_SELECTION_MIN_HIGH_TRUST, RECRUITMENT_TIMEOUT_SECS, WITNESS_COUNT, WITNESS_THRESHOLD,
};
pub use selection::{select_witnesses, selection_seed, SelectionCriteria, WitnessCandidate};
pub use types::{CabalAttestation, LockStatus, SessionId, TerminationReason, WitnessLockResult};

pub use escrow::consumer::{ConsumerAction, ConsumerEvent, ConsumerLockSession, ConsumerState};
pub use escrow::provider::{ProviderAction, ProviderEvent, ProviderLockSession, ProviderState};
pub use escrow::witness::{WitnessAction, WitnessEvent, WitnessParticipation, WitnessState};
pub use escrow::messages::{
    BalanceUpdateBroadcast, ConsumerSignedLock, FinalVote, LivenessPing, LivenessPong, LockIntent, LockRequest,
    PreliminaryVerdict, RecruitmentRequest, RecruitmentResponse, WitnessCommitment, CHANNEL_WITNESS_COMMITMENT,
    CHANNEL_WITNESS_CONSUMER_SIGNED_LOCK, CHANNEL_WITNESS_FINAL_VOTE, CHANNEL_WITNESS_LIVENESS_PING,
    CHANNEL_WITNESS_LIVENESS_PONG, CHANNEL_WITNESS_LOCK_INTENT, CHANNEL_WITNESS_LOCK_REQUEST,
    CHANNEL_WITNESS_LOCK_RESULT, CHANNEL_WITNESS_PRELIMINARY_VERDICT, CHANNEL_WITNESS_RECRUITMENT,
};

pub use attestation::cabal::{
    CabalAttestationAction, CabalAttestationEvent, CabalAttestationParticipation, CabalAttestationState,
};
pub use attestation::consumer::{ConsumerAttestationView, ConsumerSessionEvent, ConsumerSessionState};
pub use attestation::provider::{ProviderAttestationAction, ProviderAttestationEvent, ProviderAttestationSession, ProviderAttestationState};
pub use attestation::messages::{
    CabalAttestationBroadcast, VmAllocated, VmCancelled, VmConnectivityVote, CHANNEL_CABAL_ATTESTATION,
    CHANNEL_VM_ALLOCATED, CHANNEL_VM_CANCELLED, CHANNEL_VM_CONNECTIVITY_VOTE,
};
