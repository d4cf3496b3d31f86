//! Fixed parameters for the witness-consensus protocols (§4.8), shared by
//! both Transaction 00 (escrow lock) and Transaction 01 (cabal
//! attestation). All are implementation-wide constants, not per-session
//! configuration.

/// Number of witnesses in a cabal.
pub const WITNESS_COUNT: usize = 5;

/// Minimum valid witness signatures for a `LockResult` to be final (§3, §4.8).
pub const WITNESS_THRESHOLD: usize = 3;

/// Fraction of the cabal that must agree for the witness consensus round
/// itself to conclude (distinct from the signature threshold above).
pub const CONSENSUS_THRESHOLD: f64 = 0.67;

/// Fraction of the cabal that must vote a VM reachable for attestation
/// monitoring to proceed (§4.9).
pub const CONNECTIVITY_THRESHOLD: f64 = 0.67;

pub const PRELIMINARY_TIMEOUT_SECS: u64 = 30;
pub const CONSENSUS_TIMEOUT_SECS: u64 = 60;
pub const RECRUITMENT_TIMEOUT_SECS: u64 = 120;
pub const MAX_RECRUITMENT_ROUNDS: u32 = 3;
pub const CONSUMER_SIGNATURE_TIMEOUT_SECS: u64 = 60;
pub const LIVENESS_CHECK_INTERVAL_SECS: u64 = 300;

/// Provider's witness-selection constraints (§4.8 "Provider" state).
pub const PROVIDER_SELECTION_MIN_HIGH_TRUST: usize = 2;
pub const PROVIDER_SELECTION_MAX_PRIOR_INTERACTIONS: u32 = 5;

/// Minimum number of cabal signatures to produce a `CABAL_ATTESTATION` (§4.9).
pub const ATTESTATION_THRESHOLD: usize = 3;

fn required_votes(cabal_size: usize, fraction: f64) -> usize {
    ((cabal_size as f64) * fraction).ceil() as usize
}

/// Votes required out of `cabal_size` to clear [`CONSENSUS_THRESHOLD`].
pub fn consensus_votes_required(cabal_size: usize) -> usize {
    required_votes(cabal_size, CONSENSUS_THRESHOLD)
}

/// Votes required out of `cabal_size` to clear [`CONNECTIVITY_THRESHOLD`].
pub fn connectivity_votes_required(cabal_size: usize) -> usize {
    required_votes(cabal_size, CONNECTIVITY_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_witness_cabal_needs_four_votes_for_consensus() {
        // ceil(5 * 0.67) = ceil(3.35) = 4
        assert_eq!(consensus_votes_required(5), 4);
    }

    #[test]
    fn three_witness_cabal_needs_two_votes() {
        assert_eq!(consensus_votes_required(3), 2);
    }
}
