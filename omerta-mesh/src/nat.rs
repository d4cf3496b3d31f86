//! NAT classification and connection-method selection (§4.2).
//!
//! Real STUN exchanges against bootstrap nodes are network I/O external to
//! this crate's unit tests, so the exchange itself is behind the
//! [`StunClient`] trait; `connection_method` is the pure decision function
//! the transport calls once a [`NatClass`] is known.

use async_trait::async_trait;

use crate::types::{PeerId, ReachabilityPath};

/// Result of a STUN-assisted NAT classification at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatClass {
    Open,
    FullCone,
    RestrictedCone,
    PortRestricted,
    Symmetric,
    Blocked,
    Unknown,
}

/// Bootstrap-node STUN exchange, external to unit tests.
#[async_trait]
pub trait StunClient: Send + Sync {
    async fn classify(&self) -> anyhow::Result<NatClass>;
}

/// A peer's known public reachability, as tracked by the registry/transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerReachability {
    /// Peer is reachable at a known endpoint without punching (IPv6, or
    /// `FullCone`/`RestrictedCone` behind a NAT we have an endpoint for).
    PubliclyReachable,
    /// Peer's endpoint is known but a NAT requires a coordinated hole-punch.
    RequiresHolePunch,
    /// No usable endpoint; must relay.
    Unreachable,
}

/// Decide how to reach a peer given our own NAT class and what we know
/// about theirs, plus whether at least one relay-capable peer is known.
/// Symmetric NAT always forces relay (§4.2). Relay hops are capped at 1
/// unless the caller explicitly configures more.
pub fn connection_method(
    our_nat: NatClass,
    their_reachability: PeerReachability,
    relay_candidate: Option<PeerId>,
) -> anyhow::Result<ConnectionMethod> {
    if our_nat == NatClass::Symmetric {
        return relay_candidate
            .map(ConnectionMethod::Relay)
            .ok_or_else(|| anyhow::anyhow!("symmetric NAT requires a relay but none is known"));
    }

    match their_reachability {
        PeerReachability::PubliclyReachable => Ok(ConnectionMethod::Direct),
        PeerReachability::RequiresHolePunch => {
            if relay_candidate.is_some() {
                Ok(ConnectionMethod::HolePunched)
            } else {
                Err(anyhow::anyhow!("hole-punch requires at least one relay-capable peer"))
            }
        }
        PeerReachability::Unreachable => relay_candidate
            .map(ConnectionMethod::Relay)
            .ok_or_else(|| anyhow::anyhow!("peer unreachable and no relay is known")),
    }
}

/// The connection method chosen for a `Connection`, mirroring
/// [`ReachabilityPath`] but distinguishing hole-punched from relay for
/// transport bookkeeping (freshness only cares about the structural
/// direct/relay distinction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMethod {
    Direct,
    HolePunched,
    Relay(PeerId),
}

impl ConnectionMethod {
    pub fn as_reachability_path(&self) -> ReachabilityPath {
        match self {
            ConnectionMethod::Direct => ReachabilityPath::Direct,
            ConnectionMethod::HolePunched => ReachabilityPath::HolePunched,
            ConnectionMethod::Relay(via) => ReachabilityPath::Relay(via.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_nat_always_relays() {
        let result = connection_method(NatClass::Symmetric, PeerReachability::PubliclyReachable, Some("r1".into()));
        assert_eq!(result.unwrap(), ConnectionMethod::Relay("r1".into()));
    }

    #[test]
    fn symmetric_nat_without_relay_fails() {
        let result = connection_method(NatClass::Symmetric, PeerReachability::PubliclyReachable, None);
        assert!(result.is_err());
    }

    #[test]
    fn open_nat_with_reachable_peer_goes_direct() {
        let result = connection_method(NatClass::Open, PeerReachability::PubliclyReachable, None);
        assert_eq!(result.unwrap(), ConnectionMethod::Direct);
    }

    #[test]
    fn restricted_peer_falls_back_to_hole_punch_then_relay() {
        let punched = connection_method(NatClass::RestrictedCone, PeerReachability::RequiresHolePunch, Some("r1".into()));
        assert_eq!(punched.unwrap(), ConnectionMethod::HolePunched);

        let unreachable = connection_method(NatClass::RestrictedCone, PeerReachability::Unreachable, Some("r1".into()));
        assert_eq!(unreachable.unwrap(), ConnectionMethod::Relay("r1".into()));
    }
}
