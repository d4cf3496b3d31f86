//! Omerta mesh overlay.
//!
//! Peer identity, NAT traversal and signed/encrypted message routing
//! (§4.2), the peer registry and three-part freshness tracker (§4.3).
//! Higher layers (VM protocol, witness consensus) talk to peers
//! exclusively through [`transport::MeshTransport`] channels — there is no
//! shared mailbox (§4.2).

pub mod channels;
pub mod freshness;
pub mod nat;
pub mod registry;
pub mod stats;
pub mod transport;
pub mod types;

pub use channels::{ChannelHandler, ChannelRouter};
pub use freshness::FreshnessManager;
pub use nat::{connection_method, ConnectionMethod, NatClass, PeerReachability, StunClient};
pub use registry::{DiscoveredPeer, PeerRegistry, ANNOUNCEMENT_TTL_SECS};
pub use stats::MeshStatistics;
pub use transport::{Connection, MeshTransport, PacketDevice, UdpPacketDevice};
pub use types::{
    CpuArchitecture, GpuSpec, NetworkId, PeerAnnouncement, PeerId, PeerMetadata, ReachabilityPath,
    RecentContact, ResourceCapability, ResourceRequirements,
};

use std::sync::Arc;

/// Non-owning handle bundle passed to components at startup, so the mesh
/// transport, peer registry and freshness manager can refer to each other
/// without holding back-pointers into one another (§9 design note on
/// cyclic references).
pub struct Services {
    pub transport: Arc<MeshTransport>,
    pub registry: PeerRegistry,
    pub freshness: Arc<FreshnessManager<MeshTransport>>,
}

impl Services {
    pub fn new(transport: Arc<MeshTransport>, registry: PeerRegistry, clock: Arc<dyn omerta_crypto::Clock>) -> Self {
        let freshness = Arc::new(FreshnessManager::new(transport.clone(), clock));
        Services { transport, registry, freshness }
    }
}

/// A STUN classifier that never actually talks to a bootstrap node; used
/// where no STUN infrastructure is configured, defaulting every peer to
/// relay-eligible routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStunClient;

#[async_trait::async_trait]
impl StunClient for NoopStunClient {
    async fn classify(&self) -> anyhow::Result<NatClass> {
        Ok(NatClass::Unknown)
    }
}
