//! Peer registry: the known-peer set, keyed by peer id, with a 5-minute
//! announcement TTL and periodic cleanup (§4.3).

use std::collections::HashMap;
use std::sync::Arc;

use omerta_crypto::Clock;
use parking_lot::RwLock;

use crate::types::{PeerAnnouncement, PeerId};

/// Announcements older than this are considered stale and removed by
/// [`PeerRegistry::cleanup_expired`].
pub const ANNOUNCEMENT_TTL_SECS: u64 = 5 * 60;

#[derive(Debug, Clone)]
pub struct DiscoveredPeer {
    pub announcement: PeerAnnouncement,
    pub last_seen_unix_secs: u64,
}

#[derive(Clone)]
pub struct PeerRegistry {
    peers: Arc<RwLock<HashMap<PeerId, DiscoveredPeer>>>,
    clock: Arc<dyn Clock>,
}

impl PeerRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        PeerRegistry { peers: Arc::new(RwLock::new(HashMap::new())), clock }
    }

    /// Record or refresh a peer's announcement, stamping `last_seen` with
    /// the current time.
    pub fn upsert(&self, announcement: PeerAnnouncement) {
        let now = self.clock.now_unix_secs();
        self.peers.write().insert(
            announcement.peer_id.clone(),
            DiscoveredPeer { announcement, last_seen_unix_secs: now },
        );
    }

    pub fn get(&self, peer_id: &str) -> Option<DiscoveredPeer> {
        self.peers.read().get(peer_id).cloned()
    }

    pub fn remove(&self, peer_id: &str) {
        self.peers.write().remove(peer_id);
    }

    pub fn known_peers(&self) -> Vec<PeerId> {
        self.peers.read().keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<DiscoveredPeer> {
        self.peers.read().values().cloned().collect()
    }

    /// Drop any announcement whose `last_seen` is older than
    /// [`ANNOUNCEMENT_TTL_SECS`]. Intended to be called on a fixed
    /// interval by the owning actor's timer loop.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_unix_secs();
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|_, p| now.saturating_sub(p.last_seen_unix_secs) < ANNOUNCEMENT_TTL_SECS);
        before - peers.len()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
