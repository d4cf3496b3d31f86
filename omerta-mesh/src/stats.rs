//! Mesh transport statistics exposed via `MeshTransport::statistics()`.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct MeshStatisticsInner {
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub direct_connections: AtomicU64,
    pub hole_punched_connections: AtomicU64,
    pub relayed_connections: AtomicU64,
    pub envelopes_dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStatistics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub direct_connections: u64,
    pub hole_punched_connections: u64,
    pub relayed_connections: u64,
    pub envelopes_dropped: u64,
}

impl MeshStatisticsInner {
    pub fn snapshot(&self) -> MeshStatistics {
        MeshStatistics {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            direct_connections: self.direct_connections.load(Ordering::Relaxed),
            hole_punched_connections: self.hole_punched_connections.load(Ordering::Relaxed),
            relayed_connections: self.relayed_connections.load(Ordering::Relaxed),
            envelopes_dropped: self.envelopes_dropped.load(Ordering::Relaxed),
        }
    }

    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_received(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_dropped_envelope(&self) {
        self.envelopes_dropped.fetch_add(1, Ordering::Relaxed);
    }
}
