//! `MeshTransport`: the cooperative, asynchronous transport API described
//! in §4.2 — `connect`, `send`, `sendOnChannel`, `onChannel`, `broadcast`,
//! `knownPeers`, `statistics` — built over a single owned [`PacketDevice`]
//! (the UDP socket, or a fake in tests).

use std::sync::{Arc, RwLock as StdRwLock};

use async_trait::async_trait;
use omerta_crypto::{Clock, KeyPair, PublicKey};
use omerta_wire::{MeshEnvelope, NetworkKey, NetworkRegistry};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::channels::{ChannelHandler, ChannelRouter};
use crate::freshness::FreshnessBroadcaster;
use crate::nat::{connection_method, ConnectionMethod, NatClass, PeerReachability};
use crate::registry::PeerRegistry;
use crate::stats::{MeshStatistics, MeshStatisticsInner};
use crate::types::{NetworkId, PeerId};

/// The socket this node owns exclusively; only the transport writes to it
/// (§5). Abstracted so tests can substitute an in-memory fake instead of
/// binding a real UDP port.
#[async_trait]
pub trait PacketDevice: Send + Sync {
    async fn send_to(&self, data: &[u8], addr: &str) -> anyhow::Result<()>;
    async fn recv_from(&self) -> anyhow::Result<(Vec<u8>, String)>;
}

/// Production [`PacketDevice`] backed by a real UDP socket.
pub struct UdpPacketDevice {
    socket: tokio::net::UdpSocket,
}

impl UdpPacketDevice {
    pub async fn bind(addr: &str) -> anyhow::Result<Self> {
        let socket = tokio::net::UdpSocket::bind(addr).await?;
        Ok(UdpPacketDevice { socket })
    }
}

#[async_trait]
impl PacketDevice for UdpPacketDevice {
    async fn send_to(&self, data: &[u8], addr: &str) -> anyhow::Result<()> {
        self.socket.send_to(data, addr).await?;
        Ok(())
    }

    async fn recv_from(&self) -> anyhow::Result<(Vec<u8>, String)> {
        let mut buf = vec![0u8; 65535];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok((buf, from.to_string()))
    }
}

/// A resolved connection to a peer: where to send, and by what method.
#[derive(Debug, Clone)]
pub struct Connection {
    pub endpoint: String,
    pub method: ConnectionMethod,
}

pub struct MeshTransport {
    identity: KeyPair,
    our_peer_id: PeerId,
    network_id: NetworkId,
    network_registry: NetworkRegistry,
    packet_device: Arc<dyn PacketDevice>,
    registry: PeerRegistry,
    channels: ChannelRouter,
    stats: MeshStatisticsInner,
    clock: Arc<dyn Clock>,
    nat_class: StdRwLock<NatClass>,
}

impl MeshTransport {
    pub fn new(
        identity: KeyPair,
        network_id: impl Into<NetworkId>,
        network_key: NetworkKey,
        packet_device: Arc<dyn PacketDevice>,
        registry: PeerRegistry,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let network_id = network_id.into();
        let network_registry = NetworkRegistry::new();
        network_registry.insert(network_id.clone(), network_key)?;
        let our_peer_id = identity.public_key.peer_id();

        Ok(MeshTransport {
            identity,
            our_peer_id,
            network_id,
            network_registry,
            packet_device,
            registry,
            channels: ChannelRouter::new(),
            stats: MeshStatisticsInner::default(),
            clock,
            nat_class: StdRwLock::new(NatClass::Unknown),
        })
    }

    pub fn our_peer_id(&self) -> &str {
        &self.our_peer_id
    }

    pub fn set_nat_class(&self, class: NatClass) {
        *self.nat_class.write().unwrap() = class;
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Resolve how to reach `peer_id`, preferring direct over hole-punched
    /// over relay (§4.2 selection policy).
    pub fn connect(&self, peer_id: &str) -> anyhow::Result<Connection> {
        let peer = self.registry.get(peer_id).ok_or_else(|| anyhow::anyhow!("no route to peer {peer_id}"))?;

        let reachability = if peer.announcement.endpoint.is_empty() {
            PeerReachability::Unreachable
        } else {
            PeerReachability::PubliclyReachable
        };

        let relay_candidate = self
            .registry
            .known_peers()
            .into_iter()
            .find(|id| id.as_str() != peer_id && id.as_str() != self.our_peer_id.as_str());

        let our_nat = *self.nat_class.read().unwrap();
        let method = connection_method(our_nat, reachability, relay_candidate)?;

        let endpoint = match &method {
            ConnectionMethod::Relay(via) => self
                .registry
                .get(via)
                .map(|p| p.announcement.endpoint)
                .unwrap_or(peer.announcement.endpoint),
            _ => peer.announcement.endpoint,
        };

        match method {
            ConnectionMethod::Direct => self.stats.direct_connections.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            ConnectionMethod::HolePunched => {
                self.stats.hole_punched_connections.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            }
            ConnectionMethod::Relay(_) => self.stats.relayed_connections.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
        };

        Ok(Connection { endpoint, method })
    }

    /// Sign, encrypt and send a raw JSON payload to `peer_id`.
    pub async fn send(&self, peer_id: &str, payload: Value) -> anyhow::Result<()> {
        let connection = self.connect(peer_id)?;

        let envelope = MeshEnvelope::new_signed(
            &self.identity,
            self.our_peer_id.clone(),
            Some(peer_id.to_string()),
            payload,
            self.clock.now_unix_secs(),
        )?;

        let key = self.network_registry.get(&self.network_id)?;
        let frame = omerta_wire::seal(&self.network_id, &key, &envelope)?;
        self.packet_device.send_to(&frame, &connection.endpoint).await?;
        self.stats.record_sent(frame.len());
        Ok(())
    }

    /// Send `data` tagged with `channel`, the only way higher layers
    /// communicate over the mesh (§4.2).
    pub async fn send_on_channel(&self, peer_id: &str, channel: &str, data: Value) -> anyhow::Result<()> {
        self.send(peer_id, json!({ "channel": channel, "data": data })).await
    }

    /// Register (or replace) the handler for `channel`. Last registration
    /// wins; the previous handler is deregistered.
    pub fn on_channel(&self, channel: impl Into<String>, handler: ChannelHandler) {
        self.channels.on_channel(channel, handler);
    }

    /// Best-effort flood broadcast to every known peer, capped at
    /// `max_hops` (carried in the payload for any peer that chooses to
    /// re-broadcast with a decremented count; this transport does not
    /// itself re-broadcast inbound messages).
    pub async fn broadcast(&self, channel: &str, data: Value, max_hops: u8) {
        for peer_id in self.registry.known_peers() {
            if peer_id == self.our_peer_id {
                continue;
            }
            let payload = json!({ "channel": channel, "data": data, "hopsRemaining": max_hops });
            if let Err(e) = self.send(&peer_id, payload).await {
                debug!(peer = %peer_id, error = %e, "broadcast send failed");
            }
        }
    }

    pub fn known_peers(&self) -> Vec<PeerId> {
        self.registry.known_peers()
    }

    pub fn statistics(&self) -> MeshStatistics {
        self.stats.snapshot()
    }

    /// Process one inbound raw UDP frame: decode, verify, and dispatch to
    /// the matching channel handler. Any failure in the decrypt/verify
    /// chain is logged at `debug!` and dropped silently, per the transport
    /// error policy (§7, §9) — never surfaced, never acknowledged.
    pub fn handle_inbound_frame(&self, frame: &[u8]) {
        let lookup = |peer_id: &str| self.registry.get(peer_id).map(|p| p.announcement.public_key);
        match omerta_wire::open(frame, &self.network_registry, lookup, self.clock.now_unix_secs()) {
            Ok(envelope) => {
                self.stats.record_received(frame.len());
                let channel = envelope.payload.get("channel").and_then(Value::as_str).map(str::to_string);
                let data = envelope.payload.get("data").cloned().unwrap_or(Value::Null);
                if let Some(channel) = channel {
                    self.channels.dispatch(&channel, envelope.from_peer, data);
                }
            }
            Err(e) => {
                debug!(error = %e, "dropping invalid envelope");
                self.stats.record_dropped_envelope();
            }
        }
    }

    /// Drive the receive loop: blocks reading frames off the packet device
    /// forever, dispatching each to `handle_inbound_frame`. Intended to be
    /// spawned as the transport's own task.
    pub async fn run_receive_loop(self: Arc<Self>) {
        loop {
            match self.packet_device.recv_from().await {
                Ok((frame, _from)) => self.handle_inbound_frame(&frame),
                Err(e) => {
                    warn!(error = %e, "packet device recv failed");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl FreshnessBroadcaster for MeshTransport {
    async fn broadcast_who_has_recent(&self, peer_id: &str, max_age_secs: u64, max_hops: u8) {
        self.broadcast(
            "freshness-who-has-recent",
            json!({ "peerId": peer_id, "maxAcceptableAgeSecs": max_age_secs }),
            max_hops,
        )
        .await;
    }
}
