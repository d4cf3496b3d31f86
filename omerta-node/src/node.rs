//! `OmertaNode`: composes identity, mesh transport, the VM protocol's
//! consumer and (optionally) provider sides, and the capability ports into
//! one running process, the way `zhtp/src/main.rs` composes its
//! `lib-network`/`lib-consensus`/etc. packages (§9: pass a `Services`
//! bundle by reference rather than back-pointers between components).

use std::sync::Arc;

use anyhow::{Context, Result};
use omerta_crypto::{KeyPair, OsRandomSource, SystemClock};
use omerta_mesh::transport::{MeshTransport, UdpPacketDevice};
use omerta_mesh::{NoopStunClient, PeerRegistry, StunClient};
use omerta_vm::ports::fakes::{FakeSshKeyStore, FakeTunnelDriver, FakeVmRuntime};
use omerta_vm::{ConsumerVmClient, EventLog, FilterManager, ProviderVmService, VmTracker, VpnOrchestrator};
use omerta_wire::NetworkKey;
use tracing::info;

use crate::config::NodeConfig;

/// A running Omerta node: one identity, one mesh transport, a consumer VM
/// client always present, and a provider daemon when `config.provider.enabled`.
///
/// The hypervisor/tunnel/SSH-keystore ports are out of scope for the core
/// (§1); this binary wires in the in-memory fakes from `omerta_vm::ports::fakes`
/// until a real collaborator is plugged in, keeping the composition root the
/// single place that decision is made.
pub struct OmertaNode {
    pub identity: KeyPair,
    pub transport: Arc<MeshTransport>,
    pub tracker: Arc<VmTracker>,
    pub consumer: Arc<ConsumerVmClient<FakeTunnelDriver>>,
    pub provider: Option<Arc<ProviderVmService<FakeVmRuntime>>>,
}

impl OmertaNode {
    pub async fn bootstrap(config: &NodeConfig) -> Result<Self> {
        let identity = KeyPair::generate().context("generating node identity keypair")?;
        info!(peer_id = %identity.public_key.peer_id(), "node identity established");

        let clock = Arc::new(SystemClock);
        let random = Arc::new(OsRandomSource);

        let network_key_bytes = hex::decode(&config.mesh.network_key_hex)
            .context("network_key_hex must be valid hex")?;
        let network_key_bytes: [u8; 32] = network_key_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("network_key_hex must decode to exactly 32 bytes"))?;
        let network_key = NetworkKey::from_bytes(network_key_bytes);

        let packet_device = Arc::new(
            UdpPacketDevice::bind(&config.mesh.listen_addr)
                .await
                .with_context(|| format!("binding mesh UDP socket on {}", config.mesh.listen_addr))?,
        );

        let registry = PeerRegistry::new(clock.clone());

        let transport = Arc::new(MeshTransport::new(
            identity.clone(),
            config.mesh.network_id.clone(),
            network_key,
            packet_device,
            registry,
            clock.clone(),
        )?);

        // NAT classification (§4.2) is deferred to a STUN exchange with
        // bootstrap nodes; absent that configuration, default to relay-eligible.
        let nat_class = NoopStunClient.classify().await.unwrap_or(omerta_mesh::NatClass::Unknown);
        transport.set_nat_class(nat_class);

        let data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => omerta_vm::resolve_home_dir()?.join(".omerta"),
        };

        let tracker = Arc::new(VmTracker::new(data_dir.join("vms").join("active.json")));
        tracker.load_persisted_vms().await.context("loading persisted VM tracker state")?;

        let tunnel_driver = FakeTunnelDriver::default();
        let vpn = Arc::new(VpnOrchestrator::new(tunnel_driver));
        let ssh_key_store = Arc::new(FakeSshKeyStore {
            public_key: "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAI-placeholder".to_string(),
            key_path: data_dir.join("ssh").join("id_ed25519.pub").to_string_lossy().to_string(),
        });

        let consumer = ConsumerVmClient::new(
            transport.clone(),
            tracker.clone(),
            vpn,
            ssh_key_store,
            clock.clone(),
            random.clone(),
        );

        let provider = if config.provider.enabled {
            let mut filter = FilterManager::new();
            filter.accept_trusted_only = config.provider.accept_trusted_only;
            filter.resource_limits.max_cpu_cores = config.provider.max_cpu_cores;
            filter.resource_limits.max_memory_mb = config.provider.max_memory_mb;
            filter.resource_limits.max_storage_mb = config.provider.max_storage_mb;

            let runtime = Arc::new(FakeVmRuntime::default());
            let event_log = Arc::new(EventLog::new(data_dir.join("logs")));

            Some(ProviderVmService::new(
                transport.clone(),
                runtime,
                filter,
                clock.clone(),
                event_log,
                config.mesh.network_id.clone(),
            ))
        } else {
            None
        };

        Ok(OmertaNode { identity, transport, tracker, consumer, provider })
    }

    /// Drive the node until its receive loop exits (socket error or
    /// shutdown). The provider's heartbeat loop, if present, runs
    /// concurrently; both are cooperative tasks per §5.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let receive_task = tokio::spawn(self.transport.clone().run_receive_loop());

        let heartbeat_task = self.provider.clone().map(|provider| tokio::spawn(provider.run_heartbeat_loop()));

        receive_task.await.context("mesh receive loop task panicked")?;
        if let Some(task) = heartbeat_task {
            task.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MeshConfig, ProviderConfig};

    fn config_with(data_dir: std::path::PathBuf, provider_enabled: bool) -> NodeConfig {
        NodeConfig {
            mesh: MeshConfig { listen_addr: "127.0.0.1:0".to_string(), ..MeshConfig::default() },
            provider: ProviderConfig { enabled: provider_enabled, ..ProviderConfig::default() },
            data_dir: Some(data_dir),
            log_level: None,
        }
    }

    #[tokio::test]
    async fn bootstrap_consumer_only_node_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(dir.path().to_path_buf(), false);

        let node = OmertaNode::bootstrap(&config).await.unwrap();
        assert!(node.provider.is_none());
        assert!(node.tracker.all().await.is_empty());
    }

    #[tokio::test]
    async fn bootstrap_provider_node_constructs_provider_service() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with(dir.path().to_path_buf(), true);
        config.provider.max_cpu_cores = Some(4);

        let node = OmertaNode::bootstrap(&config).await.unwrap();
        assert!(node.provider.is_some());
    }

    #[tokio::test]
    async fn bootstrap_rejects_malformed_network_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with(dir.path().to_path_buf(), false);
        config.mesh.network_key_hex = "not-hex".to_string();

        assert!(OmertaNode::bootstrap(&config).await.is_err());
    }
}
