//! Provider side of the VM protocol (§4.4 "Provider algorithm",
//! "Release", "Shutdown").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use omerta_crypto::{Clock, PeerId};
use omerta_mesh::transport::MeshTransport;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::eventlog::EventLog;
use crate::filter::{Decision, FilterManager, FilterRequest};
use crate::messages::{
    vm_release_response_channel, vm_response_channel, MeshVmAck, MeshVmHeartbeat, MeshVmHeartbeatResponse,
    MeshVmReleaseRequest, MeshVmReleaseResponse, MeshVmRequest, MeshVmResponse, MeshProviderShutdownNotification,
    CHANNEL_VM_ACK, CHANNEL_VM_HEARTBEAT, CHANNEL_VM_RELEASE, CHANNEL_VM_REQUEST, CHANNEL_VM_SHUTDOWN,
};
use crate::ports::{VmNetworkMode, VmRuntime};

/// Grace window for the consumer's ACK after a successful `vm-response`
/// (§4.4 step 4). Not fixed by the specification's parameter list; chosen
/// generously relative to the 60 s heartbeat cadence.
const ACK_TIMEOUT_SECS: u64 = 30;

/// Three consecutive missed heartbeats trigger release on the fourth tick
/// (§4.4 step 5, §8 scenario 3).
const MAX_MISSED_HEARTBEATS: u32 = 3;
const HEARTBEAT_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
struct ProvisionedVm {
    consumer_peer_id: PeerId,
    vm_ip: String,
}

pub struct ProviderVmService<R: VmRuntime> {
    transport: Arc<MeshTransport>,
    runtime: Arc<R>,
    filter: Arc<Mutex<FilterManager>>,
    clock: Arc<dyn Clock>,
    event_log: Arc<EventLog>,
    network_id: String,
    vms: Arc<Mutex<HashMap<Uuid, ProvisionedVm>>>,
    pending_acks: Arc<Mutex<HashMap<Uuid, oneshot::Sender<bool>>>>,
    missed_heartbeats: Arc<Mutex<HashMap<PeerId, u32>>>,
}

impl<R: VmRuntime + 'static> ProviderVmService<R> {
    pub fn new(
        transport: Arc<MeshTransport>,
        runtime: Arc<R>,
        filter: FilterManager,
        clock: Arc<dyn Clock>,
        event_log: Arc<EventLog>,
        network_id: impl Into<String>,
    ) -> Arc<Self> {
        let service = Arc::new(ProviderVmService {
            transport,
            runtime,
            filter: Arc::new(Mutex::new(filter)),
            clock,
            event_log,
            network_id: network_id.into(),
            vms: Arc::new(Mutex::new(HashMap::new())),
            pending_acks: Arc::new(Mutex::new(HashMap::new())),
            missed_heartbeats: Arc::new(Mutex::new(HashMap::new())),
        });
        service.register_channel_handlers();
        service
    }

    fn register_channel_handlers(self: &Arc<Self>) {
        let this = self.clone();
        self.transport.on_channel(
            CHANNEL_VM_REQUEST,
            Arc::new(move |from, data: Value| {
                let this = this.clone();
                tokio::spawn(async move {
                    if let Ok(request) = serde_json::from_value::<MeshVmRequest>(data) {
                        this.handle_vm_request(from, request).await;
                    }
                });
            }),
        );

        let this = self.clone();
        self.transport.on_channel(
            CHANNEL_VM_ACK,
            Arc::new(move |_from, data: Value| {
                let Ok(ack) = serde_json::from_value::<MeshVmAck>(data) else { return };
                let Ok(vm_id) = Uuid::parse_str(&ack.vm_id) else { return };
                if let Some(sender) = this.pending_acks.lock().remove(&vm_id) {
                    let _ = sender.send(ack.success);
                }
            }),
        );

        let this = self.clone();
        self.transport.on_channel(
            CHANNEL_VM_RELEASE,
            Arc::new(move |from, data: Value| {
                let this = this.clone();
                tokio::spawn(async move {
                    if let Ok(request) = serde_json::from_value::<MeshVmReleaseRequest>(data) {
                        this.handle_vm_release(from, request).await;
                    }
                });
            }),
        );

        let this = self.clone();
        self.transport.on_channel(
            CHANNEL_VM_HEARTBEAT,
            Arc::new(move |from, data: Value| {
                if let Ok(response) = serde_json::from_value::<MeshVmHeartbeatResponse>(data.clone()) {
                    if response.msg_type == "vm_heartbeat_response" {
                        this.missed_heartbeats.lock().insert(from, 0);
                    }
                }
            }),
        );
    }

    async fn handle_vm_request(self: &Arc<Self>, from: PeerId, request: MeshVmRequest) {
        let now = self.clock.now_unix_secs();
        let hour_utc = ((now / 3600) % 24) as u8;

        let filter_request = FilterRequest {
            requester_id: from.clone(),
            network_id: self.network_id.clone(),
            requirements: request.requirements.clone(),
            activity_description: None,
        };
        let decision = self.filter.lock().evaluate(&filter_request, hour_utc);

        match decision {
            Decision::Reject(reason) => {
                let _ = self.event_log.record_filter_rejected(now, &from, &reason).await;
                self.respond(&from, MeshVmResponse::failure(request.vm_id, reason)).await;
                return;
            }
            Decision::NeedsApproval => {
                let _ = self.event_log.record_filter_rejected(now, &from, "needs_manual_approval").await;
                self.respond(&from, MeshVmResponse::failure(request.vm_id, "needs_manual_approval")).await;
                return;
            }
            Decision::Accept(_) => {}
        }

        let Ok(vm_id) = Uuid::parse_str(&request.vm_id) else {
            self.respond(&from, MeshVmResponse::failure(request.vm_id, "invalid vm id")).await;
            return;
        };

        let created = match self
            .runtime
            .create(&request.vm_id, &request.requirements, &request.ssh_public_key, VmNetworkMode::Direct)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                let _ = self
                    .event_log
                    .record(
                        crate::eventlog::EventLogKind::Errors,
                        "provider",
                        now,
                        serde_json::json!({ "errorType": "vm_creation_failed", "vmId": request.vm_id, "detail": e.to_string() }),
                    )
                    .await;
                self.respond(&from, MeshVmResponse::failure(request.vm_id, e.to_string())).await;
                return;
            }
        };

        self.vms.lock().insert(vm_id, ProvisionedVm { consumer_peer_id: from.clone(), vm_ip: created.vm_ip.clone() });

        let (tx, rx) = oneshot::channel();
        self.pending_acks.lock().insert(vm_id, tx);

        self.respond(&from, MeshVmResponse::success(request.vm_id.clone(), created.vm_ip.clone(), created.public_key.clone()))
            .await;

        let acked = match tokio::time::timeout(Duration::from_secs(ACK_TIMEOUT_SECS), rx).await {
            Ok(Ok(success)) => success,
            _ => false,
        };

        if !acked {
            self.vms.lock().remove(&vm_id);
            let _ = self.runtime.destroy(&request.vm_id).await;
            let _ = self
                .event_log
                .record(
                    crate::eventlog::EventLogKind::VmLifecycle,
                    "provider",
                    self.clock.now_unix_secs(),
                    serde_json::json!({ "event": "ack_timeout_rollback", "vmId": request.vm_id, "consumerPeerId": from }),
                )
                .await;
        } else {
            let _ = self
                .event_log
                .record(
                    crate::eventlog::EventLogKind::Resources,
                    "provider",
                    self.clock.now_unix_secs(),
                    serde_json::json!({ "event": "vm_allocated", "vmId": request.vm_id, "consumerPeerId": from }),
                )
                .await;
        }
    }

    async fn handle_vm_release(self: &Arc<Self>, from: PeerId, request: MeshVmReleaseRequest) {
        let error = match Uuid::parse_str(&request.vm_id) {
            Ok(vm_id) => {
                self.vms.lock().remove(&vm_id);
                match self.runtime.destroy(&request.vm_id).await {
                    Ok(()) => None,
                    Err(e) => Some(e.to_string()),
                }
            }
            Err(_) => Some("invalid vm id".to_string()),
        };

        let response = MeshVmReleaseResponse::new(request.vm_id, error);
        if let Ok(payload) = serde_json::to_value(response) {
            let _ = self.transport.send_on_channel(&from, &vm_release_response_channel(&from), payload).await;
        }
    }

    async fn respond(&self, consumer_peer_id: &str, response: MeshVmResponse) {
        if let Ok(payload) = serde_json::to_value(response) {
            let _ = self.transport.send_on_channel(consumer_peer_id, &vm_response_channel(consumer_peer_id), payload).await;
        }
    }

    /// Snapshot vm ids currently tracked for a consumer.
    fn vm_ids_for_consumer(&self, consumer_peer_id: &str) -> Vec<String> {
        self.vms
            .lock()
            .iter()
            .filter(|(_, vm)| vm.consumer_peer_id == consumer_peer_id)
            .map(|(id, _)| id.to_string())
            .collect()
    }

    fn consumers_with_active_vms(&self) -> Vec<PeerId> {
        let mut consumers: Vec<PeerId> = self.vms.lock().values().map(|vm| vm.consumer_peer_id.clone()).collect();
        consumers.sort();
        consumers.dedup();
        consumers
    }

    async fn release_all_for_consumer(&self, consumer_peer_id: &str, reason: &str) {
        let vm_ids = self.vm_ids_for_consumer(consumer_peer_id);
        {
            let mut vms = self.vms.lock();
            vms.retain(|_, vm| vm.consumer_peer_id != consumer_peer_id);
        }
        for vm_id in &vm_ids {
            let _ = self.runtime.destroy(vm_id).await;
        }
        let _ = self.event_log.record_vm_timeout(self.clock.now_unix_secs(), consumer_peer_id, &vm_ids).await;
        tracing::info!(consumer = consumer_peer_id, reason, "released VMs after missed heartbeats");
    }

    /// Drive the 60 s heartbeat loop (§4.4 step 5, §8 scenario 3): spawn
    /// once at provider startup.
    pub async fn run_heartbeat_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            let consumers = self.consumers_with_active_vms();
            for consumer in consumers {
                let missed = {
                    let mut guard = self.missed_heartbeats.lock();
                    *guard.entry(consumer.clone()).or_insert(0)
                };

                if missed >= MAX_MISSED_HEARTBEATS {
                    self.release_all_for_consumer(&consumer, "heartbeat_timeout").await;
                    self.missed_heartbeats.lock().remove(&consumer);
                    continue;
                }

                let vm_ids = self.vm_ids_for_consumer(&consumer);
                let heartbeat = MeshVmHeartbeat::new(self.transport.our_peer_id().to_string(), vm_ids, self.clock.now_unix_secs());
                if let Ok(payload) = serde_json::to_value(heartbeat) {
                    let _ = self.transport.send_on_channel(&consumer, CHANNEL_VM_HEARTBEAT, payload).await;
                }
                *self.missed_heartbeats.lock().entry(consumer).or_insert(0) += 1;
            }
        }
    }

    /// Broadcast `provider_shutdown{vmIds, reason}` to every consumer with
    /// an active VM before the provider process exits (§4.4 "Shutdown").
    pub async fn shutdown(&self, reason: &str) {
        let now = self.clock.now_unix_secs();
        for consumer in self.consumers_with_active_vms() {
            let vm_ids = self.vm_ids_for_consumer(&consumer);
            let notification = MeshProviderShutdownNotification::new(self.transport.our_peer_id().to_string(), vm_ids, reason, now);
            if let Ok(payload) = serde_json::to_value(notification) {
                let _ = self.transport.send_on_channel(&consumer, CHANNEL_VM_SHUTDOWN, payload).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::fakes::FakeVmRuntime;
    use omerta_crypto::ports::FixedClock;
    use omerta_crypto::KeyPair;
    use omerta_mesh::registry::PeerRegistry;
    use omerta_wire::NetworkKey;

    struct NullPacketDevice;

    #[async_trait::async_trait]
    impl omerta_mesh::PacketDevice for NullPacketDevice {
        async fn send_to(&self, _data: &[u8], _addr: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn recv_from(&self) -> anyhow::Result<(Vec<u8>, String)> {
            std::future::pending().await
        }
    }

    fn make_service() -> (Arc<ProviderVmService<FakeVmRuntime>>, Arc<MeshTransport>) {
        let identity = KeyPair::generate().unwrap();
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let registry = PeerRegistry::new(clock.clone());
        let transport = Arc::new(
            MeshTransport::new(identity, "direct", NetworkKey::from_bytes([0x11; 32]), Arc::new(NullPacketDevice), registry, clock.clone())
                .unwrap(),
        );
        let dir = tempfile::tempdir().unwrap();
        let event_log = Arc::new(EventLog::new(dir.path()));
        let mut filter = FilterManager::new();
        filter.accept_trusted_only = false;
        filter.default_accept = true;
        let service = ProviderVmService::new(transport.clone(), Arc::new(FakeVmRuntime::default()), filter, clock, event_log, "direct");
        (service, transport)
    }

    #[tokio::test]
    async fn accepted_request_provisions_a_vm_and_waits_for_ack() {
        let (service, _transport) = make_service();
        let vm_id = Uuid::new_v4();
        let request = MeshVmRequest::new(
            vm_id.to_string(),
            omerta_mesh::ResourceRequirements::default(),
            "consumer-pubkey".into(),
            "1.2.3.4:9000".into(),
            "ssh-ed25519 AAAA".into(),
            "ubuntu".into(),
        );

        service.handle_vm_request("consumer1".to_string(), request).await;
        // Without an ACK arriving the pending-ack wait would block for
        // ACK_TIMEOUT_SECS; exercise the accept path up to VM creation here.
        assert_eq!(service.vms.lock().len(), 1);
    }

    #[tokio::test]
    async fn release_removes_tracked_vm_and_destroys_runtime_resource() {
        let (service, _transport) = make_service();
        let vm_id = Uuid::new_v4();
        service.vms.lock().insert(vm_id, ProvisionedVm { consumer_peer_id: "consumer1".to_string(), vm_ip: "10.60.1.2".into() });

        service.handle_vm_release("consumer1".to_string(), MeshVmReleaseRequest::new(vm_id.to_string())).await;
        assert!(service.vms.lock().is_empty());
    }

    #[test]
    fn consumers_with_active_vms_is_deduplicated_and_sorted() {
        let (service, _transport) = make_service();
        let mut vms = service.vms.lock();
        vms.insert(Uuid::new_v4(), ProvisionedVm { consumer_peer_id: "b".into(), vm_ip: "x".into() });
        vms.insert(Uuid::new_v4(), ProvisionedVm { consumer_peer_id: "a".into(), vm_ip: "y".into() });
        vms.insert(Uuid::new_v4(), ProvisionedVm { consumer_peer_id: "a".into(), vm_ip: "z".into() });
        drop(vms);

        assert_eq!(service.consumers_with_active_vms(), vec!["a".to_string(), "b".to_string()]);
    }
}
