//! Consumer side of the VM protocol (§4.4 "Consumer algorithm").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use omerta_crypto::{Clock, RandomSource};
use omerta_mesh::transport::MeshTransport;
use omerta_mesh::{PeerId, ResourceRequirements};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::connection::{ProviderRef, VmConnection};
use crate::error::{VmError, VmResult};
use crate::messages::{
    vm_response_channel, MeshVmAck, MeshVmHeartbeat, MeshVmHeartbeatResponse, MeshVmRequest, MeshVmResponse,
    MeshProviderShutdownNotification, CHANNEL_VM_HEARTBEAT, CHANNEL_VM_REQUEST, CHANNEL_VM_SHUTDOWN,
};
use crate::ports::{SshKeyStore, TunnelDriver};
use crate::tracker::VmTracker;
use crate::vpn::{VpnHandle, VpnOrchestrator};

fn connection_method_network_id(method: &omerta_mesh::nat::ConnectionMethod) -> &'static str {
    match method {
        omerta_mesh::nat::ConnectionMethod::Direct => "direct",
        omerta_mesh::nat::ConnectionMethod::HolePunched => "hole_punched",
        omerta_mesh::nat::ConnectionMethod::Relay(_) => "relay",
    }
}

/// Continuations keyed by `vmId`, resolved when the matching
/// `vm-response-<consumer>` message arrives (§4.4 step 4, §8 round-trip
/// property).
type PendingResponses = Mutex<HashMap<String, oneshot::Sender<MeshVmResponse>>>;

pub struct ConsumerVmClient<T: TunnelDriver> {
    transport: Arc<MeshTransport>,
    tracker: Arc<VmTracker>,
    vpn: Arc<VpnOrchestrator<T>>,
    ssh_key_store: Arc<dyn SshKeyStore>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    pending: Arc<PendingResponses>,
}

impl<T: TunnelDriver + 'static> ConsumerVmClient<T> {
    pub fn new(
        transport: Arc<MeshTransport>,
        tracker: Arc<VmTracker>,
        vpn: Arc<VpnOrchestrator<T>>,
        ssh_key_store: Arc<dyn SshKeyStore>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Arc<Self> {
        let client = Arc::new(ConsumerVmClient { transport, tracker, vpn, ssh_key_store, clock, random, pending: Arc::new(Mutex::new(HashMap::new())) });
        client.register_channel_handlers();
        client
    }

    /// Wires the consumer's three inbound channels: its own response
    /// channel, heartbeats, and shutdown notifications.
    fn register_channel_handlers(self: &Arc<Self>) {
        let our_peer_id = self.transport.our_peer_id().to_string();

        let pending = self.pending.clone();
        self.transport.on_channel(
            vm_response_channel(&our_peer_id),
            Arc::new(move |_from, data: Value| {
                let Ok(response) = serde_json::from_value::<MeshVmResponse>(data) else { return };
                if let Some(sender) = pending.lock().remove(&response.vm_id) {
                    let _ = sender.send(response);
                }
            }),
        );

        let transport = self.transport.clone();
        let tracker = self.tracker.clone();
        self.transport.on_channel(
            CHANNEL_VM_HEARTBEAT,
            Arc::new(move |from, data: Value| {
                let Ok(heartbeat) = serde_json::from_value::<MeshVmHeartbeat>(data) else { return };
                let transport = transport.clone();
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    let active_vm_ids: Vec<String> = {
                        let owned = tracker.all().await;
                        heartbeat
                            .vm_ids
                            .into_iter()
                            .filter(|id| owned.iter().any(|vm| vm.vm_id.to_string() == *id))
                            .collect()
                    };
                    let response = MeshVmHeartbeatResponse::new(active_vm_ids, heartbeat.timestamp);
                    let _ = transport
                        .send_on_channel(&from, crate::messages::CHANNEL_VM_HEARTBEAT, serde_json::to_value(response).unwrap())
                        .await;
                });
            }),
        );

        let tracker = self.tracker.clone();
        self.transport.on_channel(
            CHANNEL_VM_SHUTDOWN,
            Arc::new(move |_from, data: Value| {
                let Ok(notification) = serde_json::from_value::<MeshProviderShutdownNotification>(data) else { return };
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    for vm_id in notification.vm_ids {
                        if let Ok(uuid) = Uuid::parse_str(&vm_id) {
                            let _ = tracker.remove_vm(&uuid).await;
                        }
                    }
                });
            }),
        );
    }

    /// Request a VM from `provider_peer_id` (§4.4 steps 1-7).
    pub async fn request_vm(
        &self,
        provider_peer_id: &str,
        requirements: ResourceRequirements,
        ssh_user: &str,
        timeout_minutes: u32,
    ) -> VmResult<VmConnection> {
        if provider_peer_id == self.transport.our_peer_id() {
            return Err(VmError::SelfRequestNotAllowed);
        }

        let connection = self
            .transport
            .connect(provider_peer_id)
            .map_err(|e| VmError::Persistence(anyhow::anyhow!("no route to provider: {e}")))?;

        let vm_id = Uuid::new_v4();
        let vpn_handle = self.vpn.create_for_request(vm_id, &*self.random).await?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(vm_id.to_string(), tx);

        let ssh_public_key = self.ssh_key_store.public_key().await?;
        let request = MeshVmRequest {
            msg_type: "vm_request".to_string(),
            vm_id: vm_id.to_string(),
            requirements,
            consumer_public_key: hex::encode(vpn_handle.consumer_public_key_bytes),
            consumer_endpoint: connection.endpoint.clone(),
            consumer_vpn_ip: Some(vpn_handle.subnet.consumer_ip()),
            vm_vpn_ip: Some(vpn_handle.subnet.vm_ip()),
            ssh_public_key,
            ssh_user: ssh_user.to_string(),
            timeout_minutes: Some(timeout_minutes),
        };

        self.transport
            .send_on_channel(provider_peer_id, CHANNEL_VM_REQUEST, serde_json::to_value(&request).map_err(anyhow::Error::from)?)
            .await
            .map_err(VmError::Persistence)?;

        let result = self.await_response(vm_id, timeout_minutes, rx).await;

        match result {
            Ok(response) if !response.is_error() => {
                self.ack(provider_peer_id, &vm_id.to_string(), true).await;
                self.vpn
                    .add_provider_peer(
                        &vpn_handle,
                        response.provider_public_key.as_deref().unwrap_or_default(),
                        &connection.endpoint,
                    )
                    .await?;

                let vm_connection = VmConnection {
                    vm_id,
                    provider: ProviderRef { peer_id: provider_peer_id.to_string(), endpoint: connection.endpoint.clone() },
                    vm_ip: response.vm_ip.unwrap_or_else(|| vpn_handle.subnet.vm_ip()),
                    ssh_key_path: self.ssh_key_store.key_path().await?,
                    ssh_user: ssh_user.to_string(),
                    vpn_interface: vpn_handle.interface_name.clone(),
                    created_at: self.clock.now_unix_secs(),
                    network_id: connection_method_network_id(&connection.method).to_string(),
                };
                self.tracker.track_vm(vm_connection.clone()).await?;
                Ok(vm_connection)
            }
            Ok(response) => {
                self.ack(provider_peer_id, &vm_id.to_string(), false).await;
                self.pending.lock().remove(&vm_id.to_string());
                self.vpn.teardown(&vpn_handle).await?;
                Err(VmError::VmCreationFailed(response.error.unwrap_or_else(|| "unknown error".to_string())))
            }
            Err(e) => {
                self.pending.lock().remove(&vm_id.to_string());
                self.vpn.teardown(&vpn_handle).await?;
                Err(e)
            }
        }
    }

    async fn await_response(&self, vm_id: Uuid, timeout_minutes: u32, rx: oneshot::Receiver<MeshVmResponse>) -> VmResult<MeshVmResponse> {
        let _ = vm_id;
        let timeout = Duration::from_secs(u64::from(timeout_minutes.max(1)) * 60);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) | Err(_) => Err(VmError::NoResponse),
        }
    }

    async fn ack(&self, provider_peer_id: &str, vm_id: &str, success: bool) {
        let ack = MeshVmAck::new(vm_id.to_string(), success);
        if let Ok(payload) = serde_json::to_value(ack) {
            let _ = self.transport.send_on_channel(provider_peer_id, crate::messages::CHANNEL_VM_ACK, payload).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_method_maps_to_spec_network_ids() {
        assert_eq!(connection_method_network_id(&omerta_mesh::nat::ConnectionMethod::Direct), "direct");
        assert_eq!(connection_method_network_id(&omerta_mesh::nat::ConnectionMethod::HolePunched), "hole_punched");
        assert_eq!(
            connection_method_network_id(&omerta_mesh::nat::ConnectionMethod::Relay("r1".into())),
            "relay"
        );
    }
}
