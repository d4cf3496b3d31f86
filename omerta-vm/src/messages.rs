//! VM protocol wire message schemas (§6).

use serde::{Deserialize, Serialize};

use omerta_mesh::{PeerId, ResourceRequirements};

pub const CHANNEL_VM_REQUEST: &str = "vm-request";
pub const CHANNEL_VM_ACK: &str = "vm-ack";
pub const CHANNEL_VM_RELEASE: &str = "vm-release";
pub const CHANNEL_VM_HEARTBEAT: &str = "vm-heartbeat";
pub const CHANNEL_VM_SHUTDOWN: &str = "vm-shutdown";
pub const CHANNEL_TUNNEL_DATA: &str = "tunnel-data";

/// Per-consumer response channel name: `vm-response-<consumerPeerId>`.
pub fn vm_response_channel(consumer_peer_id: &str) -> String {
    format!("vm-response-{consumer_peer_id}")
}

/// Per-consumer release-acknowledgement channel, mirroring
/// [`vm_response_channel`] so the provider's `vm-released{vmId, error?}`
/// reply (§4.4 "Release") doesn't collide with other consumers' replies
/// on the shared `vm-release` request channel.
pub fn vm_release_response_channel(consumer_peer_id: &str) -> String {
    format!("vm-release-response-{consumer_peer_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshVmRequest {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub vm_id: String,
    pub requirements: ResourceRequirements,
    pub consumer_public_key: String,
    pub consumer_endpoint: String,
    pub consumer_vpn_ip: Option<String>,
    pub vm_vpn_ip: Option<String>,
    pub ssh_public_key: String,
    pub ssh_user: String,
    pub timeout_minutes: Option<u32>,
}

impl MeshVmRequest {
    pub fn new(
        vm_id: String,
        requirements: ResourceRequirements,
        consumer_public_key: String,
        consumer_endpoint: String,
        ssh_public_key: String,
        ssh_user: String,
    ) -> Self {
        MeshVmRequest {
            msg_type: "vm_request".to_string(),
            vm_id,
            requirements,
            consumer_public_key,
            consumer_endpoint,
            consumer_vpn_ip: None,
            vm_vpn_ip: None,
            ssh_public_key,
            ssh_user,
            timeout_minutes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshVmResponse {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub vm_id: String,
    pub vm_ip: Option<String>,
    pub provider_public_key: Option<String>,
    pub error: Option<String>,
}

impl MeshVmResponse {
    pub fn success(vm_id: String, vm_ip: String, provider_public_key: String) -> Self {
        MeshVmResponse {
            msg_type: "vm_response".to_string(),
            vm_id,
            vm_ip: Some(vm_ip),
            provider_public_key: Some(provider_public_key),
            error: None,
        }
    }

    pub fn failure(vm_id: String, error: impl Into<String>) -> Self {
        MeshVmResponse { msg_type: "vm_response".to_string(), vm_id, vm_ip: None, provider_public_key: None, error: Some(error.into()) }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshVmReleaseRequest {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub vm_id: String,
}

impl MeshVmReleaseRequest {
    pub fn new(vm_id: String) -> Self {
        MeshVmReleaseRequest { msg_type: "vm_release".to_string(), vm_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshVmReleaseResponse {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub vm_id: String,
    pub error: Option<String>,
}

impl MeshVmReleaseResponse {
    pub fn new(vm_id: String, error: Option<String>) -> Self {
        MeshVmReleaseResponse { msg_type: "vm_released".to_string(), vm_id, error }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshVmAck {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub vm_id: String,
    pub success: bool,
}

impl MeshVmAck {
    pub fn new(vm_id: String, success: bool) -> Self {
        MeshVmAck { msg_type: "vm_ack".to_string(), vm_id, success }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshVmHeartbeat {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub provider_peer_id: PeerId,
    pub vm_ids: Vec<String>,
    pub timestamp: u64,
}

impl MeshVmHeartbeat {
    pub fn new(provider_peer_id: PeerId, vm_ids: Vec<String>, timestamp: u64) -> Self {
        MeshVmHeartbeat { msg_type: "vm_heartbeat".to_string(), provider_peer_id, vm_ids, timestamp }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshVmHeartbeatResponse {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub active_vm_ids: Vec<String>,
    pub timestamp: u64,
}

impl MeshVmHeartbeatResponse {
    pub fn new(active_vm_ids: Vec<String>, timestamp: u64) -> Self {
        MeshVmHeartbeatResponse { msg_type: "vm_heartbeat_response".to_string(), active_vm_ids, timestamp }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshProviderShutdownNotification {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub provider_peer_id: PeerId,
    pub vm_ids: Vec<String>,
    pub reason: String,
    pub timestamp: u64,
}

impl MeshProviderShutdownNotification {
    pub fn new(provider_peer_id: PeerId, vm_ids: Vec<String>, reason: impl Into<String>, timestamp: u64) -> Self {
        MeshProviderShutdownNotification {
            msg_type: "provider_shutdown".to_string(),
            provider_peer_id,
            vm_ids,
            reason: reason.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_request_round_trips_through_json() {
        let req = MeshVmRequest::new(
            "vm-1".into(),
            ResourceRequirements::default(),
            "pubkey".into(),
            "1.2.3.4:9000".into(),
            "ssh-ed25519 AAAA".into(),
            "ubuntu".into(),
        );
        let json = serde_json::to_string(&req).unwrap();
        let back: MeshVmRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.vm_id, "vm-1");
        assert_eq!(back.msg_type, "vm_request");
    }

    #[test]
    fn response_channel_name_is_per_consumer() {
        assert_eq!(vm_response_channel("aaaa1111"), "vm-response-aaaa1111");
    }

    #[test]
    fn failure_response_carries_error_and_no_ip() {
        let resp = MeshVmResponse::failure("vm-1".into(), "filter_rejected");
        assert!(resp.is_error());
        assert!(resp.vm_ip.is_none());
    }
}
