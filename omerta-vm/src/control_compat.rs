//! Legacy `ControlMessage` / `UdpControlClient` compatibility sibling.
//!
//! §9's last Open Question notes that the original codebase carries an
//! older direct-UDP control path alongside the newer mesh-channel path and
//! does not say which is normative. This crate treats the mesh-channel
//! protocol in [`crate::consumer`]/[`crate::provider`] as primary; this
//! module exists only so a node can still exchange VM protocol messages
//! with a peer that has not yet adopted mesh channels. It is not wired
//! into [`crate::consumer::ConsumerVmClient`] or
//! [`crate::provider::ProviderVmService`] and carries none of the mesh
//! envelope's signing/encryption/replay-window guarantees (§4.1) — callers
//! bridging to it are responsible for authenticating peers some other way.

use serde::{Deserialize, Serialize};

use omerta_mesh::transport::PacketDevice;

use crate::messages::{
    MeshProviderShutdownNotification, MeshVmAck, MeshVmHeartbeat, MeshVmHeartbeatResponse, MeshVmReleaseRequest,
    MeshVmReleaseResponse, MeshVmRequest, MeshVmResponse,
};

/// A single legacy control-path datagram: one `ControlMessage` per UDP
/// packet, newline-free JSON, no envelope framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "controlType")]
pub enum ControlMessage {
    VmRequest(MeshVmRequest),
    VmResponse(MeshVmResponse),
    VmAck(MeshVmAck),
    VmRelease(MeshVmReleaseRequest),
    VmReleaseResponse(MeshVmReleaseResponse),
    VmHeartbeat(MeshVmHeartbeat),
    VmHeartbeatResponse(MeshVmHeartbeatResponse),
    ProviderShutdown(MeshProviderShutdownNotification),
}

/// Errors specific to the legacy control path; kept separate from
/// [`crate::error::VmError`] since this path never produces the structured
/// taxonomy of §7 (there's no envelope to fail signature/replay checks on).
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("control message serialization failed: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("control socket error: {0}")]
    Socket(#[from] anyhow::Error),
}

/// Direct point-to-point UDP client for [`ControlMessage`] datagrams,
/// bypassing the mesh transport's channel routing and NAT traversal
/// entirely. Exists so the compatibility path can be exercised in
/// isolation (e.g. against a legacy peer reachable by a known socket
/// address) without depending on `MeshTransport`.
pub struct UdpControlClient<D: PacketDevice> {
    device: D,
}

impl<D: PacketDevice> UdpControlClient<D> {
    pub fn new(device: D) -> Self {
        UdpControlClient { device }
    }

    pub async fn send(&self, addr: &str, message: &ControlMessage) -> Result<(), ControlError> {
        let bytes = serde_json::to_vec(message)?;
        self.device.send_to(&bytes, addr).await?;
        Ok(())
    }

    pub async fn recv(&self) -> Result<(ControlMessage, String), ControlError> {
        let (bytes, from) = self.device.recv_from().await?;
        let message = serde_json::from_slice(&bytes)?;
        Ok((message, from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use omerta_mesh::ResourceRequirements;
    use std::sync::Mutex;

    #[derive(Default)]
    struct LoopbackDevice {
        outbox: Mutex<Vec<(Vec<u8>, String)>>,
    }

    #[async_trait]
    impl PacketDevice for LoopbackDevice {
        async fn send_to(&self, data: &[u8], addr: &str) -> anyhow::Result<()> {
            self.outbox.lock().unwrap().push((data.to_vec(), addr.to_string()));
            Ok(())
        }

        async fn recv_from(&self) -> anyhow::Result<(Vec<u8>, String)> {
            let mut outbox = self.outbox.lock().unwrap();
            if outbox.is_empty() {
                return Err(anyhow::anyhow!("loopback device empty"));
            }
            Ok(outbox.remove(0))
        }
    }

    #[tokio::test]
    async fn vm_request_round_trips_through_control_message() {
        let client = UdpControlClient::new(LoopbackDevice::default());
        let request = MeshVmRequest::new(
            "vm-1".into(),
            ResourceRequirements::default(),
            "pubkey".into(),
            "1.2.3.4:9000".into(),
            "ssh-ed25519 AAAA".into(),
            "ubuntu".into(),
        );
        let message = ControlMessage::VmRequest(request);

        client.send("1.2.3.4:9000", &message).await.unwrap();
        let (received, from) = client.recv().await.unwrap();

        assert_eq!(from, "1.2.3.4:9000");
        match received {
            ControlMessage::VmRequest(req) => assert_eq!(req.vm_id, "vm-1"),
            other => panic!("unexpected message variant: {other:?}"),
        }
    }

    #[test]
    fn control_message_tag_is_stable_across_variants() {
        let ack = ControlMessage::VmAck(MeshVmAck::new("vm-1".into(), true));
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["controlType"], "VmAck");
    }
}
