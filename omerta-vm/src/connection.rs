//! `VMConnection`: the consumer-side record of an allocated VM, sufficient
//! to reconnect over SSH through the tunnel (§3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use omerta_mesh::PeerId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderRef {
    pub peer_id: PeerId,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VmConnection {
    pub vm_id: Uuid,
    pub provider: ProviderRef,
    pub vm_ip: String,
    pub ssh_key_path: String,
    pub ssh_user: String,
    pub vpn_interface: String,
    pub created_at: u64,
    pub network_id: String,
}
