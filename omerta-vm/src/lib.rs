//! Omerta VM lifecycle.
//!
//! Resource model and peer selection (§4.5), VM request/lifecycle
//! protocol (§4.4) running over `omerta_mesh` channels, the ephemeral VPN
//! orchestrator (§4.6), the crash-recoverable VM tracker (§4.7), and the
//! provider daemon's filter/accounting/heartbeat loop (§4.4/§4.5). External
//! collaborators (`VMRuntime`, `TunnelDriver`, `SSHKeyStore`) are capability
//! traits in [`ports`] per §1/§6 — this crate never shells out to a
//! hypervisor or `wg` binary itself.

pub mod connection;
pub mod consumer;
pub mod control_compat;
pub mod error;
pub mod eventlog;
pub mod filter;
pub mod messages;
pub mod ports;
pub mod provider;
pub mod selection;
pub mod tracker;
pub mod tunnel_ip;
pub mod vpn;

pub use connection::{ProviderRef, VmConnection};
pub use consumer::ConsumerVmClient;
pub use control_compat::{ControlError, ControlMessage, UdpControlClient};
pub use error::{VmError, VmResult};
pub use eventlog::{EventLog, EventLogKind, EventLogWriter};
pub use filter::{AcceptPriority, Decision, FilterManager, FilterRequest, ResourceLimits};
pub use messages::{
    vm_release_response_channel, vm_response_channel, MeshProviderShutdownNotification, MeshVmAck,
    MeshVmHeartbeat, MeshVmHeartbeatResponse, MeshVmReleaseRequest, MeshVmReleaseResponse, MeshVmRequest,
    MeshVmResponse, CHANNEL_TUNNEL_DATA, CHANNEL_VM_ACK, CHANNEL_VM_HEARTBEAT, CHANNEL_VM_RELEASE,
    CHANNEL_VM_REQUEST, CHANNEL_VM_SHUTDOWN,
};
pub use ports::{CreatedVm, SshKeyStore, TunnelDriver, VmNetworkMode, VmRuntime};
pub use provider::ProviderVmService;
pub use selection::{score_candidate, select_peers, Candidate};
pub use tracker::{default_state_path, resolve_home_dir, VmTracker, SCHEMA_VERSION};
pub use tunnel_ip::{mesh_tunnel_ip, tunnel_interface_name, VpnSubnet};
pub use vpn::{VpnHandle, VpnOrchestrator};
