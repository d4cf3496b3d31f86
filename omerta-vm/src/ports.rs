//! External collaborator interfaces (§1, §6): the VM hypervisor, the OS
//! tunnel device, and the SSH keystore are deliberately out of scope for
//! this crate; it only defines the capability boundary they must satisfy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use omerta_mesh::ResourceRequirements;

/// How a created VM's network is wired up, mirrored from §4.4 step 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmNetworkMode {
    Direct,
    Filtered,
    Sampled,
    Conntrack,
}

#[derive(Debug, Clone)]
pub struct CreatedVm {
    pub vm_ip: String,
    pub public_key: String,
}

/// VM hypervisor driver, external to this crate (§1 Non-goals).
#[async_trait]
pub trait VmRuntime: Send + Sync {
    async fn create(
        &self,
        vm_id: &str,
        requirements: &ResourceRequirements,
        ssh_public_key: &str,
        net_mode: VmNetworkMode,
    ) -> anyhow::Result<CreatedVm>;

    async fn destroy(&self, vm_id: &str) -> anyhow::Result<()>;

    async fn status(&self, vm_id: &str) -> anyhow::Result<Option<String>>;
}

/// OS-level WireGuard-style tunnel device, external to this crate (§1
/// Non-goals: "OS-level tunnel device configuration").
#[async_trait]
pub trait TunnelDriver: Send + Sync {
    async fn create(&self, name: &str, privkey: &str, address: &str, prefix: u8) -> anyhow::Result<()>;
    async fn add_peer(&self, name: &str, pubkey: &str, allowed_ips: &str, endpoint: Option<&str>) -> anyhow::Result<()>;
    async fn destroy(&self, name: &str) -> anyhow::Result<()>;
    async fn list_interfaces(&self) -> anyhow::Result<Vec<String>>;
}

/// SSH key material lives on disk external to this crate (§1 Non-goals:
/// "SSH key files on disk").
#[async_trait]
pub trait SshKeyStore: Send + Sync {
    async fn public_key(&self) -> anyhow::Result<String>;
    async fn key_path(&self) -> anyhow::Result<String>;
}

/// In-memory fakes for every port, used by tests in this crate and by
/// downstream integration tests that don't want to depend on a real
/// hypervisor/tunnel/keystore.
pub mod fakes {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeVmRuntime {
        pub created: Mutex<Vec<String>>,
        pub destroyed: Mutex<Vec<String>>,
        pub fail_create: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl VmRuntime for FakeVmRuntime {
        async fn create(
            &self,
            vm_id: &str,
            _requirements: &ResourceRequirements,
            _ssh_public_key: &str,
            _net_mode: VmNetworkMode,
        ) -> anyhow::Result<CreatedVm> {
            if self.fail_create.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(anyhow::anyhow!("simulated VM creation failure"));
            }
            self.created.lock().unwrap().push(vm_id.to_string());
            Ok(CreatedVm { vm_ip: "10.60.1.2".to_string(), public_key: format!("provider-pubkey-{vm_id}") })
        }

        async fn destroy(&self, vm_id: &str) -> anyhow::Result<()> {
            self.destroyed.lock().unwrap().push(vm_id.to_string());
            Ok(())
        }

        async fn status(&self, vm_id: &str) -> anyhow::Result<Option<String>> {
            if self.created.lock().unwrap().iter().any(|id| id == vm_id) {
                Ok(Some("running".to_string()))
            } else {
                Ok(None)
            }
        }
    }

    #[derive(Default)]
    pub struct FakeTunnelDriver {
        pub interfaces: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TunnelDriver for FakeTunnelDriver {
        async fn create(&self, name: &str, _privkey: &str, _address: &str, _prefix: u8) -> anyhow::Result<()> {
            self.interfaces.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn add_peer(&self, _name: &str, _pubkey: &str, _allowed_ips: &str, _endpoint: Option<&str>) -> anyhow::Result<()> {
            Ok(())
        }

        async fn destroy(&self, name: &str) -> anyhow::Result<()> {
            self.interfaces.lock().unwrap().retain(|n| n != name);
            Ok(())
        }

        async fn list_interfaces(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.interfaces.lock().unwrap().clone())
        }
    }

    pub struct FakeSshKeyStore {
        pub public_key: String,
        pub key_path: String,
    }

    #[async_trait]
    impl SshKeyStore for FakeSshKeyStore {
        async fn public_key(&self) -> anyhow::Result<String> {
            Ok(self.public_key.clone())
        }
        async fn key_path(&self) -> anyhow::Result<String> {
            Ok(self.key_path.clone())
        }
    }
}
