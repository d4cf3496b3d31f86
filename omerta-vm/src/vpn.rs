//! Ephemeral VPN orchestrator (§4.6): a stateless-per-call helper that
//! brings up a WireGuard-style tunnel for exactly one VM's lifetime. It is
//! the *only* component that creates tunnel state, so "request failed ⇒
//! no residual interface" (§8 invariant #2) reduces to "every call path
//! through here tears down on error".

use uuid::Uuid;

use omerta_crypto::types::PrivateKey;
use omerta_crypto::RandomSource;

use crate::ports::TunnelDriver;
use crate::tunnel_ip::{tunnel_interface_name, VpnSubnet};

const TUNNEL_PREFIX_BITS: u8 = 24;

/// The tunnel this orchestrator stood up for one VM, returned so the
/// caller can later add the provider as a peer or tear it down.
#[derive(Debug, Clone)]
pub struct VpnHandle {
    pub vm_id: Uuid,
    pub interface_name: String,
    pub subnet: VpnSubnet,
    pub consumer_private_key: PrivateKey,
    pub consumer_public_key_bytes: [u8; 32],
}

pub struct VpnOrchestrator<T: TunnelDriver> {
    driver: T,
}

impl<T: TunnelDriver> VpnOrchestrator<T> {
    pub fn new(driver: T) -> Self {
        VpnOrchestrator { driver }
    }

    /// Steps 1-2: generate keys, allocate the subnet and bring the
    /// interface up. Returns the handle the caller must eventually pass to
    /// either [`Self::add_provider_peer`] or [`Self::teardown`].
    pub async fn create_for_request(&self, vm_id: Uuid, random: &dyn RandomSource) -> anyhow::Result<VpnHandle> {
        let mut seed = [0u8; 32];
        random.fill_bytes(&mut seed);
        let private_key = PrivateKey::from_bytes(seed);
        let public_key_bytes = *private_key.x25519_public().as_bytes();

        let subnet = VpnSubnet::from_vm_id(&vm_id);
        let interface_name = tunnel_interface_name(&vm_id);

        let encoded_privkey = hex::encode(private_key_seed_bytes(&private_key));
        self.driver.create(&interface_name, &encoded_privkey, &subnet.consumer_ip(), TUNNEL_PREFIX_BITS).await?;

        Ok(VpnHandle {
            vm_id,
            interface_name,
            subnet,
            consumer_private_key: private_key,
            consumer_public_key_bytes: public_key_bytes,
        })
    }

    /// Step 3: once the provider has responded with its own WireGuard
    /// public key and reachable endpoint, add it as a peer restricted to
    /// the VM's single address.
    pub async fn add_provider_peer(&self, handle: &VpnHandle, provider_pubkey_hex: &str, provider_endpoint: &str) -> anyhow::Result<()> {
        let allowed_ips = format!("{}/32", handle.subnet.vm_ip());
        self.driver
            .add_peer(&handle.interface_name, provider_pubkey_hex, &allowed_ips, Some(provider_endpoint))
            .await
    }

    /// Step 4: tear down on any failure in the request path. Idempotent —
    /// tearing down an interface that never came up, or was already torn
    /// down, is not an error from this orchestrator's point of view.
    pub async fn teardown(&self, handle: &VpnHandle) -> anyhow::Result<()> {
        match self.driver.destroy(&handle.interface_name).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(interface = %handle.interface_name, error = %e, "tunnel teardown failed, treating as already gone");
                Ok(())
            }
        }
    }
}

fn private_key_seed_bytes(key: &PrivateKey) -> [u8; 32] {
    // `PrivateKey` intentionally exposes only derived secrets, not its raw
    // seed; the WireGuard key material handed to the tunnel driver is the
    // X25519 static secret bytes derived from it.
    key.x25519_static_secret().to_bytes()
}
