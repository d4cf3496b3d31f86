//! Deterministic mesh-tunnel IP allocation from a VM id (§4.4 step 3,
//! §4.6 step 1). Both the consumer's quick sanity IP and the VPN
//! orchestrator's `/24` subnet derive from the same two leading bytes of
//! the VM's UUID, so they never need to coordinate out of band.

use uuid::Uuid;

/// `10.(id[0]%200+50).(id[1]%250+1).2` — the address the consumer expects
/// the VM to answer on.
pub fn mesh_tunnel_ip(vm_id: &Uuid) -> String {
    let bytes = vm_id.as_bytes();
    format!("10.{}.{}.2", (bytes[0] as u16 % 200) + 50, (bytes[1] as u16 % 250) + 1)
}

/// The `/24` subnet the VPN orchestrator allocates for a VM:
/// `10.(h[0]%200+50).(h[1]%250+1).0/24`, with `.1` for the consumer and
/// `.2` for the VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpnSubnet {
    pub second_octet: u8,
    pub third_octet: u8,
}

impl VpnSubnet {
    pub fn from_vm_id(vm_id: &Uuid) -> Self {
        let bytes = vm_id.as_bytes();
        VpnSubnet {
            second_octet: ((bytes[0] as u16 % 200) + 50) as u8,
            third_octet: ((bytes[1] as u16 % 250) + 1) as u8,
        }
    }

    pub fn cidr(&self) -> String {
        format!("10.{}.{}.0/24", self.second_octet, self.third_octet)
    }

    pub fn consumer_ip(&self) -> String {
        format!("10.{}.{}.1", self.second_octet, self.third_octet)
    }

    pub fn vm_ip(&self) -> String {
        format!("10.{}.{}.2", self.second_octet, self.third_octet)
    }
}

/// Interface name for a VM's tunnel: `wg<first-8-of-vmId>` (§4.6 step 2,
/// invariant #2 in §8).
pub fn tunnel_interface_name(vm_id: &Uuid) -> String {
    let hex = vm_id.simple().to_string();
    format!("wg{}", &hex[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_tunnel_ip_matches_vpn_subnet_vm_ip() {
        let vm_id = Uuid::new_v4();
        let subnet = VpnSubnet::from_vm_id(&vm_id);
        assert_eq!(mesh_tunnel_ip(&vm_id), subnet.vm_ip());
    }

    #[test]
    fn vpn_subnet_octets_are_within_spec_ranges() {
        for _ in 0..1000 {
            let vm_id = Uuid::new_v4();
            let subnet = VpnSubnet::from_vm_id(&vm_id);
            assert!((50..250).contains(&subnet.second_octet));
            assert!((1..=250).contains(&subnet.third_octet));
        }
    }

    #[test]
    fn tunnel_interface_name_is_wg_plus_8_hex_chars() {
        let vm_id = Uuid::new_v4();
        let name = tunnel_interface_name(&vm_id);
        assert!(name.starts_with("wg"));
        assert_eq!(name.len(), 10);
    }

    #[test]
    fn deterministic_for_the_same_vm_id() {
        let vm_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(mesh_tunnel_ip(&vm_id), mesh_tunnel_ip(&vm_id));
        assert_eq!(tunnel_interface_name(&vm_id), tunnel_interface_name(&vm_id));
    }
}
