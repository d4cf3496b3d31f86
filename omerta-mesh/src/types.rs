//! Shared mesh domain types: identifiers, resource matching and the
//! announcement/contact records the registry and freshness layers track.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use omerta_crypto::PeerId;

/// Routing/key-selection tag carried in plaintext on the wire. See
/// `omerta_wire::network` for the 255-byte length limit enforced at encode
/// time.
pub type NetworkId = String;

/// CPU architectures a provider may advertise or a consumer may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuArchitecture {
    X86_64,
    Arm64,
}

/// GPU requirement/capability descriptor. Every field is optional on both
/// sides; an unset field on the requirement side means "don't care".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuSpec {
    pub model: Option<String>,
    pub vram_mb: Option<u32>,
    pub vendor: Option<String>,
    pub required_apis: Option<HashSet<String>>,
}

/// What a consumer asks for in a VM request. Unspecified fields mean "any".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub cpu_cores: Option<u32>,
    pub cpu_architecture: Option<CpuArchitecture>,
    pub memory_mb: Option<u64>,
    pub storage_mb: Option<u64>,
    pub network_bandwidth_mbps: Option<u32>,
    pub gpu: Option<GpuSpec>,
    pub image_id: Option<String>,
}

/// What a provider advertises it has available, including totals so peer
/// selection can reason about headroom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceCapability {
    pub total_cpu_cores: u32,
    pub available_cpu_cores: u32,
    pub cpu_architecture: CpuArchitecture,
    pub total_memory_mb: u64,
    pub available_memory_mb: u64,
    pub total_storage_mb: u64,
    pub available_storage_mb: u64,
    pub network_bandwidth_mbps: Option<u32>,
    pub gpu: Option<GpuSpec>,
    pub available_images: HashSet<String>,
}

impl Default for CpuArchitecture {
    fn default() -> Self {
        CpuArchitecture::X86_64
    }
}

impl ResourceCapability {
    /// Element-wise ≥ match of `req` against this capability (§4.5).
    /// `imageId`/`requiredAPIs` are set-membership checks rather than
    /// numeric comparisons.
    pub fn satisfies(&self, req: &ResourceRequirements) -> bool {
        if let Some(cores) = req.cpu_cores {
            if self.available_cpu_cores < cores {
                return false;
            }
        }
        if let Some(arch) = req.cpu_architecture {
            if self.cpu_architecture != arch {
                return false;
            }
        }
        if let Some(mem) = req.memory_mb {
            if self.available_memory_mb < mem {
                return false;
            }
        }
        if let Some(storage) = req.storage_mb {
            if self.available_storage_mb < storage {
                return false;
            }
        }
        if let Some(bw) = req.network_bandwidth_mbps {
            match self.network_bandwidth_mbps {
                Some(have) if have >= bw => {}
                _ => return false,
            }
        }
        if let Some(req_gpu) = &req.gpu {
            let Some(have_gpu) = &self.gpu else { return false };
            if let Some(model) = &req_gpu.model {
                if have_gpu.model.as_deref() != Some(model.as_str()) {
                    return false;
                }
            }
            if let Some(vram) = req_gpu.vram_mb {
                if have_gpu.vram_mb.unwrap_or(0) < vram {
                    return false;
                }
            }
            if let Some(vendor) = &req_gpu.vendor {
                if have_gpu.vendor.as_deref() != Some(vendor.as_str()) {
                    return false;
                }
            }
            if let Some(apis) = &req_gpu.required_apis {
                let have_apis = have_gpu.required_apis.clone().unwrap_or_default();
                if !apis.is_subset(&have_apis) {
                    return false;
                }
            }
        }
        if let Some(image) = &req.image_id {
            if !self.available_images.contains(image) {
                return false;
            }
        }
        true
    }
}

/// Provider-reported operating metadata used by peer selection's reputation
/// term and by display/telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerMetadata {
    pub reputation: u8,
    pub jobs_completed: u64,
    pub jobs_rejected: u64,
    pub avg_resp_ms: u32,
}

/// A signed, broadcastable statement of what a peer is and offers.
///
/// Self-certifying: `public_key` lets any recipient verify both
/// `peer_id = derive_peer_id(public_key)` and `signature` without a
/// separate key-distribution step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerAnnouncement {
    pub peer_id: PeerId,
    pub network_id: NetworkId,
    pub endpoint: String,
    pub public_key: omerta_crypto::PublicKey,
    pub capabilities: Vec<ResourceCapability>,
    pub metadata: PeerMetadata,
    pub signature: Vec<u8>,
}

impl PeerAnnouncement {
    /// Fields the signature is computed over (everything but the signature
    /// itself), canonically encoded.
    fn signed_bytes(&self) -> anyhow::Result<Vec<u8>> {
        #[derive(Serialize)]
        struct Fields<'a> {
            peer_id: &'a str,
            network_id: &'a str,
            endpoint: &'a str,
            public_key: &'a omerta_crypto::PublicKey,
            capabilities: &'a [ResourceCapability],
            metadata: &'a PeerMetadata,
        }
        let fields = Fields {
            peer_id: &self.peer_id,
            network_id: &self.network_id,
            endpoint: &self.endpoint,
            public_key: &self.public_key,
            capabilities: &self.capabilities,
            metadata: &self.metadata,
        };
        Ok(serde_json::to_vec(&fields)?)
    }

    pub fn sign(mut self, keypair: &omerta_crypto::KeyPair) -> anyhow::Result<Self> {
        let bytes = self.signed_bytes()?;
        let signature = keypair.sign(&bytes)?;
        self.signature = signature.signature;
        Ok(self)
    }

    /// Verify `peer_id` is actually derived from `public_key` and that
    /// `signature` covers the announced fields.
    pub fn verify(&self) -> anyhow::Result<bool> {
        if self.public_key.peer_id() != self.peer_id {
            return Ok(false);
        }
        let bytes = self.signed_bytes()?;
        let signature = omerta_crypto::types::Signature {
            signature: self.signature.clone(),
            public_key: self.public_key.clone(),
            timestamp: 0,
        };
        self.public_key.verify(&bytes, &signature)
    }
}

/// The three reachability modes a mesh connection can take, preferred in
/// this order: direct, hole-punched, relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReachabilityPath {
    Direct,
    HolePunched,
    Relay(PeerId),
}

impl ReachabilityPath {
    /// Structural comparison of paths, as required by the freshness
    /// invariants (§4.3): a relay path only matches the same relay peer.
    pub fn same_path(&self, other: &ReachabilityPath) -> bool {
        self == other
    }
}

/// Connection quality/recency record for a peer, tracked by
/// `RecentContactTracker`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentContact {
    pub peer_id: PeerId,
    pub last_seen_unix_secs: u64,
    pub reachability: ReachabilityPath,
    pub latency_ms: u32,
    pub connection_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability(cores: u32, mem: u64) -> ResourceCapability {
        ResourceCapability {
            total_cpu_cores: cores,
            available_cpu_cores: cores,
            cpu_architecture: CpuArchitecture::X86_64,
            total_memory_mb: mem,
            available_memory_mb: mem,
            total_storage_mb: 100_000,
            available_storage_mb: 100_000,
            network_bandwidth_mbps: Some(1000),
            gpu: None,
            available_images: HashSet::new(),
        }
    }

    #[test]
    fn satisfies_checks_element_wise_minimums() {
        let cap = capability(4, 8192);
        let req = ResourceRequirements { cpu_cores: Some(2), memory_mb: Some(4096), ..Default::default() };
        assert!(cap.satisfies(&req));

        let too_much = ResourceRequirements { cpu_cores: Some(8), ..Default::default() };
        assert!(!cap.satisfies(&too_much));
    }

    #[test]
    fn unspecified_requirement_fields_mean_any() {
        let cap = capability(2, 2048);
        assert!(cap.satisfies(&ResourceRequirements::default()));
    }

    #[test]
    fn image_id_is_set_membership() {
        let mut cap = capability(2, 2048);
        cap.available_images.insert("ubuntu-22.04".to_string());
        let req = ResourceRequirements { image_id: Some("ubuntu-22.04".to_string()), ..Default::default() };
        assert!(cap.satisfies(&req));

        let missing = ResourceRequirements { image_id: Some("debian-12".to_string()), ..Default::default() };
        assert!(!cap.satisfies(&missing));
    }

    #[test]
    fn peer_announcement_self_certifies() {
        let keypair = omerta_crypto::KeyPair::generate().unwrap();
        let announcement = PeerAnnouncement {
            peer_id: keypair.public_key.peer_id(),
            network_id: "direct".to_string(),
            endpoint: "127.0.0.1:9000".to_string(),
            public_key: keypair.public_key.clone(),
            capabilities: vec![],
            metadata: PeerMetadata::default(),
            signature: Vec::new(),
        }
        .sign(&keypair)
        .unwrap();

        assert!(announcement.verify().unwrap());
    }

    #[test]
    fn tampered_announcement_fails_verification() {
        let keypair = omerta_crypto::KeyPair::generate().unwrap();
        let mut announcement = PeerAnnouncement {
            peer_id: keypair.public_key.peer_id(),
            network_id: "direct".to_string(),
            endpoint: "127.0.0.1:9000".to_string(),
            public_key: keypair.public_key.clone(),
            capabilities: vec![],
            metadata: PeerMetadata::default(),
            signature: Vec::new(),
        }
        .sign(&keypair)
        .unwrap();

        announcement.endpoint = "10.0.0.1:9000".to_string();
        assert!(!announcement.verify().unwrap());
    }

    #[test]
    fn reachability_path_compares_structurally() {
        assert!(ReachabilityPath::Direct.same_path(&ReachabilityPath::Direct));
        assert!(!ReachabilityPath::Direct.same_path(&ReachabilityPath::Relay("peer1".into())));
        assert!(!ReachabilityPath::Relay("a".into()).same_path(&ReachabilityPath::Relay("b".into())));
    }
}
