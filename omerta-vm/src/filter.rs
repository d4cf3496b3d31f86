//! Provider-side access control: `FilterManager` decides whether an
//! incoming `vm-request` is even considered for resource allocation (§4.5).
//!
//! Rules are evaluated in a fixed order and the first deterministic
//! decision short-circuits the rest — an owner override always wins, a
//! block always loses, and everything else falls through to the default
//! action.

use std::collections::HashSet;

use omerta_mesh::{PeerId, ResourceRequirements};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptPriority {
    Owner,
    Network,
    Trusted,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept(AcceptPriority),
    Reject(String),
    NeedsApproval,
}

#[derive(Debug, Clone)]
pub struct FilterRequest {
    pub requester_id: PeerId,
    pub network_id: String,
    pub requirements: ResourceRequirements,
    pub activity_description: Option<String>,
}

/// CPU/memory/disk ceilings a single request may not exceed, independent
/// of whatever the provider actually has free.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    pub max_cpu_cores: Option<u32>,
    pub max_memory_mb: Option<u64>,
    pub max_storage_mb: Option<u64>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        ResourceLimits { max_cpu_cores: None, max_memory_mb: None, max_storage_mb: None }
    }
}

impl ResourceLimits {
    fn violates(&self, req: &ResourceRequirements) -> Option<String> {
        if let (Some(limit), Some(wanted)) = (self.max_cpu_cores, req.cpu_cores) {
            if wanted > limit {
                return Some(format!("cpu_cores {wanted} exceeds limit {limit}"));
            }
        }
        if let (Some(limit), Some(wanted)) = (self.max_memory_mb, req.memory_mb) {
            if wanted > limit {
                return Some(format!("memory_mb {wanted} exceeds limit {limit}"));
            }
        }
        if let (Some(limit), Some(wanted)) = (self.max_storage_mb, req.storage_mb) {
            if wanted > limit {
                return Some(format!("storage_mb {wanted} exceeds limit {limit}"));
            }
        }
        None
    }
}

/// Keyword policy for the free-text `activityDescription` a consumer may
/// attach to a request. Forbidden keywords always beat required ones.
#[derive(Debug, Clone, Default)]
pub struct ActivityDescriptionRule {
    pub forbidden_keywords: Vec<String>,
    pub required_keywords: Vec<String>,
}

impl ActivityDescriptionRule {
    fn evaluate(&self, description: Option<&str>) -> Option<Decision> {
        let lower = description.map(|d| d.to_lowercase()).unwrap_or_default();

        for forbidden in &self.forbidden_keywords {
            if lower.contains(&forbidden.to_lowercase()) {
                return Some(Decision::Reject(format!("forbidden keyword: {forbidden}")));
            }
        }

        if !self.required_keywords.is_empty() {
            let has_required = self.required_keywords.iter().any(|kw| lower.contains(&kw.to_lowercase()));
            if !has_required {
                return Some(Decision::Reject("missing required activity description keyword".to_string()));
            }
        }

        None
    }
}

/// Hour-of-day window (UTC, `0..24`) outside which requests are rejected.
#[derive(Debug, Clone)]
pub struct QuietHoursRule {
    pub start_hour_utc: u8,
    pub end_hour_utc: u8,
}

impl QuietHoursRule {
    /// `start <= end` is a same-day window; `start > end` wraps past
    /// midnight (e.g. 22..6).
    fn is_quiet(&self, hour_utc: u8) -> bool {
        if self.start_hour_utc <= self.end_hour_utc {
            hour_utc >= self.start_hour_utc && hour_utc < self.end_hour_utc
        } else {
            hour_utc >= self.start_hour_utc || hour_utc < self.end_hour_utc
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterManager {
    pub owner_peer_id: Option<PeerId>,
    pub blocked_peer_ids: HashSet<PeerId>,
    pub accept_trusted_only: bool,
    pub trusted_network_ids: HashSet<String>,
    pub resource_limits: ResourceLimits,
    pub activity_rule: ActivityDescriptionRule,
    pub quiet_hours: Option<QuietHoursRule>,
    pub default_accept: bool,
}

impl FilterManager {
    pub fn new() -> Self {
        FilterManager { accept_trusted_only: true, default_accept: false, ..Default::default() }
    }

    /// Apply the ordered rule chain (§4.5) to a single request. `now_hour_utc`
    /// is the caller-supplied wall-clock hour so the quiet-hours rule stays
    /// a pure function of its inputs.
    pub fn evaluate(&self, request: &FilterRequest, now_hour_utc: u8) -> Decision {
        if self.owner_peer_id.as_deref() == Some(request.requester_id.as_str()) {
            return Decision::Accept(AcceptPriority::Owner);
        }

        if self.blocked_peer_ids.contains(&request.requester_id) {
            return Decision::Reject("peer is blocked".to_string());
        }

        let is_trusted_network = self.trusted_network_ids.contains(&request.network_id);
        if self.accept_trusted_only && !is_trusted_network {
            return Decision::Reject("network is not trusted and acceptTrustedOnly is set".to_string());
        }

        if let Some(reason) = self.resource_limits.violates(&request.requirements) {
            return Decision::Reject(reason);
        }

        if let Some(decision) = self.activity_rule.evaluate(request.activity_description.as_deref()) {
            return decision;
        }

        if let Some(quiet_hours) = &self.quiet_hours {
            if quiet_hours.is_quiet(now_hour_utc) {
                return Decision::Reject("quiet hours in effect".to_string());
            }
        }

        if is_trusted_network {
            return Decision::Accept(AcceptPriority::Trusted);
        }

        if self.default_accept {
            Decision::Accept(AcceptPriority::Default)
        } else {
            Decision::Reject("no matching accept rule".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(requester: &str, network: &str) -> FilterRequest {
        FilterRequest {
            requester_id: requester.to_string(),
            network_id: network.to_string(),
            requirements: ResourceRequirements::default(),
            activity_description: None,
        }
    }

    #[test]
    fn owner_override_wins_even_when_blocked() {
        let mut filter = FilterManager::new();
        filter.owner_peer_id = Some("owner1".to_string());
        filter.blocked_peer_ids.insert("owner1".to_string());

        let decision = filter.evaluate(&request("owner1", "any"), 12);
        assert_eq!(decision, Decision::Accept(AcceptPriority::Owner));
    }

    #[test]
    fn blocked_peer_is_rejected_before_trust_check() {
        let mut filter = FilterManager::new();
        filter.blocked_peer_ids.insert("bad-peer".to_string());
        filter.accept_trusted_only = false;
        filter.default_accept = true;

        let decision = filter.evaluate(&request("bad-peer", "any"), 12);
        assert!(matches!(decision, Decision::Reject(_)));
    }

    #[test]
    fn untrusted_network_rejected_under_accept_trusted_only() {
        let filter = FilterManager::new();
        let decision = filter.evaluate(&request("peer1", "stranger-net"), 12);
        assert!(matches!(decision, Decision::Reject(_)));
    }

    #[test]
    fn trusted_network_accepted() {
        let mut filter = FilterManager::new();
        filter.trusted_network_ids.insert("home-net".to_string());

        let decision = filter.evaluate(&request("peer1", "home-net"), 12);
        assert_eq!(decision, Decision::Accept(AcceptPriority::Trusted));
    }

    #[test]
    fn resource_limit_violation_rejects() {
        let mut filter = FilterManager::new();
        filter.trusted_network_ids.insert("home-net".to_string());
        filter.resource_limits.max_cpu_cores = Some(4);

        let mut req = request("peer1", "home-net");
        req.requirements.cpu_cores = Some(8);

        let decision = filter.evaluate(&req, 12);
        assert!(matches!(decision, Decision::Reject(reason) if reason.contains("cpu_cores")));
    }

    #[test]
    fn forbidden_keyword_rejects_even_with_required_keyword_present() {
        let mut filter = FilterManager::new();
        filter.trusted_network_ids.insert("home-net".to_string());
        filter.activity_rule.forbidden_keywords = vec!["mining".to_string()];
        filter.activity_rule.required_keywords = vec!["render".to_string()];

        let mut req = request("peer1", "home-net");
        req.activity_description = Some("render job, also crypto mining".to_string());

        let decision = filter.evaluate(&req, 12);
        assert!(matches!(decision, Decision::Reject(reason) if reason.contains("forbidden")));
    }

    #[test]
    fn missing_required_keyword_rejects() {
        let mut filter = FilterManager::new();
        filter.trusted_network_ids.insert("home-net".to_string());
        filter.activity_rule.required_keywords = vec!["render".to_string()];

        let mut req = request("peer1", "home-net");
        req.activity_description = Some("compile a kernel".to_string());

        let decision = filter.evaluate(&req, 12);
        assert!(matches!(decision, Decision::Reject(_)));
    }

    #[test]
    fn quiet_hours_window_rejects_inside_and_allows_outside() {
        let mut filter = FilterManager::new();
        filter.trusted_network_ids.insert("home-net".to_string());
        filter.quiet_hours = Some(QuietHoursRule { start_hour_utc: 22, end_hour_utc: 6 });

        let req = request("peer1", "home-net");
        assert!(matches!(filter.evaluate(&req, 23), Decision::Reject(_)));
        assert!(matches!(filter.evaluate(&req, 3), Decision::Reject(_)));
        assert_eq!(filter.evaluate(&req, 12), Decision::Accept(AcceptPriority::Trusted));
    }

    #[test]
    fn default_action_governs_untrusted_non_rejected_requests() {
        let mut filter = FilterManager::new();
        filter.accept_trusted_only = false;
        filter.default_accept = true;

        let decision = filter.evaluate(&request("peer1", "stranger-net"), 12);
        assert_eq!(decision, Decision::Accept(AcceptPriority::Default));
    }
}
