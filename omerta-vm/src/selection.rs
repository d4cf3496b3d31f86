//! Peer selection: scoring and ranking candidate providers for a VM
//! request (§4.5).

use omerta_mesh::{PeerId, PeerMetadata, ResourceCapability, ResourceRequirements};

#[derive(Debug, Clone)]
pub struct Candidate {
    pub peer_id: PeerId,
    pub capabilities: Vec<ResourceCapability>,
    pub metadata: PeerMetadata,
    pub last_seen_unix_secs: u64,
}

/// `10/7/5/2` for `<30s/<60s/<120s/else` (§4.5).
fn freshness_bonus(now_unix_secs: u64, last_seen_unix_secs: u64) -> f64 {
    let age = now_unix_secs.saturating_sub(last_seen_unix_secs);
    if age < 30 {
        10.0
    } else if age < 60 {
        7.0
    } else if age < 120 {
        5.0
    } else {
        2.0
    }
}

/// `score = 0.6*reputation + 0.3*(1000/max(responseMs,1)) + freshnessBonus(lastSeen)`.
pub fn score_candidate(candidate: &Candidate, now_unix_secs: u64) -> f64 {
    let reputation = candidate.metadata.reputation as f64;
    let response_ms = candidate.metadata.avg_resp_ms.max(1) as f64;
    0.6 * reputation + 0.3 * (1000.0 / response_ms) + freshness_bonus(now_unix_secs, candidate.last_seen_unix_secs)
}

/// Rank candidates whose capabilities satisfy `requirements`, highest score
/// first, ties broken by `peerId` lexicographically for determinism
/// (§4.5).
pub fn select_peers(candidates: &[Candidate], requirements: &ResourceRequirements, now_unix_secs: u64) -> Vec<PeerId> {
    let mut eligible: Vec<(&Candidate, f64)> = candidates
        .iter()
        .filter(|c| c.capabilities.iter().any(|cap| cap.satisfies(requirements)))
        .map(|c| (c, score_candidate(c, now_unix_secs)))
        .collect();

    eligible.sort_by(|(a, a_score), (b, b_score)| {
        b_score.partial_cmp(a_score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.peer_id.cmp(&b.peer_id))
    });

    eligible.into_iter().map(|(c, _)| c.peer_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn capability(cores: u32) -> ResourceCapability {
        ResourceCapability {
            total_cpu_cores: cores,
            available_cpu_cores: cores,
            cpu_architecture: Default::default(),
            total_memory_mb: 8192,
            available_memory_mb: 8192,
            total_storage_mb: 100_000,
            available_storage_mb: 100_000,
            network_bandwidth_mbps: Some(1000),
            gpu: None,
            available_images: HashSet::new(),
        }
    }

    fn candidate(peer_id: &str, reputation: u8, avg_resp_ms: u32, last_seen_unix_secs: u64) -> Candidate {
        Candidate {
            peer_id: peer_id.to_string(),
            capabilities: vec![capability(8)],
            metadata: PeerMetadata { reputation, jobs_completed: 0, jobs_rejected: 0, avg_resp_ms },
            last_seen_unix_secs,
        }
    }

    #[test]
    fn higher_reputation_scores_higher_all_else_equal() {
        let now = 1_000;
        let high = candidate("a", 100, 50, now);
        let low = candidate("b", 10, 50, now);
        assert!(score_candidate(&high, now) > score_candidate(&low, now));
    }

    #[test]
    fn fresher_contact_scores_higher_all_else_equal() {
        let now = 1_000;
        let fresh = candidate("a", 50, 50, now - 10);
        let stale = candidate("b", 50, 50, now - 200);
        assert!(score_candidate(&fresh, now) > score_candidate(&stale, now));
    }

    #[test]
    fn ineligible_candidates_are_filtered_out() {
        let now = 1_000;
        let mut under_provisioned = candidate("a", 100, 10, now);
        under_provisioned.capabilities = vec![capability(1)];

        let req = ResourceRequirements { cpu_cores: Some(4), ..Default::default() };
        let ranked = select_peers(&[under_provisioned], &req, now);
        assert!(ranked.is_empty());
    }

    #[test]
    fn ties_break_by_peer_id_lexicographically() {
        let now = 1_000;
        let a = candidate("zzz", 50, 50, now);
        let b = candidate("aaa", 50, 50, now);

        let req = ResourceRequirements::default();
        let ranked = select_peers(&[a, b], &req, now);
        assert_eq!(ranked, vec!["aaa".to_string(), "zzz".to_string()]);
    }

    #[test]
    fn ranking_orders_highest_score_first() {
        let now = 1_000;
        let best = candidate("best", 100, 10, now);
        let worst = candidate("worst", 1, 900, now - 500);

        let req = ResourceRequirements::default();
        let ranked = select_peers(&[worst, best], &req, now);
        assert_eq!(ranked, vec!["best".to_string(), "worst".to_string()]);
    }
}
