//! `PathFailureReporter`: records local connection failures and invalidates
//! any cached contact using the same path, without ever fabricating
//! success (§4.3, §7 `PathFailed`).

use std::sync::Arc;

use omerta_crypto::Clock;
use parking_lot::Mutex;

use crate::types::{PeerId, ReachabilityPath};

use super::contact::RecentContactTracker;

#[derive(Debug, Clone)]
pub struct PathFailureEvent {
    pub peer_id: PeerId,
    pub path: ReachabilityPath,
    pub observed_unix_secs: u64,
}

/// Callback invoked when a failure is forwarded to peers. Forwarding never
/// claims success on behalf of another peer; it is purely informational.
pub type FailureForwarder = Arc<dyn Fn(&PathFailureEvent) + Send + Sync>;

pub struct PathFailureReporter {
    contacts: Arc<RecentContactTracker>,
    clock: Arc<dyn Clock>,
    local_log: Mutex<Vec<PathFailureEvent>>,
    forwarder: Option<FailureForwarder>,
}

impl PathFailureReporter {
    pub fn new(contacts: Arc<RecentContactTracker>, clock: Arc<dyn Clock>) -> Self {
        PathFailureReporter { contacts, clock, local_log: Mutex::new(Vec::new()), forwarder: None }
    }

    pub fn with_forwarder(mut self, forwarder: FailureForwarder) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Report a failure reaching `peer_id` over `path`: record it locally,
    /// invalidate any cache entry using that exact path, and optionally
    /// forward it.
    pub fn report_connection_failure(&self, peer_id: PeerId, path: ReachabilityPath) {
        let event = PathFailureEvent { peer_id: peer_id.clone(), path: path.clone(), observed_unix_secs: self.clock.now_unix_secs() };

        self.contacts.remove_contacts_using_path(&peer_id, &path);
        self.local_log.lock().push(event.clone());

        if let Some(forwarder) = &self.forwarder {
            forwarder(&event);
        }
    }

    pub fn failures_for(&self, peer_id: &str) -> Vec<PathFailureEvent> {
        self.local_log.lock().iter().filter(|e| e.peer_id == peer_id).cloned().collect()
    }

    pub fn recent_failure_count(&self) -> usize {
        self.local_log.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omerta_crypto::ports::FixedClock;

    #[test]
    fn reporting_failure_invalidates_cache_and_records_locally() {
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let contacts = Arc::new(RecentContactTracker::new(clock.clone()));
        contacts.record_contact("peer1".into(), ReachabilityPath::Direct, 30, "udp");

        let reporter = PathFailureReporter::new(contacts.clone(), clock);
        reporter.report_connection_failure("peer1".into(), ReachabilityPath::Direct);

        assert!(contacts.get_contact("peer1").is_none());
        assert_eq!(reporter.failures_for("peer1").len(), 1);
    }

    #[test]
    fn forwarder_is_invoked_but_never_fabricates_success() {
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let contacts = Arc::new(RecentContactTracker::new(clock.clone()));
        let forwarded = Arc::new(Mutex::new(Vec::new()));

        let forwarded_clone = forwarded.clone();
        let reporter = PathFailureReporter::new(contacts, clock)
            .with_forwarder(Arc::new(move |event| forwarded_clone.lock().push(event.peer_id.clone())));

        reporter.report_connection_failure("peer2".into(), ReachabilityPath::Relay("r1".into()));

        assert_eq!(forwarded.lock().as_slice(), &["peer2".to_string()]);
    }
}
