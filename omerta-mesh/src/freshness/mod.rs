//! `FreshnessManager`: composes [`RecentContactTracker`], [`FreshnessQuery`]
//! and [`PathFailureReporter`] into the facade the VM protocol and peer
//! selection layers use (§4.3).

pub mod contact;
pub mod path_failure;
pub mod query;

pub use contact::{RecentContactTracker, CONTACT_TTL_SECS, MAX_CONTACTS};
pub use path_failure::{FailureForwarder, PathFailureEvent, PathFailureReporter};
pub use query::{
    FreshnessBroadcaster, FreshnessResult, IHaveRecent, MAX_ACCEPTABLE_AGE_SECS, MAX_QUERY_HOPS,
    QUERY_RATE_LIMIT_SECS, QUERY_TIMEOUT_SECS,
};

use std::sync::Arc;

use omerta_crypto::Clock;

use crate::types::{PeerId, ReachabilityPath, RecentContact};
use query::FreshnessQuery;

pub struct FreshnessManager<B: FreshnessBroadcaster + 'static> {
    pub contacts: Arc<RecentContactTracker>,
    pub query: FreshnessQuery<B>,
    pub path_failures: Arc<PathFailureReporter>,
}

impl<B: FreshnessBroadcaster + 'static> FreshnessManager<B> {
    pub fn new(broadcaster: Arc<B>, clock: Arc<dyn Clock>) -> Self {
        let contacts = Arc::new(RecentContactTracker::new(clock.clone()));
        let path_failures = Arc::new(PathFailureReporter::new(contacts.clone(), clock.clone()));
        let query = FreshnessQuery::new(broadcaster, clock);
        FreshnessManager { contacts, query, path_failures }
    }

    pub fn record_contact(&self, peer_id: PeerId, reachability: ReachabilityPath, latency_ms: u32, connection_type: &str) {
        self.contacts.record_contact(peer_id, reachability, latency_ms, connection_type);
    }

    pub fn get_contact(&self, peer_id: &str) -> Option<RecentContact> {
        self.contacts.get_contact(peer_id)
    }

    pub fn report_connection_failure(&self, peer_id: PeerId, path: ReachabilityPath) {
        self.path_failures.report_connection_failure(peer_id, path);
    }

    /// §4.3: prefer a recent local contact over a network query when we
    /// already have one within the TTL.
    pub async fn who_has_recent(&self, peer_id: &str) -> FreshnessResult {
        if let Some(contact) = self.get_contact(peer_id) {
            return FreshnessResult::Found(IHaveRecent {
                peer_id: contact.peer_id,
                age_secs: 0,
                reachability: contact.reachability,
            });
        }
        self.query.who_has_recent(peer_id).await
    }
}
