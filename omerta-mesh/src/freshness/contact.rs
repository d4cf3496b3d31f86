//! `RecentContactTracker`: bounded LRU + TTL record of who we've
//! successfully communicated with recently, and by what path (§4.3).

use std::sync::Arc;

use lru::LruCache;
use omerta_crypto::Clock;
use parking_lot::Mutex;

use crate::types::{PeerId, ReachabilityPath, RecentContact};

/// Max entries before LRU eviction kicks in.
pub const MAX_CONTACTS: usize = 500;

/// Entries older than this are treated as absent even if still cached.
pub const CONTACT_TTL_SECS: u64 = 5 * 60;

pub struct RecentContactTracker {
    cache: Mutex<LruCache<PeerId, RecentContact>>,
    clock: Arc<dyn Clock>,
}

impl RecentContactTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        RecentContactTracker {
            cache: Mutex::new(LruCache::new(std::num::NonZeroUsize::new(MAX_CONTACTS).unwrap())),
            clock,
        }
    }

    /// Create a new contact record on successful communication. This is the
    /// only operation that creates an entry; [`touch`](Self::touch) never
    /// does.
    pub fn record_contact(&self, peer_id: PeerId, reachability: ReachabilityPath, latency_ms: u32, connection_type: &str) {
        let now = self.clock.now_unix_secs();
        self.cache.lock().put(
            peer_id.clone(),
            RecentContact {
                peer_id,
                last_seen_unix_secs: now,
                reachability,
                latency_ms,
                connection_type: connection_type.to_string(),
            },
        );
    }

    /// Refresh `last_seen` on an existing contact. Never creates a new
    /// entry for an unknown peer.
    pub fn touch(&self, peer_id: &str) -> bool {
        let now = self.clock.now_unix_secs();
        let mut cache = self.cache.lock();
        if let Some(contact) = cache.get_mut(peer_id) {
            contact.last_seen_unix_secs = now;
            true
        } else {
            false
        }
    }

    /// Fetch a contact, applying the TTL: an entry older than
    /// [`CONTACT_TTL_SECS`] is treated as absent (and evicted).
    pub fn get_contact(&self, peer_id: &str) -> Option<RecentContact> {
        let now = self.clock.now_unix_secs();
        let mut cache = self.cache.lock();
        let expired = match cache.peek(peer_id) {
            Some(contact) => now.saturating_sub(contact.last_seen_unix_secs) >= CONTACT_TTL_SECS,
            None => return None,
        };
        if expired {
            cache.pop(peer_id);
            return None;
        }
        cache.get(peer_id).cloned()
    }

    /// Invariant (iii): if a tracked contact's path exactly matches
    /// `failed_path`, remove it. Used by [`super::path_failure::PathFailureReporter`]
    /// so a cached entry can never claim success over a path that just
    /// failed.
    pub fn remove_contacts_using_path(&self, peer_id: &str, failed_path: &ReachabilityPath) -> bool {
        let mut cache = self.cache.lock();
        let matches = matches!(cache.peek(peer_id), Some(c) if c.reachability.same_path(failed_path));
        if matches {
            cache.pop(peer_id);
        }
        matches
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
