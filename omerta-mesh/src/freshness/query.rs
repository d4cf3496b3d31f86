//! `FreshnessQuery`: bounded-hop `whoHasRecent` / `iHaveRecent` gossip
//! (§4.3). At most one in-flight query per peer id; concurrent callers
//! asking about the same peer share the one outstanding query; responses
//! are folded into a running "best" answer until `queryTimeout` elapses,
//! at which point the best answer (or `NotFound`) is delivered to every
//! waiter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use omerta_crypto::Clock;
use tokio::sync::watch;

use crate::types::{PeerId, ReachabilityPath};

/// Maximum gossip hop count for a `whoHasRecent` broadcast.
pub const MAX_QUERY_HOPS: u8 = 3;
/// Minimum spacing between queries for the same peer id.
pub const QUERY_RATE_LIMIT_SECS: u64 = 30;
/// How long a query waits for responses before returning its best answer.
pub const QUERY_TIMEOUT_SECS: u64 = 5;
/// A response older than this is ignored outright.
pub const MAX_ACCEPTABLE_AGE_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct IHaveRecent {
    pub peer_id: PeerId,
    pub age_secs: u64,
    pub reachability: ReachabilityPath,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FreshnessResult {
    Found(IHaveRecent),
    NotFound,
}

/// Broadcasts the `whoHasRecent` gossip message; implemented by the mesh
/// transport in production, a recording stub in tests.
#[async_trait]
pub trait FreshnessBroadcaster: Send + Sync {
    async fn broadcast_who_has_recent(&self, peer_id: &str, max_age_secs: u64, max_hops: u8);
}

struct QueryState {
    best: Mutex<Option<IHaveRecent>>,
    completed: AtomicBool,
    tx: watch::Sender<Option<FreshnessResult>>,
}

pub struct FreshnessQuery<B: FreshnessBroadcaster + 'static> {
    broadcaster: Arc<B>,
    clock: Arc<dyn Clock>,
    in_flight: Mutex<HashMap<PeerId, Arc<QueryState>>>,
    last_started: Mutex<HashMap<PeerId, u64>>,
}

impl<B: FreshnessBroadcaster + 'static> FreshnessQuery<B> {
    pub fn new(broadcaster: Arc<B>, clock: Arc<dyn Clock>) -> Self {
        FreshnessQuery {
            broadcaster,
            clock,
            in_flight: Mutex::new(HashMap::new()),
            last_started: Mutex::new(HashMap::new()),
        }
    }

    /// Query the mesh for the freshest known contact with `peer_id`.
    /// Returns once `QUERY_TIMEOUT_SECS` has elapsed (or immediately if an
    /// identical query is already in flight and completes first).
    pub async fn who_has_recent(&self, peer_id: &str) -> FreshnessResult {
        let existing = self.in_flight.lock().unwrap().get(peer_id).cloned();
        if let Some(state) = existing {
            if !state.completed.load(Ordering::SeqCst) {
                return Self::await_completion(&state).await;
            }
        }

        let now = self.clock.now_unix_secs();
        let rate_limited = {
            let mut last = self.last_started.lock().unwrap();
            match last.get(peer_id) {
                Some(prev) if now.saturating_sub(*prev) < QUERY_RATE_LIMIT_SECS => true,
                _ => {
                    last.insert(peer_id.to_string(), now);
                    false
                }
            }
        };

        if rate_limited {
            // Serve the last completed result for this peer rather than
            // firing a second broadcast inside the rate-limit window.
            let cached = self.in_flight.lock().unwrap().get(peer_id).cloned();
            return match cached {
                Some(state) => Self::await_completion(&state).await,
                None => FreshnessResult::NotFound,
            };
        }

        let (tx, _rx) = watch::channel(None);
        let state = Arc::new(QueryState {
            best: Mutex::new(None),
            completed: AtomicBool::new(false),
            tx,
        });
        self.in_flight.lock().unwrap().insert(peer_id.to_string(), state.clone());

        self.broadcaster.broadcast_who_has_recent(peer_id, MAX_ACCEPTABLE_AGE_SECS, MAX_QUERY_HOPS).await;

        let timeout_state = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(QUERY_TIMEOUT_SECS)).await;
            let result = match timeout_state.best.lock().unwrap().clone() {
                Some(best) => FreshnessResult::Found(best),
                None => FreshnessResult::NotFound,
            };
            timeout_state.completed.store(true, Ordering::SeqCst);
            let _ = timeout_state.tx.send(Some(result));
        });

        Self::await_completion(&state).await
    }

    async fn await_completion(state: &Arc<QueryState>) -> FreshnessResult {
        let mut rx = state.tx.subscribe();
        loop {
            if let Some(result) = rx.borrow().clone() {
                return result;
            }
            if rx.changed().await.is_err() {
                return FreshnessResult::NotFound;
            }
        }
    }

    /// Feed an `iHaveRecent` response into the in-flight query for
    /// `peer_id`, if any. Accepted only if the response is within
    /// `MAX_ACCEPTABLE_AGE_SECS` and strictly fresher than the current
    /// best.
    pub fn record_response(&self, response: IHaveRecent) {
        if response.age_secs > MAX_ACCEPTABLE_AGE_SECS {
            return;
        }
        let state = match self.in_flight.lock().unwrap().get(&response.peer_id).cloned() {
            Some(s) if !s.completed.load(Ordering::SeqCst) => s,
            _ => return,
        };

        let mut best = state.best.lock().unwrap();
        let should_replace = match best.as_ref() {
            Some(current) => response.age_secs < current.age_secs,
            None => true,
        };
        if should_replace {
            *best = Some(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omerta_crypto::ports::FixedClock;
    use std::sync::atomic::AtomicUsize;

    struct CountingBroadcaster {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FreshnessBroadcaster for CountingBroadcaster {
        async fn broadcast_who_has_recent(&self, _peer_id: &str, _max_age_secs: u64, _max_hops: u8) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_not_found_after_timeout_with_no_responses() {
        let broadcaster = Arc::new(CountingBroadcaster { calls: AtomicUsize::new(0) });
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let query = FreshnessQuery::new(broadcaster.clone(), clock);

        let result = query.who_has_recent("peerZ").await;
        assert_eq!(result, FreshnessResult::NotFound);
        assert_eq!(broadcaster.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn best_response_wins_over_worse_one() {
        let broadcaster = Arc::new(CountingBroadcaster { calls: AtomicUsize::new(0) });
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let query = Arc::new(FreshnessQuery::new(broadcaster, clock));

        let query_clone = query.clone();
        let handle = tokio::spawn(async move { query_clone.who_has_recent("peerZ").await });

        tokio::task::yield_now().await;
        query.record_response(IHaveRecent { peer_id: "peerZ".into(), age_secs: 250, reachability: ReachabilityPath::Relay("r1".into()) });
        query.record_response(IHaveRecent { peer_id: "peerZ".into(), age_secs: 120, reachability: ReachabilityPath::Direct });

        let result = handle.await.unwrap();
        assert_eq!(
            result,
            FreshnessResult::Found(IHaveRecent { peer_id: "peerZ".into(), age_secs: 120, reachability: ReachabilityPath::Direct })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_broadcast() {
        let broadcaster = Arc::new(CountingBroadcaster { calls: AtomicUsize::new(0) });
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let query = Arc::new(FreshnessQuery::new(broadcaster.clone(), clock));

        let q1 = query.clone();
        let q2 = query.clone();
        let h1 = tokio::spawn(async move { q1.who_has_recent("peerZ").await });
        tokio::task::yield_now().await;
        let h2 = tokio::spawn(async move { q2.who_has_recent("peerZ").await });

        let (r1, r2) = tokio::join!(h1, h2);
        assert_eq!(r1.unwrap(), FreshnessResult::NotFound);
        assert_eq!(r2.unwrap(), FreshnessResult::NotFound);
        assert_eq!(broadcaster.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overly_stale_response_is_ignored() {
        let broadcaster = Arc::new(CountingBroadcaster { calls: AtomicUsize::new(0) });
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let query = Arc::new(FreshnessQuery::new(broadcaster, clock));

        let query_clone = query.clone();
        let handle = tokio::spawn(async move { query_clone.who_has_recent("peerZ").await });
        tokio::task::yield_now().await;

        query.record_response(IHaveRecent { peer_id: "peerZ".into(), age_secs: 301, reachability: ReachabilityPath::Direct });
        // No valid response arrived; the in-flight query should time out to NotFound.
        let result = handle.await.unwrap();
        assert_eq!(result, FreshnessResult::NotFound);
    }
}
