//! Channel-tag routing: the only way higher layers communicate over the
//! mesh (§4.2). Incoming plaintext payloads carry a `channel` string tag;
//! handlers are registered per channel name with last-registration-wins
//! semantics (single-writer).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::types::PeerId;

/// A channel handler receives the sender's peer id and the decoded
/// payload. Handlers run on the owning actor's task, never concurrently
/// with each other (§5: "guarded by the owning actor").
pub type ChannelHandler = Arc<dyn Fn(PeerId, Value) + Send + Sync>;

#[derive(Default, Clone)]
pub struct ChannelRouter {
    handlers: Arc<RwLock<HashMap<String, ChannelHandler>>>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        ChannelRouter::default()
    }

    /// Register a handler for `channel`. A second call with the same name
    /// replaces the first; the first handler is cleanly deregistered and
    /// never invoked again.
    pub fn on_channel(&self, channel: impl Into<String>, handler: ChannelHandler) {
        self.handlers.write().insert(channel.into(), handler);
    }

    pub fn deregister(&self, channel: &str) {
        self.handlers.write().remove(channel);
    }

    /// Dispatch `payload` from `from_peer` to the channel's current
    /// handler, if any. Unrouted channels are silently ignored.
    pub fn dispatch(&self, channel: &str, from_peer: PeerId, payload: Value) {
        let handler = self.handlers.read().get(channel).cloned();
        if let Some(handler) = handler {
            handler(from_peer, payload);
        }
    }

    pub fn has_handler(&self, channel: &str) -> bool {
        self.handlers.read().contains_key(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_registration_replaces_first_and_first_is_never_called_again() {
        let router = ChannelRouter::new();
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));

        {
            let first_calls = first_calls.clone();
            router.on_channel("vm-request", Arc::new(move |_peer, _payload| {
                first_calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        {
            let second_calls = second_calls.clone();
            router.on_channel("vm-request", Arc::new(move |_peer, _payload| {
                second_calls.fetch_add(1, Ordering::SeqCst);
            }));
        }

        router.dispatch("vm-request", "peer1".into(), json!({}));

        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_to_unrouted_channel_is_a_no_op() {
        let router = ChannelRouter::new();
        router.dispatch("nothing-here", "peer1".into(), json!({}));
    }

    #[test]
    fn deregister_removes_handler() {
        let router = ChannelRouter::new();
        router.on_channel("vm-ack", Arc::new(|_peer, _payload| {}));
        assert!(router.has_handler("vm-ack"));
        router.deregister("vm-ack");
        assert!(!router.has_handler("vm-ack"));
    }
}
