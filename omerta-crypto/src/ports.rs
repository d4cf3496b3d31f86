//! Capability traits for externally-injectable ambient dependencies.
//!
//! Per the design note in the specification ("the home-directory lookup is
//! the only ambient dependency — inject it"), the remaining sources of
//! non-determinism a test would otherwise fight (wall-clock time, randomness)
//! are exposed as traits here rather than called directly via `SystemTime`
//! or `OsRng`. Production code uses [`SystemClock`] and [`OsRandomSource`];
//! tests inject fixed doubles.

use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, abstracted so protocol timeouts and envelope
/// freshness checks can be tested without sleeping or racing the wall clock.
pub trait Clock: Send + Sync {
    /// Current time as unix seconds.
    fn now_unix_secs(&self) -> u64;

    /// Current time as unix milliseconds, used by components that need
    /// finer-grained timeouts (e.g. freshness query deadlines).
    fn now_unix_millis(&self) -> u64 {
        self.now_unix_secs() * 1000
    }
}

/// Wall-clock implementation of [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn now_unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A fixed, manually-advanceable clock for deterministic tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    millis: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl FixedClock {
    pub fn new(unix_secs: u64) -> Self {
        FixedClock { millis: std::sync::Arc::new(std::sync::atomic::AtomicU64::new(unix_secs * 1000)) }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.millis.fetch_add(secs * 1000, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_unix_secs(&self, secs: u64) {
        self.millis.store(secs * 1000, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix_secs(&self) -> u64 {
        self.millis.load(std::sync::atomic::Ordering::SeqCst) / 1000
    }

    fn now_unix_millis(&self) -> u64 {
        self.millis.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Source of randomness, abstracted so request ids, nonces and witness
/// recruitment jitter can be replayed deterministically in tests.
pub trait RandomSource: Send + Sync {
    fn fill_bytes(&self, dest: &mut [u8]);

    fn random_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }
}

/// OS CSPRNG-backed [`RandomSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomSource;

impl RandomSource for OsRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) {
        let mut rng = crate::random::SecureRng::new();
        rng.fill_bytes(dest);
    }
}
