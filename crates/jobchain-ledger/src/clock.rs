//! Physical time effect
//!
//! The ledger never reads the wall clock directly; the service is handed a
//! [`PhysicalClock`] so tests and replays can pin time.

use crate::types::PhysicalTime;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock timestamps.
#[async_trait]
pub trait PhysicalClock: Send + Sync {
    /// Current time.
    async fn physical_time(&self) -> PhysicalTime;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl PhysicalClock for SystemClock {
    async fn physical_time(&self) -> PhysicalTime {
        // A clock before the epoch is reported as the epoch itself.
        let ts_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        PhysicalTime::from_ms(ts_ms)
    }
}

/// Deterministic clock for tests; advances only when told to.
#[derive(Debug, Default)]
pub struct FixedClock {
    ts_ms: AtomicU64,
}

impl FixedClock {
    /// Create a clock pinned at `ts_ms`.
    pub fn new(ts_ms: u64) -> Self {
        Self {
            ts_ms: AtomicU64::new(ts_ms),
        }
    }

    /// Move the clock forward.
    pub fn advance_ms(&self, delta_ms: u64) {
        self.ts_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl PhysicalClock for FixedClock {
    async fn physical_time(&self) -> PhysicalTime {
        PhysicalTime::from_ms(self.ts_ms.load(Ordering::SeqCst))
    }
}
