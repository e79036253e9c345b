//! Delivery statistics.
//!
//! Counters are plain relaxed atomics: `raise` bumps one from producer
//! context, which is safe because `fetch_add` neither blocks nor allocates.
//! They are pointer-width so they exist on targets without 64-bit atomics;
//! snapshots widen them to `u64`.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Live counters owned by a controller.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    raised: AtomicUsize,
    passes: AtomicUsize,
    delivered: AtomicUsize,
}

impl StatsCounters {
    #[inline(always)]
    pub(crate) fn record_raise(&self) {
        let _ = self.raised.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pass(&self) {
        let _ = self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery(&self) {
        let _ = self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> IrqStats {
        IrqStats {
            raised: widen(&self.raised),
            delivery_passes: widen(&self.passes),
            delivered: widen(&self.delivered),
        }
    }
}

/// Reads a counter as `u64`.
#[inline]
pub(crate) fn widen(counter: &AtomicUsize) -> u64 {
    counter.load(Ordering::Relaxed) as u64
}

/// Point-in-time copy of a controller's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IrqStats {
    /// Successful `raise` calls, including ones coalesced into an already-set bit.
    pub raised: u64,
    /// Enable transitions that found at least one pending line.
    pub delivery_passes: u64,
    /// Lines handed to the dispatch domain.
    pub delivered: u64,
}

impl IrqStats {
    /// Raises that were absorbed by an already-pending bit (or are still pending).
    pub const fn coalesced(&self) -> u64 {
        self.raised.saturating_sub(self.delivered)
    }
}

impl fmt::Display for IrqStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "raised           {}", self.raised)?;
        writeln!(f, "delivery passes  {}", self.delivery_passes)?;
        writeln!(f, "delivered        {}", self.delivered)?;
        write!(f, "coalesced        {}", self.coalesced())
    }
}
