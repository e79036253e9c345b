//! Lock-free pending bitmask.
//!
//! Raising is a single `fetch_or`; draining is a single `swap(0)`. Both are
//! read-modify-write operations on one word, so they linearize and no raise
//! is ever lost or counted twice.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{PendingSet, PendingSnapshot};
use crate::common::LineId;

/// Pending bitmask backed by an `AtomicU64`.
#[derive(Debug, Default)]
pub struct AtomicPending {
    bits: AtomicU64,
}

impl AtomicPending {
    /// Creates an empty bitmask.
    pub const fn new() -> Self {
        Self {
            bits: AtomicU64::new(0),
        }
    }
}

impl PendingSet for AtomicPending {
    #[inline(always)]
    fn raise(&self, line: LineId) {
        // Release pairs with the Acquire in drain: whatever the producer wrote
        // before raising is visible to the handler.
        let _ = self.bits.fetch_or(line.mask(), Ordering::Release);
    }

    fn drain(&self) -> PendingSnapshot {
        // Cheap early-out keeps an idle enable from dirtying the cache line.
        if self.bits.load(Ordering::Relaxed) == 0 {
            return PendingSnapshot::EMPTY;
        }
        PendingSnapshot::from_bits(self.bits.swap(0, Ordering::AcqRel))
    }

    fn peek(&self) -> PendingSnapshot {
        PendingSnapshot::from_bits(self.bits.load(Ordering::Acquire))
    }
}
