//! Pending bitmask.
//!
//! One bit per line id; a set bit means "raised since the last drain, not yet
//! dispatched". Raises are edge-triggered: repeated raises before a drain
//! collapse into the same bit. Two backends implement [`PendingSet`]:
//! 1. **Atomic:** `fetch_or` to raise and `swap(0)` to drain.
//! 2. **Locked:** A single mutex guarding a plain word, for targets without
//!    native 64-bit atomics.
//!
//! Callers never see which backend is active.

use std::fmt;

use crate::common::LineId;
use crate::config::PendingBackend;

/// Native atomic backend.
#[cfg(target_has_atomic = "64")]
pub mod atomic;

/// Mutex-guarded backend.
pub mod locked;

#[cfg(target_has_atomic = "64")]
pub use atomic::AtomicPending;
pub use locked::LockedPending;

/// Set of raised-but-undelivered lines.
///
/// `raise` may run concurrently from any number of producers. `drain` is
/// fetch-and-clear: a bit set by a racing `raise` either appears in the
/// returned snapshot or stays pending for the next drain.
pub trait PendingSet: Send + Sync + fmt::Debug {
    /// Marks `line` pending. Must not block on anything a producer could be holding.
    fn raise(&self, line: LineId);

    /// Returns every pending line and clears them in one indivisible step.
    fn drain(&self) -> PendingSnapshot;

    /// Returns the pending lines without clearing them.
    fn peek(&self) -> PendingSnapshot;
}

/// Builds the backend selected by `backend`.
///
/// `Auto`, and `Atomic` on targets without 64-bit atomics, fall back to the
/// locked backend where native atomics are missing.
pub fn new_pending(backend: PendingBackend) -> Box<dyn PendingSet> {
    match backend {
        PendingBackend::Locked => Box::new(LockedPending::new()),
        PendingBackend::Auto | PendingBackend::Atomic => native_or_locked(),
    }
}

#[cfg(target_has_atomic = "64")]
fn native_or_locked() -> Box<dyn PendingSet> {
    Box::new(AtomicPending::new())
}

#[cfg(not(target_has_atomic = "64"))]
fn native_or_locked() -> Box<dyn PendingSet> {
    Box::new(LockedPending::new())
}

/// Copy of the pending word taken by a drain or peek.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PendingSnapshot(u64);

impl PendingSnapshot {
    /// Snapshot with no line pending.
    pub const EMPTY: Self = Self(0);

    /// Wraps a raw word. Bit 0 is reserved and dropped.
    #[inline]
    pub(crate) const fn from_bits(bits: u64) -> Self {
        Self(bits & !1)
    }

    /// Returns the raw word.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if no line is pending.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if `line` is pending.
    #[inline]
    pub const fn contains(self, line: LineId) -> bool {
        self.0 & line.mask() != 0
    }

    /// Number of pending lines.
    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates pending lines from the lowest id to the highest.
    pub const fn iter(self) -> SnapshotIter {
        SnapshotIter(self.0)
    }
}

impl IntoIterator for PendingSnapshot {
    type Item = LineId;
    type IntoIter = SnapshotIter;

    fn into_iter(self) -> SnapshotIter {
        self.iter()
    }
}

/// Ascending iterator over the lines of a [`PendingSnapshot`].
#[derive(Clone, Debug)]
pub struct SnapshotIter(u64);

impl Iterator for SnapshotIter {
    type Item = LineId;

    fn next(&mut self) -> Option<LineId> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros();
        // Clear the lowest set bit.
        self.0 &= self.0 - 1;
        Some(LineId::from_bit(bit))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SnapshotIter {}
