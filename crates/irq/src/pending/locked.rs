//! Mutex-guarded pending bitmask.
//!
//! Stand-in for targets without native 64-bit atomic read-modify-write. One
//! lock guards every read and write of the word, so the external contract is
//! identical to the atomic backend. Critical sections are a single
//! load/store and never call out, so a producer holds the lock only for the
//! duration of an OR.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{PendingSet, PendingSnapshot};
use crate::common::LineId;

/// Pending bitmask guarded by a single mutex.
#[derive(Debug, Default)]
pub struct LockedPending {
    bits: Mutex<u64>,
}

impl LockedPending {
    /// Creates an empty bitmask.
    pub const fn new() -> Self {
        Self {
            bits: Mutex::new(0),
        }
    }

    /// Locks the word. A poisoned lock still guards a valid `u64`.
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.bits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PendingSet for LockedPending {
    fn raise(&self, line: LineId) {
        *self.lock() |= line.mask();
    }

    fn drain(&self) -> PendingSnapshot {
        let mut bits = self.lock();
        PendingSnapshot::from_bits(std::mem::take(&mut *bits))
    }

    fn peek(&self) -> PendingSnapshot {
        PendingSnapshot::from_bits(*self.lock())
    }
}
