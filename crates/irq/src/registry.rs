//! Interrupt line registry.
//!
//! Hands out line ids to named owners. Allocation is lowest-free-first over
//! `1..nr_lines`; release checks that the caller is the recorded owner so one
//! subsystem cannot free another's line.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::common::{IrqError, LineId, MAX_LINES};

/// Owner table indexed by line id. Slot 0 is never used.
#[derive(Debug)]
pub struct LineRegistry {
    owners: Mutex<Vec<Option<String>>>,
}

impl LineRegistry {
    /// Creates an empty registry for ids `0..nr_lines`.
    ///
    /// `nr_lines` is capped at [`MAX_LINES`] so every allocated id fits the
    /// pending bitmask.
    pub fn new(nr_lines: u32) -> Self {
        Self {
            owners: Mutex::new(vec![None; nr_lines.min(MAX_LINES) as usize]),
        }
    }

    fn table(&self) -> MutexGuard<'_, Vec<Option<String>>> {
        self.owners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Assigns the lowest free line to `owner`.
    ///
    /// # Errors
    ///
    /// [`IrqError::Exhausted`] when every line in `1..nr_lines` is taken.
    pub fn allocate(&self, owner: &str) -> Result<LineId, IrqError> {
        let mut owners = self.table();
        let (idx, slot) = owners
            .iter_mut()
            .enumerate()
            .skip(1)
            .find(|(_, slot)| slot.is_none())
            .ok_or(IrqError::Exhausted)?;
        let raw = u32::try_from(idx).map_err(|_| IrqError::Exhausted)?;
        *slot = Some(owner.to_owned());
        let line = LineId::from_bit(raw);
        debug!(%line, owner, "allocated interrupt line");
        Ok(line)
    }

    /// Frees `line` if `owner` matches the recorded owner.
    ///
    /// A mismatch (or an unallocated line) leaves the table untouched and
    /// logs a warning; it is not reported to the caller.
    pub fn release(&self, line: LineId, owner: &str) {
        let mut owners = self.table();
        let Some(slot) = owners.get_mut(line.index()) else {
            warn!(%line, owner, "release of a line outside the registry");
            return;
        };
        match slot.as_deref() {
            Some(current) if current == owner => {
                *slot = None;
                debug!(%line, owner, "released interrupt line");
            }
            current => {
                warn!(
                    %line,
                    owner,
                    holder = current.unwrap_or("<none>"),
                    "tried to release another owner's interrupt line"
                );
            }
        }
    }

    /// Returns the owner of `line`, if allocated.
    pub fn owner(&self, line: LineId) -> Option<String> {
        self.table().get(line.index()).cloned().flatten()
    }

    /// Returns `true` if `line` is allocated.
    pub fn is_allocated(&self, line: LineId) -> bool {
        self.table()
            .get(line.index())
            .is_some_and(Option::is_some)
    }

    /// Number of allocated lines.
    pub fn allocated_count(&self) -> usize {
        self.table().iter().filter(|slot| slot.is_some()).count()
    }
}
