//! Dispatch contract and the internal line → handler table.
//!
//! The delivery engine hands each pending line to an [`IrqDomain`]. Kernels
//! with their own dispatch framework implement the trait themselves; the
//! [`HandlerTable`] here is the minimal stand-in: one chip slot and at most
//! one handler per line, with simple-IRQ flow (run the handler if present,
//! otherwise count the line as spurious).

use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, trace, warn};

use crate::chip::IrqChip;
use crate::common::{IrqError, LineId, MAX_LINES};
use crate::config::ResourceFailurePolicy;
use crate::stats::widen;

/// Handler invoked when a line is delivered.
pub type Handler = Arc<dyn Fn(LineId) + Send + Sync>;

/// Routes delivered lines to whatever higher layers registered for them.
pub trait IrqDomain: Send + Sync + fmt::Debug {
    /// Installs `chip` on line `irq`. Ids outside the domain are ignored.
    fn set_chip(&self, irq: u32, chip: Arc<dyn IrqChip>);

    /// Runs the handler(s) for `line`. A line with no handler is a no-op.
    fn handle(&self, line: LineId);
}

struct Action {
    name: String,
    handler: Handler,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct Slot {
    chip: Option<Arc<dyn IrqChip>>,
    action: Option<Action>,
}

/// Line → chip/handler table implementing [`IrqDomain`].
#[derive(Debug)]
pub struct HandlerTable {
    slots: RwLock<Vec<Slot>>,
    /// Per-line delivery counts, indexed by line id.
    counts: Vec<AtomicUsize>,
    spurious: AtomicUsize,
    policy: ResourceFailurePolicy,
}

impl HandlerTable {
    /// Creates an empty table for ids `0..nr_lines`.
    ///
    /// `nr_lines` is capped at [`MAX_LINES`]; ids past the bitmask are never delivered.
    pub fn new(nr_lines: u32, policy: ResourceFailurePolicy) -> Self {
        let n = nr_lines.min(MAX_LINES) as usize;
        Self {
            slots: RwLock::new(std::iter::repeat_with(Slot::default).take(n).collect()),
            counts: std::iter::repeat_with(|| AtomicUsize::new(0)).take(n).collect(),
            spurious: AtomicUsize::new(0),
            policy,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Slot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs `handler` on `line` under the action name `name`.
    ///
    /// The line's chip is asked for resources first, then started. The
    /// resource request runs without the table lock, so host hooks may query
    /// the table.
    ///
    /// # Errors
    ///
    /// * [`IrqError::Invalid`] - `line` is outside this table.
    /// * [`IrqError::NoChip`] - no chip installed (the controller was not initialized).
    /// * [`IrqError::Busy`] - the line already has a handler.
    /// * [`IrqError::ResourceUnavailable`] - the chip refused resources and the
    ///   policy is [`ResourceFailurePolicy::Surface`].
    pub fn request_irq<F>(&self, line: LineId, name: &str, handler: F) -> Result<(), IrqError>
    where
        F: Fn(LineId) + Send + Sync + 'static,
    {
        let chip = self.idle_chip(line)?;

        let acquired = match chip.request_resources(line) {
            Ok(()) => true,
            Err(err) => match self.policy {
                ResourceFailurePolicy::Surface => return Err(err),
                ResourceFailurePolicy::Ignore => {
                    warn!(%line, name, error = %err, "ignoring resource request failure");
                    false
                }
            },
        };

        let mut slots = self.write();
        let Some(slot) = slots.get_mut(line.index()) else {
            return Err(IrqError::Invalid(line.get()));
        };
        if slot.action.is_some() {
            // Another caller won the line while the host was consulted.
            drop(slots);
            if acquired {
                chip.release_resources(line);
            }
            return Err(IrqError::Busy(line));
        }
        chip.startup(line);
        slot.action = Some(Action {
            name: name.to_owned(),
            handler: Arc::new(handler),
        });
        info!(%line, name, chip = chip.name(), "handler installed");
        Ok(())
    }

    /// Returns the chip of a line that has no handler yet.
    fn idle_chip(&self, line: LineId) -> Result<Arc<dyn IrqChip>, IrqError> {
        let slots = self.read();
        let slot = slots
            .get(line.index())
            .ok_or(IrqError::Invalid(line.get()))?;
        let chip = slot.chip.clone().ok_or(IrqError::NoChip(line))?;
        if slot.action.is_some() {
            return Err(IrqError::Busy(line));
        }
        Ok(chip)
    }

    /// Removes the handler named `name` from `line`.
    ///
    /// Returns `false`, leaving the table unchanged, if the line has no
    /// handler of that name. Chip shutdown and resource release run after
    /// the table lock is dropped.
    pub fn free_irq(&self, line: LineId, name: &str) -> bool {
        let chip = {
            let mut slots = self.write();
            let Some(slot) = slots.get_mut(line.index()) else {
                return false;
            };
            if !slot.action.as_ref().is_some_and(|action| action.name == name) {
                warn!(%line, name, "free of a handler that is not installed");
                return false;
            }
            slot.action = None;
            slot.chip.clone()
        };
        if let Some(chip) = chip {
            chip.shutdown(line);
            chip.release_resources(line);
        }
        debug!(%line, name, "handler removed");
        true
    }

    /// Returns `true` if `line` has a handler.
    pub fn has_handler(&self, line: LineId) -> bool {
        self.read()
            .get(line.index())
            .is_some_and(|slot| slot.action.is_some())
    }

    /// Name of the chip installed on `line`.
    pub fn chip_name(&self, line: LineId) -> Option<String> {
        self.read()
            .get(line.index())
            .and_then(|slot| slot.chip.as_ref().map(|chip| chip.name().to_owned()))
    }

    /// Number of times `line`'s handler has run.
    pub fn count(&self, line: LineId) -> u64 {
        self.counts
            .get(line.index())
            .map_or(0, widen)
    }

    /// Deliveries that found no handler installed.
    pub fn spurious(&self) -> u64 {
        widen(&self.spurious)
    }

    /// Renders installed handlers in `/proc/interrupts` style.
    pub fn show_interrupts(&self) -> String {
        let slots = self.read();
        let mut out = String::new();
        for (idx, slot) in slots.iter().enumerate() {
            let Some(action) = &slot.action else {
                continue;
            };
            let chip = slot.chip.as_ref().map_or("-", |chip| chip.name());
            let count = self.counts.get(idx).map_or(0, widen);
            let _ = writeln!(out, "{idx:>4}: {count:>10}  {chip:<12} {}", action.name);
        }
        out
    }
}

impl IrqDomain for HandlerTable {
    fn set_chip(&self, irq: u32, chip: Arc<dyn IrqChip>) {
        if let Some(slot) = self.write().get_mut(irq as usize) {
            slot.chip = Some(chip);
        }
    }

    fn handle(&self, line: LineId) {
        // Clone chip and handler out so the handler runs without the table
        // lock held and may itself request or free handlers.
        let (chip, handler) = self.read().get(line.index()).map_or((None, None), |slot| {
            (
                slot.chip.clone(),
                slot.action.as_ref().map(|a| Arc::clone(&a.handler)),
            )
        });

        if let Some(chip) = &chip {
            chip.ack(line);
        }
        match handler {
            Some(handler) => {
                if let Some(count) = self.counts.get(line.index()) {
                    let _ = count.fetch_add(1, Ordering::Relaxed);
                }
                handler(line);
            }
            None => {
                let _ = self.spurious.fetch_add(1, Ordering::Relaxed);
                trace!(%line, "no handler for delivered line");
            }
        }
    }
}
