//! Hooks consumed from the host environment.
//!
//! The host owns the scheduler that parks the guest context and may own
//! resources (file descriptors, timers) backing a line. All hooks are
//! optional; [`NoopHost`] provides none of them.

use std::fmt;

use crate::common::LineId;

/// Operations the embedding host provides to the controller.
///
/// `wake` is called from producer contexts, including signal handlers, so
/// implementations must be async-signal-safe: no locks, no allocation, no
/// logging.
pub trait HostOps: Send + Sync + fmt::Debug {
    /// Best-effort, idempotent hint that the parked guest context should resume.
    fn wake(&self) {}

    /// Acquires host resources for `line`.
    ///
    /// Returns `None` when the host has no such hook, otherwise the outcome.
    fn irq_request(&self, line: LineId) -> Option<Result<(), String>> {
        let _ = line;
        None
    }

    /// Releases host resources for `line`. Best effort; failures are not reported.
    fn irq_release(&self, line: LineId) {
        let _ = line;
    }
}

/// Host with no hooks.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl HostOps for NoopHost {}

/// Gives producers a chance to raise lines while the guest spins.
#[inline]
pub fn yield_to_irqs() {
    std::hint::spin_loop();
}
