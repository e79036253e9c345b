//! Enable gate.
//!
//! Holds the guest context's interrupt permission and its interrupt-dispatch
//! depth. Only the guest context changes either, so relaxed atomics are
//! enough; they are atomics only so the controller stays `Sync` for producers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::common::EnableFlag;
use crate::controller::Controller;
use crate::dispatch::IrqDomain;

/// Interrupt permission flag plus dispatch-context depth.
#[derive(Debug, Default)]
pub struct EnableGate {
    enabled: AtomicBool,
    irq_depth: AtomicUsize,
}

impl EnableGate {
    /// Creates a gate with delivery disabled.
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            irq_depth: AtomicUsize::new(0),
        }
    }

    /// Returns the current flag.
    #[inline]
    pub fn save(&self) -> EnableFlag {
        EnableFlag::from(self.enabled.load(Ordering::Relaxed))
    }

    /// Records `flag` without any delivery side effect.
    #[inline]
    pub fn set(&self, flag: EnableFlag) {
        self.enabled.store(flag.is_enabled(), Ordering::Relaxed);
    }

    /// Returns `true` while a line is being dispatched.
    #[inline]
    pub fn in_interrupt(&self) -> bool {
        self.irq_depth.load(Ordering::Relaxed) != 0
    }

    /// Marks entry into dispatch context until the returned guard drops.
    pub(crate) fn enter_interrupt(&self) -> InterruptContext<'_> {
        let _ = self.irq_depth.fetch_add(1, Ordering::Relaxed);
        InterruptContext { gate: self }
    }
}

/// Dispatch-context marker; leaving scope (normally or by unwinding) exits the context.
#[derive(Debug)]
pub(crate) struct InterruptContext<'a> {
    gate: &'a EnableGate,
}

impl Drop for InterruptContext<'_> {
    fn drop(&mut self) {
        let _ = self.gate.irq_depth.fetch_sub(1, Ordering::Relaxed);
    }
}

/// RAII critical section: disables delivery on creation and restores the
/// saved flag on drop, delivering pending lines if that re-enables.
///
/// # Example
///
/// ```
/// use hostirq_core::{Controller, ControllerConfig, EnableFlag};
/// use hostirq_core::host::NoopHost;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let ctl = Controller::new(ControllerConfig::default(), Arc::new(NoopHost))?;
/// ctl.restore_enable_state(EnableFlag::Enabled);
/// {
///     let _guard = ctl.irq_guard();
///     assert!(!ctl.save_enable_state().is_enabled());
/// }
/// assert!(ctl.save_enable_state().is_enabled());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
#[must_use = "dropping the guard immediately restores interrupts"]
pub struct IrqGuard<'a, D: IrqDomain> {
    controller: &'a Controller<D>,
    saved: EnableFlag,
}

impl<'a, D: IrqDomain> IrqGuard<'a, D> {
    pub(crate) fn new(controller: &'a Controller<D>) -> Self {
        let saved = controller.local_irq_save();
        Self { controller, saved }
    }

    /// Returns `true` if delivery was enabled when the guard was created.
    pub const fn was_enabled(&self) -> bool {
        self.saved.is_enabled()
    }
}

impl<D: IrqDomain> Drop for IrqGuard<'_, D> {
    fn drop(&mut self) {
        self.controller.restore_enable_state(self.saved);
    }
}
