//! The interrupt controller instance.
//!
//! One `Controller` is created at startup and shared (by reference or `Arc`)
//! between producer contexts and the guest context:
//! 1. **Producers** (host signal handlers, host threads) call only [`Controller::raise`].
//! 2. **The guest context** allocates lines, installs handlers, and toggles the
//!    enable gate. The disabled → enabled transition drains the pending
//!    bitmask and dispatches each line, lowest id first.
//!
//! # Delivery ordering
//!
//! A line raised while a batch is being dispatched lands in the freshly
//! cleared bitmask and waits for the next enable transition. Delivery never
//! recurses: a handler that re-enables interrupts only records the flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::chip::{DummyChip, IrqChip};
use crate::common::{ConfigError, EnableFlag, IrqError, LineId};
use crate::config::ControllerConfig;
use crate::dispatch::{HandlerTable, IrqDomain};
use crate::gate::{EnableGate, IrqGuard};
use crate::host::HostOps;
use crate::pending::{PendingSet, PendingSnapshot, new_pending};
use crate::registry::LineRegistry;
use crate::stats::{IrqStats, StatsCounters};

/// Software interrupt controller.
///
/// `D` is the dispatch domain delivered lines are routed to; the default is
/// the built-in [`HandlerTable`].
#[derive(Debug)]
pub struct Controller<D: IrqDomain = HandlerTable> {
    config: ControllerConfig,
    pending: Box<dyn PendingSet>,
    registry: LineRegistry,
    gate: EnableGate,
    host: Arc<dyn HostOps>,
    domain: D,
    stats: StatsCounters,
    initialized: AtomicBool,
}

impl Controller {
    /// Creates a controller dispatching through a fresh [`HandlerTable`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::LineCount`] if the configuration is invalid.
    pub fn new(config: ControllerConfig, host: Arc<dyn HostOps>) -> Result<Self, ConfigError> {
        config.validate()?;
        let table = HandlerTable::new(config.nr_lines, config.resource_failure);
        Self::with_domain(config, host, table)
    }

    /// Returns the built-in handler table.
    pub const fn handlers(&self) -> &HandlerTable {
        &self.domain
    }
}

impl<D: IrqDomain> Controller<D> {
    /// Creates a controller dispatching through `domain`.
    ///
    /// Delivery starts disabled; call [`init`](Self::init) before use.
    ///
    /// # Errors
    ///
    /// [`ConfigError::LineCount`] if the configuration is invalid.
    pub fn with_domain(
        config: ControllerConfig,
        host: Arc<dyn HostOps>,
        domain: D,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            pending: new_pending(config.resolved_backend()),
            registry: LineRegistry::new(config.nr_lines),
            gate: EnableGate::new(),
            host,
            domain,
            stats: StatsCounters::default(),
            initialized: AtomicBool::new(false),
            config,
        })
    }

    /// Installs the dummy chip on every line `0..nr_lines` of the domain.
    ///
    /// Runs once; later calls do nothing.
    pub fn init(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            debug!("irq controller already initialized");
            return;
        }
        let chip: Arc<dyn IrqChip> = Arc::new(DummyChip::new(Arc::clone(&self.host)));
        for irq in 0..self.config.nr_lines {
            self.domain.set_chip(irq, Arc::clone(&chip));
        }
        info!(
            nr_lines = self.config.nr_lines,
            backend = ?self.config.resolved_backend(),
            "irqs initialized"
        );
    }

    /// Returns the active configuration.
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the dispatch domain.
    pub const fn domain(&self) -> &D {
        &self.domain
    }

    /// Returns the line registry.
    pub const fn registry(&self) -> &LineRegistry {
        &self.registry
    }

    /// Allocates the lowest free line to `owner`.
    ///
    /// # Errors
    ///
    /// [`IrqError::Exhausted`] when no line is free.
    pub fn allocate_line(&self, owner: &str) -> Result<LineId, IrqError> {
        self.registry.allocate(owner)
    }

    /// Frees `line` if `owner` holds it; otherwise logs and leaves it allocated.
    pub fn release_line(&self, line: LineId, owner: &str) {
        self.registry.release(line, owner);
    }

    /// Marks `line` pending and wakes the guest context.
    ///
    /// Callable from any context, including signal handlers: it performs one
    /// atomic OR, one relaxed counter increment, and the host wake hint. It
    /// never blocks (on the atomic backend), allocates, or logs. Lines need
    /// not be allocated to be raised.
    ///
    /// # Errors
    ///
    /// [`IrqError::Invalid`] if `line` is 0 or not below `nr_lines`; nothing
    /// is changed.
    #[inline]
    pub fn raise(&self, line: u32) -> Result<(), IrqError> {
        let line = LineId::new(line, self.config.nr_lines).ok_or(IrqError::Invalid(line))?;
        self.pending.raise(line);
        self.stats.record_raise();
        self.host.wake();
        Ok(())
    }

    /// Returns the current enable flag.
    pub fn save_enable_state(&self) -> EnableFlag {
        self.gate.save()
    }

    /// Restores a previously saved enable flag.
    ///
    /// On a disabled → enabled transition outside dispatch context, every
    /// pending line is dispatched before the flag is recorded, and this call
    /// returns only after the whole batch has run.
    pub fn restore_enable_state(&self, flag: EnableFlag) {
        if flag.is_enabled() && !self.gate.save().is_enabled() && !self.gate.in_interrupt() {
            self.run_irqs();
        }
        self.gate.set(flag);
    }

    /// Disables delivery.
    pub fn local_irq_disable(&self) {
        self.restore_enable_state(EnableFlag::Disabled);
    }

    /// Enables delivery, dispatching anything pending.
    pub fn local_irq_enable(&self) {
        self.restore_enable_state(EnableFlag::Enabled);
    }

    /// Disables delivery and returns the previous flag for a later restore.
    pub fn local_irq_save(&self) -> EnableFlag {
        let flags = self.save_enable_state();
        self.local_irq_disable();
        flags
    }

    /// Disables delivery until the returned guard drops.
    pub fn irq_guard(&self) -> IrqGuard<'_, D> {
        IrqGuard::new(self)
    }

    /// Returns `true` while a line is being dispatched.
    pub fn in_interrupt(&self) -> bool {
        self.gate.in_interrupt()
    }

    /// Lines raised and not yet delivered. Does not clear them.
    pub fn pending_lines(&self) -> PendingSnapshot {
        self.pending.peek()
    }

    /// Returns a copy of the delivery counters.
    pub fn stats(&self) -> IrqStats {
        self.stats.snapshot()
    }

    /// Drains the bitmask and dispatches the batch, lowest line first.
    fn run_irqs(&self) {
        let snapshot = self.pending.drain();
        if snapshot.is_empty() {
            return;
        }
        self.stats.record_pass();
        for line in snapshot {
            let _ctx = self.gate.enter_interrupt();
            self.domain.handle(line);
            self.stats.record_delivery();
        }
    }
}
