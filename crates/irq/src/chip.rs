//! Interrupt chip contract.
//!
//! The handler table routes a line through the chip installed on it. A real
//! controller would program hardware in these callbacks; a hosted kernel has
//! none, so every lifecycle operation defaults to a no-op. Resource requests
//! are forwarded to the host.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::common::{IrqError, LineId};
use crate::host::HostOps;

/// Per-line controller operations.
///
/// Every method has a trivial default, so an implementor only overrides what
/// it needs.
pub trait IrqChip: Send + Sync + fmt::Debug {
    /// Short chip name shown in `show_interrupts`.
    fn name(&self) -> &str;

    /// Called when a handler is installed on `line`.
    fn startup(&self, line: LineId) {
        let _ = line;
    }
    /// Called when the last handler is removed from `line`.
    fn shutdown(&self, line: LineId) {
        let _ = line;
    }
    /// Enables delivery of `line` at the controller.
    fn enable(&self, line: LineId) {
        let _ = line;
    }
    /// Disables delivery of `line` at the controller.
    fn disable(&self, line: LineId) {
        let _ = line;
    }
    /// Acknowledges `line` before its handler runs.
    fn ack(&self, line: LineId) {
        let _ = line;
    }
    /// Masks `line`.
    fn mask(&self, line: LineId) {
        let _ = line;
    }
    /// Unmasks `line`.
    fn unmask(&self, line: LineId) {
        let _ = line;
    }

    /// Acquires resources backing `line`.
    ///
    /// # Errors
    ///
    /// [`IrqError::ResourceUnavailable`] when the backing resource is refused.
    fn request_resources(&self, line: LineId) -> Result<(), IrqError> {
        let _ = line;
        Ok(())
    }

    /// Releases resources backing `line`. Cannot fail.
    fn release_resources(&self, line: LineId) {
        let _ = line;
    }
}

/// The chip installed on every line by `Controller::init`.
///
/// Lifecycle operations are no-ops; resource operations go to the host.
#[derive(Debug, Clone)]
pub struct DummyChip {
    host: Arc<dyn HostOps>,
}

impl DummyChip {
    /// Name reported by [`IrqChip::name`].
    pub const NAME: &'static str = "host_dummy";

    /// Creates a chip forwarding resource requests to `host`.
    pub fn new(host: Arc<dyn HostOps>) -> Self {
        Self { host }
    }
}

impl IrqChip for DummyChip {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn request_resources(&self, line: LineId) -> Result<(), IrqError> {
        match self.host.irq_request(line) {
            None | Some(Ok(())) => Ok(()),
            Some(Err(reason)) => {
                trace!(%line, %reason, "host refused line resources");
                Err(IrqError::ResourceUnavailable { line, reason })
            }
        }
    }

    fn release_resources(&self, line: LineId) {
        self.host.irq_release(line);
    }
}
