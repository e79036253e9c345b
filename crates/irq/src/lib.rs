//! Software interrupt controller for a kernel hosted inside a process.
//!
//! A hosted kernel has no interrupt hardware. Host signal handlers and host
//! threads raise interrupt lines asynchronously; the kernel sees them only
//! when its guest context re-enables interrupts. This crate implements:
//! 1. **Pending bitmask:** Lock-free (or mutex-guarded) edge-triggered line set.
//! 2. **Line registry:** Allocation of line ids to named owners.
//! 3. **Chip contract:** No-op controller operations plus host resource hooks.
//! 4. **Handler table:** Minimal line → handler routing for dispatch.
//! 5. **Enable gate and delivery:** Save/restore interrupt state; the
//!    disabled → enabled transition drains and dispatches pending lines.

/// Line identifiers, enable flags, and error types shared by all modules.
pub mod common;
/// Controller configuration (line count, bitmask backend, resource policy).
pub mod config;
/// The no-op interrupt chip and its capability trait.
pub mod chip;
/// The controller instance: raise, enable gate transitions, and delivery.
pub mod controller;
/// Dispatch contract and the internal line → handler table.
pub mod dispatch;
/// Enable gate state and the RAII interrupt guard.
pub mod gate;
/// Hooks consumed from the host environment.
pub mod host;
/// Pending bitmask backends.
pub mod pending;
/// Line allocation registry.
pub mod registry;
/// Delivery statistics.
pub mod stats;

/// Root configuration type; use `ControllerConfig::default()` or parse JSON.
pub use crate::config::ControllerConfig;
/// The controller; construct with `Controller::new` and call `init` once.
pub use crate::controller::Controller;
pub use crate::common::{EnableFlag, IrqError, LineId};
