//! Controller and configuration errors.
//!
//! Every recoverable condition is returned to the immediate caller. Owner
//! mismatch on release is not an error: it is logged and ignored.

use thiserror::Error;

use super::line::LineId;

/// Errors returned by controller, registry, and handler table operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IrqError {
    /// The line id is 0 or not below the controller's line count.
    ///
    /// The associated value is the rejected raw id.
    #[error("invalid interrupt line {0}")]
    Invalid(u32),

    /// Every line in `[1, nr_lines)` is already allocated.
    #[error("no free interrupt line")]
    Exhausted,

    /// The host hook refused resources while a handler was being set up.
    #[error("host refused resources for line {line}: {reason}")]
    ResourceUnavailable {
        /// Line being set up.
        line: LineId,
        /// Reason reported by the host.
        reason: String,
    },

    /// No controller chip has been installed on the line (`init` not run).
    #[error("no interrupt chip installed on line {0}")]
    NoChip(LineId),

    /// The line already has a handler installed.
    #[error("line {0} already has a handler")]
    Busy(LineId),
}

/// Errors produced while loading a [`ControllerConfig`](crate::ControllerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("malformed controller configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// `nr_lines` leaves no usable line or exceeds the bitmask width.
    #[error("line count {0} outside supported range 2..=64")]
    LineCount(u32),
}
