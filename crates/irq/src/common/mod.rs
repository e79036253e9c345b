//! Common types shared across the controller.
//!
//! This module provides:
//! 1. **Line identifiers:** A validated `LineId` newtype and the bitmask width.
//! 2. **Enable flag:** The saved/restored interrupt permission state.
//! 3. **Error handling:** Controller and configuration error enums.

/// Error types for controller operations and configuration.
pub mod error;

/// Line identifier and enable flag definitions.
pub mod line;

pub use error::{ConfigError, IrqError};
pub use line::{EnableFlag, LineId, MAX_LINES};
