//! Configuration for the interrupt controller.
//!
//! This module defines the structures used to parameterize a controller. It provides:
//! 1. **Defaults:** Baseline line count and policies.
//! 2. **Structures:** `ControllerConfig`, deserializable from JSON.
//! 3. **Enums:** Pending bitmask backend and resource-failure policy.
//!
//! Configuration is supplied as JSON by the embedding host or built with
//! `ControllerConfig::default()`.

use serde::Deserialize;

use crate::common::{ConfigError, MAX_LINES};

/// Default configuration constants for the controller.
mod defaults {
    /// Number of line ids, including the reserved id 0.
    ///
    /// Fills the 64-bit pending word, leaving 63 usable lines.
    pub const NR_LINES: u32 = 64;
}

/// Storage strategy for the pending bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PendingBackend {
    /// Native atomics when the target has 64-bit atomic RMW, otherwise locked.
    #[default]
    Auto,
    /// `AtomicU64` fetch-or / swap.
    Atomic,
    /// A single mutex guarding a plain word.
    ///
    /// Used on targets without native 64-bit atomics.
    #[serde(alias = "Mutex")]
    Locked,
}

/// What to do when the host refuses resources for a line being set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ResourceFailurePolicy {
    /// Fail the setup with `IrqError::ResourceUnavailable`.
    #[default]
    Surface,
    /// Log the refusal and install the handler anyway.
    Ignore,
}

/// Controller configuration.
///
/// # Example
///
/// ```
/// use hostirq_core::config::{ControllerConfig, PendingBackend};
///
/// let config = ControllerConfig::from_json(r#"{ "nr_lines": 16, "backend": "Locked" }"#);
/// assert!(matches!(config, Ok(ref c) if c.nr_lines == 16 && c.backend == PendingBackend::Locked));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControllerConfig {
    /// Number of line ids `N`; usable lines are `1..N`.
    #[serde(default = "ControllerConfig::default_nr_lines")]
    pub nr_lines: u32,

    /// Pending bitmask backend.
    #[serde(default)]
    pub backend: PendingBackend,

    /// Handling of host resource-request failures.
    #[serde(default)]
    pub resource_failure: ResourceFailurePolicy,
}

impl ControllerConfig {
    /// Returns the default line count.
    const fn default_nr_lines() -> u32 {
        defaults::NR_LINES
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the line count leaves at least one usable line and fits the bitmask.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.nr_lines < 2 || self.nr_lines > MAX_LINES {
            return Err(ConfigError::LineCount(self.nr_lines));
        }
        Ok(())
    }

    /// Resolves `Auto` to the concrete backend for this target.
    pub const fn resolved_backend(&self) -> PendingBackend {
        match self.backend {
            PendingBackend::Auto => {
                if cfg!(target_has_atomic = "64") {
                    PendingBackend::Atomic
                } else {
                    PendingBackend::Locked
                }
            }
            other => other,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            nr_lines: defaults::NR_LINES,
            backend: PendingBackend::Auto,
            resource_failure: ResourceFailurePolicy::Surface,
        }
    }
}
