//! # Unit Components
//!
//! One module per controller component, plus end-to-end scenarios.

/// Chip contract: no-op lifecycle and host resource forwarding.
pub mod chip;


/// Configuration defaults, JSON parsing, and validation.
pub mod config;

/// Delivery engine: ordering, coalescing, deferral, and re-entrancy.
pub mod delivery;
