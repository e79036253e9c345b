//! Interrupt line identifiers and the enable flag.
//!
//! A line id is the index of one bit in the pending bitmask. Id 0 is
//! reserved and never constructed, so every `LineId` value is a valid
//! non-zero bit position below [`MAX_LINES`].

use std::fmt;

/// Width of the pending bitmask; controllers track at most this many ids.
pub const MAX_LINES: u32 = u64::BITS;

/// Identifier of an interrupt line in `[1, nr_lines)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId(u32);

impl LineId {
    /// Validates `raw` against a controller with `nr_lines` lines.
    ///
    /// Returns `None` for 0, for ids at or above `nr_lines`, and for ids that
    /// do not fit in the bitmask.
    #[inline]
    pub const fn new(raw: u32, nr_lines: u32) -> Option<Self> {
        if raw == 0 || raw >= nr_lines || raw >= MAX_LINES {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Builds an id from a bit index already known to be a non-zero bit.
    #[inline]
    pub(crate) const fn from_bit(bit: u32) -> Self {
        Self(bit)
    }

    /// Returns the raw numeric id.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the single-bit mask for this line.
    #[inline]
    pub const fn mask(self) -> u64 {
        1 << self.0
    }

    /// Returns the id as a table index.
    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<LineId> for u32 {
    fn from(line: LineId) -> Self {
        line.0
    }
}

/// Whether the guest context currently permits interrupt delivery.
///
/// Callers save the flag before disabling and hand the saved value back to
/// `restore_enable_state`, so nested critical sections compose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EnableFlag {
    /// Delivery is forbidden; raised lines stay pending.
    #[default]
    Disabled,
    /// Delivery is permitted.
    Enabled,
}

impl EnableFlag {
    /// Returns `true` for [`EnableFlag::Enabled`].
    #[inline]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl From<bool> for EnableFlag {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

impl From<EnableFlag> for bool {
    fn from(flag: EnableFlag) -> Self {
        flag.is_enabled()
    }
}
