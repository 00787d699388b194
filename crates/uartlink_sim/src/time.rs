//! Simulation time measured in clock ticks.
//!
//! Every component in the simulator shares one global clock, so time is a
//! plain tick counter. [`Tick::to_fs`] converts back to wall-clock time when
//! a clock frequency is known, for reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

use uartlink_common::Frequency;

/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;

/// One point on the global clock, counted from reset.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(pub u64);

impl Tick {
    /// The first tick after reset.
    pub const ZERO: Tick = Tick(0);

    /// The tick immediately after this one.
    pub fn next(self) -> Tick {
        Tick(self.0 + 1)
    }

    /// Ticks elapsed since `earlier`, saturating at zero.
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Wall-clock time of this tick on a `clock`, in femtoseconds.
    pub fn to_fs(self, clock: Frequency) -> u64 {
        clock.fs_for_ticks(self.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick {}", self.0)
    }
}

/// Formats a femtosecond duration using the largest unit that divides it.
pub fn format_fs(fs: u64) -> String {
    if fs == 0 {
        "0 fs".to_string()
    } else if fs % FS_PER_MS == 0 {
        format!("{} ms", fs / FS_PER_MS)
    } else if fs % FS_PER_US == 0 {
        format!("{} us", fs / FS_PER_US)
    } else if fs % FS_PER_NS == 0 {
        format!("{} ns", fs / FS_PER_NS)
    } else {
        format!("{fs} fs")
    }
}
