//! Clock frequency values with unit parsing, display, and tick conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Femtoseconds in one second.
pub const FS_PER_SECOND: u64 = 1_000_000_000_000_000;

/// Unit suffixes accepted by [`Frequency::from_str`], longest first so that
/// `"mhz"` is not mistaken for `"hz"`.
const UNITS: [(&str, f64); 4] = [
    ("ghz", 1_000_000_000.0),
    ("mhz", 1_000_000.0),
    ("khz", 1_000.0),
    ("hz", 1.0),
];

/// A clock or baud frequency stored in Hertz.
///
/// Parses strings like `"16MHz"`, `"307.2KHz"`, `"9600Hz"` and bare numbers
/// (interpreted as Hz). Displays using the largest unit that keeps the value
/// at or above one.
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Frequency(f64);

impl Frequency {
    /// Creates a new frequency from a value in Hertz.
    pub fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns the frequency in megahertz.
    pub fn mhz(&self) -> f64 {
        self.0 / 1_000_000.0
    }

    /// Number of whole periods of this clock that fit in `duration_fs`
    /// femtoseconds.
    pub fn ticks_in(&self, duration_fs: u64) -> u64 {
        (duration_fs as f64 * self.0 / FS_PER_SECOND as f64).floor() as u64
    }

    /// Duration of `ticks` periods of this clock, in femtoseconds.
    pub fn fs_for_ticks(&self, ticks: u64) -> u64 {
        if self.0 <= 0.0 {
            return 0;
        }
        (ticks as f64 * FS_PER_SECOND as f64 / self.0).round() as u64
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1_000_000_000.0 {
            write!(f, "{}GHz", hz / 1_000_000_000.0)
        } else if hz >= 1_000_000.0 {
            write!(f, "{}MHz", hz / 1_000_000.0)
        } else if hz >= 1_000.0 {
            write!(f, "{}KHz", hz / 1_000.0)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error type for parsing frequency strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (number, scale) = UNITS
            .iter()
            .find_map(|(suffix, scale)| lower.strip_suffix(suffix).map(|n| (n, *scale)))
            .unwrap_or((lower.as_str(), 1.0));

        let val: f64 = number.trim().parse().map_err(|_| err())?;
        if !val.is_finite() || val <= 0.0 {
            return Err(err());
        }
        Ok(Frequency(val * scale))
    }
}
