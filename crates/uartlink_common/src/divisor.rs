//! Baud-rate divisors and serial frame geometry.
//!
//! A [`Divisor`] is the number of clock ticks a UART channel spends on one
//! serial bit. It is derived from a clock [`Frequency`] and a baud rate the
//! same way the board firmware computes it: integer division, rounding down.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::frequency::Frequency;

/// Bit periods per serial frame: one start bit, eight data bits, one stop bit.
pub const FRAME_BITS: u32 = 10;

/// Errors produced when a divisor cannot be derived or is out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DivisorError {
    /// A divisor of zero ticks per bit was requested.
    #[error("divisor must be at least 1 tick per bit")]
    Zero,

    /// The requested baud rate is faster than the clock can sample.
    #[error("baud rate {baud} is faster than the {clock} clock")]
    BaudAboveClock {
        /// The requested baud rate in bits per second.
        baud: u32,
        /// The clock the channel runs on.
        clock: Frequency,
    },
}

/// Clock ticks per serial bit for one UART channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Divisor(NonZeroU32);

impl Divisor {
    /// Creates a divisor from a raw ticks-per-bit count.
    pub fn new(ticks_per_bit: u32) -> Result<Self, DivisorError> {
        NonZeroU32::new(ticks_per_bit)
            .map(Self)
            .ok_or(DivisorError::Zero)
    }

    /// Derives the divisor for `baud` on a `clock`, rounding down.
    pub fn from_baud(clock: Frequency, baud: u32) -> Result<Self, DivisorError> {
        if baud == 0 {
            return Err(DivisorError::Zero);
        }
        let ticks = (clock.hz() / baud as f64).floor();
        if ticks < 1.0 {
            return Err(DivisorError::BaudAboveClock { baud, clock });
        }
        Self::new(ticks.min(u32::MAX as f64) as u32)
    }

    /// Ticks per serial bit.
    pub fn ticks_per_bit(&self) -> u32 {
        self.0.get()
    }

    /// Ticks needed to shift one complete frame.
    pub fn frame_ticks(&self) -> u64 {
        u64::from(self.0.get()) * u64::from(FRAME_BITS)
    }

    /// The tick at which the last of `frames` paced frames completes, the
    /// first starting at `start` and each followed by `gap_bits` idle bit
    /// periods. Zero frames end at `start`.
    ///
    /// Returns `None` if that tick does not fit in a `u64`.
    pub fn stream_end(&self, start: u64, frames: u64, gap_bits: u32) -> Option<u64> {
        let Some(between) = frames.checked_sub(1) else {
            return Some(start);
        };
        let gap = u64::from(gap_bits) * u64::from(self.ticks_per_bit());
        let period = self.frame_ticks().checked_add(gap)?;
        between
            .checked_mul(period)?
            .checked_add(self.frame_ticks())?
            .checked_add(start)
    }

    /// The baud rate this divisor actually produces on `clock`.
    pub fn effective_baud(&self, clock: Frequency) -> f64 {
        clock.hz() / f64::from(self.0.get())
    }
}

impl fmt::Debug for Divisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Divisor({})", self.0)
    }
}

impl fmt::Display for Divisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Divisor {
    type Error = DivisorError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Divisor> for u32 {
    fn from(d: Divisor) -> u32 {
        d.ticks_per_bit()
    }
}
