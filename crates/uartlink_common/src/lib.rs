//! Shared foundational types used across the uartlink workspace.
//!
//! This crate provides the clock [`Frequency`] type with unit parsing, and the
//! baud-rate [`Divisor`] that configures how many clock ticks a UART channel
//! spends on each serial bit.

#![warn(missing_docs)]

pub mod divisor;
pub mod frequency;

pub use divisor::{Divisor, DivisorError, FRAME_BITS};
pub use frequency::{Frequency, ParseFrequencyError, FS_PER_SECOND};
