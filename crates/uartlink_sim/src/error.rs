//! Simulation error types.
//!
//! The handshake logic itself never fails: stalls and dropped bytes are
//! structural behavior, visible through state queries and counters. The
//! errors here are raised by the kernel and its watchdog when a harness asks
//! for them.

use crate::time::Tick;

/// Errors that can occur while setting up or running a simulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// A component waited on its partner for longer than the stall limit.
    #[error("{component} stalled for {ticks} ticks (at {at})")]
    Timeout {
        /// Instance name of the stalled component.
        component: String,
        /// Consecutive ticks spent waiting.
        ticks: u64,
        /// The tick the limit was exceeded.
        at: Tick,
    },

    /// A stimulus or capture referenced a port the topology does not have.
    #[error("unknown port '{port}' (topology has: {available})")]
    UnknownPort {
        /// The requested port name.
        port: String,
        /// Comma-separated list of the topology's ports.
        available: String,
    },

    /// A paced stimulus would complete past the last representable tick.
    #[error("stimulus on '{port}' overflows the tick counter ({frames} frame(s) from {start})")]
    StimulusOverflow {
        /// The port the stimulus targets.
        port: String,
        /// Number of frames requested.
        frames: usize,
        /// The tick the first frame starts.
        start: Tick,
    },

    /// The run reached its tick limit before all traffic had drained.
    #[error("tick limit exceeded: {limit} ticks")]
    TickLimitExceeded {
        /// The configured limit.
        limit: u64,
    },
}
