//! Cycle-accurate simulation of UART byte-handshake logic.
//!
//! This crate models the small state machines that move bytes between UART
//! cores over a ready/acknowledge/data handshake, evaluated on one global
//! clock. Every component is a pure per-tick transition function
//! ([`Synchronous`]); composites evaluate all children against the pre-tick
//! register snapshot and then commit every register together.
//!
//! # Usage
//!
//! ```ignore
//! use uartlink_common::Divisor;
//! use uartlink_sim::{LowHighSpeedLoopback, SimConfig, SimKernel, Tick};
//!
//! let topology = LowHighSpeedLoopback::new(Divisor::new(32)?, Divisor::new(5)?);
//! let mut kernel = SimKernel::new(topology, SimConfig::default());
//! kernel.send("low", b"hi", 30, Tick::ZERO)?;
//! let result = kernel.run_to_completion()?;
//! assert_eq!(result.received("low").unwrap(), b"hi");
//! ```
//!
//! # Modules
//!
//! - `sync`: the two-phase synchronous component model
//! - `edge`: rising-edge detection
//! - `copy`: the byte-copy handshake FSM
//! - `echo`: single-port echo with a one-byte buffer
//! - `channel`: behavioral UART core handshake model
//! - `topology`: closed systems driven by the kernel, single-port loopbacks
//! - `bridge`: two-channel bridge and its self-looped variant
//! - `stimulus`: serial line stimulus and capture
//! - `watchdog`: stall detection
//! - `kernel`: the tick loop
//! - `time`: tick counting
//! - `error`: simulation error types

#![warn(missing_docs)]

pub mod bridge;
pub mod channel;
pub mod copy;
pub mod echo;
pub mod edge;
pub mod error;
pub mod kernel;
pub mod stimulus;
pub mod sync;
pub mod time;
pub mod topology;
pub mod watchdog;

pub use bridge::{Bridge, LowHighSpeedLoopback};
pub use channel::{ChannelInput, ChannelOutput, ChannelStats, UartChannel};
pub use copy::{ByteHandshakeFsm, ControlState, CopyEvent, CopyInput, CopyOutput, CopyStats};
pub use echo::{DoubleBufferedEcho, EchoInput, EchoOutput, EchoStats};
pub use edge::EdgeDetector;
pub use error::SimError;
pub use kernel::{PortCapture, SimConfig, SimKernel, SimResult, StepResult};
pub use stimulus::{CapturedFrame, LineCapture, LineStimulus};
pub use sync::{Clocked, Moore, Synchronous};
pub use time::Tick;
pub use topology::{CopyLoopback, EchoLoopback, PortInfo, StallProbe, Topology, TopologyStats};
pub use watchdog::StallWatchdog;
