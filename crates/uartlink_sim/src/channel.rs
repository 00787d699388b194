//! Behavioral model of a UART core's parallel handshake.
//!
//! The line-level shift registers are not simulated bit by bit. Instead a
//! [`UartChannel`] accounts for a frame as `divisor * 10` busy ticks on the
//! transmit side and treats the receive side as completing a frame on the
//! tick a byte arrives on `line_in`. What the handshake logic sees is the
//! same as with the real core:
//!
//! - `tx_ack` is high while the transmitter is idle. An idle transmitter
//!   that sees `tx_ready` loads `tx_data` and drops `tx_ack` until the frame
//!   has been shifted out; on that tick the byte appears on `line_out` and
//!   `tx_ack` rises again.
//! - A completed receive frame sets `rx_data` and raises `rx_ready`. The
//!   core clears `rx_ready` on any tick where `rx_ack` is high. A frame that
//!   completes while a previous one is still unacknowledged overwrites it and
//!   sets `rx_overrun`.
//!
//! Every output is registered.

use serde::Serialize;
use uartlink_common::Divisor;

use crate::sync::{Moore, Synchronous};

/// Input levels sampled by a [`UartChannel`] each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelInput {
    /// Request to transmit `tx_data`.
    pub tx_ready: bool,
    /// Byte to transmit.
    pub tx_data: u8,
    /// Acknowledge of the byte on `rx_data`.
    pub rx_ack: bool,
    /// A frame finished arriving on the serial line this tick.
    pub line_in: Option<u8>,
}

/// Registered outputs of a [`UartChannel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelOutput {
    /// Transmitter idle and able to accept a byte.
    pub tx_ack: bool,
    /// A received byte is waiting on `rx_data`.
    pub rx_ready: bool,
    /// Last received byte.
    pub rx_data: u8,
    /// The last received frame overwrote an unacknowledged one.
    pub rx_overrun: bool,
    /// A frame finished shifting out on the serial line this tick.
    pub line_out: Option<u8>,
}

/// Channel counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// Frames shifted out.
    pub frames_sent: u64,
    /// Frames received from the line.
    pub frames_received: u64,
    /// Received frames that overwrote an unacknowledged byte.
    pub overruns: u64,
}

/// Register state of a [`UartChannel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelState {
    /// Ticks left in the frame being shifted out; zero when idle.
    pub tx_remaining: u64,
    /// Byte being shifted out.
    pub tx_shift: u8,
    /// Frame completed on the previous tick.
    pub tx_done: Option<u8>,
    /// Received byte register.
    pub rx_data: u8,
    /// Received byte waiting for acknowledge.
    pub rx_ready: bool,
    /// Overrun flag for the last received frame.
    pub rx_overrun: bool,
    /// Counters.
    pub stats: ChannelStats,
}

impl ChannelState {
    /// Whether the transmitter is shifting a frame.
    pub fn is_transmitting(&self) -> bool {
        self.tx_remaining > 0
    }

    /// Whether neither direction has work in flight.
    pub fn is_idle(&self) -> bool {
        !self.is_transmitting() && !self.rx_ready && self.tx_done.is_none()
    }
}

/// A UART core running at a fixed baud-rate divisor.
#[derive(Debug, Clone, Copy)]
pub struct UartChannel {
    divisor: Divisor,
}

impl UartChannel {
    /// Creates a channel with the given ticks-per-bit divisor.
    pub fn new(divisor: Divisor) -> Self {
        Self { divisor }
    }

    /// The channel's divisor.
    pub fn divisor(&self) -> Divisor {
        self.divisor
    }

    /// Ticks taken to shift one frame out.
    pub fn frame_ticks(&self) -> u64 {
        self.divisor.frame_ticks()
    }
}

impl Synchronous for UartChannel {
    type Input = ChannelInput;
    type Output = ChannelOutput;
    type State = ChannelState;

    fn update(&self, state: ChannelState, input: ChannelInput) -> (ChannelState, ChannelOutput) {
        let mut next = state;
        next.tx_done = None;

        if state.tx_remaining == 0 {
            if input.tx_ready {
                next.tx_shift = input.tx_data;
                next.tx_remaining = self.frame_ticks();
            }
        } else {
            next.tx_remaining = state.tx_remaining - 1;
            if next.tx_remaining == 0 {
                next.tx_done = Some(state.tx_shift);
                next.stats.frames_sent += 1;
            }
        }

        if let Some(byte) = input.line_in {
            let overrun = state.rx_ready && !input.rx_ack;
            next.rx_data = byte;
            next.rx_ready = true;
            next.rx_overrun = overrun;
            next.stats.frames_received += 1;
            if overrun {
                next.stats.overruns += 1;
            }
        } else if input.rx_ack {
            next.rx_ready = false;
        }

        (next, self.outputs(&state))
    }
}

impl Moore for UartChannel {
    fn outputs(&self, state: &ChannelState) -> ChannelOutput {
        ChannelOutput {
            tx_ack: state.tx_remaining == 0,
            rx_ready: state.rx_ready,
            rx_data: state.rx_data,
            rx_overrun: state.rx_overrun,
            line_out: state.tx_done,
        }
    }
}
