//! Single-port echo with a one-byte buffer guarded by an empty flag.
//!
//! Unlike [`ByteHandshakeFsm`](crate::copy::ByteHandshakeFsm) there is no
//! control state: the receive and transmit halves are two independent
//! priority-ordered rules evaluated every tick against the pre-tick
//! registers.
//!
//! Receive, in priority order:
//! 1. buffer occupied: release `rx_ack` so the producer can drop `rx_ready`;
//! 2. `rx_ready` and buffer empty: latch `rx_data`, mark occupied, raise `rx_ack`.
//!
//! Transmit, in priority order:
//! 1. `tx_ready` high: withdraw it (one-tick request pulse);
//! 2. buffer occupied and `tx_ack` high: raise `tx_ready`, drive `tx_data`,
//!    mark the buffer empty.
//!
//! `rx_ready` is level sensitive here. Re-latching the same byte is prevented
//! only because the producer drops `rx_ready` within one tick of seeing
//! `rx_ack`, before the buffer is freed again.

use serde::Serialize;

use crate::sync::{Moore, Synchronous};

/// Reset value of the data register, matching the board design.
pub const DATA_RESET: u8 = 0xAA;

/// Input levels sampled by [`DoubleBufferedEcho`] each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoInput {
    /// Producer has a byte on `rx_data`.
    pub rx_ready: bool,
    /// Receive data bus.
    pub rx_data: u8,
    /// Consumer is able to accept a byte.
    pub tx_ack: bool,
}

/// Registered outputs of [`DoubleBufferedEcho`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoOutput {
    /// Acknowledge to the producer.
    pub rx_ack: bool,
    /// One-tick request pulse to the consumer.
    pub tx_ready: bool,
    /// Transmit data bus.
    pub tx_data: u8,
}

/// Echo counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EchoStats {
    /// Bytes latched into the buffer.
    pub received: u64,
    /// Bytes handed to the transmit side.
    pub sent: u64,
    /// Ticks with `rx_ready` asserted while the buffer was occupied.
    pub held_off: u64,
}

/// Register state of [`DoubleBufferedEcho`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoState {
    /// `true` while the buffer holds no byte.
    pub empty: bool,
    /// The buffered byte; meaningful only when `empty` is false.
    pub data: u8,
    /// Registered receive acknowledge.
    pub rx_ack: bool,
    /// Registered transmit request.
    pub tx_ready: bool,
    /// Registered transmit data.
    pub tx_data: u8,
    /// Counters.
    pub stats: EchoStats,
}

impl Default for EchoState {
    fn default() -> Self {
        Self {
            empty: true,
            data: DATA_RESET,
            rx_ack: false,
            tx_ready: false,
            tx_data: 0,
            stats: EchoStats::default(),
        }
    }
}

impl EchoState {
    /// The buffered byte, if any.
    pub fn pending(&self) -> Option<u8> {
        (!self.empty).then_some(self.data)
    }
}

/// Receives a byte into a one-entry buffer and sends it back out.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleBufferedEcho;

impl Synchronous for DoubleBufferedEcho {
    type Input = EchoInput;
    type Output = EchoOutput;
    type State = EchoState;

    fn update(&self, state: EchoState, input: EchoInput) -> (EchoState, EchoOutput) {
        let mut next = state;

        if !state.empty {
            next.rx_ack = false;
            if input.rx_ready {
                next.stats.held_off += 1;
            }
        } else if input.rx_ready {
            next.empty = false;
            next.data = input.rx_data;
            next.rx_ack = true;
            next.stats.received += 1;
        }

        if state.tx_ready {
            next.tx_ready = false;
        } else if !state.empty && input.tx_ack {
            next.tx_ready = true;
            next.tx_data = state.data;
            next.empty = true;
            next.stats.sent += 1;
        }

        (next, self.outputs(&state))
    }
}

impl Moore for DoubleBufferedEcho {
    fn outputs(&self, state: &EchoState) -> EchoOutput {
        EchoOutput {
            rx_ack: state.rx_ack,
            tx_ready: state.tx_ready,
            tx_data: state.tx_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::Clocked;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn input(rx_ready: bool, rx_data: u8, tx_ack: bool) -> EchoInput {
        EchoInput {
            rx_ready,
            rx_data,
            tx_ack,
        }
    }

    #[test]
    fn reset_values() {
        let echo = Clocked::new(DoubleBufferedEcho);
        assert!(echo.state().empty);
        assert_eq!(echo.state().data, DATA_RESET);
        assert_eq!(echo.state().pending(), None);
    }

    #[test]
    fn latch_then_send() {
        let mut echo = Clocked::new(DoubleBufferedEcho);
        echo.step(input(true, 0x61, true));
        assert_eq!(echo.state().pending(), Some(0x61));
        assert!(echo.outputs().rx_ack);

        // Producer drops ready after seeing ack; buffer goes out next.
        echo.step(input(false, 0, true));
        let out = echo.outputs();
        assert!(!out.rx_ack);
        assert!(out.tx_ready);
        assert_eq!(out.tx_data, 0x61);
        assert!(echo.state().empty);

        // Request is a one-tick pulse.
        echo.step(input(false, 0, false));
        assert!(!echo.outputs().tx_ready);
        assert_eq!(echo.state().stats.sent, 1);
    }

    #[test]
    fn occupied_buffer_holds_off_receive() {
        let mut echo = Clocked::new(DoubleBufferedEcho);
        echo.step(input(true, 0x01, false));
        // Consumer busy: byte stays, a new offer is not latched.
        for _ in 0..4 {
            echo.step(input(true, 0x02, false));
            assert_eq!(echo.state().pending(), Some(0x01));
        }
        assert_eq!(echo.state().stats.received, 1);
        assert_eq!(echo.state().stats.held_off, 4);
    }

    #[test]
    fn held_ready_relatches_after_free() {
        // Level sensitivity: a producer that never drops ready gets its byte
        // taken again once the buffer is freed.
        let mut echo = Clocked::new(DoubleBufferedEcho);
        for _ in 0..6 {
            echo.step(input(true, 0x33, true));
        }
        assert!(echo.state().stats.received >= 2);
    }

    #[test]
    fn transmit_waits_for_consumer() {
        let mut echo = Clocked::new(DoubleBufferedEcho);
        echo.step(input(true, 0x7E, false));
        for _ in 0..5 {
            echo.step(input(false, 0, false));
            assert!(!echo.outputs().tx_ready);
        }
        echo.step(input(false, 0, true));
        assert!(echo.outputs().tx_ready);
        assert_eq!(echo.outputs().tx_data, 0x7E);
    }

    #[test]
    fn buffer_never_holds_two_bytes() {
        let mut echo = Clocked::new(DoubleBufferedEcho);
        let mut rng = StdRng::seed_from_u64(0x1234_5678);
        for _ in 0..2_000 {
            let rx_ready = rng.gen_bool(0.5);
            let tx_ack = rng.gen_bool(0.5);
            let was_empty = echo.state().empty;
            let before = echo.state().stats.received;
            echo.step(input(rx_ready, rng.gen(), tx_ack));
            let s = echo.state();
            if s.stats.received > before {
                assert!(was_empty, "latched into an occupied buffer");
            }
            assert_eq!(s.stats.received - s.stats.sent, u64::from(!s.empty));
        }
    }
}
