//! The byte-copy handshake state machine.
//!
//! [`ByteHandshakeFsm`] moves one byte per round trip from a receive-side
//! ready/ack/data handshake to a transmit-side one:
//!
//! ```text
//!            rx_ready rising               tx_ack rising
//!  WaitToRx ----------------> DoTx ------------------------> WaitToRx
//!            latch rx_data,        tx_data = holding,
//!            rx_ack := 1           tx_ready = 1 until then
//! ```
//!
//! Both `rx_ready` and `tx_ack` are level signals that may already be high
//! when the machine starts watching them, so both are edge detected. The edge
//! detectors sample every tick in every state.
//!
//! A receive edge that arrives during `DoTx` is not serviced. The byte is
//! dropped and counted in [`CopyStats::dropped`]; producers must wait for
//! `rx_ack` before offering the next byte.

use serde::Serialize;

use crate::edge::EdgeDetector;
use crate::sync::Synchronous;

/// The control register of [`ByteHandshakeFsm`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ControlState {
    /// Idle, watching for a rising edge on `rx_ready`.
    #[default]
    WaitToRx,
    /// Offering the held byte on the transmit side until `tx_ack` rises.
    DoTx,
}

/// Input levels sampled by [`ByteHandshakeFsm`] each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyInput {
    /// Receive side: producer has a byte on `rx_data`.
    pub rx_ready: bool,
    /// Receive side data bus.
    pub rx_data: u8,
    /// Transmit side: consumer has taken (or finished) the offered byte.
    pub tx_ack: bool,
}

/// Output levels driven by [`ByteHandshakeFsm`] each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOutput {
    /// Registered acknowledge to the receive-side producer.
    pub rx_ack: bool,
    /// Combinational request to the transmit-side consumer.
    pub tx_ready: bool,
    /// Transmit side data bus. Zero outside `DoTx`.
    pub tx_data: u8,
    /// What happened this tick, for observers.
    pub event: Option<CopyEvent>,
}

/// A notable transition, reported in the tick it was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CopyEvent {
    /// A byte was latched from the receive side.
    Latched(u8),
    /// The held byte was acknowledged by the transmit side.
    Delivered(u8),
    /// A receive edge arrived while busy; that byte is lost.
    Dropped,
}

/// Per-instance transfer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    /// Bytes latched from the receive side.
    pub latched: u64,
    /// Bytes acknowledged by the transmit side.
    pub delivered: u64,
    /// Receive edges ignored because a transfer was in flight.
    pub dropped: u64,
}

/// Register state of [`ByteHandshakeFsm`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyState {
    /// Current control state.
    pub control: ControlState,
    /// The byte being transferred; valid in `DoTx`.
    pub holding: u8,
    /// Registered receive acknowledge.
    pub rx_ack: bool,
    /// Edge history of `rx_ready`.
    pub rx_ready_edge: EdgeDetector,
    /// Edge history of `tx_ack`.
    pub tx_ack_edge: EdgeDetector,
    /// Transfer counters.
    pub stats: CopyStats,
}

impl CopyState {
    /// Whether a transfer is in flight.
    pub fn is_busy(&self) -> bool {
        self.control == ControlState::DoTx
    }
}

/// Copies bytes from one ready/ack/data handshake to another.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteHandshakeFsm;

impl Synchronous for ByteHandshakeFsm {
    type Input = CopyInput;
    type Output = CopyOutput;
    type State = CopyState;

    fn update(&self, state: CopyState, input: CopyInput) -> (CopyState, CopyOutput) {
        let mut next = state;
        let rx_rising = next.rx_ready_edge.observe(input.rx_ready);
        let tx_rising = next.tx_ack_edge.observe(input.tx_ack);

        let mut output = CopyOutput {
            rx_ack: state.rx_ack,
            ..CopyOutput::default()
        };

        match state.control {
            ControlState::WaitToRx => {
                if rx_rising {
                    next.holding = input.rx_data;
                    next.rx_ack = true;
                    next.control = ControlState::DoTx;
                    next.stats.latched += 1;
                    output.event = Some(CopyEvent::Latched(input.rx_data));
                }
            }
            ControlState::DoTx => {
                output.tx_data = state.holding;
                if tx_rising {
                    next.control = ControlState::WaitToRx;
                    next.rx_ack = false;
                    next.stats.delivered += 1;
                    output.event = Some(CopyEvent::Delivered(state.holding));
                } else {
                    output.tx_ready = true;
                }
                if rx_rising {
                    next.stats.dropped += 1;
                    // Delivery takes precedence when both land on one tick;
                    // the counter still records the loss.
                    if output.event.is_none() {
                        output.event = Some(CopyEvent::Dropped);
                    }
                }
            }
        }

        (next, output)
    }
}
