//! Full-duplex bridge between two UART channels.
//!
//! [`Bridge`] owns two channels at independent divisors and two
//! [`ByteHandshakeFsm`] instances, one per direction:
//!
//! ```text
//!  low line ─▶ low.rx ──▶ low_to_high ──▶ high.tx ─▶ high line
//!  low line ◀─ low.tx ◀── high_to_low ◀── high.rx ◀─ high line
//! ```
//!
//! Each FSM drives the receive acknowledge of one channel and the transmit
//! request of the other, so no signal has two drivers. The bridge adds no
//! state of its own.
//!
//! [`LowHighSpeedLoopback`] closes the high side of a bridge onto a third
//! channel running a [`CopyLoopback`], so everything sent into the low port
//! comes back out of it after a round trip through the fast link.

use uartlink_common::Divisor;

use crate::channel::{ChannelInput, UartChannel};
use crate::copy::{ByteHandshakeFsm, CopyInput};
use crate::sync::Clocked;
use crate::topology::{
    drive, line, log_copy_event, log_overrun, CopyLoopback, PortInfo, StallProbe, Topology,
    TopologyStats,
};

/// Two UART channels cross-wired through two handshake FSMs.
#[derive(Debug, Clone)]
pub struct Bridge {
    low: Clocked<UartChannel>,
    high: Clocked<UartChannel>,
    low_to_high: Clocked<ByteHandshakeFsm>,
    high_to_low: Clocked<ByteHandshakeFsm>,
}

impl Bridge {
    /// Name of the slow-side port.
    pub const LOW: &'static str = "low";
    /// Name of the fast-side port.
    pub const HIGH: &'static str = "high";

    /// Creates a bridge between a channel at `low` and one at `high`.
    pub fn new(low: Divisor, high: Divisor) -> Self {
        Self {
            low: Clocked::new(UartChannel::new(low)),
            high: Clocked::new(UartChannel::new(high)),
            low_to_high: Clocked::new(ByteHandshakeFsm),
            high_to_low: Clocked::new(ByteHandshakeFsm),
        }
    }

    /// The slow-side channel.
    pub fn low(&self) -> &Clocked<UartChannel> {
        &self.low
    }

    /// The fast-side channel.
    pub fn high(&self) -> &Clocked<UartChannel> {
        &self.high
    }

    /// The FSM copying low-side receives to the high side.
    pub fn low_to_high(&self) -> &Clocked<ByteHandshakeFsm> {
        &self.low_to_high
    }

    /// The FSM copying high-side receives to the low side.
    pub fn high_to_low(&self) -> &Clocked<ByteHandshakeFsm> {
        &self.high_to_low
    }

    /// Advances one tick. Returns the frames completed on the low and high
    /// transmit lines this tick.
    pub fn step_lines(
        &mut self,
        low_in: Option<u8>,
        high_in: Option<u8>,
    ) -> (Option<u8>, Option<u8>) {
        let low = self.low.outputs();
        let high = self.high.outputs();
        let low_before = self.low.state().stats;
        let high_before = self.high.state().stats;

        let lh = self.low_to_high.eval(CopyInput {
            rx_ready: low.rx_ready,
            rx_data: low.rx_data,
            tx_ack: high.tx_ack,
        });
        let hl = self.high_to_low.eval(CopyInput {
            rx_ready: high.rx_ready,
            rx_data: high.rx_data,
            tx_ack: low.tx_ack,
        });
        self.low.eval(ChannelInput {
            tx_ready: hl.tx_ready,
            tx_data: hl.tx_data,
            rx_ack: lh.rx_ack,
            line_in: low_in,
        });
        self.high.eval(ChannelInput {
            tx_ready: lh.tx_ready,
            tx_data: lh.tx_data,
            rx_ack: hl.rx_ack,
            line_in: high_in,
        });

        self.low_to_high.commit();
        self.high_to_low.commit();
        self.low.commit();
        self.high.commit();

        log_copy_event("low_to_high", lh.event);
        log_copy_event("high_to_low", hl.event);
        log_overrun(Self::LOW, &low_before, &self.low.state().stats);
        log_overrun(Self::HIGH, &high_before, &self.high.state().stats);

        (low.line_out, high.line_out)
    }

    fn add_stats(&self, stats: &mut TopologyStats) {
        stats
            .channels
            .insert(Self::LOW.to_string(), self.low.state().stats);
        stats
            .channels
            .insert(Self::HIGH.to_string(), self.high.state().stats);
        stats
            .copies
            .insert("low_to_high".to_string(), self.low_to_high.state().stats);
        stats
            .copies
            .insert("high_to_low".to_string(), self.high_to_low.state().stats);
    }
}

impl Topology for Bridge {
    fn name(&self) -> &'static str {
        "bridge"
    }

    fn ports(&self) -> Vec<PortInfo> {
        vec![
            PortInfo {
                name: Self::LOW,
                divisor: self.low.component().divisor(),
            },
            PortInfo {
                name: Self::HIGH,
                divisor: self.high.component().divisor(),
            },
        ]
    }

    fn step(&mut self, line_in: &[Option<u8>], line_out: &mut [Option<u8>]) {
        let (low, high) = self.step_lines(line(line_in, 0), line(line_in, 1));
        drive(line_out, 0, low);
        drive(line_out, 1, high);
    }

    fn is_idle(&self) -> bool {
        self.low.state().is_idle()
            && self.high.state().is_idle()
            && !self.low_to_high.state().is_busy()
            && !self.high_to_low.state().is_busy()
    }

    fn stall_probes(&self) -> Vec<StallProbe> {
        vec![
            StallProbe {
                component: "low_to_high",
                waiting: self.low_to_high.state().is_busy(),
            },
            StallProbe {
                component: "high_to_low",
                waiting: self.high_to_low.state().is_busy(),
            },
        ]
    }

    fn stats(&self) -> TopologyStats {
        let mut stats = TopologyStats::default();
        self.add_stats(&mut stats);
        stats
    }
}

/// A bridge whose fast side is looped back through a third channel.
#[derive(Debug, Clone)]
pub struct LowHighSpeedLoopback {
    bridge: Bridge,
    far: CopyLoopback,
}

impl LowHighSpeedLoopback {
    /// Instance name of the far-end loopback.
    const FAR: &'static str = "far";

    /// Creates the loopback with the slow side at `low` and both fast
    /// channels at `high`.
    pub fn new(low: Divisor, high: Divisor) -> Self {
        Self {
            bridge: Bridge::new(low, high),
            far: CopyLoopback::named(Self::FAR, high),
        }
    }

    /// The embedded bridge.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// The far-end loopback.
    pub fn far(&self) -> &CopyLoopback {
        &self.far
    }
}

impl Topology for LowHighSpeedLoopback {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn ports(&self) -> Vec<PortInfo> {
        vec![PortInfo {
            name: Bridge::LOW,
            divisor: self.bridge.low.component().divisor(),
        }]
    }

    fn step(&mut self, line_in: &[Option<u8>], line_out: &mut [Option<u8>]) {
        // Both line drivers are registered, so read the far end's frame
        // before either side advances.
        let far_out = self.far.line_output();
        let (low_out, high_out) = self.bridge.step_lines(line(line_in, 0), far_out);
        self.far.step_line(high_out);
        drive(line_out, 0, low_out);
    }

    fn is_idle(&self) -> bool {
        self.bridge.is_idle() && Topology::is_idle(&self.far)
    }

    fn stall_probes(&self) -> Vec<StallProbe> {
        let mut probes = self.bridge.stall_probes();
        probes.extend(self.far.stall_probes());
        probes
    }

    fn stats(&self) -> TopologyStats {
        let mut stats = self.far.stats();
        self.bridge.add_stats(&mut stats);
        stats
    }
}
