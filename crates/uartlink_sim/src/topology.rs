//! Closed systems of channels and handshake logic with external serial ports.
//!
//! A [`Topology`] is what the kernel drives: a fixed set of named serial
//! ports, each with a [`UartChannel`] behind it, wired to handshake logic.
//! Single-port loopbacks live here; the two-channel bridge and its
//! self-looped variant live in [`crate::bridge`].

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::Serialize;
use uartlink_common::Divisor;

use crate::channel::{ChannelInput, ChannelStats, UartChannel};
use crate::copy::{ByteHandshakeFsm, CopyEvent, CopyInput, CopyStats};
use crate::echo::{DoubleBufferedEcho, EchoInput, EchoStats};
use crate::sync::Clocked;

/// An external serial port of a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    /// Port name, unique within the topology.
    pub name: &'static str,
    /// Divisor of the channel behind the port.
    pub divisor: Divisor,
}

/// Whether one component is currently waiting on a partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallProbe {
    /// Instance name.
    pub component: &'static str,
    /// `true` while the component is waiting for its consumer.
    pub waiting: bool,
}

/// Counters of every instance in a topology, keyed by instance name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopologyStats {
    /// UART channel counters.
    pub channels: BTreeMap<String, ChannelStats>,
    /// Handshake FSM counters.
    pub copies: BTreeMap<String, CopyStats>,
    /// Echo buffer counters.
    pub echoes: BTreeMap<String, EchoStats>,
}

impl TopologyStats {
    /// Bytes lost by handshake FSMs and channel overruns combined.
    pub fn total_dropped(&self) -> u64 {
        let fsm: u64 = self.copies.values().map(|s| s.dropped).sum();
        let uart: u64 = self.channels.values().map(|s| s.overruns).sum();
        fsm + uart
    }
}

/// A closed system stepped once per tick by the kernel.
///
/// `line_in` and `line_out` are indexed like [`ports`](Topology::ports).
/// An entry is `Some(byte)` on the tick a frame finishes on that line.
pub trait Topology {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// The external serial ports, in index order.
    fn ports(&self) -> Vec<PortInfo>;

    /// Advances every component by one tick.
    fn step(&mut self, line_in: &[Option<u8>], line_out: &mut [Option<u8>]);

    /// Whether no byte is in flight anywhere in the system.
    fn is_idle(&self) -> bool;

    /// Current waiting status of every component that can stall.
    fn stall_probes(&self) -> Vec<StallProbe>;

    /// Counters of every instance.
    fn stats(&self) -> TopologyStats;
}

impl<T: Topology + ?Sized> Topology for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn ports(&self) -> Vec<PortInfo> {
        (**self).ports()
    }

    fn step(&mut self, line_in: &[Option<u8>], line_out: &mut [Option<u8>]) {
        (**self).step(line_in, line_out)
    }

    fn is_idle(&self) -> bool {
        (**self).is_idle()
    }

    fn stall_probes(&self) -> Vec<StallProbe> {
        (**self).stall_probes()
    }

    fn stats(&self) -> TopologyStats {
        (**self).stats()
    }
}

/// Logs a handshake FSM event under the instance name.
pub(crate) fn log_copy_event(instance: &str, event: Option<CopyEvent>) {
    match event {
        Some(CopyEvent::Latched(byte)) => debug!("{instance}: latched 0x{byte:02x}"),
        Some(CopyEvent::Delivered(byte)) => debug!("{instance}: delivered 0x{byte:02x}"),
        Some(CopyEvent::Dropped) => warn!("{instance}: receive edge while busy, byte dropped"),
        None => {}
    }
}

/// Logs a receive overrun if the channel's overrun count moved this tick.
pub(crate) fn log_overrun(instance: &str, before: &ChannelStats, after: &ChannelStats) {
    if after.overruns > before.overruns {
        warn!("{instance}: receive overrun, unacknowledged byte overwritten");
    }
}

/// Port index helper tolerant of short slices.
pub(crate) fn line(lines: &[Option<u8>], index: usize) -> Option<u8> {
    lines.get(index).copied().flatten()
}

/// Writes `value` to `lines[index]` if the slot exists.
pub(crate) fn drive(lines: &mut [Option<u8>], index: usize, value: Option<u8>) {
    if let Some(slot) = lines.get_mut(index) {
        *slot = value;
    }
}

/// One UART channel whose received bytes are echoed through a
/// [`DoubleBufferedEcho`].
#[derive(Debug, Clone)]
pub struct EchoLoopback {
    channel: Clocked<UartChannel>,
    echo: Clocked<DoubleBufferedEcho>,
}

impl EchoLoopback {
    /// Port name of the single channel.
    pub const PORT: &'static str = "uart";

    /// Creates the loopback with the channel at `divisor`.
    pub fn new(divisor: Divisor) -> Self {
        Self {
            channel: Clocked::new(UartChannel::new(divisor)),
            echo: Clocked::new(DoubleBufferedEcho),
        }
    }

    /// The echo instance.
    pub fn echo(&self) -> &Clocked<DoubleBufferedEcho> {
        &self.echo
    }

    /// The channel instance.
    pub fn channel(&self) -> &Clocked<UartChannel> {
        &self.channel
    }
}

impl Topology for EchoLoopback {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn ports(&self) -> Vec<PortInfo> {
        vec![PortInfo {
            name: Self::PORT,
            divisor: self.channel.component().divisor(),
        }]
    }

    fn step(&mut self, line_in: &[Option<u8>], line_out: &mut [Option<u8>]) {
        let ch = self.channel.outputs();
        let echo = self.echo.outputs();
        let before = self.channel.state().stats;

        self.echo.eval(EchoInput {
            rx_ready: ch.rx_ready,
            rx_data: ch.rx_data,
            tx_ack: ch.tx_ack,
        });
        self.channel.eval(ChannelInput {
            tx_ready: echo.tx_ready,
            tx_data: echo.tx_data,
            rx_ack: echo.rx_ack,
            line_in: line(line_in, 0),
        });
        self.echo.commit();
        self.channel.commit();

        log_overrun(Self::PORT, &before, &self.channel.state().stats);
        drive(line_out, 0, ch.line_out);
    }

    fn is_idle(&self) -> bool {
        self.channel.state().is_idle() && self.echo.state().empty && !self.echo.state().tx_ready
    }

    fn stall_probes(&self) -> Vec<StallProbe> {
        vec![StallProbe {
            component: "echo",
            waiting: !self.echo.state().empty,
        }]
    }

    fn stats(&self) -> TopologyStats {
        let mut stats = TopologyStats::default();
        stats
            .channels
            .insert(Self::PORT.to_string(), self.channel.state().stats);
        stats
            .echoes
            .insert("echo".to_string(), self.echo.state().stats);
        stats
    }
}

/// One UART channel whose receive side is copied back to its own transmit
/// side through a [`ByteHandshakeFsm`].
#[derive(Debug, Clone)]
pub struct CopyLoopback {
    instance: &'static str,
    channel: Clocked<UartChannel>,
    fsm: Clocked<ByteHandshakeFsm>,
}

impl CopyLoopback {
    /// Port name of the single channel.
    pub const PORT: &'static str = "uart";

    /// Creates the loopback with the channel at `divisor`.
    pub fn new(divisor: Divisor) -> Self {
        Self::named("copy", divisor)
    }

    /// Creates the loopback with a custom FSM instance name.
    pub fn named(instance: &'static str, divisor: Divisor) -> Self {
        Self {
            instance,
            channel: Clocked::new(UartChannel::new(divisor)),
            fsm: Clocked::new(ByteHandshakeFsm),
        }
    }

    /// The handshake FSM instance.
    pub fn fsm(&self) -> &Clocked<ByteHandshakeFsm> {
        &self.fsm
    }

    /// The channel instance.
    pub fn channel(&self) -> &Clocked<UartChannel> {
        &self.channel
    }

    /// The frame this channel is completing on its line this tick.
    pub fn line_output(&self) -> Option<u8> {
        self.channel.outputs().line_out
    }

    /// Advances one tick with `line_in` on the channel's receive line.
    /// Returns what the channel drove on its transmit line this tick.
    pub fn step_line(&mut self, line_in: Option<u8>) -> Option<u8> {
        let ch = self.channel.outputs();
        let before = self.channel.state().stats;

        let out = self.fsm.eval(CopyInput {
            rx_ready: ch.rx_ready,
            rx_data: ch.rx_data,
            tx_ack: ch.tx_ack,
        });
        self.channel.eval(ChannelInput {
            tx_ready: out.tx_ready,
            tx_data: out.tx_data,
            rx_ack: out.rx_ack,
            line_in,
        });
        self.fsm.commit();
        self.channel.commit();

        log_copy_event(self.instance, out.event);
        log_overrun(self.instance, &before, &self.channel.state().stats);
        ch.line_out
    }
}

impl Topology for CopyLoopback {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn ports(&self) -> Vec<PortInfo> {
        vec![PortInfo {
            name: Self::PORT,
            divisor: self.channel.component().divisor(),
        }]
    }

    fn step(&mut self, line_in: &[Option<u8>], line_out: &mut [Option<u8>]) {
        let out = self.step_line(line(line_in, 0));
        drive(line_out, 0, out);
    }

    fn is_idle(&self) -> bool {
        self.channel.state().is_idle() && !self.fsm.state().is_busy()
    }

    fn stall_probes(&self) -> Vec<StallProbe> {
        vec![StallProbe {
            component: self.instance,
            waiting: self.fsm.state().is_busy(),
        }]
    }

    fn stats(&self) -> TopologyStats {
        let mut stats = TopologyStats::default();
        stats
            .channels
            .insert(self.instance.to_string(), self.channel.state().stats);
        stats
            .copies
            .insert(self.instance.to_string(), self.fsm.state().stats);
        stats
    }
}
