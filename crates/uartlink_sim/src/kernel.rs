//! Simulation kernel: drives a topology tick by tick with line stimulus.
//!
//! [`SimKernel`] owns a [`Topology`], one [`LineStimulus`] and one
//! [`LineCapture`] per port, and a [`StallWatchdog`]. Each tick it polls the
//! stimulus, steps the topology once, records what the ports transmitted and
//! checks the stall probes. A run ends when all stimulus has been delivered
//! and the topology has stayed idle for the settle period, when the tick
//! limit is reached, or when the watchdog fires.

use log::{error, info};
use serde::Serialize;
use uartlink_common::Divisor;

use crate::error::SimError;
use crate::stimulus::{CapturedFrame, LineCapture, LineStimulus};
use crate::time::Tick;
use crate::topology::{PortInfo, Topology, TopologyStats};
use crate::watchdog::StallWatchdog;

/// Run limits for a simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Ticks after which the run stops regardless of traffic.
    pub max_ticks: u64,
    /// Consecutive waiting ticks after which a component counts as stalled.
    pub stall_timeout: Option<u64>,
    /// Extra ticks to keep running once the system has drained.
    pub settle_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_ticks: 10_000_000,
            stall_timeout: None,
            settle_ticks: 0,
        }
    }
}

/// Outcome of a single kernel tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// More ticks are needed.
    Continued,
    /// Stimulus delivered and the system has drained.
    Done,
}

/// Frames captured on one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortCapture {
    /// Port name.
    pub port: String,
    /// Ticks per bit of the port's channel.
    pub divisor: Divisor,
    /// Frames transmitted on the port, in order.
    pub frames: Vec<CapturedFrame>,
}

impl PortCapture {
    /// The captured data bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.frames.iter().map(|f| f.byte).collect()
    }
}

/// The result of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimResult {
    /// Topology name.
    pub topology: String,
    /// The first tick not simulated.
    pub final_tick: Tick,
    /// Whether the run drained all traffic within its limits.
    pub completed: bool,
    /// Watchdog report, if the run was stopped by a stall.
    pub timeout: Option<String>,
    /// Per-port transmit captures, in port order.
    pub ports: Vec<PortCapture>,
    /// Counters of every instance.
    pub stats: TopologyStats,
}

impl SimResult {
    /// The bytes transmitted on `port`, if the topology has it.
    pub fn received(&self, port: &str) -> Option<Vec<u8>> {
        self.ports
            .iter()
            .find(|p| p.port == port)
            .map(PortCapture::bytes)
    }
}

/// Drives a [`Topology`] with stimulus until it drains.
pub struct SimKernel<T: Topology> {
    topology: T,
    config: SimConfig,
    ports: Vec<PortInfo>,
    now: Tick,
    stimulus: Vec<LineStimulus>,
    captures: Vec<LineCapture>,
    line_in: Vec<Option<u8>>,
    line_out: Vec<Option<u8>>,
    watchdog: StallWatchdog,
    idle_for: u64,
    timeout: Option<SimError>,
}

impl<T: Topology> SimKernel<T> {
    /// Creates a kernel at tick zero with no stimulus queued.
    pub fn new(topology: T, config: SimConfig) -> Self {
        let ports = topology.ports();
        let n = ports.len();
        Self {
            watchdog: StallWatchdog::new(config.stall_timeout),
            topology,
            config,
            ports,
            now: Tick::ZERO,
            stimulus: vec![LineStimulus::new(); n],
            captures: vec![LineCapture::new(); n],
            line_in: vec![None; n],
            line_out: vec![None; n],
            idle_for: 0,
            timeout: None,
        }
    }

    /// The simulated topology.
    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// The next tick to be simulated.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// The topology's ports, in index order.
    pub fn ports(&self) -> &[PortInfo] {
        &self.ports
    }

    /// Index of the port called `name`.
    pub fn port_index(&self, name: &str) -> Result<usize, SimError> {
        self.ports
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| SimError::UnknownPort {
                port: name.to_string(),
                available: self
                    .ports
                    .iter()
                    .map(|p| p.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Queues `bytes` on `port`'s receive line at the port's own baud rate,
    /// starting at `start` with `gap_bits` idle bit periods after each frame.
    ///
    /// Fails with [`SimError::StimulusOverflow`], queuing nothing, if the last
    /// frame would complete past the last representable tick.
    pub fn send(
        &mut self,
        port: &str,
        bytes: &[u8],
        gap_bits: u32,
        start: Tick,
    ) -> Result<(), SimError> {
        let index = self.port_index(port)?;
        let divisor = self.ports[index].divisor;
        self.stimulus[index]
            .extend_paced(bytes, divisor, gap_bits, start)
            .map(|_| ())
            .ok_or_else(|| SimError::StimulusOverflow {
                port: port.to_string(),
                frames: bytes.len(),
                start,
            })
    }

    /// Schedules one frame on `port` to complete at `at`.
    pub fn schedule(&mut self, port: &str, at: Tick, byte: u8) -> Result<(), SimError> {
        let index = self.port_index(port)?;
        self.stimulus[index].push(at, byte);
        Ok(())
    }

    /// Frames captured so far on `port`.
    pub fn capture(&self, port: &str) -> Result<&LineCapture, SimError> {
        let index = self.port_index(port)?;
        Ok(&self.captures[index])
    }

    fn stimulus_exhausted(&self) -> bool {
        self.stimulus.iter().all(LineStimulus::is_exhausted)
    }

    /// Simulates one tick.
    ///
    /// Returns [`SimError::Timeout`] if a component has been waiting longer
    /// than the stall limit; the topology is left exactly as it was at that
    /// tick.
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        let now = self.now;
        for (slot, source) in self.line_in.iter_mut().zip(&mut self.stimulus) {
            *slot = source.poll(now);
        }
        self.line_out.iter_mut().for_each(|slot| *slot = None);

        self.topology.step(&self.line_in, &mut self.line_out);

        for (capture, line) in self.captures.iter_mut().zip(&self.line_out) {
            capture.record(now, *line);
        }
        self.now = now.next();

        self.watchdog.check(now, &self.topology.stall_probes())?;

        if self.stimulus_exhausted() && self.topology.is_idle() {
            if self.idle_for >= self.config.settle_ticks {
                return Ok(StepResult::Done);
            }
            self.idle_for += 1;
        } else {
            self.idle_for = 0;
        }
        Ok(StepResult::Continued)
    }

    /// Runs until the system drains, the tick limit is hit, or a stall is
    /// detected. Stalls are reported in the result rather than as an error.
    pub fn run(&mut self) -> SimResult {
        let mut completed = false;
        while self.now.0 < self.config.max_ticks {
            match self.step() {
                Ok(StepResult::Continued) => {}
                Ok(StepResult::Done) => {
                    completed = true;
                    break;
                }
                Err(e) => {
                    error!("{}: {e}", self.topology.name());
                    self.timeout = Some(e);
                    break;
                }
            }
        }
        let result = self.result(completed);
        info!(
            "{}: stopped at {} ({}), {} frame(s) out",
            result.topology,
            result.final_tick,
            if completed { "drained" } else { "incomplete" },
            result.ports.iter().map(|p| p.frames.len()).sum::<usize>()
        );
        result
    }

    /// Like [`run`](Self::run), but turns a stall or an exhausted tick budget
    /// into an error.
    pub fn run_to_completion(&mut self) -> Result<SimResult, SimError> {
        let result = self.run();
        if let Some(e) = self.timeout.clone() {
            return Err(e);
        }
        if !result.completed {
            return Err(SimError::TickLimitExceeded {
                limit: self.config.max_ticks,
            });
        }
        Ok(result)
    }

    fn result(&self, completed: bool) -> SimResult {
        SimResult {
            topology: self.topology.name().to_string(),
            final_tick: self.now,
            completed,
            timeout: self.timeout.as_ref().map(ToString::to_string),
            ports: self
                .ports
                .iter()
                .zip(&self.captures)
                .map(|(info, capture)| PortCapture {
                    port: info.name.to_string(),
                    divisor: info.divisor,
                    frames: capture.frames().to_vec(),
                })
                .collect(),
            stats: self.topology.stats(),
        }
    }
}
