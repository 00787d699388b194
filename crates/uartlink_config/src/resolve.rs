//! Scenario resolution: turning validated settings into concrete divisors
//! and byte streams.

use crate::error::ConfigError;
use crate::types::{ChannelConfig, ScenarioFile, TopologyKind};
use std::collections::BTreeMap;
use uartlink_common::{Divisor, Frequency};

/// Frames sent when a scenario lists no stimulus.
const DEFAULT_PAYLOAD: [u8; 4] = [0x55; 4];
/// Idle bit periods between the default frames.
const DEFAULT_GAP_BITS: u32 = 30;

/// A byte stream bound to a port, with its payload already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStimulus {
    /// Port to drive.
    pub port: String,
    /// Bytes to send, in order.
    pub bytes: Vec<u8>,
    /// Idle bit periods after each frame.
    pub gap_bits: u32,
    /// Tick at which the first frame starts.
    pub start_tick: u64,
}

/// A scenario ready to be built and run.
///
/// Only the channels the topology needs are resolved; any others in the file
/// were validated and then left out.
#[derive(Debug, Clone)]
pub struct ResolvedScenario {
    /// The topology to build.
    pub topology: TopologyKind,
    /// The global clock.
    pub clock: Frequency,
    /// Divisors of the topology's channels, by channel name.
    pub channels: BTreeMap<String, Divisor>,
    /// Traffic to send, in file order.
    pub stimuli: Vec<ResolvedStimulus>,
    /// Hard stop for the run.
    pub max_ticks: u64,
    /// Optional stall limit.
    pub stall_timeout: Option<u64>,
    /// Extra ticks to run after the system drains.
    pub settle_ticks: u64,
}

impl ResolvedScenario {
    /// The divisor of a resolved channel.
    pub fn divisor(&self, channel: &str) -> Result<Divisor, ConfigError> {
        self.channels
            .get(channel)
            .copied()
            .ok_or_else(|| ConfigError::MissingField(format!("channels.{channel}")))
    }
}

/// Resolves a scenario into concrete divisors and stimulus.
///
/// Baud rates are converted on the configured clock, rounding down. A
/// scenario without stimulus gets four `0x55` frames on its first port.
pub fn resolve_scenario(config: &ScenarioFile) -> Result<ResolvedScenario, ConfigError> {
    let topology = config.scenario.topology;
    let clock = config.clock.frequency;

    let mut channels = BTreeMap::new();
    for &name in topology.required_channels() {
        let channel = config
            .channels
            .get(name)
            .ok_or_else(|| ConfigError::MissingField(format!("channels.{name}")))?;
        channels.insert(name.to_string(), channel_divisor(clock, name, channel)?);
    }

    let stimuli = if config.scenario.stimulus.is_empty() {
        vec![ResolvedStimulus {
            port: topology.ports()[0].to_string(),
            bytes: DEFAULT_PAYLOAD.to_vec(),
            gap_bits: DEFAULT_GAP_BITS,
            start_tick: 0,
        }]
    } else {
        config
            .scenario
            .stimulus
            .iter()
            .map(|s| ResolvedStimulus {
                port: s.port.clone(),
                bytes: s.payload().to_vec(),
                gap_bits: s.gap_bits,
                start_tick: s.start_tick,
            })
            .collect()
    };

    Ok(ResolvedScenario {
        topology,
        clock,
        channels,
        stimuli,
        max_ticks: config.sim.max_ticks,
        stall_timeout: config.sim.stall_timeout,
        settle_ticks: config.sim.settle_ticks,
    })
}

/// Derives one channel's divisor from whichever rate it was given.
pub(crate) fn channel_divisor(
    clock: Frequency,
    name: &str,
    channel: &ChannelConfig,
) -> Result<Divisor, ConfigError> {
    let divisor = match (channel.baud, channel.divisor) {
        (Some(baud), None) => Divisor::from_baud(clock, baud),
        (None, Some(divisor)) => Divisor::new(divisor),
        (Some(_), Some(_)) => {
            return Err(ConfigError::ValidationError(format!(
                "channel '{name}' sets both baud and divisor"
            )))
        }
        (None, None) => {
            return Err(ConfigError::MissingField(format!(
                "channels.{name}.baud or channels.{name}.divisor"
            )))
        }
    };
    divisor.map_err(|e| ConfigError::ValidationError(format!("channel '{name}': {e}")))
}
