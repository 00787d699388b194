//! Configuration types deserialized from `uartlink.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uartlink_common::Frequency;

/// The top-level scenario configuration parsed from `uartlink.toml`.
///
/// Every table is optional; an empty file describes the same run as
/// [`ScenarioFile::default`].
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFile {
    /// The global clock every component runs on.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Named UART channels and their bit rates. Channels the file sets
    /// replace the stock channel of the same name; the rest stay.
    #[serde(default = "default_channels", deserialize_with = "deserialize_channels")]
    pub channels: BTreeMap<String, ChannelConfig>,
    /// Kernel limits.
    #[serde(default)]
    pub sim: SimSettings,
    /// Which topology to build and what to send into it.
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl Default for ScenarioFile {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            channels: default_channels(),
            sim: SimSettings::default(),
            scenario: ScenarioConfig::default(),
        }
    }
}

/// The stock channels: a 9600 baud side and a fast side, both on the
/// default 307.2 kHz clock, plus a standalone `uart` for the single-port
/// topologies.
fn default_channels() -> BTreeMap<String, ChannelConfig> {
    [("low", 32), ("high", 5), ("uart", 32)]
        .into_iter()
        .map(|(name, divisor)| (name.to_string(), ChannelConfig::with_divisor(divisor)))
        .collect()
}

/// Lays the file's `[channels]` tables over the stock channels.
fn deserialize_channels<'de, D>(deserializer: D) -> Result<BTreeMap<String, ChannelConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut channels = default_channels();
    channels.extend(BTreeMap::<String, ChannelConfig>::deserialize(deserializer)?);
    Ok(channels)
}

/// Clock settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    /// Clock frequency, either a string with a unit (`"307.2KHz"`) or a
    /// plain number of hertz.
    #[serde(default = "default_frequency", deserialize_with = "deserialize_frequency")]
    pub frequency: Frequency,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
        }
    }
}

/// 32x oversampling of 9600 baud.
fn default_frequency() -> Frequency {
    Frequency::new(307_200.0)
}

/// Deserializes a frequency given either as a unit string or as a number.
///
/// Accepts `frequency = "50MHz"` as well as `frequency = 50000000`.
fn deserialize_frequency<'de, D>(deserializer: D) -> Result<Frequency, D::Error>
where
    D: Deserializer<'de>,
{
    struct FrequencyVisitor;

    impl<'de> Visitor<'de> for FrequencyVisitor {
        type Value = Frequency;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a frequency such as \"50MHz\" or a number of hertz")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Frequency::from_str(v).map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            self.visit_f64(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            self.visit_f64(v as f64)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            if v.is_finite() && v > 0.0 {
                Ok(Frequency::new(v))
            } else {
                Err(E::custom(format!("frequency must be positive, got {v}")))
            }
        }
    }

    deserializer.deserialize_any(FrequencyVisitor)
}

/// One UART channel's bit rate, as exactly one of a baud rate or a divisor.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Baud rate; the divisor is derived from the clock, rounding down.
    pub baud: Option<u32>,
    /// Clock ticks per serial bit.
    pub divisor: Option<u32>,
}

impl ChannelConfig {
    /// A channel configured directly by divisor.
    pub fn with_divisor(divisor: u32) -> Self {
        Self {
            baud: None,
            divisor: Some(divisor),
        }
    }
}

/// Kernel limits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SimSettings {
    /// Hard stop for the run.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Ticks a component may wait on its partner before the run is aborted.
    #[serde(default)]
    pub stall_timeout: Option<u64>,
    /// Extra ticks to keep running once everything is idle.
    #[serde(default)]
    pub settle_ticks: u64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            stall_timeout: None,
            settle_ticks: 0,
        }
    }
}

fn default_max_ticks() -> u64 {
    10_000_000
}

/// The topology to build and the traffic to send into it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioConfig {
    /// Which composition of channels and handshake logic to simulate.
    #[serde(default)]
    pub topology: TopologyKind,
    /// Byte streams to drive into the topology's ports. When empty, four
    /// `0x55` frames are sent into the topology's first port.
    #[serde(default)]
    pub stimulus: Vec<StimulusConfig>,
}

/// The available topologies.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    /// One channel echoed through a one-byte buffer.
    Echo,
    /// One channel copied back to itself through a handshake FSM.
    Copy,
    /// Two channels bridged in both directions.
    Bridge,
    /// A bridge whose fast side loops back through a third channel (default).
    #[default]
    Loopback,
}

impl TopologyKind {
    /// Channels that must be configured for this topology.
    pub fn required_channels(self) -> &'static [&'static str] {
        match self {
            TopologyKind::Echo | TopologyKind::Copy => &["uart"],
            TopologyKind::Bridge | TopologyKind::Loopback => &["low", "high"],
        }
    }

    /// External ports that accept stimulus.
    pub fn ports(self) -> &'static [&'static str] {
        match self {
            TopologyKind::Echo | TopologyKind::Copy => &["uart"],
            TopologyKind::Bridge => &["low", "high"],
            TopologyKind::Loopback => &["low"],
        }
    }

    /// The lowercase name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            TopologyKind::Echo => "echo",
            TopologyKind::Copy => "copy",
            TopologyKind::Bridge => "bridge",
            TopologyKind::Loopback => "loopback",
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A byte stream sent into one port as back-to-back UART frames.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StimulusConfig {
    /// Port to drive.
    pub port: String,
    /// Payload as UTF-8 text.
    pub text: Option<String>,
    /// Payload as raw bytes.
    pub bytes: Option<Vec<u8>>,
    /// Idle bit periods after each frame.
    #[serde(default = "default_gap_bits")]
    pub gap_bits: u32,
    /// Tick at which the first frame starts.
    #[serde(default)]
    pub start_tick: u64,
}

impl StimulusConfig {
    /// A text stimulus on `port` with the default spacing.
    pub fn text(port: &str, text: &str) -> Self {
        Self {
            port: port.to_string(),
            text: Some(text.to_string()),
            bytes: None,
            gap_bits: default_gap_bits(),
            start_tick: 0,
        }
    }

    /// The payload bytes, whichever form they were given in.
    pub fn payload(&self) -> &[u8] {
        match (&self.text, &self.bytes) {
            (Some(text), _) => text.as_bytes(),
            (None, Some(bytes)) => bytes,
            (None, None) => &[],
        }
    }
}

/// Long enough for a 9600 baud side to drain a frame arriving from a much
/// faster one.
fn default_gap_bits() -> u32 {
    30
}
