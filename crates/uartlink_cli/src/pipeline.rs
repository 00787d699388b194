//! Shared pipeline helpers for CLI commands.
//!
//! Contains the steps `run` and `check` have in common: locating and loading
//! the scenario file, duration and `--send` parsing, and building the
//! topology a resolved scenario describes.

use std::path::{Path, PathBuf};

use log::debug;
use uartlink_common::{Frequency, FS_PER_SECOND};
use uartlink_config::{ConfigError, ResolvedScenario, ScenarioFile, TopologyKind};
use uartlink_sim::time::{FS_PER_MS, FS_PER_NS, FS_PER_US};
use uartlink_sim::{Bridge, CopyLoopback, EchoLoopback, LowHighSpeedLoopback, Topology};

use crate::GlobalArgs;

/// File name looked for when `--config` is not given.
pub const CONFIG_FILE: &str = "uartlink.toml";

/// Walks up from `start` looking for the nearest `uartlink.toml`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Loads the scenario named by `--config`, or the nearest `uartlink.toml`,
/// or falls back to the built-in defaults.
pub fn load_scenario(global: &GlobalArgs) -> Result<ScenarioFile, Box<dyn std::error::Error>> {
    let path = match global.config {
        Some(ref config_path) => Some(PathBuf::from(config_path)),
        None => find_config_file(&std::env::current_dir()?),
    };
    match path {
        Some(path) => {
            debug!("loading scenario from {}", path.display());
            Ok(uartlink_config::load_config(&path)?)
        }
        None => {
            debug!("no {CONFIG_FILE} found, using defaults");
            Ok(ScenarioFile::default())
        }
    }
}

/// Builds the topology a resolved scenario describes.
pub fn build_topology(scenario: &ResolvedScenario) -> Result<Box<dyn Topology>, ConfigError> {
    let topology: Box<dyn Topology> = match scenario.topology {
        TopologyKind::Echo => Box::new(EchoLoopback::new(scenario.divisor("uart")?)),
        TopologyKind::Copy => Box::new(CopyLoopback::new(scenario.divisor("uart")?)),
        TopologyKind::Bridge => Box::new(Bridge::new(
            scenario.divisor("low")?,
            scenario.divisor("high")?,
        )),
        TopologyKind::Loopback => Box::new(LowHighSpeedLoopback::new(
            scenario.divisor("low")?,
            scenario.divisor("high")?,
        )),
    };
    Ok(topology)
}

/// Splits a `PORT=TEXT` argument.
pub fn parse_send(arg: &str) -> Result<(&str, &str), Box<dyn std::error::Error>> {
    match arg.split_once('=') {
        Some((port, text)) if !port.trim().is_empty() => Ok((port.trim(), text)),
        _ => Err(format!("invalid --send '{arg}' (expected PORT=TEXT)").into()),
    }
}

/// Parses a human-readable duration string into femtoseconds.
///
/// Supports units: `ns`, `us`, `ms`, `s`.
/// Examples: `"100ns"`, `"1us"`, `"10ms"`, `"2s"`.
pub fn parse_duration(s: &str) -> Result<u64, Box<dyn std::error::Error>> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".into());
    }

    let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());

    if digit_end == 0 {
        return Err(format!("invalid duration: no numeric value in '{s}'").into());
    }

    let number: u64 = s[..digit_end]
        .parse()
        .map_err(|_| format!("invalid number in duration '{s}'"))?;

    let unit = s[digit_end..].trim();

    let multiplier = match unit {
        "ns" => FS_PER_NS,
        "us" => FS_PER_US,
        "ms" => FS_PER_MS,
        "s" => FS_PER_SECOND,
        "" => return Err(format!("missing unit in duration '{s}' (use ns, us, ms, or s)").into()),
        _ => {
            return Err(format!("unknown duration unit '{unit}' (use ns, us, ms, or s)").into())
        }
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration '{s}' is too long").into())
}

/// Converts a duration string to whole ticks of `clock`.
pub fn duration_to_ticks(s: &str, clock: Frequency) -> Result<u64, Box<dyn std::error::Error>> {
    Ok(clock.ticks_in(parse_duration(s)?))
}
