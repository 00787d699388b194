//! Scenario file loading and validation.

use crate::error::ConfigError;
use crate::resolve::channel_divisor;
use crate::types::ScenarioFile;
use std::path::Path;

/// Loads and validates a `uartlink.toml` scenario file.
pub fn load_config(path: &Path) -> Result<ScenarioFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `uartlink.toml` scenario from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ScenarioFile, ConfigError> {
    let config: ScenarioFile =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that the topology's channels are present, every channel and
/// stimulus is well-formed, stimulus only targets the topology's ports, and
/// every stimulus finishes within the tick counter's range.
///
/// Call again after applying command-line overrides to a loaded file.
pub fn validate_config(config: &ScenarioFile) -> Result<(), ConfigError> {
    let topology = config.scenario.topology;

    for &name in topology.required_channels() {
        if !config.channels.contains_key(name) {
            return Err(ConfigError::MissingField(format!("channels.{name}")));
        }
    }
    for (name, channel) in &config.channels {
        channel_divisor(config.clock.frequency, name, channel)?;
    }

    if config.sim.max_ticks == 0 {
        return Err(ConfigError::ValidationError(
            "sim.max_ticks must be at least 1".to_string(),
        ));
    }
    if config.sim.stall_timeout == Some(0) {
        return Err(ConfigError::ValidationError(
            "sim.stall_timeout must be at least 1 tick".to_string(),
        ));
    }

    for (i, stimulus) in config.scenario.stimulus.iter().enumerate() {
        if !topology.ports().contains(&stimulus.port.as_str()) {
            return Err(ConfigError::UnknownPort {
                port: stimulus.port.clone(),
                topology: topology.to_string(),
            });
        }
        match (&stimulus.text, &stimulus.bytes) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::ValidationError(format!(
                    "scenario.stimulus[{i}] sets both text and bytes"
                )))
            }
            (None, None) => {
                return Err(ConfigError::MissingField(format!(
                    "scenario.stimulus[{i}].text or scenario.stimulus[{i}].bytes"
                )))
            }
            _ => {}
        }
        // A port is driven by the channel of the same name.
        let channel = config
            .channels
            .get(&stimulus.port)
            .ok_or_else(|| ConfigError::MissingField(format!("channels.{}", stimulus.port)))?;
        let divisor = channel_divisor(config.clock.frequency, &stimulus.port, channel)?;
        let frames = stimulus.payload().len() as u64;
        if divisor
            .stream_end(stimulus.start_tick, frames, stimulus.gap_bits)
            .is_none()
        {
            return Err(ConfigError::ValidationError(format!(
                "scenario.stimulus[{i}] would end past the last representable tick"
            )));
        }
    }
    Ok(())
}
