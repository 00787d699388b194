//! Parsing and validation of `uartlink.toml` scenario files.
//!
//! This crate reads a scenario file and produces a strongly-typed
//! [`ScenarioFile`], checks it against the chosen topology, and resolves it
//! into concrete channel divisors and byte stimulus ([`ResolvedScenario`]).
//! A missing file is not an error at this level: [`ScenarioFile::default`]
//! reproduces the stock low/high-speed loopback run.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, validate_config};
pub use resolve::{resolve_scenario, ResolvedScenario, ResolvedStimulus};
pub use types::*;
