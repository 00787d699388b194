//! `uartlink check`: validate a scenario and show its channel timing.

use uartlink_config::{resolve_scenario, ResolvedScenario};

use crate::pipeline::load_scenario;
use crate::GlobalArgs;

/// Runs the `uartlink check` command.
///
/// Returns exit code 0 when the scenario is valid; validation failures are
/// returned as errors.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_scenario(global)?;
    let scenario = resolve_scenario(&config)?;

    print!("{}", describe(&scenario));
    if !global.quiet {
        eprintln!("   Scenario OK");
    }
    Ok(0)
}

/// One line for the topology and clock, then one per resolved channel and
/// stimulus.
fn describe(scenario: &ResolvedScenario) -> String {
    let mut out = format!(
        "topology {} on a {} clock\n",
        scenario.topology, scenario.clock
    );
    for (name, divisor) in &scenario.channels {
        out.push_str(&format!(
            "  channel {name}: divisor {}, {} ticks/frame, {:.1} baud\n",
            divisor.ticks_per_bit(),
            divisor.frame_ticks(),
            divisor.effective_baud(scenario.clock)
        ));
    }
    for stimulus in &scenario.stimuli {
        out.push_str(&format!(
            "  send {} byte(s) into {} from tick {}, {} idle bit(s) apart\n",
            stimulus.bytes.len(),
            stimulus.port,
            stimulus.start_tick,
            stimulus.gap_bits
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use uartlink_config::ScenarioFile;

    #[test]
    fn describe_default_scenario() {
        let scenario = resolve_scenario(&ScenarioFile::default()).unwrap();
        let text = describe(&scenario);
        assert_eq!(
            text,
            "topology loopback on a 307.2KHz clock\n\
             \x20 channel high: divisor 5, 50 ticks/frame, 61440.0 baud\n\
             \x20 channel low: divisor 32, 320 ticks/frame, 9600.0 baud\n\
             \x20 send 4 byte(s) into low from tick 0, 30 idle bit(s) apart\n"
        );
    }

    #[test]
    fn check_valid_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("uartlink.toml");
        fs::write(&path, "[channels.low]\nbaud = 9600\n[channels.high]\ndivisor = 1\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(path.to_str().unwrap().to_string()),
        };
        assert_eq!(run(&global).unwrap(), 0);
    }

    #[test]
    fn check_invalid_file_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("uartlink.toml");
        fs::write(&path, "[channels.low]\nbaud = 9600\ndivisor = 3\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(path.to_str().unwrap().to_string()),
        };
        let err = run(&global).unwrap_err();
        assert!(err.to_string().contains("channel 'low' sets both baud and divisor"));
    }

    #[test]
    fn check_rejects_stimulus_past_last_tick() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("uartlink.toml");
        fs::write(
            &path,
            "[channels.uart]\ndivisor = 4294967295\n\
             [scenario]\ntopology = \"echo\"\n\
             [[scenario.stimulus]]\nport = \"uart\"\ntext = \"ab\"\ngap_bits = 4294967295\n",
        )
        .unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(path.to_str().unwrap().to_string()),
        };
        let err = run(&global).unwrap_err();
        assert!(err.to_string().contains("past the last representable tick"));
    }

    #[test]
    fn check_merges_stock_channels() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("uartlink.toml");
        fs::write(&path, "[channels.low]\ndivisor = 16\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(path.to_str().unwrap().to_string()),
        };
        let config = load_scenario(&global).unwrap();
        let scenario = resolve_scenario(&config).unwrap();
        assert_eq!(scenario.divisor("low").unwrap().ticks_per_bit(), 16);
        assert_eq!(scenario.divisor("high").unwrap().ticks_per_bit(), 5);
        assert_eq!(run(&global).unwrap(), 0);
    }
}
