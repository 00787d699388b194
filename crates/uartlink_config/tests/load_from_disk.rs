//! Loading scenario files from disk and resolving them end to end.

use std::fs;

use uartlink_config::{load_config, resolve_scenario, ConfigError, TopologyKind};

#[test]
fn load_and_resolve_bridge_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uartlink.toml");
    fs::write(
        &path,
        r#"
[clock]
frequency = "16MHz"

[channels.low]
baud = 9600
[channels.high]
baud = 1000000

[sim]
stall_timeout = 50000

[scenario]
topology = "bridge"

[[scenario.stimulus]]
port = "high"
text = "fast"
gap_bits = 200
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.scenario.topology, TopologyKind::Bridge);

    let resolved = resolve_scenario(&config).unwrap();
    // 16_000_000 / 9600 = 1666.67
    assert_eq!(resolved.divisor("low").unwrap().ticks_per_bit(), 1666);
    assert_eq!(resolved.divisor("high").unwrap().ticks_per_bit(), 16);
    assert_eq!(resolved.stimuli.len(), 1);
    assert_eq!(resolved.stimuli[0].port, "high");
    assert_eq!(resolved.stimuli[0].bytes, b"fast");
    assert_eq!(resolved.stall_timeout, Some(50_000));
}

#[test]
fn invalid_file_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uartlink.toml");
    fs::write(&path, "[scenario\ntopology = ").unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn missing_file_reports_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::IoError(_)));
    assert!(err.to_string().starts_with("failed to read configuration:"));
}
