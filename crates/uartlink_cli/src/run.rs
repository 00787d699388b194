//! `uartlink run`: simulate a topology and report its traffic.
//!
//! Loads the scenario, applies command-line overrides, builds the topology,
//! queues the stimulus, and runs the kernel until the system drains, the tick
//! limit is reached, or the stall watchdog fires. Captured frames go to
//! stdout; progress lines go to stderr.

use log::info;
use uartlink_config::{resolve_scenario, validate_config, ScenarioFile, StimulusConfig};
use uartlink_sim::time::format_fs;
use uartlink_sim::{SimConfig, SimKernel, SimResult, Tick};

use crate::pipeline::{build_topology, duration_to_ticks, load_scenario, parse_send};
use crate::report::render_text;
use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Runs the `uartlink run` command.
///
/// Returns exit code 0 if the run drained without a stall, 1 otherwise.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = load_scenario(global)?;
    apply_overrides(&mut config, args)?;
    validate_config(&config)?;
    let scenario = resolve_scenario(&config)?;

    if !global.quiet {
        eprintln!(
            "   Simulating {} on a {} clock",
            scenario.topology, scenario.clock
        );
    }

    let topology = build_topology(&scenario)?;
    let sim_config = SimConfig {
        max_ticks: scenario.max_ticks,
        stall_timeout: scenario.stall_timeout,
        settle_ticks: scenario.settle_ticks,
    };
    let mut kernel = SimKernel::new(topology, sim_config);

    for stimulus in &scenario.stimuli {
        kernel.send(
            &stimulus.port,
            &stimulus.bytes,
            stimulus.gap_bits,
            Tick(stimulus.start_tick),
        )?;
        info!(
            "queued {} byte(s) on {} from {}",
            stimulus.bytes.len(),
            stimulus.port,
            Tick(stimulus.start_tick)
        );
    }

    let result = kernel.run();

    match args.format {
        ReportFormat::Text => print!("{}", render_text(&result, scenario.clock)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if !global.quiet {
        eprintln!(
            "   Finished at {} ({})",
            result.final_tick,
            format_fs(result.final_tick.to_fs(scenario.clock))
        );
    }
    Ok(exit_code(&result, global.quiet))
}

/// Applies `--topology`, `--send`, and the limit flags to a loaded scenario.
fn apply_overrides(
    config: &mut ScenarioFile,
    args: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(topology) = args.topology {
        config.scenario.topology = topology.into();
    }
    if !args.send.is_empty() {
        config.scenario.stimulus = args
            .send
            .iter()
            .map(|arg| parse_send(arg).map(|(port, text)| StimulusConfig::text(port, text)))
            .collect::<Result<_, _>>()?;
    }
    if let Some(max_ticks) = args.max_ticks {
        config.sim.max_ticks = max_ticks;
    }
    if let Some(ref time) = args.time {
        config.sim.max_ticks = duration_to_ticks(time, config.clock.frequency)?;
    }
    if let Some(stall_timeout) = args.stall_timeout {
        config.sim.stall_timeout = Some(stall_timeout);
    }
    Ok(())
}

fn exit_code(result: &SimResult, quiet: bool) -> i32 {
    if let Some(ref timeout) = result.timeout {
        if !quiet {
            eprintln!("   STALLED: {timeout}");
        }
        1
    } else if !result.completed {
        if !quiet {
            eprintln!("   INCOMPLETE: traffic still in flight at the tick limit");
        }
        1
    } else {
        0
    }
}
