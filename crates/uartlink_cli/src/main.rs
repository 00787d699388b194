//! uartlink CLI: drives cycle-accurate UART handshake simulations.
//!
//! Provides `uartlink run` for simulating a topology with byte stimulus and
//! reporting what came back out of its ports, and `uartlink check` for
//! validating a scenario file and showing the resolved channel timing.

#![warn(missing_docs)]

mod check;
mod pipeline;
mod report;
mod run;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use uartlink_config::TopologyKind;

/// uartlink: simulate byte-handshake logic between UART channels.
#[derive(Parser, Debug)]
#[command(name = "uartlink", version, about = "UART handshake simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `uartlink.toml` scenario file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation and report the captured traffic.
    Run(RunArgs),
    /// Validate the scenario and print the resolved channels.
    Check,
}

/// Arguments for the `uartlink run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Topology to simulate, overriding the scenario file.
    #[arg(short, long, value_enum)]
    pub topology: Option<TopologyArg>,

    /// Text to send into a port, as `PORT=TEXT`. Replaces the scenario's
    /// stimulus; may be repeated.
    #[arg(short, long)]
    pub send: Vec<String>,

    /// Tick limit for the run.
    #[arg(long, conflicts_with = "time")]
    pub max_ticks: Option<u64>,

    /// Simulated time limit (e.g., "10ms", "250us"), converted with the clock.
    #[arg(long)]
    pub time: Option<String>,

    /// Ticks a component may wait on its partner before the run is aborted.
    #[arg(long)]
    pub stall_timeout: Option<u64>,

    /// Output format for the report.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Topology selection on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TopologyArg {
    /// One channel echoed through a one-byte buffer.
    Echo,
    /// One channel copied back to itself through a handshake FSM.
    Copy,
    /// Two channels bridged in both directions.
    Bridge,
    /// A bridge looped back through a third fast channel.
    Loopback,
}

impl From<TopologyArg> for TopologyKind {
    fn from(arg: TopologyArg) -> Self {
        match arg {
            TopologyArg::Echo => TopologyKind::Echo,
            TopologyArg::Copy => TopologyKind::Copy,
            TopologyArg::Bridge => TopologyKind::Bridge,
            TopologyArg::Loopback => TopologyKind::Loopback,
        }
    }
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a scenario file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::Check => check::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the logger. `RUST_LOG` wins over the verbosity flags.
fn init_logging(global: &GlobalArgs) {
    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
