//! Debug clock controller CLI.
//!
//! This binary exposes the measurement library from a shell. It provides:
//! 1. **Inspection:** List registered clocks and measurable sources, dump a topology.
//! 2. **Validation:** Check a topology and report how every clock bound.
//! 3. **Measurement:** Read a clock's rate or measure any routable source.
//!
//! Without `--map` the topology runs on the simulated SoC, where `--source` and
//! `--stuck` shape the signals. With `--map` every listed window is mapped from the
//! memory device instead.

use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use debugcc_core::clk::{ClockKind, DebugCc};
use debugcc_core::config::TopologyConfig;
use debugcc_core::soc::devices::{MmioResolver, SimulatedSoc};
use debugcc_core::soc::traits::{FixedReference, ReferenceClock, WindowResolver};
use debugcc_core::targets::{self, sdx55};
use debugcc_core::{ConfigError, DebugCcError};

#[derive(Parser, Debug)]
#[command(
    name = "debugcc",
    author,
    version,
    about = "Measure internal SoC clocks through the debug clock controller",
    long_about = "Route internal clocks through the debug multiplexers into the shared counter and report their rate.\n\nExamples:\n  debugcc list --sources\n  debugcc --source gcc_gp1_clk=100000000 measure gcc_gp1_clk\n  debugcc --topology board.json check\n  debugcc --map qcom,gcc=0x100000:0x1f0000 measure --all"
)]
struct Cli {
    #[command(flatten)]
    platform: Platform,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Platform {
    /// Topology JSON file (overrides --target).
    #[arg(long, global = true)]
    topology: Option<String>,

    /// Built-in hardware variant.
    #[arg(long, default_value = "sdx55", global = true)]
    target: String,

    /// Reference oscillator rate in Hz.
    #[arg(long, default_value_t = sdx55::XO_RATE, global = true)]
    xo: u64,

    /// Simulated source rate, as NAME=HZ (repeatable).
    #[arg(long = "source", value_parser = parse_source, global = true)]
    sources: Vec<(String, u64)>,

    /// Simulated source that never finishes counting (repeatable).
    #[arg(long, global = true)]
    stuck: Vec<String>,

    /// Simulated window that is not present (repeatable).
    #[arg(long, global = true)]
    absent: Vec<String>,

    /// Physical window, as NAME=BASE:SIZE (repeatable); switches to mapped hardware.
    #[arg(long = "map", value_parser = parse_region, global = true)]
    regions: Vec<(String, u64, u64)>,

    /// Memory device used with --map.
    #[arg(long, default_value = "/dev/mem", global = true)]
    devmem: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered clocks (or every measurable source).
    List {
        /// List measurable sources instead of registered clocks.
        #[arg(long)]
        sources: bool,
    },

    /// Validate the topology and report how each clock bound.
    Check,

    /// Report the current rate of registered clocks.
    Rate {
        /// Clock names.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Measure sources through the debug multiplexers.
    Measure {
        /// Source names.
        names: Vec<String>,

        /// Measure every routable source.
        #[arg(long, conflicts_with = "names")]
        all: bool,
    },

    /// Print the topology as JSON.
    Dump,
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("debugcc: {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), DebugCcError> {
    let topology = load_topology(&cli.platform)?;

    match cli.command {
        Commands::Dump => {
            println!("{}", topology.to_json()?);
            Ok(())
        }
        Commands::Check => cmd_check(&cli.platform, &topology),
        Commands::List { sources } => {
            let cc = start(&cli.platform, &topology)?;
            if sources {
                for name in cc.sources() {
                    println!("{name}");
                }
            } else {
                for clock in cc.clocks() {
                    let kind = match clock.kind() {
                        ClockKind::Mux => "mux",
                        ClockKind::Placeholder => "placeholder",
                    };
                    let state = if clock.is_available() { "" } else { " (unbound)" };
                    println!("{:<32} {kind}{state}", clock.name());
                }
            }
            Ok(())
        }
        Commands::Rate { names } => {
            let cc = start(&cli.platform, &topology)?;
            for name in &names {
                println!("{name:<32} {}", format_rate(cc.current_rate(name)?));
            }
            Ok(())
        }
        Commands::Measure { names, all } => {
            let cc = start(&cli.platform, &topology)?;
            let names: Vec<String> = if all {
                cc.sources().into_iter().map(str::to_string).collect()
            } else {
                names
            };
            let mut failed = None;
            for name in &names {
                match cc.measure(name) {
                    Ok(rate) => println!("{name:<32} {}", format_rate(rate)),
                    Err(err) => {
                        println!("{name:<32} error: {err}");
                        failed.get_or_insert(err);
                    }
                }
            }
            failed.map_or(Ok(()), Err)
        }
    }
}

fn load_topology(platform: &Platform) -> Result<TopologyConfig, ConfigError> {
    match &platform.topology {
        Some(path) => TopologyConfig::from_json_file(path),
        None => targets::lookup(&platform.target),
    }
}

fn start(platform: &Platform, topology: &TopologyConfig) -> Result<DebugCc, DebugCcError> {
    let reference: Arc<dyn ReferenceClock> =
        Arc::new(FixedReference::new(sdx55::REFERENCE, platform.xo));

    let mut resolver: Box<dyn WindowResolver> = if platform.regions.is_empty() {
        let soc = SimulatedSoc::new(topology, platform.xo);
        for (name, rate) in &platform.sources {
            soc.set_rate(name, *rate);
        }
        for name in &platform.stuck {
            soc.set_stuck(name, true);
        }
        for window in &platform.absent {
            soc.set_absent(window);
        }
        debug!(topology = %topology.name, "running on the simulated SoC");
        Box::new(soc)
    } else {
        let resolver = platform
            .regions
            .iter()
            .fold(MmioResolver::new(&platform.devmem), |r, (name, base, size)| {
                r.with_region(name.clone(), *base, *size)
            });
        debug!(device = %platform.devmem, windows = platform.regions.len(), "mapping hardware");
        Box::new(resolver)
    };

    DebugCc::start(topology, resolver.as_mut(), Some(reference))
}

fn cmd_check(platform: &Platform, topology: &TopologyConfig) -> Result<(), DebugCcError> {
    topology.validate()?;
    println!(
        "{}: {} muxes, {} placeholders, valid",
        topology.name,
        topology.muxes.len(),
        topology.placeholders.len()
    );

    let cc = start(platform, topology)?;
    let report = cc.report();
    for name in &report.bound {
        println!("  bound        {name}");
    }
    for name in &report.not_present {
        println!("  not present  {name}");
    }
    for (name, err) in &report.failed {
        println!("  failed       {name}: {err}");
    }
    for (name, err) in &report.rejected {
        println!("  rejected     {name}: {err}");
    }
    Ok(())
}

fn format_rate(hz: u64) -> String {
    match hz {
        0 => "0 Hz (not running)".to_string(),
        hz if hz >= 1_000_000 && hz % 1000 == 0 => format!("{hz} Hz ({:.3} MHz)", hz as f64 / 1e6),
        hz => format!("{hz} Hz"),
    }
}

fn parse_source(s: &str) -> Result<(String, u64), String> {
    let (name, hz) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=HZ, got {s:?}"))?;
    let hz = hz.parse().map_err(|e| format!("rate of {name}: {e}"))?;
    Ok((name.to_string(), hz))
}

fn parse_region(s: &str) -> Result<(String, u64, u64), String> {
    let (name, range) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=BASE:SIZE, got {s:?}"))?;
    let (base, size) = range
        .split_once(':')
        .ok_or_else(|| format!("expected BASE:SIZE for {name}, got {range:?}"))?;
    Ok((name.to_string(), parse_u64(base)?, parse_u64(size)?))
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("{s:?}: {e}"))
}
