//! asc-probe - run the ASC probe battery and print what the chip did
//!
//! Usage:
//! - `asc-probe` - probe a simulated Mac II class ASC
//! - `asc-probe --chip sonora` - probe a Sonora-class chip
//! - `asc-probe --config probe.toml` - override battery tunables
//!
//! The report is always printed and the exit status is always zero: a
//! probe that could not run is itself a finding.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use asc_prober::{ProbeConfig, Report, Runner};
use asc_sim::{ChipProfile, SimMachine};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{error, info, warn};

#[derive(Parser)]
#[command(name = "asc-probe")]
#[command(version)]
#[command(about = "Behavioral probe for the Apple Sound Chip and its VIA2 interrupt path", long_about = None)]
struct Cli {
    /// Chip profile to probe
    #[arg(short, long, value_enum, default_value_t = Chip::Classic)]
    chip: Chip,

    /// TOML file with battery tunables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exit without waiting for Enter
    #[arg(long)]
    no_wait: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Chip {
    /// Discrete ASC with a real VIA2 (Mac II class)
    Classic,
    /// Sonora-class integrated ASC with the interrupt gate
    Sonora,
    /// V8-class integrated ASC, mono only
    V8,
}

impl Chip {
    fn name(self) -> &'static str {
        match self {
            Chip::Classic => "classic",
            Chip::Sonora => "sonora",
            Chip::V8 => "v8",
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let runner = build_runner(cli.config.as_deref());
    let mut machine = match build_machine(cli.chip) {
        Ok(machine) => machine,
        Err(e) => {
            error!("{:#}", e);
            return;
        }
    };

    println!("{}", "ASC Prober".bold().cyan());
    println!(
        "{} probing {} ({} bus accesses so far)",
        "▶".green(),
        machine.profile().name.bold(),
        machine.stats().bus_accesses
    );
    println!();

    let report = runner.run(&mut machine);
    print_report(&report, &machine);

    if !cli.no_wait {
        wait_for_enter();
    }
}

/// Load tunables, falling back to the calibrated defaults on any problem
fn build_runner(path: Option<&Path>) -> Runner {
    let config = match path.map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            warn!("{:#}; using default tunables", e);
            ProbeConfig::default()
        }
    };

    match Runner::new(config) {
        Ok(runner) => runner,
        Err(e) => {
            warn!("Invalid tunables ({}); using defaults", e);
            Runner::default()
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<ProbeConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    info!("Loaded tunables from {}", path.display());
    Ok(config)
}

fn build_machine(chip: Chip) -> anyhow::Result<SimMachine> {
    let profile = ChipProfile::by_name(chip.name())
        .ok_or_else(|| anyhow!("No profile named '{}'", chip.name()))?;
    SimMachine::new(profile).map_err(|e| anyhow!("Failed to build {} machine: {}", chip.name(), e))
}

fn print_report(report: &Report, machine: &SimMachine) {
    print!("{}", report);

    let stats = machine.stats();
    println!();
    println!("{}", "Simulator".bold());
    println!("  bus accesses      {}", stats.bus_accesses);
    println!("  deliveries        {}", stats.deliveries);
    println!("  longest storm     {}", stats.longest_storm);

    let snapshot = machine.register_snapshot();
    if snapshot.masked || snapshot.handler_installed {
        println!("{} machine left with interrupts masked or a probe handler installed", "✗".red());
    } else {
        println!("{} machine state restored", "✓".green());
    }
}

fn wait_for_enter() {
    print!("\nPress Enter to exit...");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}
