//! Synthetic Reservoir Generator
//!
//! Emits a volumetric-depletion dataset as JSON for demos and testing of the
//! `mbal` analysis. The clean history satisfies F = N·Eo exactly; pressure and
//! contact noise can be layered on top.
//!
//! # Usage
//! ```bash
//! ./synthetic-reservoir --ooip 40e6 --surveys 10 --noise 0.01 --seed 7 > tank.json
//! ./mbal tank.json --rate 2000 --decline 0.08
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};

use mbal_engine::synthetic::SyntheticReservoir;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "synthetic-reservoir")]
#[command(about = "Synthetic material-balance dataset generator")]
#[command(version = "1.0")]
struct Args {
    /// Reservoir name
    #[arg(long, default_value = "Synthetic-1")]
    name: String,

    /// Original oil in place (STB)
    #[arg(long, default_value = "50e6")]
    ooip: f64,

    /// Initial reservoir pressure (psia)
    #[arg(long, default_value = "4000")]
    initial_pressure: f64,

    /// Pressure at the last survey (psia)
    #[arg(long, default_value = "2000")]
    final_pressure: f64,

    /// Number of yearly pressure surveys
    #[arg(short, long, default_value = "8", value_parser = clap::value_parser!(u32).range(2..=200))]
    surveys: u32,

    /// Year of the first survey
    #[arg(long, default_value = "2015")]
    start_year: i32,

    /// Producing gas-oil ratio (scf/STB)
    #[arg(long, default_value = "800")]
    gor: f64,

    /// Relative standard deviation of surveyed pressures (0.01 = 1%)
    #[arg(short, long, default_value = "0")]
    noise: f64,

    /// Standard deviation of measured contact depths (ft)
    #[arg(long, default_value = "0")]
    contact_noise: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress the generation log on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn log_mission(msg: &str, quiet: bool) {
    if !quiet {
        eprintln!("[synthetic] {}", msg);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let generator = SyntheticReservoir {
        name: args.name.clone(),
        ooip: args.ooip,
        initial_pressure: args.initial_pressure,
        final_pressure: args.final_pressure,
        surveys: args.surveys as usize,
        start_year: args.start_year,
        producing_gor: args.gor,
        pressure_noise: args.noise,
        contact_noise_ft: args.contact_noise,
        seed: args.seed,
    };

    log_mission(&"=".repeat(60), args.quiet);
    log_mission(&format!("Reservoir: {}", generator.name), args.quiet);
    log_mission(&format!("  OOIP: {:.3e} STB", generator.ooip), args.quiet);
    log_mission(
        &format!(
            "  Pressure: {:.0} -> {:.0} psia over {} surveys",
            generator.initial_pressure, generator.final_pressure, generator.surveys
        ),
        args.quiet,
    );
    log_mission(
        &format!(
            "  Noise: {:.2}% pressure, {:.1} ft contacts",
            generator.pressure_noise * 100.0,
            generator.contact_noise_ft
        ),
        args.quiet,
    );
    if let Some(seed) = args.seed {
        log_mission(&format!("  Random seed: {}", seed), args.quiet);
    }
    log_mission(&"=".repeat(60), args.quiet);

    let dataset = generator.generate().context("Failed to generate dataset")?;
    let json = serde_json::to_string_pretty(&dataset).context("Failed to serialize dataset")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json)?;

    log_mission(
        &format!(
            "Wrote {} production, {} pressure, {} PVT and {} contact records",
            dataset.production.len(),
            dataset.pressure.len(),
            dataset.pvt.len(),
            dataset.contacts.len()
        ),
        args.quiet,
    );
    Ok(())
}
