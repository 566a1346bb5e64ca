//! MBAL - reservoir material-balance analysis
//!
//! Loads a reservoir dataset (JSON), runs diagnostics, drive-model fits and
//! classification, an optional production forecast and the contact
//! consistency check, then prints a summary or a JSON report.
//!
//! # Usage
//!
//! ```bash
//! # Analysis only
//! mbal reservoir.json
//!
//! # Ten-year forecast at 1500 STB/d declining 12%/yr, forcing the water-drive model
//! mbal reservoir.json --rate 1500 --decline 0.12 --years 10 --model water
//!
//! # Machine-readable report
//! mbal reservoir.json --rate 1500 --json > report.json
//! ```
//!
//! # Environment Variables
//!
//! - `MBAL_CONFIG`: Path to an engine config TOML (default: ./mbal_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use mbal_engine::{
    AnalysisSession, ConsistencyResult, DiagnosticPoint, DriveClassification, DriveModel, EngineConfig,
    ForecastRun, ProductionSchedule, RegressionResult, ReservoirDataset,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "mbal")]
#[command(about = "Reservoir material-balance diagnostics, regression and forecasting")]
#[command(version)]
struct CliArgs {
    /// Reservoir dataset (JSON: metadata, production, pressure, pvt, contacts)
    dataset: PathBuf,

    /// Engine config TOML (overrides MBAL_CONFIG and ./mbal_config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force the active drive model instead of the recommendation
    #[arg(short, long)]
    model: Option<DriveModel>,

    /// Initial forecast rate (STB/d, or gas volume/d for the gas model); omit to skip the forecast
    #[arg(long)]
    rate: Option<f64>,

    /// Annual exponential decline fraction
    #[arg(long, default_value = "0.1")]
    decline: f64,

    /// Forecast duration in years
    #[arg(long, default_value = "10")]
    years: u32,

    /// Print the full report as JSON instead of a text summary
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "MBAL_LOG_JSON")]
    log_json: bool,
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Serialize)]
struct Report {
    reservoir: String,
    diagnostics: Vec<DiagnosticPoint>,
    /// Per model: the fit, or why it could not be fitted
    fits: BTreeMap<DriveModel, FitOutcome>,
    classification: Option<DriveClassification>,
    forecast: Option<ForecastRun>,
    consistency: ConsistencyResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum FitOutcome {
    Fitted(RegressionResult),
    Failed(String),
}

fn load_dataset(path: &Path) -> Result<ReservoirDataset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let dataset: ReservoirDataset = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid dataset JSON in {}", path.display()))?;
    dataset
        .validate()
        .with_context(|| format!("Dataset {} failed validation", path.display()))?;
    Ok(dataset)
}

fn run(args: &CliArgs) -> Result<Report> {
    let config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::load(),
    };
    let dataset = load_dataset(&args.dataset)?;
    let reservoir = dataset.metadata.name.clone();
    info!(
        "Reservoir: {} | Fluid: {} | {} production, {} pressure, {} PVT, {} contact records",
        reservoir,
        dataset.metadata.fluid,
        dataset.production.len(),
        dataset.pressure.len(),
        dataset.pvt.len(),
        dataset.contacts.len()
    );

    let mut session = AnalysisSession::new(dataset, config);

    let diagnostics = session
        .diagnostics()
        .context("Diagnostic variables could not be computed")?
        .to_vec();

    let fits = session
        .fit_models()?
        .results
        .iter()
        .map(|(model, result)| {
            let outcome = match result {
                Ok(fit) => FitOutcome::Fitted(fit.clone()),
                Err(e) => FitOutcome::Failed(e.to_string()),
            };
            (*model, outcome)
        })
        .collect();

    let classification = match session.classify(args.model) {
        Ok(c) => Some(c),
        Err(e) => {
            warn!(error = %e, "Drive mechanism could not be classified");
            None
        }
    };

    let forecast = match args.rate {
        Some(rate) => {
            let schedule = ProductionSchedule {
                initial_rate: rate,
                annual_decline: args.decline,
                duration_years: args.years,
            };
            let run = session
                .run_forecast(&schedule, args.model)
                .context("Forecast failed")?;
            Some(run.clone())
        }
        None => None,
    };

    let consistency = session.run_consistency_check().clone();

    Ok(Report {
        reservoir,
        diagnostics,
        fits,
        classification,
        forecast,
        consistency,
    })
}

// ============================================================================
// Text Summary
// ============================================================================

fn print_summary(report: &Report) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Material Balance: {}", report.reservoir);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Diagnostic points: {}", report.diagnostics.len());
    println!();
    println!("{:<12} {:>10} {:>16} {:>16}  Parameters", "Model", "R²", "Slope", "Intercept");
    for (model, outcome) in &report.fits {
        match outcome {
            FitOutcome::Fitted(fit) => {
                let p = &fit.parameters;
                let mut params = Vec::new();
                if let Some(n) = p.n {
                    params.push(format!("N={:.3e}", n));
                }
                if let Some(m) = p.m {
                    params.push(format!("m={:.3}", m));
                }
                if let Some(g) = p.g {
                    params.push(format!("G={:.3e}", g));
                }
                if let Some(u) = p.u {
                    params.push(format!("U={:.1}", u));
                }
                println!(
                    "{:<12} {:>10.4} {:>16.4e} {:>16.4e}  {}",
                    model.as_str(),
                    fit.r_squared,
                    fit.slope,
                    fit.intercept,
                    params.join(" ")
                );
            }
            FitOutcome::Failed(reason) => println!("{:<12} {:>10}  {}", model.as_str(), "-", reason),
        }
    }
    println!();

    match &report.classification {
        Some(c) => {
            let recommended = c.recommended.map_or("none", |m| m.as_str());
            println!(
                "Drive mechanism: {}{} (recommended: {})",
                c.active,
                if c.user_override { " [override]" } else { "" },
                recommended
            );
        }
        None => println!("Drive mechanism: unclassified"),
    }

    if let Some(forecast) = &report.forecast {
        println!();
        println!(
            "Forecast ({}, {:.0}/d, {:.1}%/yr, {} yr):",
            forecast.model,
            forecast.schedule.initial_rate,
            forecast.schedule.annual_decline * 100.0,
            forecast.schedule.duration_years
        );
        println!(
            "{:<12} {:>10} {:>14} {:>10} {:>9} {:>9}",
            "Date", "Rate", "Cumulative", "P (psi)", "GOC", "OWC"
        );
        // Yearly rows
        let per_year = (forecast.points.len() / forecast.schedule.duration_years.max(1) as usize).max(1);
        for p in forecast.points.iter().skip(per_year - 1).step_by(per_year) {
            let (rate, cumulative) = if forecast.model == DriveModel::Gas {
                (p.gas_rate, p.cumulative_gas)
            } else {
                (p.oil_rate, p.cumulative_oil)
            };
            println!(
                "{:<12} {:>10.1} {:>14.4e} {:>10.1} {:>9.1} {:>9.1}{}",
                p.date.to_string(),
                rate,
                cumulative,
                p.pressure,
                p.goc_ft,
                p.owc_ft,
                if p.contacts_crossed() { "  CROSSED" } else { "" }
            );
        }
    }

    println!();
    println!("Contact consistency score: {}/100", report.consistency.score);
    for issue in &report.consistency.issues {
        println!("  [{}] {} {}", issue.severity, issue.date, issue.message);
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let report = run(&args)?;

    if args.json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{out}");
    } else {
        print_summary(&report);
    }

    Ok(())
}
