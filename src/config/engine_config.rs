//! Engine Configuration - numerical tolerances and QC thresholds as TOML values
//!
//! Each section implements `Default` from `config::defaults`, so an absent
//! file or an absent key behaves exactly like the built-in engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MBAL_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "mbal_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the material-balance engine.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$MBAL_CONFIG` env var
/// 2. `./mbal_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pvt: PvtConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub regression: RegressionConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub consistency: ConsistencyConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$MBAL_CONFIG` environment variable
    /// 2. `./mbal_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found — using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate tolerances and thresholds for internal consistency.
    ///
    /// Rules:
    /// - Error thresholds must be >= warning thresholds
    /// - Tolerances and step counts must be positive
    /// - Every value must be finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let c = &self.consistency;
        Self::check_escalation(
            c.warning_fraction,
            c.error_fraction,
            "consistency.fraction",
            &mut errors,
        );
        Self::check_escalation(
            c.warning_weight,
            c.error_weight,
            "consistency.weight",
            &mut errors,
        );

        if self.diagnostics.min_points < defaults::MIN_DIAGNOSTIC_POINTS {
            errors.push(format!(
                "diagnostics.min_points ({}) must be >= {} (a line needs two points)",
                self.diagnostics.min_points,
                defaults::MIN_DIAGNOSTIC_POINTS
            ));
        }

        let f = &self.forecast;
        if f.steps_per_year == 0 {
            errors.push("forecast.steps_per_year must be > 0".to_string());
        }
        if f.max_iterations == 0 {
            errors.push("forecast.max_iterations must be > 0".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_escalation(warning: f64, error: f64, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass — catch them explicitly
        if !warning.is_finite() || !error.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got warning={warning}, error={error})"
            ));
            return;
        }
        if error < warning {
            errors.push(format!(
                "{name}: error ({error:.3}) must be >= warning ({warning:.3})"
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// PVT table handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvtConfig {
    /// Extend the end segments of the table linearly instead of failing
    #[serde(default)]
    pub allow_extrapolation: bool,

    /// Bw used when the metadata has none (rb/STB)
    #[serde(default = "default_bw")]
    pub default_bw: f64,
}

fn default_bw() -> f64 {
    defaults::DEFAULT_BW
}

impl Default for PvtConfig {
    fn default() -> Self {
        Self {
            allow_extrapolation: false,
            default_bw: defaults::DEFAULT_BW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_ratio_epsilon")]
    pub ratio_epsilon: f64,

    #[serde(default = "default_min_points")]
    pub min_points: usize,
}

fn default_ratio_epsilon() -> f64 {
    defaults::RATIO_EPSILON
}
fn default_min_points() -> usize {
    defaults::MIN_DIAGNOSTIC_POINTS
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            ratio_epsilon: defaults::RATIO_EPSILON,
            min_points: defaults::MIN_DIAGNOSTIC_POINTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionConfig {
    #[serde(default = "default_r2_tie_tolerance")]
    pub r2_tie_tolerance: f64,
}

fn default_r2_tie_tolerance() -> f64 {
    defaults::R2_TIE_TOLERANCE
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            r2_tie_tolerance: defaults::R2_TIE_TOLERANCE,
        }
    }
}

/// Root-finder used for the material-balance pressure inversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Bisection,
    Newton,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_steps_per_year")]
    pub steps_per_year: u32,

    #[serde(default = "default_days_per_year")]
    pub days_per_year: f64,

    #[serde(default)]
    pub solver: SolverKind,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_pressure_tolerance")]
    pub pressure_tolerance_psi: f64,
}

fn default_steps_per_year() -> u32 {
    defaults::STEPS_PER_YEAR
}
fn default_days_per_year() -> f64 {
    defaults::DAYS_PER_YEAR
}
fn default_max_iterations() -> u32 {
    defaults::MAX_SOLVER_ITERATIONS
}
fn default_pressure_tolerance() -> f64 {
    defaults::PRESSURE_TOLERANCE_PSI
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            steps_per_year: defaults::STEPS_PER_YEAR,
            days_per_year: defaults::DAYS_PER_YEAR,
            solver: SolverKind::default(),
            max_iterations: defaults::MAX_SOLVER_ITERATIONS,
            pressure_tolerance_psi: defaults::PRESSURE_TOLERANCE_PSI,
        }
    }
}

/// Contact QC thresholds, as fractions of the total contact travel range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    #[serde(default = "default_warning_fraction")]
    pub warning_fraction: f64,

    #[serde(default = "default_error_fraction")]
    pub error_fraction: f64,

    #[serde(default = "default_warning_weight")]
    pub warning_weight: f64,

    #[serde(default = "default_error_weight")]
    pub error_weight: f64,
}

fn default_warning_fraction() -> f64 {
    defaults::CONSISTENCY_WARNING_FRACTION
}
fn default_error_fraction() -> f64 {
    defaults::CONSISTENCY_ERROR_FRACTION
}
fn default_warning_weight() -> f64 {
    defaults::CONSISTENCY_WARNING_WEIGHT
}
fn default_error_weight() -> f64 {
    defaults::CONSISTENCY_ERROR_WEIGHT
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            warning_fraction: defaults::CONSISTENCY_WARNING_FRACTION,
            error_fraction: defaults::CONSISTENCY_ERROR_FRACTION,
            warning_weight: defaults::CONSISTENCY_WARNING_WEIGHT,
            error_weight: defaults::CONSISTENCY_ERROR_WEIGHT,
        }
    }
}
