//! Engine-wide default constants.
//!
//! Every tunable in `EngineConfig` takes its default from here, grouped by
//! the stage that reads it.

// ============================================================================
// PVT
// ============================================================================

/// Water formation volume factor used when the metadata does not declare one (rb/STB).
pub const DEFAULT_BW: f64 = 1.0;

// ============================================================================
// Diagnostics
// ============================================================================

/// |Eo| below this is treated as zero for the Eg/Eo and F/Eo ratios.
pub const RATIO_EPSILON: f64 = 1e-9;

/// Fewest diagnostic points a regression can run on.
pub const MIN_DIAGNOSTIC_POINTS: usize = 2;

// ============================================================================
// Regression
// ============================================================================

/// R² values closer than this are considered tied by the classifier.
pub const R2_TIE_TOLERANCE: f64 = 1e-9;

// ============================================================================
// Forecast
// ============================================================================

/// Monthly forecast steps.
pub const STEPS_PER_YEAR: u32 = 12;

/// Days per year for rate × time integration and step dating.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Longest production schedule a forecast accepts (years).
pub const MAX_FORECAST_YEARS: u32 = 200;

/// Iteration cap for the pressure root-find.
pub const MAX_SOLVER_ITERATIONS: u32 = 200;

/// Pressure tolerance for the root-find (psi).
pub const PRESSURE_TOLERANCE_PSI: f64 = 1e-4;

/// Central-difference step for Newton's derivative estimate (psi).
pub const NEWTON_DERIVATIVE_STEP_PSI: f64 = 0.5;

// ============================================================================
// Contact Consistency
// ============================================================================

/// Deviation above this fraction of contact travel raises a warning.
pub const CONSISTENCY_WARNING_FRACTION: f64 = 0.05;

/// Deviation above this fraction of contact travel raises an error.
pub const CONSISTENCY_ERROR_FRACTION: f64 = 0.15;

/// Score weight of a warning-class deviation.
pub const CONSISTENCY_WARNING_WEIGHT: f64 = 0.5;

/// Score weight of an error-class deviation.
pub const CONSISTENCY_ERROR_WEIGHT: f64 = 1.0;
