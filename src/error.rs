//! Engine error taxonomy
//!
//! Every stage fails fast with the offending input attached. Nothing here is
//! retried: all engine operations are deterministic.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::DriveModel;

/// Errors raised by the diagnostics, regression, forecast and scoring stages
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Pressure {pressure:.2} psi{} is outside the PVT table range ({min:.2}-{max:.2} psi)", at_date(.date))]
    InsufficientPvtRange {
        pressure: f64,
        min: f64,
        max: f64,
        date: Option<NaiveDate>,
    },

    #[error("Not enough diagnostic points to fit a model: have {usable}, need at least 2")]
    EmptyDiagnosticSet { usable: usize },

    #[error("Degenerate {model} regression: {reason}")]
    DegenerateRegression { model: DriveModel, reason: String },

    #[error("Pressure solve did not converge at {step_date} after {iterations} iterations: {detail}")]
    ForecastPressureNonConvergent {
        step_date: NaiveDate,
        iterations: u32,
        detail: String,
    },

    #[error("Invalid schedule parameter {parameter} = {value}: must be {requirement}")]
    InvalidScheduleParameter {
        parameter: &'static str,
        value: f64,
        requirement: &'static str,
    },

    #[error("Invalid PVT table: {0}")]
    InvalidPvtTable(String),

    #[error("Invalid reservoir metadata: {0}")]
    InvalidMetadata(String),

    #[error("No drive model could be fitted for a {fluid} reservoir")]
    NoApplicableModel { fluid: String },

    #[error("No regression result available for the {0} model")]
    MissingRegression(DriveModel),
}

fn at_date(date: &Option<NaiveDate>) -> String {
    date.map(|d| format!(" at {d}")).unwrap_or_default()
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pvt_range_message_names_the_date() {
        let err = EngineError::InsufficientPvtRange {
            pressure: 1500.0,
            min: 2000.0,
            max: 4000.0,
            date: NaiveDate::from_ymd_opt(2021, 3, 1),
        };
        let msg = err.to_string();
        assert!(msg.contains("1500.00 psi at 2021-03-01"), "{msg}");
        assert!(msg.contains("2000.00-4000.00"));
    }

    #[test]
    fn degenerate_message_names_the_model() {
        let err = EngineError::DegenerateRegression {
            model: DriveModel::GasCap,
            reason: "zero variance in Eg/Eo".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Degenerate gascap regression: zero variance in Eg/Eo"
        );
    }
}
