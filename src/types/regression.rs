//! Drive-mechanism models, their straight-line fits and the classifier output

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::FluidType;
use crate::error::EngineError;

/// Candidate drive mechanisms, declared in tie-break preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveModel {
    /// Volumetric depletion: F = N·Eo
    Volumetric,
    /// Gas-cap drive: F/Eo = N + m·N·Eg/Eo
    GasCap,
    /// Water drive: F = N·Efw + We
    Water,
    /// Solution-gas drive with all expansion terms: F = N·Et
    Solution,
    /// Volumetric dry gas: p/z = pi/zi·(1 − Gp/G)
    Gas,
}

impl DriveModel {
    pub const ALL: [DriveModel; 5] = [
        DriveModel::Volumetric,
        DriveModel::GasCap,
        DriveModel::Water,
        DriveModel::Solution,
        DriveModel::Gas,
    ];

    /// Models evaluated for a fluid system
    pub fn applicable_to(fluid: FluidType) -> &'static [DriveModel] {
        match fluid {
            FluidType::Oil => &Self::ALL[..4],
            FluidType::Gas => &Self::ALL[4..],
            FluidType::Condensate => &Self::ALL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriveModel::Volumetric => "volumetric",
            DriveModel::GasCap => "gascap",
            DriveModel::Water => "water",
            DriveModel::Solution => "solution",
            DriveModel::Gas => "gas",
        }
    }

    /// Axis labels (x, y) of the diagnostic plot
    pub fn axis_labels(&self) -> (&'static str, &'static str) {
        match self {
            DriveModel::Volumetric => ("Eo", "F"),
            DriveModel::GasCap => ("Eg/Eo", "F/Eo"),
            DriveModel::Water => ("Efw", "F"),
            DriveModel::Solution => ("Et", "F"),
            DriveModel::Gas => ("Gp", "p/z"),
        }
    }
}

impl std::fmt::Display for DriveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "volumetric" => Ok(DriveModel::Volumetric),
            "gascap" | "gas-cap" | "gas_cap" => Ok(DriveModel::GasCap),
            "water" => Ok(DriveModel::Water),
            "solution" => Ok(DriveModel::Solution),
            "gas" => Ok(DriveModel::Gas),
            other => Err(format!(
                "unknown drive model '{other}' (expected volumetric, gascap, water, solution or gas)"
            )),
        }
    }
}

/// Physical parameters recovered from a fit. Only the ones the model defines
/// are populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveParameters {
    /// Original oil in place (STB)
    pub n: Option<f64>,
    /// Gas-cap ratio
    pub m: Option<f64>,
    /// Original gas in place (same volume unit as Gp)
    pub g: Option<f64>,
    /// Pot-aquifer constant (rb/psi)
    pub u: Option<f64>,
    /// Constant water-influx term read from the water-drive intercept (rb)
    pub we: Option<f64>,
}

/// Straight-line fit of one drive model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub model: DriveModel,
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, always within [0, 1]
    pub r_squared: f64,
    pub rmse: f64,
    pub point_count: usize,
    /// Standard error of the slope (needs ≥ 3 points)
    pub slope_std_error: Option<f64>,
    /// Two-sided p-value for slope ≠ 0 (needs ≥ 3 points)
    pub slope_p_value: Option<f64>,
    pub parameters: DriveParameters,
}

impl RegressionResult {
    /// Trend line value at `x`, for overlaying on the diagnostic plot
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Outcome of fitting every applicable model: failures are kept next to the
/// successes so the caller can show why a model is missing.
#[derive(Debug, Clone, Default)]
pub struct ModelFits {
    pub results: BTreeMap<DriveModel, Result<RegressionResult, EngineError>>,
}

impl ModelFits {
    pub fn get(&self, model: DriveModel) -> Option<&RegressionResult> {
        self.results.get(&model).and_then(|r| r.as_ref().ok())
    }

    /// Successful fits, in preference order
    pub fn successful(&self) -> impl Iterator<Item = &RegressionResult> {
        self.results.values().filter_map(|r| r.as_ref().ok())
    }
}

/// Classifier decision consumed by the forecast engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveClassification {
    /// Best-supported model on R², if any model could be fitted
    pub recommended: Option<DriveModel>,
    /// Model used downstream: the user's choice when given, else the recommendation
    pub active: DriveModel,
    pub user_override: bool,
    /// Successful fits ordered best first
    pub ranking: Vec<(DriveModel, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applicable_models_by_fluid() {
        assert_eq!(DriveModel::applicable_to(FluidType::Gas), &[DriveModel::Gas]);
        let oil = DriveModel::applicable_to(FluidType::Oil);
        assert_eq!(oil.len(), 4);
        assert!(!oil.contains(&DriveModel::Gas));
        assert_eq!(DriveModel::applicable_to(FluidType::Condensate).len(), 5);
    }

    #[test]
    fn test_declaration_order_is_preference_order() {
        let mut sorted = DriveModel::ALL;
        sorted.sort();
        assert_eq!(sorted, DriveModel::ALL);
        assert!(DriveModel::Volumetric < DriveModel::GasCap);
        assert!(DriveModel::Solution < DriveModel::Gas);
    }

    #[test]
    fn test_parse_and_display_round_trip() {
        for model in DriveModel::ALL {
            assert_eq!(model.as_str().parse::<DriveModel>(), Ok(model));
        }
        assert_eq!("Gas-Cap".parse::<DriveModel>(), Ok(DriveModel::GasCap));
        assert!("aquifer".parse::<DriveModel>().is_err());
    }
}
