//! Derived material-balance variables, one point per matched reporting date

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Havlena-Odeh terms at one date.
///
/// `eg_over_eo` and `f_over_eo` are `None` when Eo is too close to zero to
/// divide by; such a point is still usable by models that plot F against an
/// expansion term directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticPoint {
    pub date: NaiveDate,
    /// Reservoir pressure (psia)
    pub pressure: f64,
    /// Underground withdrawal (rb)
    pub f: f64,
    /// Oil and dissolved-gas expansion (rb/STB)
    pub eo: f64,
    /// Gas-cap expansion (rb/STB)
    pub eg: f64,
    /// Connate water and rock expansion (rb/STB)
    pub efw: f64,
    /// Eo + Eg + Efw
    pub et: f64,
    pub eg_over_eo: Option<f64>,
    pub f_over_eo: Option<f64>,
    pub np: f64,
    pub gp: f64,
    pub wp: f64,
    /// Pressure drop from initial (psi)
    pub delta_p: f64,
    /// p/z, gas reservoirs only
    pub p_over_z: Option<f64>,
}

impl DiagnosticPoint {
    /// Whether the ratio-based (gas-cap) plot can use this point
    pub fn has_ratios(&self) -> bool {
        self.eg_over_eo.is_some() && self.f_over_eo.is_some()
    }
}
