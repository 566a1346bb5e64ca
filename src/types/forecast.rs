//! Production schedule input and forecast output

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DriveModel;
use crate::config::defaults::MAX_FORECAST_YEARS;
use crate::error::{EngineError, EngineResult};

/// User-specified production plan for a forecast run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionSchedule {
    /// Initial rate (STB/d for oil models, gas volume/d for the gas model)
    pub initial_rate: f64,
    /// Annual exponential decline (fraction per year); 0 = flat rate
    pub annual_decline: f64,
    pub duration_years: u32,
}

impl ProductionSchedule {
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.initial_rate.is_finite() && self.initial_rate > 0.0) {
            return Err(EngineError::InvalidScheduleParameter {
                parameter: "initial_rate",
                value: self.initial_rate,
                requirement: "a positive finite rate",
            });
        }
        if !(self.annual_decline.is_finite() && self.annual_decline >= 0.0) {
            return Err(EngineError::InvalidScheduleParameter {
                parameter: "annual_decline",
                value: self.annual_decline,
                requirement: "a finite fraction >= 0",
            });
        }
        if self.duration_years == 0 {
            return Err(EngineError::InvalidScheduleParameter {
                parameter: "duration_years",
                value: 0.0,
                requirement: "at least one year",
            });
        }
        if self.duration_years > MAX_FORECAST_YEARS {
            return Err(EngineError::InvalidScheduleParameter {
                parameter: "duration_years",
                value: f64::from(self.duration_years),
                requirement: "at most 200 years",
            });
        }
        Ok(())
    }
}

/// One forecast (or hindcast) time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Years since the start of the forecast (negative or zero for hindcast points)
    pub elapsed_years: f64,
    pub oil_rate: f64,
    pub cumulative_oil: f64,
    pub gas_rate: f64,
    pub cumulative_gas: f64,
    pub cumulative_water: f64,
    pub pressure: f64,
    pub goc_ft: f64,
    pub owc_ft: f64,
}

impl ForecastPoint {
    /// Gas-oil contact sits below the oil-water contact
    pub fn contacts_crossed(&self) -> bool {
        self.goc_ft > self.owc_ft
    }
}

/// A complete forecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRun {
    pub model: DriveModel,
    pub schedule: ProductionSchedule,
    pub points: Vec<ForecastPoint>,
}

/// Named snapshot a caller may persist; the engine never stores these
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub forecast: ForecastRun,
}
