//! Canonical input records supplied by the dataset normalizer
//!
//! All depths are in feet relative to the reservoir's reference datum, pressures
//! in psia, volumes in field units (STB, Mscf, rb).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DriveModel;
use crate::error::{EngineError, EngineResult};

/// Reservoir fluid system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluidType {
    Oil,
    Gas,
    Condensate,
}

impl std::fmt::Display for FluidType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FluidType::Oil => write!(f, "oil"),
            FluidType::Gas => write!(f, "gas"),
            FluidType::Condensate => write!(f, "condensate"),
        }
    }
}

/// Static tank properties for one analysis session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirMetadata {
    #[serde(default)]
    pub name: String,
    /// Drainage area (acres)
    pub area_acres: f64,
    /// Net pay thickness (ft)
    pub net_thickness_ft: f64,
    /// Porosity (fraction)
    pub porosity: f64,
    /// Initial water saturation (fraction)
    pub swi: f64,
    /// Formation (rock) compressibility (1/psi)
    pub cf: f64,
    /// Water compressibility (1/psi)
    pub cw: f64,
    /// Initial gas-oil contact depth (ft)
    pub goc0_ft: f64,
    /// Initial oil-water contact depth (ft)
    pub owc0_ft: f64,
    /// Reference datum depth (ft)
    #[serde(default)]
    pub datum_ft: f64,
    pub fluid: FluidType,
    /// Drive mechanism the geologist expects; breaks R² ties in classification
    #[serde(default)]
    pub drive_hint: Option<DriveModel>,
    /// Declared initial reservoir pressure (psia). Falls back to the first
    /// matched pressure measurement when absent.
    #[serde(default)]
    pub initial_pressure: Option<f64>,
    /// Gas-cap to oil-zone volume ratio, when known from logs
    #[serde(default)]
    pub gas_cap_ratio: Option<f64>,
    /// Water formation volume factor (rb/STB)
    #[serde(default)]
    pub bw: Option<f64>,
    /// Gas specific gravity (air = 1), for the z-factor correlation
    #[serde(default)]
    pub gas_gravity: Option<f64>,
    /// Reservoir temperature (°F), for the z-factor correlation
    #[serde(default)]
    pub temperature_f: Option<f64>,
}

impl ReservoirMetadata {
    /// Hydrocarbon pore volume per foot of contact travel (rb/ft)
    pub fn hydrocarbon_pore_volume_per_ft(&self) -> f64 {
        const SQFT_PER_ACRE: f64 = 43_560.0;
        const CUFT_PER_BBL: f64 = 5.615;
        self.area_acres * SQFT_PER_ACRE * self.porosity * (1.0 - self.swi) / CUFT_PER_BBL
    }

    /// Total distance the contacts can travel: the initial oil column, or the
    /// net thickness when no oil column is defined.
    pub fn contact_travel_range_ft(&self) -> f64 {
        let column = (self.owc0_ft - self.goc0_ft).abs();
        if column > 0.0 {
            column
        } else {
            self.net_thickness_ft
        }
    }

    /// Check the ranges the diagnostic and contact formulas divide by.
    pub fn validate(&self) -> EngineResult<()> {
        let mut problems = Vec::new();
        if !(0.0..1.0).contains(&self.swi) {
            problems.push(format!("swi = {} must be in [0, 1)", self.swi));
        }
        if !(self.porosity > 0.0 && self.porosity < 1.0) {
            problems.push(format!("porosity = {} must be in (0, 1)", self.porosity));
        }
        if self.area_acres <= 0.0 {
            problems.push(format!("area_acres = {} must be > 0", self.area_acres));
        }
        if self.net_thickness_ft <= 0.0 {
            problems.push(format!(
                "net_thickness_ft = {} must be > 0",
                self.net_thickness_ft
            ));
        }
        if self.cf < 0.0 || self.cw < 0.0 {
            problems.push("compressibilities cannot be negative".to_string());
        }
        if let Some(m) = self.gas_cap_ratio {
            if m < 0.0 {
                problems.push(format!("gas_cap_ratio = {m} cannot be negative"));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(EngineError::InvalidMetadata(problems.join("; ")))
        }
    }
}

/// Cumulative production at one reporting date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub date: NaiveDate,
    /// Cumulative oil (STB)
    pub np: f64,
    /// Cumulative gas (Mscf for gas reservoirs, scf otherwise)
    pub gp: f64,
    /// Cumulative water (STB)
    pub wp: f64,
    /// Water cut (fraction)
    #[serde(default)]
    pub wc: Option<f64>,
    /// Producing gas-oil ratio (scf/STB)
    #[serde(default)]
    pub rp: Option<f64>,
}

impl ProductionRecord {
    /// Producing GOR, falling back to the cumulative ratio Gp/Np
    pub fn gas_oil_ratio(&self) -> f64 {
        match self.rp {
            Some(rp) => rp,
            None if self.np > 0.0 => self.gp / self.np,
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureRecord {
    pub date: NaiveDate,
    /// Average reservoir pressure (psia)
    pub pr: f64,
    /// Flowing bottomhole pressure (psia)
    #[serde(default)]
    pub pwf: Option<f64>,
}

/// One row of the PVT table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvtRecord {
    pub pressure: f64,
    /// Oil FVF (rb/STB)
    pub bo: f64,
    /// Gas FVF (rb/scf)
    pub bg: f64,
    /// Solution GOR (scf/STB)
    pub rs: f64,
    #[serde(default)]
    pub mu_o: f64,
    #[serde(default)]
    pub mu_g: f64,
    /// Gas deviation factor, when the lab report carries one
    #[serde(default)]
    pub z: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactObservation {
    pub date: NaiveDate,
    pub goc_ft: f64,
    pub owc_ft: f64,
    #[serde(default)]
    pub method: String,
}

/// Everything one analysis session works from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirDataset {
    pub metadata: ReservoirMetadata,
    #[serde(default)]
    pub production: Vec<ProductionRecord>,
    #[serde(default)]
    pub pressure: Vec<PressureRecord>,
    #[serde(default)]
    pub pvt: Vec<PvtRecord>,
    #[serde(default)]
    pub contacts: Vec<ContactObservation>,
}

impl ReservoirDataset {
    /// Boundary check on what the normalizer hands over: date-ordered series,
    /// no duplicate dates, finite values. Does not reorder anything.
    pub fn validate(&self) -> EngineResult<()> {
        self.metadata.validate()?;

        let dates_ordered = |dates: &mut dyn Iterator<Item = NaiveDate>| {
            let v: Vec<NaiveDate> = dates.collect();
            v.windows(2).all(|w| w[0] < w[1])
        };
        if !dates_ordered(&mut self.production.iter().map(|r| r.date)) {
            return Err(EngineError::InvalidMetadata(
                "production records must be strictly ordered by date".to_string(),
            ));
        }
        if !dates_ordered(&mut self.pressure.iter().map(|r| r.date)) {
            return Err(EngineError::InvalidMetadata(
                "pressure records must be strictly ordered by date".to_string(),
            ));
        }
        if let Some(bad) = self
            .production
            .iter()
            .find(|r| ![r.np, r.gp, r.wp].iter().all(|v| v.is_finite() && *v >= 0.0))
        {
            return Err(EngineError::InvalidMetadata(format!(
                "production record {} has a negative or non-finite cumulative",
                bad.date
            )));
        }
        if let Some(bad) = self.pressure.iter().find(|r| !(r.pr.is_finite() && r.pr > 0.0)) {
            return Err(EngineError::InvalidMetadata(format!(
                "pressure record {} has reservoir pressure {}",
                bad.date, bad.pr
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn oil_metadata() -> ReservoirMetadata {
        ReservoirMetadata {
            name: "Test-Tank".to_string(),
            area_acres: 1000.0,
            net_thickness_ft: 50.0,
            porosity: 0.2,
            swi: 0.2,
            cf: 3e-6,
            cw: 3e-6,
            goc0_ft: 5000.0,
            owc0_ft: 5100.0,
            datum_ft: 5050.0,
            fluid: FluidType::Oil,
            drive_hint: None,
            initial_pressure: None,
            gas_cap_ratio: None,
            bw: None,
            gas_gravity: None,
            temperature_f: None,
        }
    }
}
