//! PVT table lookup and gas deviation factor
//!
//! Properties are interpolated linearly in pressure. Outside the measured
//! range the table either fails with `InsufficientPvtRange` or, when
//! extrapolation is enabled, extends its end segments.

use chrono::NaiveDate;

use crate::error::{EngineError, EngineResult};
use crate::types::{PvtRecord, ReservoirMetadata};

/// Interpolated fluid properties at one pressure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvtProperties {
    pub bo: f64,
    pub bg: f64,
    pub rs: f64,
    pub z: Option<f64>,
}

/// PVT table normalised to ascending pressure
#[derive(Debug, Clone)]
pub struct PvtTable {
    records: Vec<PvtRecord>,
    allow_extrapolation: bool,
}

impl PvtTable {
    /// Build from records ordered by pressure, in either direction.
    ///
    /// Rejects tables with fewer than two rows, repeated or non-monotonic
    /// pressures, and non-positive formation volume factors.
    pub fn new(records: &[PvtRecord], allow_extrapolation: bool) -> EngineResult<Self> {
        if records.len() < 2 {
            return Err(EngineError::InvalidPvtTable(format!(
                "need at least 2 records, have {}",
                records.len()
            )));
        }

        let ascending = records.windows(2).all(|w| w[0].pressure < w[1].pressure);
        let descending = records.windows(2).all(|w| w[0].pressure > w[1].pressure);
        if !ascending && !descending {
            return Err(EngineError::InvalidPvtTable(
                "pressures must be strictly monotonic".to_string(),
            ));
        }

        if let Some(bad) = records
            .iter()
            .find(|r| !(r.pressure.is_finite() && r.bo > 0.0 && r.bg > 0.0 && r.rs >= 0.0))
        {
            return Err(EngineError::InvalidPvtTable(format!(
                "record at {:.1} psi has non-physical Bo/Bg/Rs",
                bad.pressure
            )));
        }

        let mut records = records.to_vec();
        if descending {
            records.reverse();
        }

        Ok(Self {
            records,
            allow_extrapolation,
        })
    }

    /// (lowest, highest) tabulated pressure
    pub fn pressure_range(&self) -> (f64, f64) {
        (
            self.records[0].pressure,
            self.records[self.records.len() - 1].pressure,
        )
    }

    pub fn covers(&self, pressure: f64) -> bool {
        let (lo, hi) = self.pressure_range();
        (lo..=hi).contains(&pressure)
    }

    /// Whether every row carries a z-factor
    pub fn has_z_column(&self) -> bool {
        self.records.iter().all(|r| r.z.is_some())
    }

    /// Row nearest to `pressure`; ties go to the higher-pressure row.
    pub fn nearest(&self, pressure: f64) -> &PvtRecord {
        let idx = self.records.partition_point(|r| r.pressure < pressure);
        if idx == 0 {
            return &self.records[0];
        }
        if idx == self.records.len() {
            return &self.records[idx - 1];
        }
        let below = &self.records[idx - 1];
        let above = &self.records[idx];
        if pressure - below.pressure < above.pressure - pressure {
            below
        } else {
            above
        }
    }

    /// Linear interpolation at `pressure`. `date` only decorates the error.
    pub fn interpolate(&self, pressure: f64, date: Option<NaiveDate>) -> EngineResult<PvtProperties> {
        let (lo, hi) = self.pressure_range();
        if !pressure.is_finite() || (!self.allow_extrapolation && !self.covers(pressure)) {
            return Err(EngineError::InsufficientPvtRange {
                pressure,
                min: lo,
                max: hi,
                date,
            });
        }

        // Segment index: clamped so end segments extend when extrapolating
        let n = self.records.len();
        let idx = self
            .records
            .partition_point(|r| r.pressure < pressure)
            .clamp(1, n - 1);
        let a = &self.records[idx - 1];
        let b = &self.records[idx];
        let t = (pressure - a.pressure) / (b.pressure - a.pressure);
        let lerp = |x: f64, y: f64| x + t * (y - x);

        Ok(PvtProperties {
            bo: lerp(a.bo, b.bo),
            bg: lerp(a.bg, b.bg),
            rs: lerp(a.rs, b.rs),
            z: match (a.z, b.z) {
                (Some(za), Some(zb)) => Some(lerp(za, zb)),
                _ => None,
            },
        })
    }
}

// ============================================================================
// Gas Deviation Factor
// ============================================================================

/// Where z(P) comes from for a gas reservoir
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZFactorSource {
    /// Interpolated from the PVT z column
    Table,
    /// Papay correlation on Sutton pseudo-critical properties
    Correlation {
        ppc_psia: f64,
        tpr: f64,
    },
}

impl ZFactorSource {
    /// Prefer the lab z column; fall back to the correlation when gas gravity
    /// and temperature are declared.
    pub fn resolve(table: &PvtTable, metadata: &ReservoirMetadata) -> EngineResult<Self> {
        if table.has_z_column() {
            return Ok(ZFactorSource::Table);
        }
        match (metadata.gas_gravity, metadata.temperature_f) {
            (Some(gravity), Some(temp_f)) if gravity > 0.0 => {
                let (ppc_psia, tpc_rankine) = sutton_pseudo_critical(gravity);
                Ok(ZFactorSource::Correlation {
                    ppc_psia,
                    tpr: (temp_f + 459.67) / tpc_rankine,
                })
            }
            _ => Err(EngineError::InvalidMetadata(
                "gas reservoir needs a PVT z column or gas_gravity and temperature_f".to_string(),
            )),
        }
    }

    pub fn z(&self, table: &PvtTable, pressure: f64, date: Option<NaiveDate>) -> EngineResult<f64> {
        match *self {
            ZFactorSource::Table => {
                let props = table.interpolate(pressure, date)?;
                props.z.ok_or_else(|| {
                    EngineError::InvalidPvtTable("z column is incomplete".to_string())
                })
            }
            ZFactorSource::Correlation { ppc_psia, tpr } => Ok(papay_z(pressure / ppc_psia, tpr)),
        }
    }

    /// p/z at `pressure`
    pub fn p_over_z(&self, table: &PvtTable, pressure: f64, date: Option<NaiveDate>) -> EngineResult<f64> {
        let z = self.z(table, pressure, date)?;
        if z <= 0.0 {
            return Err(EngineError::InvalidPvtTable(format!(
                "non-positive z-factor {z:.4} at {pressure:.1} psi"
            )));
        }
        Ok(pressure / z)
    }
}

/// Sutton (1985) pseudo-critical pressure (psia) and temperature (°R) from gas gravity
pub fn sutton_pseudo_critical(gravity: f64) -> (f64, f64) {
    let ppc = 756.8 - 131.07 * gravity - 3.6 * gravity * gravity;
    let tpc = 169.2 + 349.5 * gravity - 74.0 * gravity * gravity;
    (ppc, tpc)
}

/// Papay (1968) explicit z-factor
///
/// z = 1 − 3.52·Ppr / 10^(0.9813·Tpr) + 0.274·Ppr² / 10^(0.8157·Tpr)
pub fn papay_z(ppr: f64, tpr: f64) -> f64 {
    1.0 - 3.52 * ppr / 10f64.powf(0.9813 * tpr) + 0.274 * ppr * ppr / 10f64.powf(0.8157 * tpr)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Undersaturated-to-saturated black oil, 1000-4000 psi, bubble point at 4000.
    pub fn black_oil_records() -> Vec<PvtRecord> {
        [
            (1000.0, 1.10, 0.0030, 250.0),
            (2000.0, 1.15, 0.0015, 350.0),
            (3000.0, 1.18, 0.0010, 430.0),
            (4000.0, 1.20, 0.0008, 500.0),
        ]
        .iter()
        .map(|&(pressure, bo, bg, rs)| PvtRecord {
            pressure,
            bo,
            bg,
            rs,
            mu_o: 1.0,
            mu_g: 0.02,
            z: None,
        })
        .collect()
    }
}
