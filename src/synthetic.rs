//! Synthetic volumetric-depletion datasets
//!
//! Builds a closed, saturated black-oil tank whose history satisfies
//! F = N·Eo exactly, then optionally perturbs the surveyed pressures with
//! Gaussian noise. Used by the `synthetic-reservoir` binary and by tests.
//!
//! Fluid model (p in psia):
//! - Rs = 0.125·p scf/STB
//! - Bo = 1.0 + 5e-5·p rb/STB
//! - Bg = 3.2 / p rb/scf

use chrono::NaiveDate;
use rand::prelude::*;
use rand_distr::Normal;

use crate::error::{EngineError, EngineResult};
use crate::material_balance::PvtTable;
use crate::types::{
    ContactObservation, FluidType, PressureRecord, ProductionRecord, PvtRecord, ReservoirDataset,
    ReservoirMetadata,
};

/// PVT table spacing (psi)
const PVT_STEP_PSI: f64 = 250.0;
/// Lowest tabulated pressure (psi)
const PVT_FLOOR_PSI: f64 = 500.0;
/// Produced water per barrel of oil
const WATER_OIL_RATIO: f64 = 0.02;

fn solution_gor(p: f64) -> f64 {
    0.125 * p
}

fn oil_fvf(p: f64) -> f64 {
    1.0 + 5e-5 * p
}

fn gas_fvf(p: f64) -> f64 {
    3.2 / p
}

/// Generator parameters
#[derive(Debug, Clone)]
pub struct SyntheticReservoir {
    pub name: String,
    /// Original oil in place (STB)
    pub ooip: f64,
    pub initial_pressure: f64,
    /// Pressure at the last survey
    pub final_pressure: f64,
    /// Number of surveys, the first at initial pressure
    pub surveys: usize,
    pub start_year: i32,
    /// Producing GOR, above Rsi so free gas is produced
    pub producing_gor: f64,
    /// Relative standard deviation applied to surveyed pressures
    pub pressure_noise: f64,
    /// Standard deviation (ft) of contact observations around the initial contacts
    pub contact_noise_ft: f64,
    pub seed: Option<u64>,
}

impl Default for SyntheticReservoir {
    fn default() -> Self {
        Self {
            name: "Synthetic-1".to_string(),
            ooip: 50.0e6,
            initial_pressure: 4000.0,
            final_pressure: 2000.0,
            surveys: 8,
            start_year: 2015,
            producing_gor: 800.0,
            pressure_noise: 0.0,
            contact_noise_ft: 0.0,
            seed: None,
        }
    }
}

impl SyntheticReservoir {
    pub fn metadata(&self) -> ReservoirMetadata {
        ReservoirMetadata {
            name: self.name.clone(),
            area_acres: 2000.0,
            net_thickness_ft: 80.0,
            porosity: 0.22,
            swi: 0.2,
            cf: 3e-6,
            cw: 3e-6,
            goc0_ft: 7000.0,
            owc0_ft: 7150.0,
            datum_ft: 7075.0,
            fluid: FluidType::Oil,
            drive_hint: None,
            initial_pressure: Some(self.initial_pressure),
            gas_cap_ratio: None,
            bw: None,
            gas_gravity: None,
            temperature_f: None,
        }
    }

    /// Black-oil table from the floor up to 500 psi above initial pressure
    pub fn pvt_table(&self) -> Vec<PvtRecord> {
        let top = self.initial_pressure + 2.0 * PVT_STEP_PSI;
        let rows = ((top - PVT_FLOOR_PSI) / PVT_STEP_PSI).floor() as usize;
        let mut table: Vec<PvtRecord> = (0..=rows)
            .map(|i| {
                let p = PVT_FLOOR_PSI + i as f64 * PVT_STEP_PSI;
                PvtRecord {
                    pressure: p,
                    bo: oil_fvf(p),
                    bg: gas_fvf(p),
                    rs: solution_gor(p),
                    mu_o: 0.6 + 1.5e-4 * (self.initial_pressure - p).abs(),
                    mu_g: 0.012 + 2e-6 * p,
                    z: None,
                }
            })
            .collect();
        // An exact row at Pi so Boi/Bgi/Rsi match the generating model
        if !table.iter().any(|r| r.pressure == self.initial_pressure) {
            let p = self.initial_pressure;
            table.push(PvtRecord {
                pressure: p,
                bo: oil_fvf(p),
                bg: gas_fvf(p),
                rs: solution_gor(p),
                mu_o: 0.6,
                mu_g: 0.012 + 2e-6 * p,
                z: None,
            });
            table.sort_by(|a, b| a.pressure.total_cmp(&b.pressure));
        }
        table
    }

    pub fn generate(&self) -> EngineResult<ReservoirDataset> {
        if self.surveys < 2 {
            return Err(EngineError::InvalidMetadata(format!(
                "synthetic history needs at least 2 surveys, got {}",
                self.surveys
            )));
        }
        if !(self.final_pressure > PVT_FLOOR_PSI && self.final_pressure < self.initial_pressure) {
            return Err(EngineError::InvalidMetadata(format!(
                "final pressure {} must lie between {} and the initial pressure {}",
                self.final_pressure, PVT_FLOOR_PSI, self.initial_pressure
            )));
        }

        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let pressure_noise = Normal::new(0.0, self.pressure_noise.max(0.0))
            .map_err(|e| EngineError::InvalidMetadata(format!("pressure noise: {e}")))?;
        let contact_noise = Normal::new(0.0, self.contact_noise_ft.max(0.0))
            .map_err(|e| EngineError::InvalidMetadata(format!("contact noise: {e}")))?;

        // Histories are built from the interpolated table, exactly as diagnostics reads it
        let pvt = self.pvt_table();
        let table = PvtTable::new(&pvt, false)?;
        let pi = self.initial_pressure;
        let initial = table.interpolate(pi, None)?;
        let metadata = self.metadata();

        let mut production = Vec::with_capacity(self.surveys);
        let mut pressure = Vec::with_capacity(self.surveys);
        let mut contacts = Vec::new();
        let step = (pi - self.final_pressure) / (self.surveys - 1) as f64;

        for i in 0..self.surveys {
            let date = NaiveDate::from_ymd_opt(self.start_year + i as i32, 1, 1)
                .ok_or_else(|| EngineError::InvalidMetadata(format!("year {} out of range", self.start_year)))?;
            let p = pi - step * i as f64;
            let props = table.interpolate(p, Some(date))?;

            // F = N·Eo with F = Np·(Bo + (Rp − Rs)·Bg + WOR·Bw)
            let eo = (props.bo - initial.bo) + (initial.rs - props.rs) * props.bg;
            let np = self.ooip * eo
                / (props.bo + (self.producing_gor - props.rs) * props.bg + WATER_OIL_RATIO);

            production.push(ProductionRecord {
                date,
                np,
                gp: np * self.producing_gor,
                wp: np * WATER_OIL_RATIO,
                wc: Some(WATER_OIL_RATIO / (1.0 + WATER_OIL_RATIO)),
                rp: Some(self.producing_gor),
            });
            let measured = if i == 0 {
                p
            } else {
                p * (1.0 + pressure_noise.sample(&mut rng))
            };
            pressure.push(PressureRecord {
                date,
                pr: measured,
                pwf: Some(measured - 600.0),
            });

            if i > 0 && i % 2 == 0 {
                contacts.push(ContactObservation {
                    date,
                    goc_ft: metadata.goc0_ft + contact_noise.sample(&mut rng),
                    owc_ft: metadata.owc0_ft + contact_noise.sample(&mut rng),
                    method: "pulsed neutron".to_string(),
                });
            }
        }

        Ok(ReservoirDataset {
            metadata,
            production,
            pressure,
            pvt,
            contacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::material_balance::compute_diagnostics;

    #[test]
    fn test_clean_history_satisfies_volumetric_balance() {
        let gen = SyntheticReservoir::default();
        let ds = gen.generate().unwrap();
        assert!(ds.validate().is_ok());
        let set = compute_diagnostics(&ds.metadata, &ds.production, &ds.pressure, &ds.pvt, &EngineConfig::default())
            .unwrap();
        for p in &set.points {
            assert!((p.f - gen.ooip * p.eo).abs() <= 1e-6 * gen.ooip * p.eo.abs().max(1e-12), "{}", p.date);
        }
    }

    #[test]
    fn test_seed_reproduces_noise() {
        let gen = SyntheticReservoir {
            pressure_noise: 0.01,
            contact_noise_ft: 3.0,
            seed: Some(42),
            ..Default::default()
        };
        assert_eq!(gen.generate().unwrap(), gen.generate().unwrap());
    }

    #[test]
    fn test_pvt_table_brackets_history() {
        let gen = SyntheticReservoir {
            initial_pressure: 3900.0,
            ..Default::default()
        };
        let table = gen.pvt_table();
        assert!(table.windows(2).all(|w| w[0].pressure < w[1].pressure));
        assert!(table.iter().any(|r| r.pressure == 3900.0));
        assert!(table[table.len() - 1].pressure > 3900.0);
    }

    #[test]
    fn test_rejects_single_survey() {
        let gen = SyntheticReservoir {
            surveys: 1,
            ..Default::default()
        };
        assert!(gen.generate().is_err());
    }
}
