//! Diagnostic Variable Calculator
//!
//! Turns matched production/pressure dates into Havlena-Odeh terms:
//!
//! - F   = Np·(Bo + (Rp − Rs)·Bg) + Wp·Bw
//! - Eo  = (Bo − Boi) + (Rsi − Rs)·Bg
//! - Eg  = Boi·(Bg/Bgi − 1)
//! - Efw = (1 + m)·Boi·((cf + cw·Swi)/(1 − Swi))·(Pi − P)
//! - Et  = Eo + Eg + Efw
//!
//! The initial-state quantities live in `InitialConditions` so the forecast
//! engine evaluates exactly the same expressions when it inverts the balance.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use super::pvt::{PvtProperties, PvtTable, ZFactorSource};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::{
    DiagnosticPoint, FluidType, PressureRecord, ProductionRecord, PvtRecord, ReservoirMetadata,
};

/// Expansion terms per stock-tank barrel of oil in place
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expansion {
    pub eo: f64,
    pub eg: f64,
    pub efw: f64,
}

impl Expansion {
    pub fn total(&self) -> f64 {
        self.eo + self.eg + self.efw
    }
}

/// Reference state at initial pressure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialConditions {
    pub pi: f64,
    pub boi: f64,
    pub bgi: f64,
    pub rsi: f64,
    /// Gas-cap ratio used in Efw (metadata value, else 0)
    pub m: f64,
    pub bw: f64,
    /// (1 + m)·Boi·(cf + cw·Swi)/(1 − Swi), rb/STB/psi
    efw_per_psi: f64,
}

impl InitialConditions {
    /// Boi, Bgi and Rsi come from the PVT row nearest Pi, not from interpolation.
    pub fn resolve(
        metadata: &ReservoirMetadata,
        first_pressure: f64,
        table: &PvtTable,
        config: &EngineConfig,
    ) -> Self {
        let pi = metadata.initial_pressure.unwrap_or(first_pressure);
        let row = table.nearest(pi);
        let m = metadata.gas_cap_ratio.unwrap_or(0.0);
        let efw_per_psi =
            (1.0 + m) * row.bo * ((metadata.cf + metadata.cw * metadata.swi) / (1.0 - metadata.swi));

        Self {
            pi,
            boi: row.bo,
            bgi: row.bg,
            rsi: row.rs,
            m,
            bw: metadata.bw.unwrap_or(config.pvt.default_bw),
            efw_per_psi,
        }
    }

    pub fn expansion(&self, props: &PvtProperties, pressure: f64) -> Expansion {
        Expansion {
            eo: (props.bo - self.boi) + (self.rsi - props.rs) * props.bg,
            eg: self.boi * (props.bg / self.bgi - 1.0),
            efw: self.efw_per_psi * (self.pi - pressure),
        }
    }

    /// Underground withdrawal F for cumulative volumes `np`, `wp` at producing GOR `rp`
    pub fn withdrawal(&self, props: &PvtProperties, np: f64, rp: f64, wp: f64) -> f64 {
        np * (props.bo + (rp - props.rs) * props.bg) + wp * self.bw
    }
}

/// Production record joined with the pressure measured on the same date
#[derive(Debug, Clone)]
pub struct MatchedRecord<'a> {
    pub production: &'a ProductionRecord,
    pub pressure: f64,
}

/// Dates present in both series, ordered by date
pub fn match_dates<'a>(
    production: &'a [ProductionRecord],
    pressure: &[PressureRecord],
) -> Vec<MatchedRecord<'a>> {
    let by_date: BTreeMap<NaiveDate, f64> = pressure.iter().map(|r| (r.date, r.pr)).collect();
    let mut matched: Vec<MatchedRecord<'a>> = production
        .iter()
        .filter_map(|p| {
            by_date.get(&p.date).map(|&pr| MatchedRecord {
                production: p,
                pressure: pr,
            })
        })
        .collect();
    matched.sort_by_key(|m| m.production.date);
    matched
}

/// Everything the downstream stages need from a diagnostics run
#[derive(Debug, Clone)]
pub struct DiagnosticSet {
    pub points: Vec<DiagnosticPoint>,
    pub initial: InitialConditions,
    pub table: PvtTable,
    /// Always present for gas reservoirs; for condensate when a z column or
    /// gas gravity and temperature are available
    pub z_source: Option<ZFactorSource>,
}

/// Compute diagnostic points for every date present in both series.
///
/// Any PVT lookup failure aborts the whole run; a point is never computed
/// from extrapolated or substituted properties unless extrapolation is
/// explicitly enabled in config.
pub fn compute_diagnostics(
    metadata: &ReservoirMetadata,
    production: &[ProductionRecord],
    pressure: &[PressureRecord],
    pvt: &[PvtRecord],
    config: &EngineConfig,
) -> EngineResult<DiagnosticSet> {
    metadata.validate()?;
    let table = PvtTable::new(pvt, config.pvt.allow_extrapolation)?;

    let matched = match_dates(production, pressure);
    let Some(first) = matched.first() else {
        return Err(EngineError::EmptyDiagnosticSet { usable: 0 });
    };

    let initial = InitialConditions::resolve(metadata, first.pressure, &table, config);
    // Condensate only gets p/z (and so a gas fit) when a z source exists
    let z_source = match metadata.fluid {
        FluidType::Gas => Some(ZFactorSource::resolve(&table, metadata)?),
        FluidType::Condensate => ZFactorSource::resolve(&table, metadata)
            .map_err(|err| debug!(error = %err, "Condensate without z source, p/z skipped"))
            .ok(),
        FluidType::Oil => None,
    };

    debug!(
        matched = matched.len(),
        pi = initial.pi,
        boi = initial.boi,
        bgi = initial.bgi,
        rsi = initial.rsi,
        "Computing diagnostic variables"
    );

    let eps = config.diagnostics.ratio_epsilon;
    let mut points = Vec::with_capacity(matched.len());
    for rec in &matched {
        let prod = rec.production;
        let p = rec.pressure;
        let props = table.interpolate(p, Some(prod.date))?;
        let exp = initial.expansion(&props, p);
        let f = initial.withdrawal(&props, prod.np, prod.gas_oil_ratio(), prod.wp);

        let usable_ratio = exp.eo.abs() >= eps;
        let p_over_z = match &z_source {
            Some(src) => Some(src.p_over_z(&table, p, Some(prod.date))?),
            None => None,
        };

        points.push(DiagnosticPoint {
            date: prod.date,
            pressure: p,
            f,
            eo: exp.eo,
            eg: exp.eg,
            efw: exp.efw,
            et: exp.total(),
            eg_over_eo: usable_ratio.then(|| exp.eg / exp.eo),
            f_over_eo: usable_ratio.then(|| f / exp.eo),
            np: prod.np,
            gp: prod.gp,
            wp: prod.wp,
            delta_p: initial.pi - p,
            p_over_z,
        });
    }

    if points.len() < config.diagnostics.min_points {
        return Err(EngineError::EmptyDiagnosticSet {
            usable: points.len(),
        });
    }

    debug!(points = points.len(), "Diagnostic variables computed");
    Ok(DiagnosticSet {
        points,
        initial,
        table,
        z_source,
    })
}
