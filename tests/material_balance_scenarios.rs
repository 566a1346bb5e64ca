//! Material Balance Scenario Tests
//!
//! End-to-end runs through `AnalysisSession`: diagnostics, drive-model fits,
//! classification, forecasting and the contact consistency check, on small
//! synthetic tanks whose true in-place volumes are known.

use chrono::NaiveDate;

use mbal_engine::material_balance::PvtTable;
use mbal_engine::synthetic::SyntheticReservoir;
use mbal_engine::{
    AnalysisSession, DriveModel, EngineConfig, EngineError, FluidType, PressureRecord, ProductionRecord,
    ProductionSchedule, PvtRecord, ReservoirDataset, ReservoirMetadata,
};

const OOIP: f64 = 30.0e6;
const OGIP: f64 = 50.0e9;
const PRODUCING_GOR: f64 = 700.0;
const SURVEY_PRESSURES: [f64; 5] = [4000.0, 3500.0, 3000.0, 2500.0, 2000.0];

fn survey_date(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2016 + i as i32, 7, 1).expect("valid date")
}

fn metadata(fluid: FluidType) -> ReservoirMetadata {
    ReservoirMetadata {
        name: "Scenario-Tank".to_string(),
        area_acres: 1500.0,
        net_thickness_ft: 60.0,
        porosity: 0.18,
        swi: 0.2,
        cf: 3e-6,
        cw: 3e-6,
        goc0_ft: 6000.0,
        owc0_ft: 6120.0,
        datum_ft: 6060.0,
        fluid,
        drive_hint: None,
        initial_pressure: None,
        gas_cap_ratio: None,
        bw: None,
        gas_gravity: None,
        temperature_f: None,
    }
}

/// Black oil with Boi = 1.2, Bgi = 0.001, Rsi = 500 at 4000 psi
fn oil_pvt(min_pressure: f64) -> Vec<PvtRecord> {
    (0..=6)
        .map(|i| 1500.0 + 500.0 * f64::from(i))
        .filter(|p| *p >= min_pressure)
        .map(|p| {
            let below = (4000.0 - p).max(0.0);
            PvtRecord {
                pressure: p,
                bo: if p > 4000.0 { 1.19 } else { 1.2 - 4e-5 * below },
                bg: 4.0 / p,
                rs: 500.0 - 0.1 * below,
                mu_o: 0.8,
                mu_g: 0.02,
                z: None,
            }
        })
        .collect()
}

/// Closed-tank history: Np chosen so that F = N·Eo at every survey
fn volumetric_dataset() -> ReservoirDataset {
    let pvt = oil_pvt(0.0);
    let table = PvtTable::new(&pvt, false).expect("valid table");
    let initial = table.interpolate(4000.0, None).expect("Pi in table");

    let mut production = Vec::new();
    let mut pressure = Vec::new();
    for (i, &p) in SURVEY_PRESSURES.iter().enumerate() {
        let props = table.interpolate(p, None).expect("survey in table");
        let eo = (props.bo - initial.bo) + (initial.rs - props.rs) * props.bg;
        let np = OOIP * eo / (props.bo + (PRODUCING_GOR - props.rs) * props.bg);
        production.push(ProductionRecord {
            date: survey_date(i),
            np,
            gp: np * PRODUCING_GOR,
            wp: 0.0,
            wc: Some(0.0),
            rp: Some(PRODUCING_GOR),
        });
        pressure.push(PressureRecord {
            date: survey_date(i),
            pr: p,
            pwf: None,
        });
    }

    ReservoirDataset {
        metadata: metadata(FluidType::Oil),
        production,
        pressure,
        pvt,
        contacts: Vec::new(),
    }
}

/// Dry gas with a lab z column; p/z falls linearly with Gp
fn gas_dataset() -> ReservoirDataset {
    let z = |p: f64| 0.91 - 2e-5 * (p - 1000.0);
    let pvt = (0..=6)
        .map(|i| {
            let p = 1000.0 + 500.0 * f64::from(i);
            PvtRecord {
                pressure: p,
                bo: 1.0,
                bg: 5.0 * z(p) / p,
                rs: 0.0,
                mu_o: 1.0,
                mu_g: 0.018,
                z: Some(z(p)),
            }
        })
        .collect();
    let pz_initial = 4000.0 / z(4000.0);

    let production = SURVEY_PRESSURES
        .iter()
        .enumerate()
        .map(|(i, &p)| ProductionRecord {
            date: survey_date(i),
            np: 0.0,
            gp: OGIP * (1.0 - (p / z(p)) / pz_initial),
            wp: 0.0,
            wc: None,
            rp: None,
        })
        .collect();
    let pressure = SURVEY_PRESSURES
        .iter()
        .enumerate()
        .map(|(i, &p)| PressureRecord {
            date: survey_date(i),
            pr: p,
            pwf: None,
        })
        .collect();

    ReservoirDataset {
        metadata: metadata(FluidType::Gas),
        production,
        pressure,
        pvt,
        contacts: Vec::new(),
    }
}

fn schedule(rate: f64, decline: f64, years: u32) -> ProductionSchedule {
    ProductionSchedule {
        initial_rate: rate,
        annual_decline: decline,
        duration_years: years,
    }
}

// ============================================================================
// Diagnostics and Regression
// ============================================================================

#[test]
fn clean_volumetric_depletion_recovers_positive_n() {
    let mut session = AnalysisSession::new(volumetric_dataset(), EngineConfig::default());
    assert_eq!(session.diagnostics().expect("diagnostics").len(), 5);

    let fits = session.fit_models().expect("fits");
    let volumetric = fits.get(DriveModel::Volumetric).expect("volumetric fit");
    let n = volumetric.parameters.n.expect("N");
    assert!(n > 0.0);
    assert!(volumetric.r_squared > 0.9);
    assert!((n - OOIP).abs() / OOIP < 1e-6, "N = {n}");
    for fit in fits.successful() {
        assert!((0.0..=1.0).contains(&fit.r_squared), "{} R² = {}", fit.model, fit.r_squared);
    }
}

#[test]
fn clean_volumetric_depletion_is_classified_volumetric() {
    let mut session = AnalysisSession::new(volumetric_dataset(), EngineConfig::default());
    let classification = session.classify(None).expect("classification");
    assert_eq!(classification.recommended, Some(DriveModel::Volumetric));
    assert_eq!(classification.active, DriveModel::Volumetric);
    assert!(!classification.user_override);
}

#[test]
fn pvt_not_covering_surveys_is_insufficient_range() {
    let mut dataset = volumetric_dataset();
    dataset.pvt = oil_pvt(3000.0);
    let mut session = AnalysisSession::new(dataset, EngineConfig::default());

    match session.diagnostics() {
        Err(EngineError::InsufficientPvtRange { pressure, min, date, .. }) => {
            assert_eq!(pressure, 2500.0);
            assert_eq!(min, 3000.0);
            assert_eq!(date, Some(survey_date(3)));
        }
        other => panic!("expected InsufficientPvtRange, got {other:?}"),
    }
}

#[test]
fn extrapolation_can_be_enabled_explicitly() {
    let mut dataset = volumetric_dataset();
    dataset.pvt = oil_pvt(3000.0);
    let mut config = EngineConfig::default();
    config.pvt.allow_extrapolation = true;
    let mut session = AnalysisSession::new(dataset, config);
    assert_eq!(session.diagnostics().expect("extrapolated diagnostics").len(), 5);
}

#[test]
fn zero_production_gives_zero_withdrawal() {
    let mut dataset = volumetric_dataset();
    for rec in &mut dataset.production {
        rec.np = 0.0;
        rec.gp = 0.0;
        rec.wp = 0.0;
    }
    let mut session = AnalysisSession::new(dataset, EngineConfig::default());
    let points = session.diagnostics().expect("diagnostics");
    assert!(points.iter().all(|p| p.f == 0.0));
    assert!(points[0].eo.abs() < 1e-12);
}

// ============================================================================
// Forecast
// ============================================================================

#[test]
fn forecast_length_is_years_times_steps() {
    let mut session = AnalysisSession::new(volumetric_dataset(), EngineConfig::default());
    for years in [1, 5, 10] {
        let run = session
            .run_forecast(&schedule(300.0, 0.1, years), None)
            .expect("forecast");
        assert_eq!(run.points.len(), years as usize * 12);
    }

    let mut config = EngineConfig::default();
    config.forecast.steps_per_year = 4;
    let mut quarterly = AnalysisSession::new(volumetric_dataset(), config);
    let run = quarterly.run_forecast(&schedule(300.0, 0.1, 5), None).expect("forecast");
    assert_eq!(run.points.len(), 20);
}

#[test]
fn flat_rate_forecast_is_linear_in_time() {
    let mut session = AnalysisSession::new(volumetric_dataset(), EngineConfig::default());
    let last_np = volumetric_dataset().production[4].np;
    let run = session
        .run_forecast(&schedule(500.0, 0.0, 3), Some(DriveModel::Volumetric))
        .expect("forecast");

    let per_step = 500.0 * 365.25 / 12.0;
    for (k, p) in run.points.iter().enumerate() {
        let produced = p.cumulative_oil - last_np;
        assert!((produced - per_step * (k + 1) as f64).abs() < 1e-6, "step {k}");
        assert!((p.elapsed_years - (k + 1) as f64 / 12.0).abs() < 1e-12);
    }
    let increments: Vec<f64> = run
        .points
        .windows(2)
        .map(|w| w[1].cumulative_oil - w[0].cumulative_oil)
        .collect();
    assert!(increments.iter().all(|d| (d - per_step).abs() < 1e-6));
}

#[test]
fn forecast_pressure_declines_and_contacts_hold_for_volumetric_drive() {
    let mut session = AnalysisSession::new(volumetric_dataset(), EngineConfig::default());
    let run = session
        .run_forecast(&schedule(500.0, 0.08, 10), Some(DriveModel::Volumetric))
        .expect("forecast");
    assert!(run.points[0].pressure < 2000.0 + 1e-3);
    assert!(run.points.windows(2).all(|w| w[1].pressure < w[0].pressure));
    assert!(run.points.iter().all(|p| p.goc_ft == 6000.0 && p.owc_ft == 6120.0));
}

#[test]
fn invalid_schedule_is_rejected() {
    let mut session = AnalysisSession::new(volumetric_dataset(), EngineConfig::default());
    let err = session.run_forecast(&schedule(500.0, 0.1, 0), None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidScheduleParameter { parameter: "duration_years", .. }
    ));
    assert!(session.cache().forecast().is_none());
}

// ============================================================================
// Gas Reservoir
// ============================================================================

#[test]
fn gas_reservoir_recovers_ogip_and_forecasts_on_p_over_z() {
    let mut session = AnalysisSession::new(gas_dataset(), EngineConfig::default());
    let fits = session.fit_models().expect("fits");
    assert_eq!(fits.results.len(), 1);
    let g = fits
        .get(DriveModel::Gas)
        .and_then(|f| f.parameters.g)
        .expect("G");
    assert!((g - OGIP).abs() / OGIP < 1e-6, "G = {g}");

    let run = session
        .run_forecast(&schedule(5.0e6, 0.05, 3), None)
        .expect("gas forecast");
    assert_eq!(run.model, DriveModel::Gas);
    assert_eq!(run.points.len(), 36);
    assert!(run.points.windows(2).all(|w| w[1].pressure < w[0].pressure));
    assert!(run.points.iter().all(|p| p.oil_rate == 0.0 && p.goc_ft == 6000.0));
    let first_rate = 5.0e6 * (-0.05_f64 / 12.0).exp();
    assert!((run.points[0].gas_rate - first_rate).abs() < 1e-6);
}

// ============================================================================
// Consistency
// ============================================================================

#[test]
fn no_contact_observations_score_100() {
    let mut session = AnalysisSession::new(volumetric_dataset(), EngineConfig::default());
    let result = session.run_consistency_check();
    assert_eq!(result.score, 100);
    assert!(result.issues.is_empty());
}

#[test]
fn synthetic_tank_contacts_are_consistent() {
    let dataset = SyntheticReservoir {
        seed: Some(3),
        ..Default::default()
    }
    .generate()
    .expect("synthetic dataset");
    assert!(!dataset.contacts.is_empty());

    let mut session = AnalysisSession::new(dataset, EngineConfig::default());
    session
        .run_forecast(&schedule(2000.0, 0.1, 5), Some(DriveModel::Volumetric))
        .expect("forecast");
    let result = session.run_consistency_check();
    assert_eq!(result.score, 100, "issues: {:?}", result.issues);
}

#[test]
fn noisy_synthetic_tank_still_fits_volumetric() {
    let generator = SyntheticReservoir {
        pressure_noise: 0.002,
        seed: Some(11),
        ..Default::default()
    };
    let mut session = AnalysisSession::new(generator.generate().expect("dataset"), EngineConfig::default());
    let fits = session.fit_models().expect("fits");
    let volumetric = fits.get(DriveModel::Volumetric).expect("volumetric fit");
    let n = volumetric.parameters.n.expect("N");
    assert!(volumetric.r_squared > 0.95, "R² = {}", volumetric.r_squared);
    assert!((n - generator.ooip).abs() / generator.ooip < 0.1, "N = {n}");
}
