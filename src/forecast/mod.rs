//! Forecast Engine
//!
//! Projects production forward on an exponential decline, inverts the fitted
//! material balance for average pressure at each step and moves the fluid
//! contacts with the voidage each drive mechanism makes good.
//!
//! ## Stages per step
//! 1. `DeclineCurve` - rate and analytic cumulative at t = k / steps_per_year
//! 2. `PressureSolver` - pressure where supply(P) = withdrawal(P)
//! 3. `project_contacts()` - GOC/OWC from the gas-cap and aquifer shares

pub mod contacts;
pub mod decline;
pub mod solver;

pub use contacts::{project_contacts, ContactState, ExpansionSupply};
pub use decline::DeclineCurve;
pub use solver::{solver_for, Bisection, Newton, PressureSolver, SolverError};

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use crate::config::ForecastConfig;
use crate::error::{EngineError, EngineResult};
use crate::material_balance::{DiagnosticSet, Expansion};
use crate::types::{
    DiagnosticPoint, DriveModel, ForecastPoint, ForecastRun, ProductionRecord, ProductionSchedule,
    RegressionResult, ReservoirMetadata,
};

/// Cumulative volumes at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cumulatives {
    np: f64,
    gp: f64,
    wp: f64,
    /// Producing GOR in the withdrawal term. Held at the last record's value,
    /// the same Rp the historical F was fitted on.
    rp: f64,
}

/// Forecasts one fitted drive model over one diagnostics run
pub struct ForecastEngine<'a> {
    config: &'a ForecastConfig,
    metadata: &'a ReservoirMetadata,
    diagnostics: &'a DiagnosticSet,
    regression: &'a RegressionResult,
    solver: Box<dyn PressureSolver>,
}

impl<'a> ForecastEngine<'a> {
    /// Fails when the fit carries no usable in-place volume for its model.
    pub fn new(
        config: &'a ForecastConfig,
        metadata: &'a ReservoirMetadata,
        diagnostics: &'a DiagnosticSet,
        regression: &'a RegressionResult,
    ) -> EngineResult<Self> {
        let model = regression.model;
        match model {
            DriveModel::Gas => {
                if diagnostics.z_source.is_none() {
                    return Err(EngineError::InvalidMetadata(
                        "gas forecast needs a z-factor source".to_string(),
                    ));
                }
                if regression.slope == 0.0 {
                    return Err(EngineError::DegenerateRegression {
                        model,
                        reason: "p/z line has zero slope".to_string(),
                    });
                }
            }
            _ => {
                if !regression.parameters.n.is_some_and(|n| n > 0.0 && n.is_finite()) {
                    return Err(EngineError::DegenerateRegression {
                        model,
                        reason: format!(
                            "fitted oil in place {:?} is not a positive volume",
                            regression.parameters.n
                        ),
                    });
                }
            }
        }

        Ok(Self {
            config,
            metadata,
            diagnostics,
            regression,
            solver: solver_for(config),
        })
    }

    /// Replace the configured root-finder
    pub fn with_solver(mut self, solver: Box<dyn PressureSolver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn model(&self) -> DriveModel {
        self.regression.model
    }

    /// Run `schedule` forward from the last historical production record.
    pub fn run(&self, last: &ProductionRecord, schedule: &ProductionSchedule) -> EngineResult<ForecastRun> {
        schedule.validate()?;

        let model = self.model();
        let steps_per_year = self.config.steps_per_year.max(1);
        let steps = schedule
            .duration_years
            .checked_mul(steps_per_year)
            .ok_or(EngineError::InvalidScheduleParameter {
                parameter: "duration_years",
                value: f64::from(schedule.duration_years),
                requirement: "a step count (years × steps_per_year) that fits in u32",
            })?;
        let curve = DeclineCurve::new(
            schedule.initial_rate,
            schedule.annual_decline,
            self.config.days_per_year,
        );

        let gor = last.gas_oil_ratio();
        let start = Cumulatives {
            np: last.np,
            gp: last.gp,
            wp: last.wp,
            rp: gor,
        };
        let wor = water_oil_ratio(last);
        let mut guess = self
            .diagnostics
            .points
            .last()
            .map(|p| p.pressure)
            .unwrap_or(self.diagnostics.initial.pi);

        info!(
            model = %model,
            solver = self.solver.name(),
            steps,
            initial_rate = schedule.initial_rate,
            annual_decline = schedule.annual_decline,
            "Running forecast"
        );

        let mut points = Vec::with_capacity(steps as usize);
        let mut crossing_reported = false;
        for k in 1..=steps {
            let t = f64::from(k) / f64::from(steps_per_year);
            let date = Duration::try_days((t * self.config.days_per_year).round() as i64)
                .and_then(|offset| last.date.checked_add_signed(offset))
                .ok_or(EngineError::InvalidScheduleParameter {
                    parameter: "duration_years",
                    value: f64::from(schedule.duration_years),
                    requirement: "a forecast end date inside the calendar range",
                })?;
            let rate = curve.rate(t);
            let produced = curve.cumulative(t);

            let (cum, oil_rate, gas_rate) = match model {
                DriveModel::Gas => (
                    Cumulatives {
                        gp: start.gp + produced,
                        ..start
                    },
                    0.0,
                    rate,
                ),
                _ => (
                    Cumulatives {
                        np: start.np + produced,
                        gp: start.gp + gor * produced,
                        wp: start.wp + wor * produced,
                        ..start
                    },
                    rate,
                    rate * gor,
                ),
            };

            let pressure = self.solve_step(&cum, date, guess)?;
            guess = pressure;
            let contacts = match model {
                DriveModel::Gas => ContactState::initial(self.metadata),
                _ => {
                    let voidage = self.voidage(&cum, pressure, date)?;
                    self.contacts_at(voidage, pressure, date)?
                }
            };

            if contacts.crossed() && !crossing_reported {
                warn!(
                    date = %date,
                    goc_ft = contacts.goc_ft,
                    owc_ft = contacts.owc_ft,
                    "Projected GOC has moved below the OWC"
                );
                crossing_reported = true;
            }

            points.push(ForecastPoint {
                date,
                elapsed_years: t,
                oil_rate,
                cumulative_oil: cum.np,
                gas_rate,
                cumulative_gas: cum.gp,
                cumulative_water: cum.wp,
                pressure,
                goc_ft: contacts.goc_ft,
                owc_ft: contacts.owc_ft,
            });
        }

        if let Some(end) = points.last() {
            info!(
                end_date = %end.date,
                end_pressure = end.pressure,
                cumulative_oil = end.cumulative_oil,
                cumulative_gas = end.cumulative_gas,
                "Forecast complete"
            );
        }

        Ok(ForecastRun {
            model,
            schedule: *schedule,
            points,
        })
    }

    /// Contact track at the historical diagnostic dates, using measured
    /// pressure and each point's own withdrawal F. Elapsed time counts back
    /// from the last diagnostic date, so every point has `elapsed_years <= 0`.
    pub fn hindcast(&self) -> EngineResult<Vec<ForecastPoint>> {
        let points = &self.diagnostics.points;
        let Some(end) = points.last() else {
            return Ok(Vec::new());
        };

        let mut track = Vec::with_capacity(points.len());
        let mut previous: Option<&DiagnosticPoint> = None;
        for p in points {
            let contacts = self.contacts_at(p.f, p.pressure, p.date)?;

            let (oil_rate, gas_rate) = match previous {
                Some(prev) => {
                    let days = (p.date - prev.date).num_days() as f64;
                    if days > 0.0 {
                        ((p.np - prev.np) / days, (p.gp - prev.gp) / days)
                    } else {
                        (0.0, 0.0)
                    }
                }
                None => (0.0, 0.0),
            };
            previous = Some(p);

            track.push(ForecastPoint {
                date: p.date,
                elapsed_years: (p.date - end.date).num_days() as f64 / self.config.days_per_year,
                oil_rate,
                cumulative_oil: p.np,
                gas_rate,
                cumulative_gas: p.gp,
                cumulative_water: p.wp,
                pressure: p.pressure,
                goc_ft: contacts.goc_ft,
                owc_ft: contacts.owc_ft,
            });
        }

        debug!(points = track.len(), model = %self.model(), "Hindcast contact track built");
        Ok(track)
    }

    /// Solve the balance for one set of cumulatives
    fn solve_step(&self, cum: &Cumulatives, date: NaiveDate, guess: f64) -> EngineResult<f64> {
        let bracket = self.diagnostics.table.pressure_range();
        let residual = |p: f64| self.residual(cum, p, date);
        self.solver
            .solve_pressure_for_expansion(&residual, bracket, guess)
            .map_err(|err| err.at_step(date))
    }

    /// supply(P) − withdrawal(P), or p/z(P) minus the fitted line for gas
    fn residual(&self, cum: &Cumulatives, pressure: f64, date: NaiveDate) -> EngineResult<f64> {
        let set = self.diagnostics;
        if self.model() == DriveModel::Gas {
            let z_source = set.z_source.ok_or(EngineError::MissingRegression(DriveModel::Gas))?;
            let p_over_z = z_source.p_over_z(&set.table, pressure, Some(date))?;
            return Ok(p_over_z - self.regression.predict(cum.gp));
        }

        let props = set.table.interpolate(pressure, Some(date))?;
        let expansion = set.initial.expansion(&props, pressure);
        let supply = self.supply(&expansion, pressure)?;
        let withdrawal = set.initial.withdrawal(&props, cum.np, cum.rp, cum.wp);
        Ok(supply.total() - withdrawal)
    }

    fn supply(&self, expansion: &Expansion, pressure: f64) -> EngineResult<ExpansionSupply> {
        ExpansionSupply::for_model(
            self.model(),
            &self.regression.parameters,
            &self.diagnostics.initial,
            expansion,
            pressure,
        )
        .ok_or(EngineError::MissingRegression(self.model()))
    }

    /// Underground withdrawal F at `pressure` for forecast cumulatives
    fn voidage(&self, cum: &Cumulatives, pressure: f64, date: NaiveDate) -> EngineResult<f64> {
        let set = self.diagnostics;
        let props = set.table.interpolate(pressure, Some(date))?;
        Ok(set.initial.withdrawal(&props, cum.np, cum.rp, cum.wp))
    }

    fn contacts_at(&self, voidage: f64, pressure: f64, date: NaiveDate) -> EngineResult<ContactState> {
        if self.model() == DriveModel::Gas {
            return Ok(ContactState::initial(self.metadata));
        }
        let set = self.diagnostics;
        let props = set.table.interpolate(pressure, Some(date))?;
        let expansion = set.initial.expansion(&props, pressure);
        let supply = self.supply(&expansion, pressure)?;
        Ok(project_contacts(self.metadata, voidage, &supply))
    }
}

/// Water-oil ratio from the last water cut, else the cumulative ratio
fn water_oil_ratio(last: &ProductionRecord) -> f64 {
    match last.wc {
        Some(wc) if (0.0..1.0).contains(&wc) => wc / (1.0 - wc),
        _ if last.np > 0.0 => last.wp / last.np,
        _ => 0.0,
    }
}
