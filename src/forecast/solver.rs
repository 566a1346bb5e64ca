//! Pressure root-finders for the material-balance inversion
//!
//! The forecast engine hands a solver the balance residual
//! `supply(P) − withdrawal(P)` and the PVT pressure domain; the solver
//! returns the pressure where the residual vanishes. Swapping bisection for
//! Newton does not touch decline or contact logic.

use chrono::NaiveDate;

use crate::config::{ForecastConfig, SolverKind};
use crate::config::defaults::NEWTON_DERIVATIVE_STEP_PSI;
use crate::error::EngineError;

/// Why a solve failed
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The residual itself failed (PVT lookup, z-factor)
    Residual(EngineError),
    NoConvergence { iterations: u32, detail: String },
}

impl SolverError {
    /// Attach the forecast step the solve belonged to
    pub fn at_step(self, step_date: NaiveDate) -> EngineError {
        match self {
            SolverError::Residual(err) => err,
            SolverError::NoConvergence { iterations, detail } => EngineError::ForecastPressureNonConvergent {
                step_date,
                iterations,
                detail,
            },
        }
    }
}

impl From<EngineError> for SolverError {
    fn from(err: EngineError) -> Self {
        SolverError::Residual(err)
    }
}

pub type Residual<'a> = dyn Fn(f64) -> Result<f64, EngineError> + 'a;

pub trait PressureSolver {
    /// Pressure in `[lo, hi]` at which the expansion supplied by the reservoir
    /// balances withdrawal (`residual(P) = 0`). `guess` seeds iterative methods.
    fn solve_pressure_for_expansion(
        &self,
        residual: &Residual<'_>,
        bracket: (f64, f64),
        guess: f64,
    ) -> Result<f64, SolverError>;

    fn name(&self) -> &'static str;
}

/// Build the solver named in config
pub fn solver_for(config: &ForecastConfig) -> Box<dyn PressureSolver> {
    match config.solver {
        SolverKind::Bisection => Box::new(Bisection {
            max_iterations: config.max_iterations,
            tolerance_psi: config.pressure_tolerance_psi,
        }),
        SolverKind::Newton => Box::new(Newton {
            max_iterations: config.max_iterations,
            tolerance_psi: config.pressure_tolerance_psi,
        }),
    }
}

// ============================================================================
// Bisection
// ============================================================================

/// Bracketing solver; needs a sign change across the domain.
#[derive(Debug, Clone, Copy)]
pub struct Bisection {
    pub max_iterations: u32,
    pub tolerance_psi: f64,
}

impl PressureSolver for Bisection {
    fn solve_pressure_for_expansion(
        &self,
        residual: &Residual<'_>,
        bracket: (f64, f64),
        _guess: f64,
    ) -> Result<f64, SolverError> {
        let (mut lo, mut hi) = bracket;
        let mut f_lo = residual(lo)?;
        let f_hi = residual(hi)?;
        if f_lo == 0.0 {
            return Ok(lo);
        }
        if f_hi == 0.0 {
            return Ok(hi);
        }
        if f_lo.signum() == f_hi.signum() {
            return Err(SolverError::NoConvergence {
                iterations: 0,
                detail: format!(
                    "material balance has no root between {lo:.1} and {hi:.1} psi (residual {f_lo:.4e} / {f_hi:.4e})"
                ),
            });
        }

        for _ in 0..self.max_iterations {
            let mid = 0.5 * (lo + hi);
            if hi - lo <= self.tolerance_psi {
                return Ok(mid);
            }
            let f_mid = residual(mid)?;
            if f_mid == 0.0 {
                return Ok(mid);
            }
            if f_mid.signum() == f_lo.signum() {
                lo = mid;
                f_lo = f_mid;
            } else {
                hi = mid;
            }
        }

        Err(SolverError::NoConvergence {
            iterations: self.max_iterations,
            detail: format!("bracket still {:.3e} psi wide", hi - lo),
        })
    }

    fn name(&self) -> &'static str {
        "bisection"
    }
}

// ============================================================================
// Newton
// ============================================================================

/// Newton's method with a central-difference derivative, iterates clamped to
/// the domain.
#[derive(Debug, Clone, Copy)]
pub struct Newton {
    pub max_iterations: u32,
    pub tolerance_psi: f64,
}

impl PressureSolver for Newton {
    fn solve_pressure_for_expansion(
        &self,
        residual: &Residual<'_>,
        bracket: (f64, f64),
        guess: f64,
    ) -> Result<f64, SolverError> {
        let (lo, hi) = bracket;
        let h = NEWTON_DERIVATIVE_STEP_PSI.min(0.25 * (hi - lo));
        let mut p = guess.clamp(lo, hi);
        let mut pinned = 0u32;

        for i in 0..self.max_iterations {
            let f = residual(p)?;
            let (a, b) = ((p - h).max(lo), (p + h).min(hi));
            let slope = (residual(b)? - residual(a)?) / (b - a);
            if slope == 0.0 || !slope.is_finite() {
                return Err(SolverError::NoConvergence {
                    iterations: i + 1,
                    detail: format!("flat residual at {p:.2} psi"),
                });
            }

            let next = (p - f / slope).clamp(lo, hi);
            if (next - p).abs() <= self.tolerance_psi {
                return Ok(next);
            }
            // Pushed against the same domain edge twice: the root lies outside
            if next == p {
                pinned += 1;
                if pinned >= 2 {
                    break;
                }
            } else {
                pinned = 0;
            }
            p = next;
        }

        Err(SolverError::NoConvergence {
            iterations: self.max_iterations,
            detail: format!("Newton iterate stalled at {p:.2} psi"),
        })
    }

    fn name(&self) -> &'static str {
        "newton"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(p: f64) -> Result<f64, EngineError> {
        // Root at 2500 psi, monotone decreasing in P like a balance residual
        Ok(((2500.0 - p) / 1000.0).powi(3) + (2500.0 - p) / 1000.0)
    }

    #[test]
    fn test_bisection_finds_root() {
        let solver = Bisection { max_iterations: 100, tolerance_psi: 1e-6 };
        let p = solver.solve_pressure_for_expansion(&cubic, (1000.0, 4000.0), 3000.0).unwrap();
        assert!((p - 2500.0).abs() < 1e-5, "p = {p}");
    }

    #[test]
    fn test_newton_finds_root() {
        let solver = Newton { max_iterations: 50, tolerance_psi: 1e-6 };
        let p = solver.solve_pressure_for_expansion(&cubic, (1000.0, 4000.0), 3900.0).unwrap();
        assert!((p - 2500.0).abs() < 1e-4, "p = {p}");
    }

    #[test]
    fn test_solvers_agree() {
        let residual = |p: f64| Ok(1.0e-3 * (3100.0 - p) + 2.0e-7 * (3100.0 - p).powi(2));
        let b = Bisection { max_iterations: 200, tolerance_psi: 1e-7 }
            .solve_pressure_for_expansion(&residual, (1000.0, 4000.0), 4000.0)
            .unwrap();
        let n = Newton { max_iterations: 200, tolerance_psi: 1e-7 }
            .solve_pressure_for_expansion(&residual, (1000.0, 4000.0), 4000.0)
            .unwrap();
        assert!((b - n).abs() < 1e-4);
    }

    #[test]
    fn test_bisection_without_sign_change_fails() {
        let solver = Bisection { max_iterations: 100, tolerance_psi: 1e-6 };
        let err = solver
            .solve_pressure_for_expansion(&|p| Ok(p + 1.0), (1000.0, 4000.0), 2000.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::NoConvergence { iterations: 0, .. }));
    }

    #[test]
    fn test_iteration_cap_is_enforced() {
        let solver = Bisection { max_iterations: 3, tolerance_psi: 1e-9 };
        let err = solver
            .solve_pressure_for_expansion(&cubic, (1000.0, 4000.0), 3000.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::NoConvergence { iterations: 3, .. }));
    }

    #[test]
    fn test_newton_root_outside_domain_fails() {
        let solver = Newton { max_iterations: 50, tolerance_psi: 1e-6 };
        let err = solver
            .solve_pressure_for_expansion(&|p| Ok(500.0 - p), (1000.0, 4000.0), 3000.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::NoConvergence { .. }));
    }

    #[test]
    fn test_residual_errors_pass_through() {
        let solver = Bisection { max_iterations: 10, tolerance_psi: 1e-6 };
        let err = solver
            .solve_pressure_for_expansion(
                &|_| Err(EngineError::InvalidPvtTable("boom".to_string())),
                (1000.0, 4000.0),
                2000.0,
            )
            .unwrap_err();
        assert!(matches!(err, SolverError::Residual(EngineError::InvalidPvtTable(_))));
    }

    #[test]
    fn test_solver_for_config() {
        let mut config = ForecastConfig::default();
        assert_eq!(solver_for(&config).name(), "bisection");
        config.solver = SolverKind::Newton;
        assert_eq!(solver_for(&config).name(), "newton");
    }
}
