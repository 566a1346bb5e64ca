//! Regression Fitting Engine
//!
//! Ordinary least squares over the (x, y) pair each drive model plots, plus
//! the physical parameters read off the fitted line:
//!
//! | Model      | x      | y     | Parameters                                  |
//! |------------|--------|-------|---------------------------------------------|
//! | volumetric | Eo     | F     | N = slope                                   |
//! | gascap     | Eg/Eo  | F/Eo  | N = intercept, m = slope / intercept         |
//! | water      | Efw    | F     | N = slope, We = intercept, U = We / mean ΔP |
//! | solution   | Et     | F     | N = slope                                   |
//! | gas        | Gp     | p/z   | G = −intercept / slope                      |

use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::types::{DiagnosticPoint, DriveModel, DriveParameters, FluidType, ModelFits, RegressionResult};

/// Raw straight-line fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub rmse: f64,
    pub n: usize,
    pub slope_std_error: Option<f64>,
    pub slope_p_value: Option<f64>,
}

/// Least-squares line through `(xs[i], ys[i])`.
///
/// Fails when fewer than two distinct x-values exist. R² is clamped into
/// [0, 1]; a constant y that the line reproduces exactly scores 1.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Result<LineFit, String> {
    if xs.len() != ys.len() {
        return Err(format!("{} x-values vs {} y-values", xs.len(), ys.len()));
    }
    if xs.len() < 2 {
        return Err(format!("{} usable point(s), need at least 2", xs.len()));
    }
    if xs.iter().all(|x| *x == xs[0]) {
        return Err("zero variance in x (fewer than 2 distinct values)".to_string());
    }

    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut ss_tot = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        sxx += (x - x_mean) * (x - x_mean);
        sxy += (x - x_mean) * (y - y_mean);
        ss_tot += (y - y_mean) * (y - y_mean);
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = y - (slope * x + intercept);
            r * r
        })
        .sum();

    // Scale-aware zero test: a mean that is off by one ulp leaves ss_tot tiny but nonzero
    let scale = ys.iter().map(|y| y * y).sum::<f64>().max(f64::MIN_POSITIVE);
    let negligible = |v: f64| v <= 1e-20 * scale;
    let r_squared = if negligible(ss_tot) {
        if negligible(ss_res) {
            1.0
        } else {
            0.0
        }
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    let (slope_std_error, slope_p_value) = slope_significance(slope, ss_res, sxx, xs.len());

    Ok(LineFit {
        slope,
        intercept,
        r_squared,
        rmse: (ss_res / n).sqrt(),
        n: xs.len(),
        slope_std_error,
        slope_p_value,
    })
}

/// Standard error of the slope and the two-sided p-value of H0: slope = 0,
/// from Student's t with n − 2 degrees of freedom.
fn slope_significance(slope: f64, ss_res: f64, sxx: f64, n: usize) -> (Option<f64>, Option<f64>) {
    if n < 3 {
        return (None, None);
    }
    let df = (n - 2) as f64;
    let se = (ss_res / df / sxx).sqrt();
    if !se.is_finite() {
        return (None, None);
    }
    if se == 0.0 {
        return (Some(0.0), Some(0.0));
    }

    let t_stat = slope / se;
    let p = StudentsT::new(0.0, 1.0, df)
        .ok()
        .map(|t_dist| (2.0 * (1.0 - t_dist.cdf(t_stat.abs()))).clamp(0.0, 1.0));
    (Some(se), p)
}

/// The (x, y) pair a model plots for one point, or `None` if the point
/// cannot be used by that model.
fn plot_pair(model: DriveModel, p: &DiagnosticPoint) -> Option<(f64, f64)> {
    match model {
        DriveModel::Volumetric => Some((p.eo, p.f)),
        DriveModel::GasCap => Some((p.eg_over_eo?, p.f_over_eo?)),
        DriveModel::Water => Some((p.efw, p.f)),
        DriveModel::Solution => Some((p.et, p.f)),
        DriveModel::Gas => Some((p.gp, p.p_over_z?)),
    }
}

/// Physical parameters read off a fitted line
fn derive_parameters(model: DriveModel, fit: &LineFit, used: &[&DiagnosticPoint]) -> DriveParameters {
    let nonzero = |v: f64| (v.abs() > f64::EPSILON).then_some(v);
    match model {
        DriveModel::Volumetric | DriveModel::Solution => DriveParameters {
            n: Some(fit.slope),
            ..Default::default()
        },
        DriveModel::GasCap => DriveParameters {
            n: Some(fit.intercept),
            m: nonzero(fit.intercept).map(|n| fit.slope / n),
            ..Default::default()
        },
        DriveModel::Water => {
            // Pot aquifer: We = U·(Pi − P), so U is the constant influx per psi of mean drawdown
            let mean_dp = used.iter().map(|p| p.delta_p).sum::<f64>() / used.len().max(1) as f64;
            DriveParameters {
                n: Some(fit.slope),
                we: Some(fit.intercept),
                u: (mean_dp > 0.0).then(|| fit.intercept / mean_dp),
                ..Default::default()
            }
        }
        DriveModel::Gas => DriveParameters {
            g: nonzero(fit.slope).map(|s| -fit.intercept / s),
            ..Default::default()
        },
    }
}

/// Fit one drive model over the diagnostic points it can use.
pub fn fit_model(points: &[DiagnosticPoint], model: DriveModel) -> EngineResult<RegressionResult> {
    let used: Vec<&DiagnosticPoint> = points
        .iter()
        .filter(|p| plot_pair(model, p).is_some())
        .collect();
    let (xs, ys): (Vec<f64>, Vec<f64>) = used.iter().filter_map(|p| plot_pair(model, p)).unzip();

    let fit = fit_line(&xs, &ys)
        .map_err(|reason| EngineError::DegenerateRegression { model, reason })?;
    let parameters = derive_parameters(model, &fit, &used);

    debug!(
        model = %model,
        points = fit.n,
        slope = fit.slope,
        intercept = fit.intercept,
        r_squared = fit.r_squared,
        "Fitted drive model"
    );

    Ok(RegressionResult {
        model,
        slope: fit.slope,
        intercept: fit.intercept,
        r_squared: fit.r_squared,
        rmse: fit.rmse,
        point_count: fit.n,
        slope_std_error: fit.slope_std_error,
        slope_p_value: fit.slope_p_value,
        parameters,
    })
}

/// Fit every model applicable to the fluid type, keeping per-model failures.
pub fn fit_all(points: &[DiagnosticPoint], fluid: FluidType) -> ModelFits {
    ModelFits {
        results: DriveModel::applicable_to(fluid)
            .iter()
            .map(|&model| (model, fit_model(points, model)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(i: usize, eo: f64, f: f64) -> DiagnosticPoint {
        let eg = eo * 0.5;
        DiagnosticPoint {
            date: NaiveDate::from_ymd_opt(2010 + i as i32, 1, 1).unwrap(),
            pressure: 4000.0 - 100.0 * i as f64,
            f,
            eo,
            eg,
            efw: 0.001 * i as f64,
            et: eo + eg + 0.001 * i as f64,
            eg_over_eo: (eo.abs() > 1e-9).then(|| eg / eo),
            f_over_eo: (eo.abs() > 1e-9).then(|| f / eo),
            np: 1e5 * i as f64,
            gp: 1e6 * i as f64,
            wp: 0.0,
            delta_p: 100.0 * i as f64,
            p_over_z: None,
        }
    }

    #[test]
    fn test_two_points_exact_line() {
        let fit = fit_line(&[1.0, 3.0], &[2.0, 10.0]).unwrap();
        assert!((fit.slope - 4.0).abs() < 1e-12);
        assert!((fit.intercept + 2.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.rmse < 1e-12);
        assert!(fit.slope_p_value.is_none());
    }

    #[test]
    fn test_two_points_with_equal_y_are_exact() {
        let fit = fit_line(&[1.0, 2.0], &[0.1, 0.1]).unwrap();
        assert_eq!(fit.r_squared, 1.0);
    }

    #[test]
    fn test_r_squared_in_unit_interval_for_noise() {
        let xs: Vec<f64> = (0..20).map(f64::from).collect();
        let ys: Vec<f64> = xs.iter().map(|x| if (*x as i64) % 2 == 0 { 5.0 } else { -5.0 }).collect();
        let fit = fit_line(&xs, &ys).unwrap();
        assert!((0.0..=1.0).contains(&fit.r_squared));
        assert!(fit.r_squared < 0.1);
        assert!(fit.slope_p_value.unwrap() > 0.05);
    }

    #[test]
    fn test_zero_x_variance_is_degenerate() {
        assert!(fit_line(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(fit_line(&[2.0], &[1.0]).is_err());
    }

    #[test]
    fn test_volumetric_recovers_n() {
        let n_true = 25.0e6;
        let points: Vec<DiagnosticPoint> = (0..8)
            .map(|i| {
                let eo = 0.002 + 0.004 * i as f64;
                point(i, eo, n_true * eo)
            })
            .collect();
        let result = fit_model(&points, DriveModel::Volumetric).unwrap();
        let n = result.parameters.n.unwrap();
        assert!((n - n_true).abs() / n_true < 1e-9, "N = {n}");
        assert!(result.intercept.abs() < 1e-3);
        assert!((result.r_squared - 1.0).abs() < 1e-12);
        assert!(result.slope_p_value.unwrap() < 1e-6);
    }

    #[test]
    fn test_gascap_recovers_n_and_m() {
        let (n_true, m_true) = (10.0e6, 0.3);
        let points: Vec<DiagnosticPoint> = (1..6)
            .map(|i| {
                let eo = 0.01 * i as f64;
                let mut p = point(i, eo, 0.0);
                // vary Eg/Eo so the x-axis is not constant
                p.eg = eo * (0.2 + 0.1 * i as f64);
                p.f = n_true * (eo + m_true * p.eg);
                p.eg_over_eo = Some(p.eg / eo);
                p.f_over_eo = Some(p.f / eo);
                p
            })
            .collect();
        let result = fit_model(&points, DriveModel::GasCap).unwrap();
        assert!((result.parameters.n.unwrap() - n_true).abs() / n_true < 1e-9);
        assert!((result.parameters.m.unwrap() - m_true).abs() < 1e-9);
    }

    #[test]
    fn test_gascap_skips_points_without_ratios() {
        let mut points: Vec<DiagnosticPoint> = (1..4).map(|i| point(i, 0.01 * i as f64, 1.0)).collect();
        points.insert(0, point(0, 0.0, 0.0));
        assert!(!points[0].has_ratios());
        // Eg/Eo is constant at 0.5 on the remaining points
        let err = fit_model(&points, DriveModel::GasCap).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateRegression { model: DriveModel::GasCap, .. }));
    }

    #[test]
    fn test_water_reports_pot_aquifer_constant() {
        let points: Vec<DiagnosticPoint> = (1..5)
            .map(|i| {
                let mut p = point(i, 0.01 * i as f64, 0.0);
                p.f = 5.0e6 * p.efw + 2000.0;
                p
            })
            .collect();
        let result = fit_model(&points, DriveModel::Water).unwrap();
        assert!((result.parameters.n.unwrap() - 5.0e6).abs() < 1e-3);
        assert!((result.parameters.we.unwrap() - 2000.0).abs() < 1e-6);
        // mean ΔP = 250 psi
        assert!((result.parameters.u.unwrap() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_gas_model_recovers_g() {
        let g_true = 50.0e9;
        let pi_over_zi = 5000.0;
        let points: Vec<DiagnosticPoint> = (0..5)
            .map(|i| {
                let mut p = point(i, 0.0, 0.0);
                p.gp = 5.0e9 * i as f64;
                p.p_over_z = Some(pi_over_zi * (1.0 - p.gp / g_true));
                p
            })
            .collect();
        let result = fit_model(&points, DriveModel::Gas).unwrap();
        let g = result.parameters.g.unwrap();
        assert!((g - g_true).abs() / g_true < 1e-9, "G = {g}");
    }

    #[test]
    fn test_gas_model_needs_p_over_z() {
        let points: Vec<DiagnosticPoint> = (0..5).map(|i| point(i, 0.01, 1.0)).collect();
        assert!(fit_model(&points, DriveModel::Gas).is_err());
    }

    #[test]
    fn test_fit_all_for_oil_skips_gas_model() {
        let points: Vec<DiagnosticPoint> = (1..6).map(|i| point(i, 0.01 * i as f64, 1e5 * i as f64)).collect();
        let fits = fit_all(&points, FluidType::Oil);
        assert_eq!(fits.results.len(), 4);
        assert!(!fits.results.contains_key(&DriveModel::Gas));
        assert!(fits.get(DriveModel::Volumetric).is_some());
        for r in fits.successful() {
            assert!((0.0..=1.0).contains(&r.r_squared));
        }
    }
}
