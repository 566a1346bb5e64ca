//! Drive Mechanism Classifier
//!
//! Recommends the applicable model with the highest R². Ties within the
//! configured tolerance go to the metadata drive hint, then to the fixed
//! preference order volumetric > gascap > water > solution > gas.
//! A user override always becomes the active model.

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::types::{DriveClassification, DriveModel, ModelFits, ReservoirMetadata};

/// Best candidate from a best-first ranking: among fits within `tolerance`
/// of the top R², the hinted model wins, otherwise the preferred one.
fn pick(ranking: &[(DriveModel, f64)], hint: Option<DriveModel>, tolerance: f64) -> Option<DriveModel> {
    let best = ranking.first()?.1;
    let tied: Vec<DriveModel> = ranking
        .iter()
        .filter(|(_, r2)| best - r2 <= tolerance)
        .map(|(m, _)| *m)
        .collect();
    match hint {
        Some(h) if tied.contains(&h) => Some(h),
        _ => tied.into_iter().min(),
    }
}

/// Pick the active drive model.
///
/// Only fits applicable to the reservoir's fluid type are ranked, even if the
/// caller passed more. Without an override, at least one successful fit is
/// required.
pub fn classify(
    fits: &ModelFits,
    metadata: &ReservoirMetadata,
    user_override: Option<DriveModel>,
    r2_tie_tolerance: f64,
) -> EngineResult<DriveClassification> {
    let applicable = DriveModel::applicable_to(metadata.fluid);
    let mut ranking: Vec<(DriveModel, f64)> = fits
        .successful()
        .filter(|r| applicable.contains(&r.model))
        .map(|r| (r.model, r.r_squared))
        .collect();
    ranking.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let recommended = pick(&ranking, metadata.drive_hint, r2_tie_tolerance);
    if let Some(idx) = recommended.and_then(|rec| ranking.iter().position(|(m, _)| *m == rec)) {
        let entry = ranking.remove(idx);
        ranking.insert(0, entry);
    }
    debug!(?ranking, ?recommended, "Ranked drive models");

    let active = match (user_override, recommended) {
        (Some(choice), rec) => {
            if rec.is_some_and(|r| r != choice) {
                info!(
                    user_choice = %choice,
                    recommended = ?rec,
                    "User-selected drive model differs from recommendation"
                );
            }
            choice
        }
        (None, Some(rec)) => rec,
        (None, None) => {
            return Err(EngineError::NoApplicableModel {
                fluid: metadata.fluid.to_string(),
            })
        }
    };

    Ok(DriveClassification {
        recommended,
        active,
        user_override: user_override.is_some(),
        ranking,
    })
}
