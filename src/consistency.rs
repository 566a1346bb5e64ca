//! Contact Consistency Scorer
//!
//! Compares measured GOC/OWC depths with the contact track the fitted model
//! implies. Each deviation is expressed as a fraction of the total contact
//! travel range and graded:
//!
//! - fraction ≤ warning_fraction: no issue
//! - warning_fraction < fraction ≤ error_fraction: warning (half weight)
//! - fraction > error_fraction: error (full weight)
//!
//! score = 100 − min(100, 100·Σ(weight·fraction) / n_observations)

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::ConsistencyConfig;
use crate::forecast::ContactState;
use crate::types::{
    ConsistencyIssue, ConsistencyResult, ContactObservation, ForecastPoint, IssueSeverity, ReservoirMetadata,
};

/// Predicted contacts at `date`: linear in time between bracketing track
/// points, the nearest end outside the track, the initial contacts without one.
pub fn predicted_contacts(track: &[ForecastPoint], date: NaiveDate, metadata: &ReservoirMetadata) -> ContactState {
    let (Some(first), Some(last)) = (track.first(), track.last()) else {
        return ContactState::initial(metadata);
    };
    let state = |p: &ForecastPoint| ContactState {
        goc_ft: p.goc_ft,
        owc_ft: p.owc_ft,
    };
    if date <= first.date {
        return state(first);
    }
    if date >= last.date {
        return state(last);
    }

    let idx = track.partition_point(|p| p.date < date);
    let (a, b) = (&track[idx - 1], &track[idx]);
    let span = (b.date - a.date).num_days() as f64;
    if span <= 0.0 {
        return state(b);
    }
    let t = (date - a.date).num_days() as f64 / span;
    ContactState {
        goc_ft: a.goc_ft + t * (b.goc_ft - a.goc_ft),
        owc_ft: a.owc_ft + t * (b.owc_ft - a.owc_ft),
    }
}

/// Grade one deviation; returns the severity and its weighted contribution.
fn grade(fraction: f64, config: &ConsistencyConfig) -> Option<(IssueSeverity, f64)> {
    if fraction > config.error_fraction {
        Some((IssueSeverity::Error, config.error_weight * fraction))
    } else if fraction > config.warning_fraction {
        Some((IssueSeverity::Warning, config.warning_weight * fraction))
    } else {
        None
    }
}

/// Score measured contacts against a contact track (hindcast and/or
/// forecast points, any order). An empty observation list scores 100.
///
/// Measured GOC below measured OWC and projected crossings are reported as
/// errors without affecting the score.
pub fn score_contacts(
    observations: &[ContactObservation],
    track: &[ForecastPoint],
    metadata: &ReservoirMetadata,
    config: &ConsistencyConfig,
) -> ConsistencyResult {
    if observations.is_empty() {
        return ConsistencyResult::clean();
    }

    let mut track: Vec<ForecastPoint> = track.to_vec();
    track.sort_by_key(|p| p.date);
    let mut observations: Vec<&ContactObservation> = observations.iter().collect();
    observations.sort_by_key(|o| o.date);

    let range = metadata.contact_travel_range_ft();
    let mut issues = Vec::new();
    let mut weighted = 0.0;

    for obs in &observations {
        let predicted = predicted_contacts(&track, obs.date, metadata);
        let checks = [
            ("GOC", obs.goc_ft, predicted.goc_ft),
            ("OWC", obs.owc_ft, predicted.owc_ft),
        ];
        for (contact, measured, expected) in checks {
            let deviation = (measured - expected).abs();
            let fraction = deviation / range;
            if let Some((severity, contribution)) = grade(fraction, config) {
                weighted += contribution;
                issues.push(ConsistencyIssue {
                    date: obs.date,
                    severity,
                    message: format!(
                        "{contact} measured at {measured:.1} ft ({}) vs {expected:.1} ft predicted: {deviation:.1} ft, {:.1}% of the {range:.1} ft contact range",
                        obs.method,
                        fraction * 100.0
                    ),
                });
            }
        }

        if obs.goc_ft > obs.owc_ft {
            issues.push(ConsistencyIssue {
                date: obs.date,
                severity: IssueSeverity::Error,
                message: format!(
                    "Measured GOC {:.1} ft lies below measured OWC {:.1} ft ({})",
                    obs.goc_ft, obs.owc_ft, obs.method
                ),
            });
        }
    }

    if let Some(p) = track.iter().find(|p| p.contacts_crossed()) {
        issues.push(ConsistencyIssue {
            date: p.date,
            severity: IssueSeverity::Error,
            message: format!(
                "Predicted GOC {:.1} ft crosses predicted OWC {:.1} ft",
                p.goc_ft, p.owc_ft
            ),
        });
    }
    issues.sort_by_key(|i| i.date);

    let penalty = (100.0 * weighted / observations.len() as f64).min(100.0);
    let score = (100.0 - penalty).round().clamp(0.0, 100.0) as u8;

    debug!(observations = observations.len(), weighted, "Scored contact observations");
    info!(score, issues = issues.len(), "Contact consistency check complete");

    ConsistencyResult { score, issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dataset::fixtures::oil_metadata;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn obs(d: NaiveDate, goc_ft: f64, owc_ft: f64) -> ContactObservation {
        ContactObservation {
            date: d,
            goc_ft,
            owc_ft,
            method: "RST log".to_string(),
        }
    }

    fn track_point(d: NaiveDate, goc_ft: f64, owc_ft: f64) -> ForecastPoint {
        ForecastPoint {
            date: d,
            elapsed_years: 0.0,
            oil_rate: 0.0,
            cumulative_oil: 0.0,
            gas_rate: 0.0,
            cumulative_gas: 0.0,
            cumulative_water: 0.0,
            pressure: 3000.0,
            goc_ft,
            owc_ft,
        }
    }

    #[test]
    fn test_no_observations_scores_100() {
        let track = vec![track_point(date(2020, 1, 1), 5200.0, 5100.0)];
        let result = score_contacts(&[], &track, &oil_metadata(), &ConsistencyConfig::default());
        assert_eq!(result, ConsistencyResult::clean());
    }

    #[test]
    fn test_exact_match_scores_100() {
        let meta = oil_metadata();
        let o = [obs(date(2020, 1, 1), meta.goc0_ft, meta.owc0_ft)];
        let result = score_contacts(&o, &[], &meta, &ConsistencyConfig::default());
        assert_eq!(result.score, 100);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_score_strictly_decreases_with_deviation() {
        let meta = oil_metadata();
        let config = ConsistencyConfig::default();
        // 100 ft contact range: offsets of 8, 12, 20, 35, 60 ft
        let scores: Vec<u8> = [8.0, 12.0, 20.0, 35.0, 60.0]
            .iter()
            .map(|offset| {
                let o = [obs(date(2020, 1, 1), meta.goc0_ft - offset, meta.owc0_ft)];
                score_contacts(&o, &[], &meta, &config).score
            })
            .collect();
        assert!(scores.windows(2).all(|w| w[1] < w[0]), "{scores:?}");
    }

    #[test]
    fn test_severity_thresholds() {
        let meta = oil_metadata();
        let config = ConsistencyConfig::default();

        let small = [obs(date(2020, 1, 1), meta.goc0_ft - 4.0, meta.owc0_ft)];
        assert!(score_contacts(&small, &[], &meta, &config).issues.is_empty());

        let warn = [obs(date(2020, 1, 1), meta.goc0_ft - 10.0, meta.owc0_ft)];
        let result = score_contacts(&warn, &[], &meta, &config);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].severity, IssueSeverity::Warning);
        // 0.5 × 10% → 5 points
        assert_eq!(result.score, 95);

        let err = [obs(date(2020, 1, 1), meta.goc0_ft, meta.owc0_ft + 30.0)];
        let result = score_contacts(&err, &[], &meta, &config);
        assert_eq!(result.issues[0].severity, IssueSeverity::Error);
        assert!(result.issues[0].message.starts_with("OWC"));
        assert_eq!(result.score, 70);
    }

    #[test]
    fn test_penalty_is_capped() {
        let meta = oil_metadata();
        let o = [obs(date(2020, 1, 1), meta.goc0_ft - 500.0, meta.owc0_ft + 500.0)];
        let result = score_contacts(&o, &[], &meta, &ConsistencyConfig::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.error_count(), 2);
    }

    #[test]
    fn test_track_is_interpolated_in_time() {
        let meta = oil_metadata();
        let track = vec![
            track_point(date(2020, 1, 1), 5000.0, 5100.0),
            track_point(date(2020, 1, 11), 5000.0, 5080.0),
        ];
        let mid = predicted_contacts(&track, date(2020, 1, 6), &meta);
        assert!((mid.owc_ft - 5090.0).abs() < 1e-9);
        let before = predicted_contacts(&track, date(2019, 1, 1), &meta);
        assert_eq!(before.owc_ft, 5100.0);
        let after = predicted_contacts(&track, date(2030, 1, 1), &meta);
        assert_eq!(after.owc_ft, 5080.0);

        let o = [obs(date(2020, 1, 6), 5000.0, 5090.0)];
        assert_eq!(score_contacts(&o, &track, &meta, &ConsistencyConfig::default()).score, 100);
    }

    #[test]
    fn test_inverted_measurement_and_crossing_are_errors_without_penalty() {
        let meta = oil_metadata();
        let track = vec![
            track_point(date(2020, 1, 1), 5050.0, 5050.0),
            track_point(date(2021, 1, 1), 5060.0, 5040.0),
        ];
        let o = [obs(date(2020, 1, 1), 5050.0, 5050.0)];
        let result = score_contacts(&o, &track, &meta, &ConsistencyConfig::default());
        assert_eq!(result.score, 100);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.issues[0].date, date(2021, 1, 1));

        let inverted = [obs(date(2020, 1, 1), 5070.0, 5030.0)];
        let crossed = [track_point(date(2020, 1, 1), 5070.0, 5030.0)];
        let result = score_contacts(&inverted, &crossed, &meta, &ConsistencyConfig::default());
        assert_eq!(result.score, 100);
        // measured inversion plus the crossed track point
        assert_eq!(result.error_count(), 2);
    }

    #[test]
    fn test_zero_column_uses_net_thickness() {
        let mut meta = oil_metadata();
        meta.owc0_ft = meta.goc0_ft;
        // 50 ft net thickness: 10 ft is 20% → error
        let o = [obs(date(2020, 1, 1), meta.goc0_ft - 10.0, meta.owc0_ft)];
        let result = score_contacts(&o, &[], &meta, &ConsistencyConfig::default());
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.score, 80);
    }
}
