//! Analysis session and result cache
//!
//! A session owns one reservoir dataset and the engine config. Derived
//! results live in a `ResultCache` keyed by an md5 fingerprint of the
//! serialised inputs: diagnostics and fits are recomputed wholesale when the
//! fingerprint changes, forecasts and consistency results are replaced on each
//! explicit run. A failed run never clears what the cache already holds.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::consistency::score_contacts;
use crate::error::{EngineError, EngineResult};
use crate::forecast::ForecastEngine;
use crate::material_balance::{classify, compute_diagnostics, fit_all, DiagnosticSet};
use crate::types::{
    ConsistencyResult, ContactObservation, DiagnosticPoint, DriveClassification, DriveModel, ForecastPoint,
    ForecastRun, ModelFits, PressureRecord, ProductionRecord, ProductionSchedule, PvtRecord, ReservoirDataset,
    ReservoirMetadata, Scenario,
};

/// md5 of the JSON serialisation of `value`
pub fn input_fingerprint<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    match serde_json::to_vec(value) {
        Ok(bytes) => Some(format!("{:x}", md5::compute(bytes))),
        Err(e) => {
            warn!(error = %e, "Could not fingerprint inputs, results will not be cached");
            None
        }
    }
}

#[derive(Debug, Clone)]
struct CachedAnalysis {
    fingerprint: Option<String>,
    diagnostics: DiagnosticSet,
    fits: ModelFits,
}

#[derive(Debug, Clone)]
struct CachedForecast {
    /// Fingerprint of the analysis the forecast was run on
    fingerprint: Option<String>,
    run: ForecastRun,
    hindcast: Vec<ForecastPoint>,
}

/// Latest successful result of each stage
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    analysis: Option<CachedAnalysis>,
    forecast: Option<CachedForecast>,
    consistency: Option<ConsistencyResult>,
}

impl ResultCache {
    pub fn diagnostics(&self) -> Option<&[DiagnosticPoint]> {
        self.analysis.as_ref().map(|a| a.diagnostics.points.as_slice())
    }

    pub fn fits(&self) -> Option<&ModelFits> {
        self.analysis.as_ref().map(|a| &a.fits)
    }

    pub fn forecast(&self) -> Option<&ForecastRun> {
        self.forecast.as_ref().map(|f| &f.run)
    }

    pub fn hindcast(&self) -> Option<&[ForecastPoint]> {
        self.forecast.as_ref().map(|f| f.hindcast.as_slice())
    }

    pub fn consistency(&self) -> Option<&ConsistencyResult> {
        self.consistency.as_ref()
    }

    /// Fingerprint of the inputs behind the cached diagnostics
    pub fn fingerprint(&self) -> Option<&str> {
        self.analysis.as_ref().and_then(|a| a.fingerprint.as_deref())
    }
}

/// Bring the cached diagnostics and fits up to date with the inputs.
fn refresh_analysis<'c>(
    slot: &'c mut Option<CachedAnalysis>,
    dataset: &ReservoirDataset,
    config: &EngineConfig,
) -> EngineResult<&'c CachedAnalysis> {
    let fingerprint = input_fingerprint(&(
        &dataset.metadata,
        &dataset.production,
        &dataset.pressure,
        &dataset.pvt,
        config,
    ));
    let stale = match (slot.as_ref(), fingerprint.as_ref()) {
        (Some(cached), Some(fp)) => cached.fingerprint.as_ref() != Some(fp),
        _ => true,
    };

    if stale {
        let diagnostics = compute_diagnostics(
            &dataset.metadata,
            &dataset.production,
            &dataset.pressure,
            &dataset.pvt,
            config,
        )?;
        let fits = fit_all(&diagnostics.points, dataset.metadata.fluid);
        debug!(
            fingerprint = fingerprint.as_deref().unwrap_or("-"),
            points = diagnostics.points.len(),
            fitted = fits.successful().count(),
            "Analysis recomputed"
        );
        return Ok(slot.insert(CachedAnalysis {
            fingerprint,
            diagnostics,
            fits,
        }));
    }

    debug!("Analysis served from cache");
    slot.as_ref()
        .ok_or(EngineError::EmptyDiagnosticSet { usable: 0 })
}

/// One caller's analysis of one reservoir
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    config: EngineConfig,
    dataset: ReservoirDataset,
    cache: ResultCache,
}

impl AnalysisSession {
    pub fn new(dataset: ReservoirDataset, config: EngineConfig) -> Self {
        Self {
            config,
            dataset,
            cache: ResultCache::default(),
        }
    }

    pub fn dataset(&self) -> &ReservoirDataset {
        &self.dataset
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Replace the reservoir metadata. Invalid metadata is rejected and the
    /// current metadata kept.
    pub fn update_metadata(&mut self, metadata: ReservoirMetadata) -> EngineResult<()> {
        metadata.validate()?;
        self.dataset.metadata = metadata;
        Ok(())
    }

    pub fn replace_production(&mut self, records: Vec<ProductionRecord>) {
        self.dataset.production = records;
    }

    pub fn replace_pressure(&mut self, records: Vec<PressureRecord>) {
        self.dataset.pressure = records;
    }

    pub fn replace_pvt(&mut self, records: Vec<PvtRecord>) {
        self.dataset.pvt = records;
    }

    pub fn replace_contacts(&mut self, observations: Vec<ContactObservation>) {
        self.dataset.contacts = observations;
    }

    pub fn diagnostics(&mut self) -> EngineResult<&[DiagnosticPoint]> {
        let analysis = refresh_analysis(&mut self.cache.analysis, &self.dataset, &self.config)?;
        Ok(&analysis.diagnostics.points)
    }

    pub fn fit_models(&mut self) -> EngineResult<&ModelFits> {
        let analysis = refresh_analysis(&mut self.cache.analysis, &self.dataset, &self.config)?;
        Ok(&analysis.fits)
    }

    pub fn classify(&mut self, user_override: Option<DriveModel>) -> EngineResult<DriveClassification> {
        let analysis = refresh_analysis(&mut self.cache.analysis, &self.dataset, &self.config)?;
        classify(
            &analysis.fits,
            &self.dataset.metadata,
            user_override,
            self.config.regression.r2_tie_tolerance,
        )
    }

    /// Forecast with the active model (the override when given). Replaces
    /// the previous forecast only on success.
    pub fn run_forecast(
        &mut self,
        schedule: &ProductionSchedule,
        user_override: Option<DriveModel>,
    ) -> EngineResult<&ForecastRun> {
        schedule.validate()?;

        let cached = {
            let analysis = refresh_analysis(&mut self.cache.analysis, &self.dataset, &self.config)?;
            let classification = classify(
                &analysis.fits,
                &self.dataset.metadata,
                user_override,
                self.config.regression.r2_tie_tolerance,
            )?;
            let model = classification.active;
            let regression = analysis
                .fits
                .get(model)
                .ok_or(EngineError::MissingRegression(model))?;
            let last = self
                .dataset
                .production
                .iter()
                .max_by_key(|r| r.date)
                .ok_or(EngineError::EmptyDiagnosticSet { usable: 0 })?;

            let engine = ForecastEngine::new(
                &self.config.forecast,
                &self.dataset.metadata,
                &analysis.diagnostics,
                regression,
            )?;
            CachedForecast {
                fingerprint: analysis.fingerprint.clone(),
                run: engine.run(last, schedule)?,
                hindcast: engine.hindcast()?,
            }
        };

        Ok(&self.cache.forecast.insert(cached).run)
    }

    /// Score the measured contacts against the model's contact track: the
    /// current forecast (with its hindcast) when there is one, else the
    /// hindcast of the recommended model, else the initial contacts.
    pub fn run_consistency_check(&mut self) -> &ConsistencyResult {
        let track = match self.contact_track() {
            Ok(track) => track,
            Err(err) => {
                warn!(error = %err, "No model contact track, scoring against initial contacts");
                Vec::new()
            }
        };
        let result = score_contacts(
            &self.dataset.contacts,
            &track,
            &self.dataset.metadata,
            &self.config.consistency,
        );
        self.cache.consistency.insert(result)
    }

    /// Snapshot of the current forecast under `name`, for the caller to keep
    pub fn scenario(&self, name: &str) -> Option<Scenario> {
        self.cache.forecast().map(|run| Scenario {
            name: name.to_string(),
            forecast: run.clone(),
        })
    }

    fn contact_track(&mut self) -> EngineResult<Vec<ForecastPoint>> {
        let analysis = refresh_analysis(&mut self.cache.analysis, &self.dataset, &self.config)?;

        if let Some(cached) = self
            .cache
            .forecast
            .as_ref()
            .filter(|f| f.fingerprint.is_some() && f.fingerprint == analysis.fingerprint)
        {
            let mut track = cached.hindcast.clone();
            track.extend(cached.run.points.iter().cloned());
            return Ok(track);
        }

        let classification = classify(
            &analysis.fits,
            &self.dataset.metadata,
            None,
            self.config.regression.r2_tie_tolerance,
        )?;
        let model = classification.active;
        let regression = analysis
            .fits
            .get(model)
            .ok_or(EngineError::MissingRegression(model))?;
        ForecastEngine::new(
            &self.config.forecast,
            &self.dataset.metadata,
            &analysis.diagnostics,
            regression,
        )?
        .hindcast()
    }
}
