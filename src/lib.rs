//! MBAL Engine: Reservoir Material-Balance Analysis
//!
//! Deterministic diagnostics, drive-mechanism regression and forecasting over
//! in-memory reservoir datasets.
//!
//! ## Architecture
//!
//! - **Diagnostics**: F, Eo, Eg, Efw, Et and p/z per matched survey date
//! - **Regression**: Havlena-Odeh straight-line fits for five drive models
//! - **Classifier**: recommended and active drive mechanism
//! - **Forecast**: decline-curve production, pressure inversion, contact movement
//! - **Consistency**: measured vs predicted contacts, scored 0-100
//! - **Session**: caller-owned result cache keyed by input fingerprint
//! - **Synthetic**: clean or noisy volumetric-depletion datasets for demos and tests

pub mod config;
pub mod consistency;
pub mod error;
pub mod forecast;
pub mod material_balance;
pub mod session;
pub mod synthetic;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, EngineConfig};

// Re-export errors
pub use error::{EngineError, EngineResult};

// Re-export commonly used types
pub use types::{
    ConsistencyIssue, ConsistencyResult, ContactObservation, DiagnosticPoint, DriveClassification,
    DriveModel, DriveParameters, FluidType, ForecastPoint, ForecastRun, IssueSeverity, ModelFits,
    PressureRecord, ProductionRecord, ProductionSchedule, PvtRecord, RegressionResult, ReservoirDataset,
    ReservoirMetadata, Scenario,
};

// Re-export pipeline stages
pub use consistency::score_contacts;
pub use forecast::{ForecastEngine, PressureSolver};
pub use material_balance::{classify, compute_diagnostics, fit_all, fit_model, DiagnosticSet};
pub use session::{AnalysisSession, ResultCache};
