//! Material Balance Module
//!
//! Deterministic Havlena-Odeh analysis over in-memory datasets.
//! Everything here is a pure function of its inputs.
//!
//! ## Stages
//! - `compute_diagnostics()` - F, Eo, Eg, Efw, Et and p/z per matched date
//! - `fit_model()` / `fit_all()` - straight-line fits per drive model
//! - `classify()` - recommended and active drive mechanism

pub mod classifier;
pub mod diagnostics;
pub mod pvt;
pub mod regression;

pub use classifier::classify;
pub use diagnostics::{compute_diagnostics, DiagnosticSet, Expansion, InitialConditions};
pub use pvt::{PvtProperties, PvtTable, ZFactorSource};
pub use regression::{fit_all, fit_line, fit_model, LineFit};
