//! Shared data structures for reservoir material-balance analysis
//!
//! - `dataset` - metadata and the four input record streams
//! - `diagnostics` - per-date Havlena-Odeh terms
//! - `regression` - drive models, fits and the classifier decision
//! - `forecast` - production schedule and forecast/hindcast points
//! - `consistency` - contact QC score and issues

pub mod dataset;
mod diagnostics;
mod regression;
mod forecast;
mod consistency;

pub use dataset::*;
pub use diagnostics::*;
pub use regression::*;
pub use forecast::*;
pub use consistency::*;
