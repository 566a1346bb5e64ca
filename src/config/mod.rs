//! Engine Configuration Module
//!
//! Numerical tolerances, forecast stepping and QC thresholds loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `MBAL_CONFIG` environment variable (path to TOML file)
//! 2. `mbal_config.toml` in the current working directory
//! 3. Built-in defaults (`config::defaults`)
//!
//! The loaded `EngineConfig` is passed explicitly into each analysis session;
//! there is no process-global copy.

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;
