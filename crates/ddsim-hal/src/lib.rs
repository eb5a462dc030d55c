//! Simulation adapter layer for the ddsim primitives.
//!
//! This crate defines the seam between the execution core and a simulation
//! engine, plus the value types that cross it:
//!
//! - [`SimulationAdapter`]: the engine contract (`sample`, `sample_noisy`,
//!   `construct_unitary`, `simulate_state`)
//! - [`RunOptions`]: declarative option sets merged override-over-default
//! - [`ExperimentResult`] / [`BackendResult`]: the normalized result schema
//! - [`Job`]: a deferred-result handle over synchronous work
//!
//! # Example
//!
//! ```rust
//! use ddsim_hal::{RunOptions, resolve_seed};
//! use serde_json::json;
//!
//! let defaults = RunOptions::new().with_shots(1024).with_seed(-1);
//! let overrides = RunOptions::from_value(json!({"seed": 42})).unwrap();
//! let merged = defaults.merge(&overrides);
//!
//! assert_eq!(merged.shots, Some(1024));
//! assert_eq!(resolve_seed(merged.seed_or_unseeded()), Some(42));
//! ```

pub mod adapter;
pub mod error;
pub mod job;
pub mod options;
pub mod result;

pub use adapter::{
    ApproximationConfig, ApproximationStrategy, ConstructionMode, NoiseConfig, NoiseEffects, Seed,
    SimulationAdapter, UnitaryConstruction, resolve_seed,
};
pub use error::{ErrorKind, HalError, HalResult};
pub use job::{Job, JobId, JobStatus};
pub use options::RunOptions;
pub use result::{
    BackendResult, Counts, ExperimentData, ExperimentHeader, ExperimentResult, bin_to_hex,
    hex_to_bin,
};
