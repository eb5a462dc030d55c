//! Experiment runners and simulator backends for ddsim.
//!
//! Three simulation variants share one [`ExperimentRunner`] type, selected
//! by a [`RunnerKind`] tag:
//!
//! | Backend | Engine call | Result data |
//! |---------|-------------|-------------|
//! | `qasm_simulator` | `sample` | hex counts |
//! | `unitary_simulator` | `construct_unitary` | unitary, node count, construction time |
//! | `stochastic_dd_simulator` | `sample_noisy` | hex counts |
//!
//! A [`SimulatorBackend`] runs a batch of circuits through one runner and
//! returns a [`Job`](ddsim_hal::Job) yielding a
//! [`BackendResult`](ddsim_hal::BackendResult).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ddsim_adapter_dense::DenseSimulator;
//! use ddsim_backend::{RunnerKind, SimulatorBackend};
//! use ddsim_hal::RunOptions;
//! use ddsim_ir::Circuit;
//!
//! let backend = SimulatorBackend::new(RunnerKind::QasmSimulator, Arc::new(DenseSimulator::new()));
//! let job = backend.run(vec![Circuit::bell().unwrap()], RunOptions::new().with_seed(1));
//! let result = job.result().unwrap();
//!
//! let counts = result.results[0].binary_counts().unwrap();
//! assert_eq!(counts.get("00") + counts.get("11"), 1024);
//! ```

mod backend;
mod runner;

pub use backend::SimulatorBackend;
pub use runner::{
    DEFAULT_SHOTS, ExperimentRunner, MAX_UNITARY_QUBITS, RawOutput, RunConfig, RunnerKind,
};
