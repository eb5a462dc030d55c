//! Sampler and estimator primitives over ddsim simulation backends.
//!
//! A primitive takes a batch of PUBs (a circuit plus its run-time inputs),
//! expands each PUB's parameter bindings into bound circuits and returns a
//! [`Job`](ddsim_hal::Job) yielding a [`PrimitiveResult`]:
//!
//! | Primitive | PUB | Per-PUB result |
//! |-----------|-----|----------------|
//! | [`Sampler`] | circuit, bindings, shots | one [`BitArray`] per classical register |
//! | [`Estimator`] | circuit, observables, bindings | expectation values of shape `(*shape, n_obs)` |
//!
//! Bindings are expanded in row-major order, so result entry `i` always
//! belongs to flattened binding `i`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ddsim_adapter_dense::DenseSimulator;
//! use ddsim_ir::Circuit;
//! use ddsim_primitives::{Estimator, Observable, Sampler};
//!
//! let engine = Arc::new(DenseSimulator::new());
//!
//! let sampler = Sampler::new(engine.clone());
//! let result = sampler.run([Circuit::bell().unwrap()], Some(100)).result().unwrap();
//! let counts = result[0].data.get("c").unwrap().get_counts();
//! assert_eq!(counts.get("00") + counts.get("11"), 100);
//!
//! let circuit = Circuit::bell().unwrap().without_final_measurements();
//! let zz = Observable::from_labels([("ZZ", 1.0)]).unwrap();
//! let result = Estimator::new(engine).run([(circuit, zz)]).result().unwrap();
//! assert!((result[0].evs.as_real().unwrap()[[0]] - 1.0).abs() < 1e-12);
//! ```

mod bindings;
mod bit_array;
mod containers;
mod error;
mod estimator;
mod observable;
mod pubs;
mod sampler;

pub use bindings::{BindingsArray, ParameterBindingExpander};
pub use bit_array::BitArray;
pub use containers::{
    DataBin, EstimatorPubResult, ExpectationValues, PrimitiveResult, SamplerPubResult,
};
pub use error::{PrimitiveError, PrimitiveResultT};
pub use estimator::{Estimator, EstimatorOptions};
pub use observable::{Observable, Pauli, PauliString};
pub use pubs::{EstimatorPub, SamplerPub};
pub use sampler::{Sampler, SamplerOptions};
