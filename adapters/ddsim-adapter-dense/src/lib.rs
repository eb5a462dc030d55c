//! Dense reference engine for the ddsim simulation adapter.
//!
//! This crate implements [`ddsim_hal::SimulationAdapter`] on top of a full
//! statevector. It provides exact sampling, stochastic noise trajectories
//! with fidelity-bounded approximation, and full unitary construction.
//!
//! # Features
//!
//! - **Exact Sampling**: static circuits are simulated once and sampled
//! - **Dynamic Circuits**: mid-circuit measurement and reset run shot by shot
//! - **Noise Trajectories**: amplitude damping, phase flip and depolarization
//!   drawn after every gate
//! - **Unitary Construction**: sequential or recursive, with the node count
//!   of the equivalent decision diagram
//!
//! # Memory
//!
//! | Qubits | Statevector | Unitary |
//! |--------|-------------|---------|
//! | 10 | ~16 KB | ~16 MB |
//! | 15 | ~512 KB | ~16 GB |
//! | 20 | ~16 MB | - |
//! | 24 | ~256 MB | - |
//!
//! # Example
//!
//! ```rust
//! use ddsim_adapter_dense::DenseSimulator;
//! use ddsim_hal::SimulationAdapter;
//! use ddsim_ir::Circuit;
//!
//! let engine = DenseSimulator::new();
//! let counts = engine.sample(&Circuit::bell().unwrap(), 100, Some(7)).unwrap();
//!
//! assert_eq!(counts.total_shots(), 100);
//! assert_eq!(counts.get("01") + counts.get("10"), 0);
//! ```

mod program;
mod simulator;
mod statevector;
mod trajectory;
mod unitary;

pub use simulator::DenseSimulator;
pub use statevector::Statevector;
