//! Circuit representation for the ddsim primitives.
//!
//! This crate provides the circuit model that the simulation adapter, the
//! experiment runners and the primitives exchange: registers, symbolic
//! parameters, a standard gate set with dense matrices, and the
//! measurement analysis needed to decide how a circuit must be simulated.
//!
//! # Core Components
//!
//! - **Bits and registers**: [`QubitId`], [`ClbitId`], [`QuantumRegister`],
//!   [`ClassicalRegister`]
//! - **Gates**: [`StandardGate`] with [`StandardGate::matrix`]
//! - **Parameters**: [`ParameterExpression`] for variational circuits
//! - **Circuit**: [`Circuit`], a validated, program-ordered instruction list
//!
//! # Example: Binding a Parameterized Circuit
//!
//! ```rust
//! use ddsim_ir::{Circuit, ParameterExpression, QubitId};
//! use rustc_hash::FxHashMap;
//!
//! let mut circuit = Circuit::with_size("variational", 1, 1);
//! circuit.ry(ParameterExpression::symbol("theta"), QubitId(0)).unwrap();
//! assert_eq!(circuit.parameters(), vec!["theta"]);
//!
//! let mut values = FxHashMap::default();
//! values.insert("theta".to_string(), 0.25);
//! let bound = circuit.bind(&values).unwrap();
//! assert!(bound.parameters().is_empty());
//! ```
//!
//! # Bit Order
//!
//! Gate matrices and bitstrings are little-endian: qubit (or clbit) 0 is the
//! least significant bit, i.e. the rightmost character of a bitstring.

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{Instruction, InstructionKind};
pub use parameter::{ParameterExpression, compare_parameter_names};
pub use qubit::{ClassicalRegister, ClbitId, QuantumRegister, QubitId};
