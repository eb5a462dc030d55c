//! Primitive unified blocs (PUBs): a circuit plus its run-time inputs.
//!
//! Both PUB kinds coerce from tuples so callers can write
//! `(circuit, values)` or `(circuit, observables, values)` directly.
//! Coercion never fails; [`validate`](SamplerPub::validate) runs before any
//! engine call.

use ddsim_ir::Circuit;

use crate::bindings::BindingsArray;
use crate::error::{PrimitiveError, PrimitiveResultT};
use crate::observable::Observable;

/// A circuit to sample, with optional bindings and shot override.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerPub {
    /// Circuit to sample.
    pub circuit: Circuit,
    /// Values for the circuit's free parameters.
    pub parameter_values: BindingsArray,
    /// Shots for this PUB, overriding the run-level value.
    pub shots: Option<u32>,
}

impl SamplerPub {
    /// Build a sampler PUB.
    pub fn new(circuit: Circuit, parameter_values: BindingsArray, shots: Option<u32>) -> Self {
        Self {
            circuit,
            parameter_values,
            shots,
        }
    }

    /// Leading shape of the results.
    pub fn shape(&self) -> &[usize] {
        self.parameter_values.shape()
    }

    /// Check the PUB before simulation.
    pub fn validate(&self) -> PrimitiveResultT<()> {
        if self.shots == Some(0) {
            return Err(PrimitiveError::InvalidPub(format!(
                "PUB for circuit '{}' requests zero shots",
                self.circuit.name()
            )));
        }
        Ok(())
    }
}

impl From<Circuit> for SamplerPub {
    fn from(circuit: Circuit) -> Self {
        Self::new(circuit, BindingsArray::empty(), None)
    }
}

impl<B: Into<BindingsArray>> From<(Circuit, B)> for SamplerPub {
    fn from((circuit, values): (Circuit, B)) -> Self {
        Self::new(circuit, values.into(), None)
    }
}

impl<B: Into<BindingsArray>> From<(Circuit, B, u32)> for SamplerPub {
    fn from((circuit, values, shots): (Circuit, B, u32)) -> Self {
        Self::new(circuit, values.into(), Some(shots))
    }
}

/// A circuit with observables to evaluate, and optional bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorPub {
    /// Circuit preparing the state.
    pub circuit: Circuit,
    /// Observables, each on the circuit's qubit count.
    pub observables: Vec<Observable>,
    /// Values for the circuit's free parameters.
    pub parameter_values: BindingsArray,
}

impl EstimatorPub {
    /// Build an estimator PUB.
    pub fn new(
        circuit: Circuit,
        observables: Vec<Observable>,
        parameter_values: BindingsArray,
    ) -> Self {
        Self {
            circuit,
            observables,
            parameter_values,
        }
    }

    /// Leading shape of the bindings. Results append an observables axis.
    pub fn shape(&self) -> &[usize] {
        self.parameter_values.shape()
    }

    /// Check the PUB before simulation.
    pub fn validate(&self) -> PrimitiveResultT<()> {
        if self.observables.is_empty() {
            return Err(PrimitiveError::InvalidPub(format!(
                "PUB for circuit '{}' has no observables",
                self.circuit.name()
            )));
        }
        let width = self.circuit.num_qubits();
        if let Some(obs) = self.observables.iter().find(|o| o.num_qubits() != width) {
            return Err(PrimitiveError::ObservableWidthMismatch {
                observable: obs.num_qubits(),
                circuit: width,
            });
        }
        Ok(())
    }
}

impl From<(Circuit, Vec<Observable>)> for EstimatorPub {
    fn from((circuit, observables): (Circuit, Vec<Observable>)) -> Self {
        Self::new(circuit, observables, BindingsArray::empty())
    }
}

impl From<(Circuit, Observable)> for EstimatorPub {
    fn from((circuit, observable): (Circuit, Observable)) -> Self {
        Self::new(circuit, vec![observable], BindingsArray::empty())
    }
}

impl<B: Into<BindingsArray>> From<(Circuit, Vec<Observable>, B)> for EstimatorPub {
    fn from((circuit, observables, values): (Circuit, Vec<Observable>, B)) -> Self {
        Self::new(circuit, observables, values.into())
    }
}
