//! Error types for the primitives.

use ddsim_hal::{ErrorKind, HalError};
use ddsim_ir::IrError;
use thiserror::Error;

/// Errors raised while validating or running primitive PUBs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PrimitiveError {
    /// A binding holds a different number of values than the circuit has
    /// free parameters.
    #[error("Circuit '{circuit}' has {expected} parameters, but {got} values were bound")]
    ParameterCountMismatch {
        /// Circuit name.
        circuit: String,
        /// Free parameters of the circuit.
        expected: usize,
        /// Values per binding.
        got: usize,
    },

    /// A named binding refers to a parameter the circuit does not have.
    #[error("'{0}' is not a parameter of the circuit")]
    UnknownParameter(String),

    /// A named binding leaves a circuit parameter unbound.
    #[error("No value bound for parameter '{0}'")]
    MissingParameter(String),

    /// An observable acts on a different number of qubits than the circuit.
    #[error("Observable acts on {observable} qubits, but the circuit has {circuit}")]
    ObservableWidthMismatch {
        /// Qubits of the observable.
        observable: usize,
        /// Qubits of the circuit.
        circuit: usize,
    },

    /// Malformed Pauli label or operator.
    #[error("Invalid observable: {0}")]
    InvalidObservable(String),

    /// Malformed PUB.
    #[error("Invalid PUB: {0}")]
    InvalidPub(String),

    /// Array data that does not fit the declared shape.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Malformed primitive options.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure in the runner or engine.
    #[error(transparent)]
    Hal(#[from] HalError),

    /// Circuit binding error.
    #[error(transparent)]
    Ir(#[from] IrError),
}

impl PrimitiveError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrimitiveError::Configuration(_) => ErrorKind::Configuration,
            PrimitiveError::Hal(e) => e.kind(),
            PrimitiveError::ParameterCountMismatch { .. }
            | PrimitiveError::UnknownParameter(_)
            | PrimitiveError::MissingParameter(_)
            | PrimitiveError::ObservableWidthMismatch { .. }
            | PrimitiveError::InvalidObservable(_)
            | PrimitiveError::InvalidPub(_)
            | PrimitiveError::InvalidShape(_)
            | PrimitiveError::Ir(_) => ErrorKind::Validation,
        }
    }
}

/// Result type for primitive operations.
pub type PrimitiveResultT<T> = Result<T, PrimitiveError>;
