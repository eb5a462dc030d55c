//! Error types for the HAL crate.

use ddsim_ir::IrError;
use thiserror::Error;

/// Coarse classification of a failure.
///
/// Configuration and validation failures are raised before any engine call.
/// Simulation failures come from the engine and are passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unsupported or malformed options.
    Configuration,
    /// A circuit or input the selected runner cannot accept.
    Validation,
    /// Failure inside the simulation engine.
    Simulation,
}

/// Errors that can occur in HAL operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An option holds a value the engine does not recognize.
    #[error("Unsupported {option}: '{value}'")]
    UnsupportedConfiguration {
        /// Name of the option.
        option: String,
        /// The rejected value.
        value: String,
    },

    /// Circuit exceeds backend capabilities.
    #[error("Circuit has {qubits} qubits, but the backend supports at most {max}")]
    CircuitTooLarge {
        /// Number of qubits in the circuit.
        qubits: usize,
        /// Declared maximum.
        max: usize,
    },

    /// Invalid circuit.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Engine failure.
    #[error("Simulation failed: {0}")]
    SimulationFailure(String),

    /// Circuit construction or binding error.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HalError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HalError::Configuration(_)
            | HalError::UnsupportedConfiguration { .. }
            | HalError::Serialization(_) => ErrorKind::Configuration,
            HalError::CircuitTooLarge { .. } | HalError::InvalidCircuit(_) | HalError::Ir(_) => {
                ErrorKind::Validation
            }
            HalError::SimulationFailure(_) => ErrorKind::Simulation,
        }
    }

    pub(crate) fn unsupported(option: &str, value: impl Into<String>) -> Self {
        HalError::UnsupportedConfiguration {
            option: option.to_string(),
            value: value.into(),
        }
    }
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            HalError::unsupported("mode", "diagonal").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            HalError::CircuitTooLarge { qubits: 16, max: 15 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            HalError::Ir(IrError::UnboundParameter("x".into())).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            HalError::SimulationFailure("boom".into()).kind(),
            ErrorKind::Simulation
        );
    }

    #[test]
    fn test_error_display() {
        let err = HalError::unsupported("approximation_strategy", "speed");
        assert_eq!(err.to_string(), "Unsupported approximation_strategy: 'speed'");
    }
}
