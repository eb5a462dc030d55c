//! Simulation adapter contract and engine configuration.
//!
//! The [`SimulationAdapter`] trait is the only surface the runners and
//! primitives use to reach a simulation engine:
//!
//! ```text
//!   sample()            ──→ Counts
//!   sample_noisy()      ──→ Counts
//!   construct_unitary() ──→ UnitaryConstruction
//!   simulate_state()    ──→ Vec<Complex64>
//! ```
//!
//! ## Contract
//!
//! - Every entry point is a pure function of its arguments. With a seed, two
//!   identical calls return identical results; `None` draws fresh entropy.
//! - Adapters hold no cross-call state and are `Send + Sync`, so they can be
//!   shared through an `Arc`.
//! - Bitstrings in [`Counts`] are little-endian over the circuit's classical
//!   bits (clbit 0 is the rightmost character). Clbits that are never
//!   written read as 0. A circuit without classical bits is sampled over all
//!   of its qubits instead.
//! - Configuration values arrive already parsed and validated; adapters only
//!   raise [`HalError::SimulationFailure`](crate::HalError::SimulationFailure)
//!   or propagate circuit errors.

use std::fmt;
use std::str::FromStr;

use ddsim_ir::Circuit;
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};
use crate::result::Counts;

/// Seed for all pseudo-randomness of one engine call. `None` is unseeded.
pub type Seed = Option<u64>;

/// Interpret a raw option seed: negative values mean "unseeded".
pub fn resolve_seed(raw: i64) -> Seed {
    u64::try_from(raw).ok()
}

/// Trait for simulation engines.
pub trait SimulationAdapter: Send + Sync {
    /// Name of the engine.
    fn name(&self) -> &str;

    /// Version of the engine.
    fn version(&self) -> &str;

    /// Build the exact state and draw `shots` weighted samples.
    ///
    /// Circuits with mid-circuit measurement or reset are simulated shot by
    /// shot.
    fn sample(&self, circuit: &Circuit, shots: u32, seed: Seed) -> HalResult<Counts>;

    /// Simulate every shot as a stochastic trajectory under `noise`, pruning
    /// the state according to `approximation`.
    fn sample_noisy(
        &self,
        circuit: &Circuit,
        shots: u32,
        seed: Seed,
        noise: &NoiseConfig,
        approximation: &ApproximationConfig,
    ) -> HalResult<Counts>;

    /// Build the full unitary of a circuit without measurements or resets.
    ///
    /// Final measurements are removed before construction. Both modes produce
    /// the same matrix up to floating-point rounding.
    fn construct_unitary(
        &self,
        circuit: &Circuit,
        seed: Seed,
        mode: ConstructionMode,
    ) -> HalResult<UnitaryConstruction>;

    /// The exact final state of a circuit, ignoring final measurements.
    fn simulate_state(&self, circuit: &Circuit, seed: Seed) -> HalResult<Vec<Complex64>>;
}

/// How the full unitary of a circuit is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructionMode {
    /// Multiply gate matrices left to right.
    Sequential,
    /// Split the gate list in halves, build each half, then combine.
    #[default]
    Recursive,
}

impl FromStr for ConstructionMode {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(ConstructionMode::Sequential),
            "recursive" => Ok(ConstructionMode::Recursive),
            other => Err(HalError::unsupported("mode", other)),
        }
    }
}

impl fmt::Display for ConstructionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionMode::Sequential => write!(f, "sequential"),
            ConstructionMode::Recursive => write!(f, "recursive"),
        }
    }
}

/// Result of unitary construction.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitaryConstruction {
    /// Dense `2^n × 2^n` unitary, little-endian in both indices.
    pub matrix: Array2<Complex64>,
    /// Number of nodes of the decision diagram representing the unitary.
    pub node_count: usize,
    /// Construction time in seconds.
    pub construction_time: f64,
}

/// The set of noise effects applied after every gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NoiseEffects {
    /// `A`: amplitude damping.
    pub amplitude_damping: bool,
    /// `P`: phase flip.
    pub phase_flip: bool,
    /// `D`: depolarization.
    pub depolarization: bool,
}

impl NoiseEffects {
    /// Whether no effect is enabled.
    pub fn is_empty(&self) -> bool {
        !(self.amplitude_damping || self.phase_flip || self.depolarization)
    }
}

impl FromStr for NoiseEffects {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut effects = NoiseEffects::default();
        for ch in s.chars() {
            match ch {
                'A' => effects.amplitude_damping = true,
                'P' => effects.phase_flip = true,
                'D' => effects.depolarization = true,
                _ => return Err(HalError::unsupported("noise_effects", s)),
            }
        }
        Ok(effects)
    }
}

impl fmt::Display for NoiseEffects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.amplitude_damping {
            write!(f, "A")?;
        }
        if self.phase_flip {
            write!(f, "P")?;
        }
        if self.depolarization {
            write!(f, "D")?;
        }
        Ok(())
    }
}

/// Per-gate stochastic noise model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Enabled effects.
    pub effects: NoiseEffects,
    /// Probability of a phase flip or depolarizing error per qubit and gate.
    pub noise_probability: f64,
    /// Probability of amplitude damping per qubit and gate.
    pub amp_damping_probability: f64,
    /// Factor applied to both probabilities on multi-qubit gates.
    pub multi_qubit_gate_factor: f64,
}

impl NoiseConfig {
    /// Check that every probability, also after multi-qubit scaling, lies in `[0, 1]`.
    pub fn validate(&self) -> HalResult<()> {
        let in_range = |p: f64| (0.0..=1.0).contains(&p);
        if self.multi_qubit_gate_factor < 0.0 || !self.multi_qubit_gate_factor.is_finite() {
            return Err(HalError::Configuration(format!(
                "multi_qubit_gate_factor must be non-negative, got {}",
                self.multi_qubit_gate_factor
            )));
        }
        for (name, p) in [
            ("noise_probability", self.noise_probability),
            ("amp_damping_probability", self.amp_damping_probability),
        ] {
            if !in_range(p) || !in_range(p * self.multi_qubit_gate_factor) {
                return Err(HalError::Configuration(format!(
                    "{name} {p} is outside [0, 1] (multi-qubit factor {})",
                    self.multi_qubit_gate_factor
                )));
            }
        }
        Ok(())
    }
}

/// When approximation rounds are applied during a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproximationStrategy {
    /// Approximate at evenly spaced points of the circuit.
    #[default]
    Fidelity,
    /// Approximate at those points only when the state is dense.
    Memory,
}

impl FromStr for ApproximationStrategy {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fidelity" => Ok(ApproximationStrategy::Fidelity),
            "memory" => Ok(ApproximationStrategy::Memory),
            other => Err(HalError::unsupported("approximation_strategy", other)),
        }
    }
}

impl fmt::Display for ApproximationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApproximationStrategy::Fidelity => write!(f, "fidelity"),
            ApproximationStrategy::Memory => write!(f, "memory"),
        }
    }
}

/// Fidelity-bounded state pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproximationConfig {
    /// Minimum share of the norm kept by each round.
    pub step_fidelity: f64,
    /// Number of rounds per trajectory.
    pub steps: u32,
    /// Placement policy for the rounds.
    pub strategy: ApproximationStrategy,
}

impl ApproximationConfig {
    /// Whether this configuration can prune anything at all.
    pub fn is_active(&self) -> bool {
        self.steps > 0 && self.step_fidelity < 1.0
    }

    /// Check that the step fidelity lies in `[0, 1]`.
    pub fn validate(&self) -> HalResult<()> {
        if !(0.0..=1.0).contains(&self.step_fidelity) {
            return Err(HalError::Configuration(format!(
                "approximation_step_fidelity must be in [0, 1], got {}",
                self.step_fidelity
            )));
        }
        Ok(())
    }
}

impl Default for ApproximationConfig {
    fn default() -> Self {
        Self {
            step_fidelity: 1.0,
            steps: 1,
            strategy: ApproximationStrategy::Fidelity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_resolve_seed() {
        assert_eq!(resolve_seed(-1), None);
        assert_eq!(resolve_seed(-42), None);
        assert_eq!(resolve_seed(0), Some(0));
        assert_eq!(resolve_seed(1234), Some(1234));
    }

    #[test]
    fn test_construction_mode_parse() {
        assert_eq!(
            "sequential".parse::<ConstructionMode>().unwrap(),
            ConstructionMode::Sequential
        );
        assert_eq!(ConstructionMode::default(), ConstructionMode::Recursive);
        let err = "dd".parse::<ConstructionMode>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_noise_effects_parse() {
        let effects: NoiseEffects = "APD".parse().unwrap();
        assert!(effects.amplitude_damping && effects.phase_flip && effects.depolarization);
        assert_eq!(effects.to_string(), "APD");

        let effects: NoiseEffects = "D".parse().unwrap();
        assert!(!effects.amplitude_damping && effects.depolarization);

        assert!("".parse::<NoiseEffects>().unwrap().is_empty());
        assert!("APX".parse::<NoiseEffects>().is_err());
    }

    #[test]
    fn test_noise_config_validation() {
        let mut noise = NoiseConfig {
            effects: "APD".parse().unwrap(),
            noise_probability: 0.01,
            amp_damping_probability: 0.02,
            multi_qubit_gate_factor: 2.0,
        };
        assert!(noise.validate().is_ok());

        noise.noise_probability = 0.6;
        assert!(noise.validate().is_err());

        noise.noise_probability = -0.1;
        assert!(noise.validate().is_err());
    }

    #[test]
    fn test_approximation_config() {
        let config = ApproximationConfig::default();
        assert!(!config.is_active());
        assert!(config.validate().is_ok());

        let config = ApproximationConfig {
            step_fidelity: 1.5,
            ..ApproximationConfig::default()
        };
        assert!(config.validate().is_err());
        assert!("speed".parse::<ApproximationStrategy>().is_err());
    }
}
