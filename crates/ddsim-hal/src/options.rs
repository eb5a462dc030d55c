//! Declarative run options.
//!
//! A [`RunOptions`] value is an immutable set of optional overrides. Each
//! runner owns a default set; before every run the caller's options are
//! merged over it with [`RunOptions::merge`], and the runner's configure
//! phase turns the merged set into typed engine configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::{
    ApproximationConfig, ApproximationStrategy, ConstructionMode, NoiseConfig, NoiseEffects,
};
use crate::error::{HalError, HalResult};

/// Recognized run options. Every field is optional; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunOptions {
    /// Samples per circuit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shots: Option<u32>,
    /// Determinism key; negative values mean unseeded.
    #[serde(alias = "seed", skip_serializing_if = "Option::is_none")]
    pub seed_simulator: Option<i64>,
    /// Minimum norm share kept per approximation round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approximation_step_fidelity: Option<f64>,
    /// Approximation rounds per trajectory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approximation_steps: Option<u32>,
    /// `fidelity` or `memory`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approximation_strategy: Option<String>,
    /// Any combination of `A`, `P` and `D`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_effects: Option<String>,
    /// Phase flip / depolarization probability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_probability: Option<f64>,
    /// Amplitude damping probability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amp_damping_probability: Option<f64>,
    /// Probability scale for multi-qubit gates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_qubit_gate_factor: Option<f64>,
    /// `sequential` or `recursive` (unitary construction only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// One entry per circuit of a batch, mapping each parameter to one value
    /// per experiment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_binds: Option<Vec<BTreeMap<String, Vec<f64>>>>,
}

impl RunOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object.
    ///
    /// Unknown keys, wrong types and non-integer seeds are configuration
    /// errors.
    pub fn from_value(value: Value) -> HalResult<Self> {
        serde_json::from_value(value).map_err(|e| HalError::Configuration(e.to_string()))
    }

    /// Return `overrides` layered over `self`: every field set in `overrides`
    /// wins, every other field keeps its value from `self`.
    #[must_use]
    pub fn merge(&self, overrides: &RunOptions) -> RunOptions {
        RunOptions {
            shots: overrides.shots.or(self.shots),
            seed_simulator: overrides.seed_simulator.or(self.seed_simulator),
            approximation_step_fidelity: overrides
                .approximation_step_fidelity
                .or(self.approximation_step_fidelity),
            approximation_steps: overrides.approximation_steps.or(self.approximation_steps),
            approximation_strategy: overrides
                .approximation_strategy
                .clone()
                .or_else(|| self.approximation_strategy.clone()),
            noise_effects: overrides
                .noise_effects
                .clone()
                .or_else(|| self.noise_effects.clone()),
            noise_probability: overrides.noise_probability.or(self.noise_probability),
            amp_damping_probability: overrides
                .amp_damping_probability
                .or(self.amp_damping_probability),
            multi_qubit_gate_factor: overrides
                .multi_qubit_gate_factor
                .or(self.multi_qubit_gate_factor),
            mode: overrides.mode.clone().or_else(|| self.mode.clone()),
            parameter_binds: overrides
                .parameter_binds
                .clone()
                .or_else(|| self.parameter_binds.clone()),
        }
    }

    /// Set the shot count.
    pub fn with_shots(mut self, shots: u32) -> Self {
        self.shots = Some(shots);
        self
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed_simulator = Some(seed);
        self
    }

    /// Set the unitary construction mode.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Set the per-circuit parameter values.
    pub fn with_parameter_binds(mut self, binds: Vec<BTreeMap<String, Vec<f64>>>) -> Self {
        self.parameter_binds = Some(binds);
        self
    }

    /// Set the noise effects.
    pub fn with_noise_effects(mut self, effects: impl Into<String>) -> Self {
        self.noise_effects = Some(effects.into());
        self
    }

    /// Set both noise probabilities.
    pub fn with_noise_probabilities(mut self, noise: f64, amp_damping: f64) -> Self {
        self.noise_probability = Some(noise);
        self.amp_damping_probability = Some(amp_damping);
        self
    }

    /// Set the approximation policy.
    pub fn with_approximation(
        mut self,
        step_fidelity: f64,
        steps: u32,
        strategy: impl Into<String>,
    ) -> Self {
        self.approximation_step_fidelity = Some(step_fidelity);
        self.approximation_steps = Some(steps);
        self.approximation_strategy = Some(strategy.into());
        self
    }

    /// The raw seed, `-1` when unset.
    pub fn seed_or_unseeded(&self) -> i64 {
        self.seed_simulator.unwrap_or(-1)
    }

    /// Parse the construction mode, defaulting to recursive.
    pub fn construction_mode(&self) -> HalResult<ConstructionMode> {
        self.mode
            .as_deref()
            .map_or(Ok(ConstructionMode::default()), str::parse)
    }

    /// Build and validate the noise model. Every noise field must be set.
    pub fn noise_config(&self) -> HalResult<NoiseConfig> {
        let config = NoiseConfig {
            effects: required(self.noise_effects.as_deref(), "noise_effects")?
                .parse::<NoiseEffects>()?,
            noise_probability: required(self.noise_probability, "noise_probability")?,
            amp_damping_probability: required(
                self.amp_damping_probability,
                "amp_damping_probability",
            )?,
            multi_qubit_gate_factor: required(
                self.multi_qubit_gate_factor,
                "multi_qubit_gate_factor",
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build and validate the approximation policy, filling unset fields
    /// with the exact (no pruning) defaults.
    pub fn approximation_config(&self) -> HalResult<ApproximationConfig> {
        let defaults = ApproximationConfig::default();
        let config = ApproximationConfig {
            step_fidelity: self
                .approximation_step_fidelity
                .unwrap_or(defaults.step_fidelity),
            steps: self.approximation_steps.unwrap_or(defaults.steps),
            strategy: self
                .approximation_strategy
                .as_deref()
                .map_or(Ok(defaults.strategy), str::parse::<ApproximationStrategy>)?,
        };
        config.validate()?;
        Ok(config)
    }
}

fn required<T>(value: Option<T>, name: &str) -> HalResult<T> {
    value.ok_or_else(|| HalError::Configuration(format!("missing option '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_merge_override_wins() {
        let defaults = RunOptions::new().with_shots(1024).with_seed(-1).with_mode("recursive");
        let overrides = RunOptions::new().with_shots(10);

        let merged = defaults.merge(&overrides);
        assert_eq!(merged.shots, Some(10));
        assert_eq!(merged.seed_simulator, Some(-1));
        assert_eq!(merged.mode.as_deref(), Some("recursive"));
        // inputs are untouched
        assert_eq!(defaults.shots, Some(1024));
    }

    #[test]
    fn test_from_value_accepts_seed_alias() {
        let options = RunOptions::from_value(json!({"seed": 7, "shots": 100})).unwrap();
        assert_eq!(options.seed_simulator, Some(7));
        assert_eq!(options.shots, Some(100));
    }

    #[test]
    fn test_from_value_reads_parameter_binds() {
        let options =
            RunOptions::from_value(json!({"parameter_binds": [{"θ": [0.1, 0.2]}, {}]})).unwrap();
        let binds = options.parameter_binds.unwrap();
        assert_eq!(binds.len(), 2);
        assert_eq!(binds[0]["θ"], vec![0.1, 0.2]);
        assert!(binds[1].is_empty());

        let err = RunOptions::from_value(json!({"parameter_binds": {"θ": 1.0}})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_value_rejects_bad_input() {
        for value in [
            json!({"seed_simulator": 1.5}),
            json!({"seed": "abc"}),
            json!({"shots": 10, "fidelity": 0.9}),
        ] {
            let err = RunOptions::from_value(value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
    }

    #[test]
    fn test_typed_configuration() {
        let options = RunOptions::new()
            .with_noise_effects("AD")
            .with_noise_probabilities(0.1, 0.2)
            .with_approximation(0.9, 3, "memory");
        assert!(options.noise_config().is_err());

        let options = RunOptions {
            multi_qubit_gate_factor: Some(2.0),
            ..options
        };
        let noise = options.noise_config().unwrap();
        assert!(noise.effects.amplitude_damping && !noise.effects.phase_flip);

        let approx = options.approximation_config().unwrap();
        assert_eq!(approx.steps, 3);
        assert_eq!(approx.strategy, ApproximationStrategy::Memory);

        assert_eq!(
            RunOptions::new().construction_mode().unwrap(),
            ConstructionMode::Recursive
        );
        assert!(RunOptions::new().with_mode("diagonal").construction_mode().is_err());
    }
}
