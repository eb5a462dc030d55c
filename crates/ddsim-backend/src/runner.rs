//! Experiment runners.
//!
//! One [`ExperimentRunner`] type covers every simulation variant. The
//! [`RunnerKind`] tag selects what each of the four phases does:
//!
//! ```text
//!   validate(circuit)           reject circuits the variant cannot run
//!   configure(options)  ──→ RunConfig
//!   invoke(circuit, config) ──→ RawOutput      (the only engine call)
//!   package(...)        ──→ ExperimentResult
//! ```
//!
//! A run stops at the first failing phase. Validation and configuration
//! errors are raised before the engine is touched.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use ddsim_hal::{
    ApproximationConfig, ConstructionMode, Counts, ExperimentData, ExperimentHeader,
    ExperimentResult, HalError, HalResult, NoiseConfig, RunOptions, Seed, SimulationAdapter,
    UnitaryConstruction, resolve_seed,
};
use ddsim_ir::Circuit;

/// Largest circuit the unitary runner accepts. A 15-qubit complex matrix
/// already takes 16 GiB.
pub const MAX_UNITARY_QUBITS: usize = 15;

/// Default shots of the sampling runners.
pub const DEFAULT_SHOTS: u32 = 1024;

/// Simulation variant of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    /// Exact state construction followed by weighted sampling.
    QasmSimulator,
    /// Full unitary construction.
    UnitarySimulator,
    /// Stochastic noisy trajectories.
    StochasticDdSimulator,
}

impl RunnerKind {
    /// Every variant.
    pub const ALL: [RunnerKind; 3] = [
        RunnerKind::QasmSimulator,
        RunnerKind::UnitarySimulator,
        RunnerKind::StochasticDdSimulator,
    ];

    /// Backend name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            RunnerKind::QasmSimulator => "qasm_simulator",
            RunnerKind::UnitarySimulator => "unitary_simulator",
            RunnerKind::StochasticDdSimulator => "stochastic_dd_simulator",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            RunnerKind::QasmSimulator => "Decision-diagram based exact sampling simulator",
            RunnerKind::UnitarySimulator => "Decision-diagram based unitary simulator",
            RunnerKind::StochasticDdSimulator => {
                "Noise-aware stochastic simulator based on decision diagrams"
            }
        }
    }

    /// Options every run of this variant starts from.
    pub fn default_options(&self) -> RunOptions {
        match self {
            RunnerKind::QasmSimulator => RunOptions::new().with_shots(DEFAULT_SHOTS).with_seed(-1),
            RunnerKind::UnitarySimulator => RunOptions::new()
                .with_shots(1)
                .with_seed(-1)
                .with_mode(ConstructionMode::Recursive.to_string()),
            RunnerKind::StochasticDdSimulator => RunOptions {
                shots: Some(DEFAULT_SHOTS),
                seed_simulator: Some(-1),
                approximation_step_fidelity: Some(1.0),
                approximation_steps: Some(1),
                approximation_strategy: Some("fidelity".into()),
                noise_effects: Some("APD".into()),
                noise_probability: Some(0.01),
                amp_damping_probability: Some(0.02),
                multi_qubit_gate_factor: Some(2.0),
                ..RunOptions::default()
            },
        }
    }

    /// Options that configure does not understand for this variant.
    fn rejects(&self, options: &RunOptions) -> Option<&'static str> {
        let noise_or_approximation = [
            ("noise_effects", options.noise_effects.is_some()),
            ("noise_probability", options.noise_probability.is_some()),
            ("amp_damping_probability", options.amp_damping_probability.is_some()),
            ("multi_qubit_gate_factor", options.multi_qubit_gate_factor.is_some()),
            ("approximation_step_fidelity", options.approximation_step_fidelity.is_some()),
            ("approximation_steps", options.approximation_steps.is_some()),
            ("approximation_strategy", options.approximation_strategy.is_some()),
        ];
        match self {
            RunnerKind::QasmSimulator => noise_or_approximation
                .into_iter()
                .chain([("mode", options.mode.is_some())])
                .find_map(|(name, set)| set.then_some(name)),
            RunnerKind::UnitarySimulator => noise_or_approximation
                .into_iter()
                .find_map(|(name, set)| set.then_some(name)),
            RunnerKind::StochasticDdSimulator => options.mode.is_some().then_some("mode"),
        }
    }
}

impl FromStr for RunnerKind {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunnerKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| HalError::Configuration(format!("unknown simulator '{s}'")))
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Typed engine configuration produced by the configure phase.
#[derive(Debug, Clone, PartialEq)]
pub enum RunConfig {
    /// Exact sampling.
    Sampling {
        /// Shots to draw.
        shots: u32,
        /// Raw seed as given, `-1` when unseeded.
        seed: i64,
    },
    /// Unitary construction.
    Unitary {
        /// Raw seed as given.
        seed: i64,
        /// Construction mode.
        mode: ConstructionMode,
    },
    /// Noisy trajectories.
    Noisy {
        /// Trajectories to run.
        shots: u32,
        /// Raw seed as given.
        seed: i64,
        /// Noise model.
        noise: NoiseConfig,
        /// Approximation policy.
        approximation: ApproximationConfig,
    },
}

impl RunConfig {
    /// Raw seed, reported back in the result.
    pub fn raw_seed(&self) -> i64 {
        match self {
            RunConfig::Sampling { seed, .. }
            | RunConfig::Unitary { seed, .. }
            | RunConfig::Noisy { seed, .. } => *seed,
        }
    }

    /// Engine seed.
    pub fn seed(&self) -> Seed {
        resolve_seed(self.raw_seed())
    }

    /// Shots reported in the result.
    pub fn shots(&self) -> u32 {
        match self {
            RunConfig::Sampling { shots, .. } | RunConfig::Noisy { shots, .. } => *shots,
            RunConfig::Unitary { .. } => 1,
        }
    }
}

/// Engine output handed from invoke to package.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    /// Binary-keyed counts.
    Counts(Counts),
    /// A constructed unitary.
    Unitary(UnitaryConstruction),
}

/// Runs single circuits through one simulation variant.
#[derive(Clone)]
pub struct ExperimentRunner {
    kind: RunnerKind,
    adapter: Arc<dyn SimulationAdapter>,
}

impl ExperimentRunner {
    /// Create a runner of `kind` on top of `adapter`.
    pub fn new(kind: RunnerKind, adapter: Arc<dyn SimulationAdapter>) -> Self {
        Self { kind, adapter }
    }

    /// The runner's variant.
    pub fn kind(&self) -> RunnerKind {
        self.kind
    }

    /// The engine the runner invokes.
    pub fn adapter(&self) -> &Arc<dyn SimulationAdapter> {
        &self.adapter
    }

    /// Reject circuits the variant cannot run.
    pub fn validate(&self, circuit: &Circuit) -> HalResult<()> {
        if circuit.num_parameters() > 0 {
            return Err(HalError::InvalidCircuit(format!(
                "circuit '{}' has unbound parameters: {}",
                circuit.name(),
                circuit.parameters().join(", ")
            )));
        }
        if self.kind != RunnerKind::UnitarySimulator {
            return Ok(());
        }

        if circuit.num_qubits() > MAX_UNITARY_QUBITS {
            return Err(HalError::CircuitTooLarge {
                qubits: circuit.num_qubits(),
                max: MAX_UNITARY_QUBITS,
            });
        }
        if circuit.has_reset() {
            return Err(HalError::InvalidCircuit(format!(
                "unsupported '{}' instruction 'reset' in circuit '{}'",
                self.kind,
                circuit.name()
            )));
        }
        if circuit.has_mid_circuit_measurement() {
            return Err(HalError::InvalidCircuit(format!(
                "unsupported '{}' instruction 'measure' before the end of circuit '{}'",
                self.kind,
                circuit.name()
            )));
        }
        Ok(())
    }

    /// Turn options, already merged over the variant defaults, into engine
    /// configuration.
    pub fn configure(&self, options: &RunOptions) -> HalResult<RunConfig> {
        if let Some(option) = self.kind.rejects(options) {
            return Err(HalError::Configuration(format!(
                "option '{option}' is not supported by '{}'",
                self.kind
            )));
        }
        let seed = options.seed_or_unseeded();
        let shots = options.shots.unwrap_or(DEFAULT_SHOTS);
        match self.kind {
            RunnerKind::QasmSimulator => Ok(RunConfig::Sampling { shots, seed }),
            RunnerKind::UnitarySimulator => {
                if options.shots.is_some_and(|s| s != 1) {
                    warn!("'{}' ignores shots, using a single shot", self.kind);
                }
                Ok(RunConfig::Unitary {
                    seed,
                    mode: options.construction_mode()?,
                })
            }
            RunnerKind::StochasticDdSimulator => Ok(RunConfig::Noisy {
                shots,
                seed,
                noise: options.noise_config()?,
                approximation: options.approximation_config()?,
            }),
        }
    }

    /// Call the engine.
    pub fn invoke(&self, circuit: &Circuit, config: &RunConfig) -> HalResult<RawOutput> {
        let seed = config.seed();
        match config {
            RunConfig::Sampling { shots, .. } => self
                .adapter
                .sample(circuit, *shots, seed)
                .map(RawOutput::Counts),
            RunConfig::Unitary { mode, .. } => self
                .adapter
                .construct_unitary(circuit, seed, *mode)
                .map(RawOutput::Unitary),
            RunConfig::Noisy {
                shots,
                noise,
                approximation,
                ..
            } => self
                .adapter
                .sample_noisy(circuit, *shots, seed, noise, approximation)
                .map(RawOutput::Counts),
        }
    }

    /// Normalize engine output into an experiment result.
    pub fn package(
        &self,
        circuit: &Circuit,
        config: &RunConfig,
        raw: RawOutput,
        time_taken: f64,
    ) -> HalResult<ExperimentResult> {
        let data = match raw {
            RawOutput::Counts(counts) => ExperimentData {
                counts: Some(counts.to_hex()?),
                time_taken,
                ..ExperimentData::default()
            },
            RawOutput::Unitary(construction) => ExperimentData {
                unitary: Some(construction.matrix),
                construction_time: Some(construction.construction_time),
                dd_nodes: Some(construction.node_count),
                time_taken,
                ..ExperimentData::default()
            },
        };

        Ok(ExperimentResult {
            shots: config.shots(),
            success: true,
            status: "DONE".into(),
            seed: config.raw_seed(),
            data,
            metadata: self.result_metadata(circuit),
            header: ExperimentHeader::from_circuit(circuit),
        })
    }

    /// Circuit metadata as reported in the result. The unitary runner
    /// reports a single shot whatever the circuit asked for.
    fn result_metadata(&self, circuit: &Circuit) -> Map<String, Value> {
        let mut metadata = circuit.metadata().clone();
        if self.kind == RunnerKind::UnitarySimulator
            && metadata.get("shots").is_some_and(|s| s.as_u64() != Some(1))
        {
            metadata.insert("shots".into(), Value::from(1));
        }
        metadata
    }

    /// Run all four phases for one circuit with `options` layered over the
    /// variant defaults.
    #[instrument(skip(self, circuit, options), fields(runner = %self.kind, circuit = circuit.name()))]
    pub fn run(&self, circuit: &Circuit, options: &RunOptions) -> HalResult<ExperimentResult> {
        let start = Instant::now();
        self.validate(circuit)?;
        let config = self.configure(&self.kind.default_options().merge(options))?;
        debug!("Configured {:?}", config);

        let raw = self.invoke(circuit, &config)?;
        let time_taken = start.elapsed().as_secs_f64();
        debug!("Engine call finished in {:.6}s", time_taken);

        self.package(circuit, &config, raw, time_taken)
    }
}

impl fmt::Debug for ExperimentRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentRunner")
            .field("kind", &self.kind)
            .field("adapter", &self.adapter.name())
            .finish()
    }
}
