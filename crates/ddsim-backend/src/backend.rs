//! Batch backend over an experiment runner.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, info, instrument};

use ddsim_hal::{BackendResult, HalError, HalResult, Job, RunOptions, SimulationAdapter};
use ddsim_ir::Circuit;

use crate::runner::{ExperimentRunner, RunnerKind};

/// A named simulator that runs batches of circuits as one job.
///
/// Circuits run one at a time in submission order. The first failing
/// circuit aborts the batch and its error is returned from
/// [`Job::result`].
///
/// With `parameter_binds` set, circuit `i` is bound with entry `i` once per
/// value in its lists, and every bound copy is a separate experiment.
#[derive(Debug, Clone)]
pub struct SimulatorBackend {
    runner: ExperimentRunner,
}

impl SimulatorBackend {
    /// Create a backend of `kind` on top of `adapter`.
    pub fn new(kind: RunnerKind, adapter: Arc<dyn SimulationAdapter>) -> Self {
        Self {
            runner: ExperimentRunner::new(kind, adapter),
        }
    }

    /// Backend name, e.g. `qasm_simulator`.
    pub fn name(&self) -> &'static str {
        self.runner.kind().name()
    }

    /// Backend version.
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        self.runner.kind().description()
    }

    /// The runner executing every circuit.
    pub fn runner(&self) -> &ExperimentRunner {
        &self.runner
    }

    /// Options every run starts from.
    pub fn default_options(&self) -> RunOptions {
        self.runner.kind().default_options()
    }

    /// Run `circuits` with `options` layered over the defaults.
    #[instrument(skip(self, circuits, options), fields(backend = self.name(), circuits = circuits.len()))]
    pub fn run(&self, circuits: Vec<Circuit>, options: RunOptions) -> Job<BackendResult> {
        let runner = self.runner.clone();
        let backend_name = self.name().to_string();
        let backend_version = self.version().to_string();

        Job::new(move |job_id| {
            let start = Instant::now();
            let experiments = bind_experiments(&circuits, options.parameter_binds.as_deref())?;
            let results = experiments
                .iter()
                .map(|circuit| runner.run(circuit, &options))
                .collect::<HalResult<Vec<_>>>()?;
            let time_taken = start.elapsed().as_secs_f64();
            info!(
                "{} finished {} experiments in {:.6}s",
                backend_name,
                results.len(),
                time_taken
            );

            Ok(BackendResult {
                backend_name,
                backend_version,
                job_id,
                success: results.iter().all(|r| r.success),
                results,
                date: Utc::now(),
                time_taken,
            })
        })
        .submit()
    }

    /// Like [`run`](Self::run), with options given as a JSON object.
    /// Unknown keys and malformed values are configuration errors.
    pub fn run_with_value(
        &self,
        circuits: Vec<Circuit>,
        options: Value,
    ) -> HalResult<Job<BackendResult>> {
        let options = RunOptions::from_value(options)?;
        debug!("Parsed run options {:?}", options);
        Ok(self.run(circuits, options))
    }
}

/// Expand each circuit into one bound experiment per value of its binds.
fn bind_experiments(
    circuits: &[Circuit],
    binds: Option<&[BTreeMap<String, Vec<f64>>]>,
) -> HalResult<Vec<Circuit>> {
    let Some(binds) = binds else {
        return Ok(circuits.to_vec());
    };
    if binds.len() != circuits.len() {
        return Err(HalError::InvalidCircuit(format!(
            "parameter_binds has {} entries for {} circuits",
            binds.len(),
            circuits.len()
        )));
    }

    let mut experiments = Vec::new();
    for (circuit, bind) in circuits.iter().zip(binds) {
        let parameters = circuit.parameters();
        if let Some(unknown) = bind.keys().find(|name| !parameters.contains(*name)) {
            return Err(HalError::InvalidCircuit(format!(
                "circuit '{}' has no parameter '{unknown}'",
                circuit.name()
            )));
        }
        let mut lengths = bind.values().map(Vec::len);
        let count = lengths.next().unwrap_or(1);
        if count == 0 || lengths.any(|n| n != count) {
            return Err(HalError::InvalidCircuit(format!(
                "parameter_binds for circuit '{}' must give every parameter the same, non-zero number of values",
                circuit.name()
            )));
        }
        debug!("Binding '{}' into {} experiments", circuit.name(), count);

        for k in 0..count {
            let values: FxHashMap<String, f64> = bind
                .iter()
                .map(|(name, values)| (name.clone(), values[k]))
                .collect();
            experiments.push(circuit.bind(&values)?);
        }
    }
    Ok(experiments)
}
