//! Estimation primitive.
//!
//! Each bound circuit is simulated once; its final state serves every
//! observable of the PUB. Values are exact, so standard errors are zero.

use std::sync::Arc;

use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use ddsim_backend::{ExperimentRunner, RunnerKind};
use ddsim_hal::{Job, SimulationAdapter, resolve_seed};

use crate::bindings::ParameterBindingExpander;
use crate::containers::{EstimatorPubResult, ExpectationValues, PrimitiveResult};
use crate::error::{PrimitiveError, PrimitiveResultT};
use crate::pubs::EstimatorPub;

/// Estimator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorOptions {
    /// Seed passed to every simulation; negative means unseeded.
    pub seed: i64,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self { seed: -1 }
    }
}

impl EstimatorOptions {
    /// Parse from a JSON object. Unknown keys and non-integer seeds are
    /// configuration errors.
    pub fn from_value(value: Value) -> PrimitiveResultT<Self> {
        serde_json::from_value(value).map_err(|e| PrimitiveError::Configuration(e.to_string()))
    }
}

/// Evaluates observables on exact final states.
#[derive(Debug, Clone)]
pub struct Estimator {
    runner: ExperimentRunner,
    options: EstimatorOptions,
}

impl Estimator {
    /// Estimator with default options.
    pub fn new(adapter: Arc<dyn SimulationAdapter>) -> Self {
        Self::with_options(adapter, EstimatorOptions::default())
    }

    /// Estimator with explicit options.
    pub fn with_options(adapter: Arc<dyn SimulationAdapter>, options: EstimatorOptions) -> Self {
        Self {
            runner: ExperimentRunner::new(RunnerKind::QasmSimulator, adapter),
            options,
        }
    }

    /// Estimator configured from a JSON object.
    pub fn from_value(
        adapter: Arc<dyn SimulationAdapter>,
        options: Value,
    ) -> PrimitiveResultT<Self> {
        Ok(Self::with_options(
            adapter,
            EstimatorOptions::from_value(options)?,
        ))
    }

    /// Current options.
    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    /// Evaluate `pubs`.
    ///
    /// Every PUB is validated before the first simulation. Any failure
    /// aborts the run and is returned from [`Job::result`].
    #[instrument(skip_all)]
    pub fn run<P: Into<EstimatorPub>>(
        &self,
        pubs: impl IntoIterator<Item = P>,
    ) -> Job<PrimitiveResult<EstimatorPubResult>, PrimitiveError> {
        let pubs: Vec<EstimatorPub> = pubs.into_iter().map(Into::into).collect();
        let estimator = self.clone();

        Job::new(move |job_id| {
            for pub_ in &pubs {
                pub_.validate()?;
                ParameterBindingExpander::new(&pub_.circuit, &pub_.parameter_values)?;
            }
            let results = pubs
                .iter()
                .map(|pub_| estimator.run_pub(pub_))
                .collect::<PrimitiveResultT<Vec<_>>>()?;
            info!("Estimator job {} finished {} PUBs", job_id, results.len());
            Ok(PrimitiveResult::new(results))
        })
        .submit()
    }

    fn run_pub(&self, pub_: &EstimatorPub) -> PrimitiveResultT<EstimatorPubResult> {
        let seed = resolve_seed(self.options.seed);
        let expander = ParameterBindingExpander::new(&pub_.circuit, &pub_.parameter_values)?;
        let mut shape = expander.shape().to_vec();
        debug!(
            "Estimating {} observables of '{}' over shape {:?}",
            pub_.observables.len(),
            pub_.circuit.name(),
            shape
        );

        let mut values = Vec::with_capacity(expander.len() * pub_.observables.len());
        for bound in expander {
            let bound = bound?;
            self.runner.validate(&bound)?;
            let state = self.runner.adapter().simulate_state(&bound, seed)?;
            values.extend(pub_.observables.iter().map(|obs| obs.expectation(&state)));
        }
        shape.push(pub_.observables.len());

        let complex = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| PrimitiveError::InvalidShape(e.to_string()))?;
        let evs = if pub_.observables.iter().all(|o| o.has_real_coefficients()) {
            ExpectationValues::Real(complex.mapv(|z: Complex64| z.re))
        } else {
            ExpectationValues::Complex(complex)
        };

        let mut metadata = Map::new();
        metadata.insert("target_precision".into(), json!(0.0));
        metadata.insert(
            "circuit_metadata".into(),
            Value::Object(pub_.circuit.metadata().clone()),
        );
        Ok(EstimatorPubResult {
            stds: ArrayD::zeros(IxDyn(&shape)),
            evs,
            metadata,
        })
    }
}
