//! Sampling primitive.
//!
//! Every bound circuit of every PUB runs through the exact-sampling runner.
//! Counts are then split per classical register into [`BitArray`]s whose
//! leading axes follow the PUB's bindings shape.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use ddsim_backend::{DEFAULT_SHOTS, ExperimentRunner, RunnerKind};
use ddsim_hal::{Counts, Job, RunOptions, SimulationAdapter};
use ddsim_ir::{Circuit, ClassicalRegister};

use crate::bindings::ParameterBindingExpander;
use crate::bit_array::BitArray;
use crate::containers::{DataBin, PrimitiveResult, SamplerPubResult};
use crate::error::{PrimitiveError, PrimitiveResultT};
use crate::pubs::SamplerPub;

/// Sampler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerOptions {
    /// Shots for PUBs that set none, when `run` sets none either.
    pub default_shots: u32,
    /// Seed passed to every simulation; negative means unseeded.
    pub seed: i64,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            default_shots: DEFAULT_SHOTS,
            seed: -1,
        }
    }
}

impl SamplerOptions {
    /// Parse from a JSON object. Unknown keys and non-integer seeds are
    /// configuration errors.
    pub fn from_value(value: Value) -> PrimitiveResultT<Self> {
        serde_json::from_value(value).map_err(|e| PrimitiveError::Configuration(e.to_string()))
    }
}

/// Samples PUBs on the exact-sampling runner.
#[derive(Debug, Clone)]
pub struct Sampler {
    runner: ExperimentRunner,
    options: SamplerOptions,
}

impl Sampler {
    /// Sampler with default options.
    pub fn new(adapter: Arc<dyn SimulationAdapter>) -> Self {
        Self::with_options(adapter, SamplerOptions::default())
    }

    /// Sampler with explicit options.
    pub fn with_options(adapter: Arc<dyn SimulationAdapter>, options: SamplerOptions) -> Self {
        Self {
            runner: ExperimentRunner::new(RunnerKind::QasmSimulator, adapter),
            options,
        }
    }

    /// Sampler configured from a JSON object.
    pub fn from_value(
        adapter: Arc<dyn SimulationAdapter>,
        options: Value,
    ) -> PrimitiveResultT<Self> {
        Ok(Self::with_options(
            adapter,
            SamplerOptions::from_value(options)?,
        ))
    }

    /// Current options.
    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    /// Sample `pubs`. Shots come from the PUB, else `shots`, else the
    /// sampler default.
    ///
    /// Every PUB is validated before the first simulation. Any failure
    /// aborts the run and is returned from [`Job::result`].
    #[instrument(skip_all)]
    pub fn run<P: Into<SamplerPub>>(
        &self,
        pubs: impl IntoIterator<Item = P>,
        shots: Option<u32>,
    ) -> Job<PrimitiveResult<SamplerPubResult>, PrimitiveError> {
        let pubs: Vec<SamplerPub> = pubs.into_iter().map(Into::into).collect();
        let sampler = self.clone();

        Job::new(move |job_id| {
            let shots = shots.unwrap_or(sampler.options.default_shots);
            for pub_ in &pubs {
                pub_.validate()?;
                ParameterBindingExpander::new(&pub_.circuit, &pub_.parameter_values)?;
                if pub_.shots.unwrap_or(shots) == 0 {
                    return Err(PrimitiveError::InvalidPub(format!(
                        "zero shots requested for '{}'",
                        pub_.circuit.name()
                    )));
                }
            }

            let results = pubs
                .iter()
                .map(|pub_| sampler.run_pub(pub_, pub_.shots.unwrap_or(shots)))
                .collect::<PrimitiveResultT<Vec<_>>>()?;
            info!("Sampler job {} finished {} PUBs", job_id, results.len());
            Ok(PrimitiveResult::new(results))
        })
        .submit()
    }

    fn run_pub(&self, pub_: &SamplerPub, shots: u32) -> PrimitiveResultT<SamplerPubResult> {
        let options = RunOptions::new()
            .with_shots(shots)
            .with_seed(self.options.seed);
        let expander = ParameterBindingExpander::new(&pub_.circuit, &pub_.parameter_values)?;
        let shape = expander.shape().to_vec();
        debug!(
            "Sampling '{}' over shape {:?} with {} shots",
            pub_.circuit.name(),
            shape,
            shots
        );

        let counts = expander
            .map(|bound| -> PrimitiveResultT<Counts> {
                let result = self.runner.run(&bound?, &options)?;
                Ok(result.binary_counts()?)
            })
            .collect::<PrimitiveResultT<Vec<Counts>>>()?;

        let registers = pub_
            .circuit
            .cregs()
            .iter()
            .map(|creg| -> PrimitiveResultT<(String, BitArray)> {
                let per_binding: Vec<Counts> = counts
                    .iter()
                    .map(|c| register_counts(&pub_.circuit, creg, c))
                    .collect();
                let bits = BitArray::from_counts(&shape, &per_binding, creg.size as usize)?;
                Ok((creg.name.clone(), bits))
            })
            .collect::<PrimitiveResultT<Vec<_>>>()?;

        let mut metadata = Map::new();
        metadata.insert("shots".into(), json!(shots));
        metadata.insert(
            "circuit_metadata".into(),
            Value::Object(pub_.circuit.metadata().clone()),
        );
        Ok(SamplerPubResult {
            data: DataBin::new(shape, registers),
            metadata,
        })
    }
}

/// Counts restricted to the bits of one register. Overlapping registers
/// each see their own slice of the same outcome.
fn register_counts(circuit: &Circuit, creg: &ClassicalRegister, counts: &Counts) -> Counts {
    let width = circuit.num_clbits();
    let end = width - creg.offset as usize;
    let start = end - creg.size as usize;
    counts
        .iter()
        .map(|(bits, &n)| (bits[start..end].to_string(), n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_value() {
        let options = SamplerOptions::from_value(json!({"seed": 7})).unwrap();
        assert_eq!(options.seed, 7);
        assert_eq!(options.default_shots, 1024);

        let err = SamplerOptions::from_value(json!({"seed": 1.5})).unwrap_err();
        assert!(matches!(err, PrimitiveError::Configuration(_)));
        assert!(SamplerOptions::from_value(json!({"shots": 3})).is_err());
    }

    #[test]
    fn test_register_slices() {
        let mut circuit = Circuit::new("regs");
        circuit.add_qreg("q", 1).unwrap();
        circuit.add_creg("a", 1).unwrap();
        circuit.add_creg("b", 2).unwrap();
        let counts = Counts::from_pairs([("100", 3), ("011", 1)]);

        let a = register_counts(&circuit, &circuit.cregs()[0], &counts);
        let b = register_counts(&circuit, &circuit.cregs()[1], &counts);
        assert_eq!(a, Counts::from_pairs([("0", 3), ("1", 1)]));
        assert_eq!(b, Counts::from_pairs([("10", 3), ("01", 1)]));
    }
}
