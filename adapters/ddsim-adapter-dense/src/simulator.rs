//! Dense simulation engine implementation.

use std::time::Instant;

use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use ddsim_hal::{
    ApproximationConfig, ConstructionMode, Counts, HalError, HalResult, NoiseConfig, Seed,
    SimulationAdapter, UnitaryConstruction,
};
use ddsim_ir::Circuit;

use crate::program::{Operation, compile, compile_unitary_part};
use crate::statevector::{Statevector, cumulative_probabilities, draw};
use crate::trajectory::{Shot, TrajectoryPlan};
use crate::unitary;

/// Default qubit limit of the dense engine.
const DEFAULT_MAX_QUBITS: usize = 24;

/// Local dense simulation engine.
///
/// Holds the full statevector (or unitary) in memory, so it is limited to
/// roughly two dozen qubits. Every call is independent; the engine can be
/// shared between threads.
#[derive(Debug, Clone)]
pub struct DenseSimulator {
    /// Maximum number of qubits supported.
    max_qubits: usize,
}

impl DenseSimulator {
    /// Create a new engine with default settings.
    pub fn new() -> Self {
        Self {
            max_qubits: DEFAULT_MAX_QUBITS,
        }
    }

    /// Create an engine with custom max qubits.
    pub fn with_max_qubits(max_qubits: usize) -> Self {
        Self { max_qubits }
    }

    fn check_size(&self, circuit: &Circuit) -> HalResult<()> {
        if circuit.num_qubits() > self.max_qubits {
            return Err(HalError::CircuitTooLarge {
                qubits: circuit.num_qubits(),
                max: self.max_qubits,
            });
        }
        Ok(())
    }

    /// Run `shots` trajectories and histogram their readouts.
    fn run_trajectories(
        plan: &TrajectoryPlan<'_>,
        readout: &Readout,
        shots: u32,
        rng: &mut StdRng,
    ) -> Counts {
        let mut counts = Counts::new();
        let mut fidelity = 0.0;
        for shot in 0..shots {
            let outcome = plan.run(rng);
            fidelity += outcome.fidelity;
            counts.insert(readout.key_for_shot(&outcome, rng), 1);

            if shot > 0 && shot % 1000 == 0 {
                debug!("Completed {} shots", shot);
            }
        }
        if shots > 0 {
            debug!("Mean trajectory fidelity: {}", fidelity / f64::from(shots));
        }
        counts
    }
}

impl Default for DenseSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationAdapter for DenseSimulator {
    fn name(&self) -> &str {
        "ddsim_dense"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    fn sample(&self, circuit: &Circuit, shots: u32, seed: Seed) -> HalResult<Counts> {
        self.check_size(circuit)?;
        let start = Instant::now();
        let mut rng = rng_for(seed);
        let readout = Readout::new(circuit);

        let counts = if circuit.is_dynamic() {
            debug!("Dynamic circuit, simulating {} shots one by one", shots);
            let ops = compile(circuit)?;
            let plan = TrajectoryPlan::exact(circuit.num_qubits(), circuit.num_clbits(), &ops);
            Self::run_trajectories(&plan, &readout, shots, &mut rng)
        } else {
            let ops = compile_unitary_part(circuit)?;
            let state = evolve(circuit.num_qubits(), &ops);
            let cumulative = cumulative_probabilities(&state.probabilities());

            let mut histogram: FxHashMap<usize, u64> = FxHashMap::default();
            for _ in 0..shots {
                *histogram.entry(draw(&cumulative, &mut rng)).or_default() += 1;
            }
            histogram
                .into_iter()
                .map(|(index, n)| (readout.key_for_basis_state(index), n))
                .collect()
        };

        debug!("Sampling completed in {:?}", start.elapsed());
        Ok(counts)
    }

    #[instrument(skip(self, circuit, noise, approximation), fields(circuit = circuit.name()))]
    fn sample_noisy(
        &self,
        circuit: &Circuit,
        shots: u32,
        seed: Seed,
        noise: &NoiseConfig,
        approximation: &ApproximationConfig,
    ) -> HalResult<Counts> {
        self.check_size(circuit)?;
        noise.validate()?;
        approximation.validate()?;
        let start = Instant::now();
        let mut rng = rng_for(seed);

        debug!(
            "Noisy sampling: effects '{}', p = {}, amp = {}, factor = {}",
            noise.effects,
            noise.noise_probability,
            noise.amp_damping_probability,
            noise.multi_qubit_gate_factor
        );

        let ops = compile(circuit)?;
        let plan = TrajectoryPlan::noisy(
            circuit.num_qubits(),
            circuit.num_clbits(),
            &ops,
            noise,
            approximation,
        );
        let counts = Self::run_trajectories(&plan, &Readout::new(circuit), shots, &mut rng);

        debug!("Noisy sampling completed in {:?}", start.elapsed());
        Ok(counts)
    }

    #[instrument(skip(self, circuit, _seed), fields(circuit = circuit.name()))]
    fn construct_unitary(
        &self,
        circuit: &Circuit,
        _seed: Seed,
        mode: ConstructionMode,
    ) -> HalResult<UnitaryConstruction> {
        self.check_size(circuit)?;
        let ops = compile_unitary_part(circuit)?;

        let start = Instant::now();
        let matrix = unitary::build(circuit.num_qubits(), &ops, mode)?;
        let construction_time = start.elapsed().as_secs_f64();
        let node_count = unitary::count_dd_nodes(&matrix);

        debug!(
            "Built {}x{} unitary ({} nodes) in {:.6}s",
            matrix.nrows(),
            matrix.ncols(),
            node_count,
            construction_time
        );
        Ok(UnitaryConstruction {
            matrix,
            node_count,
            construction_time,
        })
    }

    #[instrument(skip(self, circuit, _seed), fields(circuit = circuit.name()))]
    fn simulate_state(&self, circuit: &Circuit, _seed: Seed) -> HalResult<Vec<Complex64>> {
        self.check_size(circuit)?;
        let ops = compile_unitary_part(circuit)?;
        Ok(evolve(circuit.num_qubits(), &ops).into_amplitudes())
    }
}

fn rng_for(seed: Seed) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Apply every gate of a measurement-free program to |0...0⟩.
fn evolve(num_qubits: usize, ops: &[Operation]) -> Statevector {
    let mut state = Statevector::new(num_qubits);
    for op in ops {
        if let Operation::Gate { qubits, matrix } = op {
            state.apply(qubits, matrix);
        }
    }
    state
}

/// How one shot is turned into a bitstring key.
enum Readout {
    /// No classical bits: read every qubit.
    Qubits(usize),
    /// Read the classical bits, unwritten ones stay 0; `finals` maps measured
    /// qubits to clbits for circuits sampled from their final state.
    Clbits {
        width: usize,
        finals: Vec<(usize, usize)>,
    },
}

impl Readout {
    fn new(circuit: &Circuit) -> Self {
        if circuit.num_clbits() > 0 {
            Readout::Clbits {
                width: circuit.num_clbits(),
                finals: circuit
                    .final_measurements()
                    .into_iter()
                    .map(|(q, c)| (q.index(), c.index()))
                    .collect(),
            }
        } else {
            Readout::Qubits(circuit.num_qubits())
        }
    }

    /// Bitstring of a basis state of the final (pre-measurement) state.
    fn key_for_basis_state(&self, index: usize) -> String {
        match self {
            Readout::Qubits(width) => basis_bitstring(index, *width),
            Readout::Clbits { width, finals } => {
                let mut bits = vec![false; *width];
                // later measurements into the same clbit win
                for &(q, c) in finals {
                    bits[c] = index >> q & 1 == 1;
                }
                clbit_bitstring(&bits)
            }
        }
    }

    fn key_for_shot(&self, shot: &Shot, rng: &mut StdRng) -> String {
        match self {
            Readout::Qubits(width) => basis_bitstring(shot.state.sample(rng), *width),
            Readout::Clbits { .. } => clbit_bitstring(&shot.clbits),
        }
    }
}

fn basis_bitstring(index: usize, width: usize) -> String {
    format!("{index:0width$b}")
}

/// Clbit 0 is the rightmost character.
fn clbit_bitstring(bits: &[bool]) -> String {
    bits.iter().rev().map(|&b| if b { '1' } else { '0' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddsim_ir::{ClbitId, QubitId};

    #[test]
    fn test_bitstrings_are_little_endian() {
        assert_eq!(basis_bitstring(1, 3), "001");
        assert_eq!(basis_bitstring(6, 4), "0110");
        assert_eq!(clbit_bitstring(&[true, false, false]), "001");
    }

    #[test]
    fn test_readout_maps_qubits_to_clbits() {
        let mut circuit = Circuit::with_size("swap", 2, 3);
        circuit.measure(QubitId(0), ClbitId(2)).unwrap();
        circuit.measure(QubitId(1), ClbitId(0)).unwrap();
        let readout = Readout::new(&circuit);
        // qubit 0 set -> clbit 2 set
        assert_eq!(readout.key_for_basis_state(0b01), "100");
        assert_eq!(readout.key_for_basis_state(0b10), "001");
    }

    #[test]
    fn test_unmeasured_clbits_read_zero() {
        let mut circuit = Circuit::with_size("unmeasured", 2, 1);
        circuit.x(QubitId(1)).unwrap();
        let readout = Readout::new(&circuit);
        assert_eq!(readout.key_for_basis_state(0b10), "0");

        let counts = DenseSimulator::new().sample(&circuit, 10, Some(3)).unwrap();
        assert_eq!(counts.get("0"), 10);
    }

    #[test]
    fn test_circuit_too_large() {
        let sim = DenseSimulator::with_max_qubits(2);
        let circuit = Circuit::ghz(3).unwrap();
        let err = sim.sample(&circuit, 10, Some(1)).unwrap_err();
        assert!(matches!(err, HalError::CircuitTooLarge { qubits: 3, max: 2 }));
    }

    #[test]
    fn test_bell_sampling() {
        let sim = DenseSimulator::new();
        let counts = sim.sample(&Circuit::bell().unwrap(), 1000, Some(42)).unwrap();
        assert_eq!(counts.total_shots(), 1000);
        assert_eq!(counts.get("01") + counts.get("10"), 0);
        assert!(counts.get("00") > 400 && counts.get("11") > 400);
    }
}
