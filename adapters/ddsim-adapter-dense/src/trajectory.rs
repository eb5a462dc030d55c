//! Shot-by-shot stochastic trajectories.
//!
//! A trajectory runs every operation of a circuit on a fresh state,
//! collapsing on measurements, drawing noise events after each gate and
//! pruning the state at evenly spaced approximation points.

use ddsim_hal::{ApproximationConfig, ApproximationStrategy, NoiseConfig};
use num_complex::Complex64;
use rand::Rng;

use crate::program::Operation;
use crate::statevector::Statevector;

const ONE: Complex64 = Complex64::new(1.0, 0.0);
const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

const PAULI_X: [Complex64; 4] = [ZERO, ONE, ONE, ZERO];
const PAULI_Y: [Complex64; 4] = [ZERO, Complex64::new(0.0, -1.0), I, ZERO];
const PAULI_Z: [Complex64; 4] = [ONE, ZERO, ZERO, Complex64::new(-1.0, 0.0)];

/// Everything that stays fixed across the shots of one run.
pub(crate) struct TrajectoryPlan<'a> {
    num_qubits: usize,
    num_clbits: usize,
    ops: &'a [Operation],
    noise: Option<&'a NoiseConfig>,
    approximation: Option<&'a ApproximationConfig>,
    /// Gate counts after which an approximation round runs, ascending.
    checkpoints: Vec<usize>,
}

/// Outcome of one trajectory.
pub(crate) struct Shot {
    /// Classical register contents, clbit 0 first.
    pub(crate) clbits: Vec<bool>,
    /// State after the last operation.
    pub(crate) state: Statevector,
    /// Product of the fidelities kept by every approximation round.
    pub(crate) fidelity: f64,
}

impl<'a> TrajectoryPlan<'a> {
    /// Noise-free plan that only collapses on measurements and resets.
    pub(crate) fn exact(num_qubits: usize, num_clbits: usize, ops: &'a [Operation]) -> Self {
        Self {
            num_qubits,
            num_clbits,
            ops,
            noise: None,
            approximation: None,
            checkpoints: Vec::new(),
        }
    }

    /// Plan with per-gate noise and, when active, approximation rounds.
    pub(crate) fn noisy(
        num_qubits: usize,
        num_clbits: usize,
        ops: &'a [Operation],
        noise: &'a NoiseConfig,
        approximation: &'a ApproximationConfig,
    ) -> Self {
        let gate_count = ops
            .iter()
            .filter(|op| matches!(op, Operation::Gate { .. }))
            .count();
        let (approximation, checkpoints) = if approximation.is_active() {
            (
                Some(approximation),
                checkpoints(gate_count, approximation.steps as usize),
            )
        } else {
            (None, Vec::new())
        };
        Self {
            num_qubits,
            num_clbits,
            ops,
            noise: (!noise.effects.is_empty()).then_some(noise),
            approximation,
            checkpoints,
        }
    }

    /// Run one trajectory.
    pub(crate) fn run(&self, rng: &mut impl Rng) -> Shot {
        let mut state = Statevector::new(self.num_qubits);
        let mut clbits = vec![false; self.num_clbits];
        let mut fidelity = 1.0;
        let mut gates_done = 0;
        let mut next_checkpoint = 0;

        for op in self.ops {
            match op {
                Operation::Gate { qubits, matrix } => {
                    state.apply(qubits, matrix);
                    if let Some(noise) = self.noise {
                        let factor = if op.is_multi_qubit_gate() {
                            noise.multi_qubit_gate_factor
                        } else {
                            1.0
                        };
                        for &q in qubits {
                            apply_noise(&mut state, q, noise, factor, rng);
                        }
                    }
                    gates_done += 1;
                    while self.checkpoints.get(next_checkpoint) == Some(&gates_done) {
                        fidelity *= self.approximate(&mut state);
                        next_checkpoint += 1;
                    }
                }
                Operation::Measure { qubit, clbit } => {
                    clbits[*clbit] = state.measure(*qubit, rng);
                }
                Operation::Reset { qubit } => state.reset(*qubit, rng),
            }
        }

        Shot {
            clbits,
            state,
            fidelity,
        }
    }

    fn approximate(&self, state: &mut Statevector) -> f64 {
        let Some(config) = self.approximation else {
            return 1.0;
        };
        if config.strategy == ApproximationStrategy::Memory
            && state.support_size() <= state.amplitudes().len() / 2
        {
            return 1.0;
        }
        state.prune(config.step_fidelity)
    }
}

/// Gate counts `floor(i * gates / (steps + 1))` for `i` in `1..=steps`,
/// skipping points before the first gate.
fn checkpoints(gates: usize, steps: usize) -> Vec<usize> {
    (1..=steps)
        .map(|i| i * gates / (steps + 1))
        .filter(|&g| g > 0)
        .collect()
}

/// Draw the enabled noise events for `qubit` after a gate.
fn apply_noise(
    state: &mut Statevector,
    qubit: usize,
    noise: &NoiseConfig,
    factor: f64,
    rng: &mut impl Rng,
) {
    let effects = noise.effects;
    if effects.amplitude_damping {
        let p = noise.amp_damping_probability * factor;
        let jump = p * state.probability_one(qubit);
        if rng.r#gen::<f64>() < jump {
            // decay: |1> -> |0>
            state.collapse(qubit, true);
            state.flip(qubit);
        } else {
            state.apply(&[qubit], &[ONE, ZERO, ZERO, Complex64::from((1.0 - p).sqrt())]);
            state.normalize();
        }
    }

    let p = noise.noise_probability * factor;
    if effects.phase_flip && rng.r#gen::<f64>() < p {
        state.apply(&[qubit], &PAULI_Z);
    }
    if effects.depolarization && rng.r#gen::<f64>() < p {
        let pauli = match rng.gen_range(0..3) {
            0 => &PAULI_X,
            1 => &PAULI_Y,
            _ => &PAULI_Z,
        };
        state.apply(&[qubit], pauli);
    }
}
