//! Statevector simulation engine.

use num_complex::Complex64;
use rand::Rng;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Apply a dense `2^k × 2^k` row-major `matrix` to `qubits` of a state.
///
/// Bit `j` of the matrix index addresses `qubits[j]`. `amplitudes` may be any
/// slice of length `2^n`, which lets unitary construction reuse this on
/// matrix columns.
pub(crate) fn apply_matrix(amplitudes: &mut [Complex64], qubits: &[usize], matrix: &[Complex64]) {
    match qubits {
        [q] => apply_single(amplitudes, *q, matrix),
        _ => apply_multi(amplitudes, qubits, matrix),
    }
}

fn apply_single(amplitudes: &mut [Complex64], qubit: usize, m: &[Complex64]) {
    let mask = 1 << qubit;
    for i in 0..amplitudes.len() {
        if i & mask == 0 {
            let j = i | mask;
            let a0 = amplitudes[i];
            let a1 = amplitudes[j];
            amplitudes[i] = m[0] * a0 + m[1] * a1;
            amplitudes[j] = m[2] * a0 + m[3] * a1;
        }
    }
}

fn apply_multi(amplitudes: &mut [Complex64], qubits: &[usize], m: &[Complex64]) {
    let dim = 1usize << qubits.len();
    let target_mask: usize = qubits.iter().map(|&q| 1usize << q).sum();
    // offsets[s] is the state index contribution of sub-index s
    let offsets: Vec<usize> = (0..dim)
        .map(|s| {
            qubits
                .iter()
                .enumerate()
                .filter(|(j, _)| s >> j & 1 == 1)
                .map(|(_, &q)| 1usize << q)
                .sum()
        })
        .collect();

    let mut local = vec![ZERO; dim];
    for base in 0..amplitudes.len() {
        if base & target_mask != 0 {
            continue;
        }
        for (s, &off) in offsets.iter().enumerate() {
            local[s] = amplitudes[base | off];
        }
        for (row, &off) in offsets.iter().enumerate() {
            let mut acc = ZERO;
            for (col, value) in local.iter().enumerate() {
                acc += m[row * dim + col] * value;
            }
            amplitudes[base | off] = acc;
        }
    }
}

/// A statevector representing a quantum state.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers), little-endian.
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![ZERO; size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Borrow the amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Consume the state and return its amplitudes.
    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// Apply a gate matrix to `qubits`.
    pub(crate) fn apply(&mut self, qubits: &[usize], matrix: &[Complex64]) {
        apply_matrix(&mut self.amplitudes, qubits, matrix);
    }

    /// Probability of measuring `qubit` as 1.
    pub fn probability_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Project `qubit` onto `outcome` and renormalize.
    pub fn collapse(&mut self, qubit: usize, outcome: bool) {
        let mask = 1 << qubit;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) != outcome {
                *amp = ZERO;
            }
        }
        self.normalize();
    }

    /// Flip `qubit`.
    pub fn flip(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                self.amplitudes.swap(i, i | mask);
            }
        }
    }

    /// Measure `qubit`, collapsing the state. Returns the outcome.
    pub fn measure(&mut self, qubit: usize, rng: &mut impl Rng) -> bool {
        let p1 = self.probability_one(qubit);
        let outcome = rng.r#gen::<f64>() < p1;
        self.collapse(qubit, outcome);
        outcome
    }

    /// Reset `qubit` to |0⟩ by measuring it and flipping a 1.
    pub fn reset(&mut self, qubit: usize, rng: &mut impl Rng) {
        if self.measure(qubit, rng) {
            self.flip(qubit);
        }
    }

    /// Squared norm of the state.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Rescale to unit norm. A zero state is left unchanged.
    pub fn normalize(&mut self) {
        let norm = self.norm_sqr().sqrt();
        if norm > 0.0 {
            for amp in &mut self.amplitudes {
                *amp /= norm;
            }
        }
    }

    /// Basis-state probabilities.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Number of amplitudes with non-negligible magnitude.
    pub fn support_size(&self) -> usize {
        self.amplitudes.iter().filter(|a| a.norm_sqr() > 1e-24).count()
    }

    /// Draw one basis state.
    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        let cumulative = cumulative_probabilities(&self.probabilities());
        draw(&cumulative, rng)
    }

    /// Remove the smallest amplitudes whose total probability does not
    /// exceed `1 - fidelity`, then renormalize. Returns the kept fidelity.
    pub fn prune(&mut self, fidelity: f64) -> f64 {
        let budget = 1.0 - fidelity;
        let mut order: Vec<usize> = (0..self.amplitudes.len())
            .filter(|&i| self.amplitudes[i].norm_sqr() > 0.0)
            .collect();
        order.sort_by(|&a, &b| {
            self.amplitudes[a]
                .norm_sqr()
                .total_cmp(&self.amplitudes[b].norm_sqr())
        });

        let mut removed = 0.0;
        for i in order {
            let p = self.amplitudes[i].norm_sqr();
            if removed + p > budget {
                break;
            }
            removed += p;
            self.amplitudes[i] = ZERO;
        }
        if removed > 0.0 {
            self.normalize();
        }
        1.0 - removed
    }
}

/// Running sums of `probabilities`.
pub(crate) fn cumulative_probabilities(probabilities: &[f64]) -> Vec<f64> {
    probabilities
        .iter()
        .scan(0.0, |acc, p| {
            *acc += p;
            Some(*acc)
        })
        .collect()
}

/// Draw an index from a cumulative distribution.
pub(crate) fn draw(cumulative: &[f64], rng: &mut impl Rng) -> usize {
    let total = cumulative.last().copied().unwrap_or(0.0);
    let r = rng.r#gen::<f64>() * total;
    let idx = cumulative.partition_point(|&c| c <= r);
    idx.min(cumulative.len().saturating_sub(1))
}
