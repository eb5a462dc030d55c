//! Pauli observables.
//!
//! Labels are written with qubit 0 as the rightmost character, so `"XZ"`
//! is `Z` on qubit 0 and `X` on qubit 1.
//!
//! A Pauli string acts on a basis state as
//!
//! ```text
//!   P |j⟩ = i^{n_Y} · (-1)^{|j ∧ zy|} · |j ⊕ x⟩
//! ```
//!
//! where `x` marks the X/Y positions, `zy` the Z/Y positions and `n_Y` is
//! the number of Y factors. Expectations and operator decomposition both
//! use this form directly, without building Pauli matrices.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{PrimitiveError, PrimitiveResultT};

/// Coefficients smaller than this are dropped when decomposing operators.
const DECOMPOSITION_TOLERANCE: f64 = 1e-8;

/// Single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pauli {
    /// Identity.
    I,
    /// Pauli X.
    X,
    /// Pauli Y.
    Y,
    /// Pauli Z.
    Z,
}

impl Pauli {
    const ALL: [Pauli; 4] = [Pauli::I, Pauli::X, Pauli::Y, Pauli::Z];

    fn label(self) -> char {
        match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        }
    }
}

/// Tensor product of single-qubit Paulis, indexed by qubit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PauliString {
    paulis: Vec<Pauli>,
}

impl PauliString {
    /// Build from per-qubit factors, qubit 0 first.
    pub fn new(paulis: Vec<Pauli>) -> Self {
        Self { paulis }
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.paulis.len()
    }

    /// Factor acting on `qubit`.
    pub fn get(&self, qubit: usize) -> Option<Pauli> {
        self.paulis.get(qubit).copied()
    }

    /// `(x mask, z-or-y mask, number of Y factors)`.
    fn masks(&self) -> (usize, usize, usize) {
        let mut x = 0;
        let mut zy = 0;
        let mut ny = 0;
        for (q, p) in self.paulis.iter().enumerate() {
            match p {
                Pauli::I => {}
                Pauli::X => x |= 1 << q,
                Pauli::Y => {
                    x |= 1 << q;
                    zy |= 1 << q;
                    ny += 1;
                }
                Pauli::Z => zy |= 1 << q,
            }
        }
        (x, zy, ny)
    }

    /// `⟨ψ|P|ψ⟩` for a little-endian state of matching width.
    pub fn expectation(&self, state: &[Complex64]) -> Complex64 {
        let (x, zy, ny) = self.masks();
        let mut acc = Complex64::new(0.0, 0.0);
        for (j, amp) in state.iter().enumerate() {
            let term = state[j ^ x].conj() * amp;
            if (j & zy).count_ones() % 2 == 1 {
                acc -= term;
            } else {
                acc += term;
            }
        }
        acc * i_pow(ny)
    }

    /// `Tr(P · M)` for a square matrix of matching dimension.
    fn trace_with(&self, matrix: &Array2<Complex64>) -> Complex64 {
        let (x, zy, ny) = self.masks();
        let mut acc = Complex64::new(0.0, 0.0);
        for k in 0..matrix.nrows() {
            let entry = matrix[[k, k ^ x]];
            if (k & zy).count_ones() % 2 == 1 {
                acc -= entry;
            } else {
                acc += entry;
            }
        }
        acc * i_pow(ny)
    }

    /// Every Pauli string on `num_qubits` qubits.
    fn all(num_qubits: usize) -> impl Iterator<Item = PauliString> {
        (0..1usize << (2 * num_qubits)).map(move |code| {
            PauliString::new(
                (0..num_qubits)
                    .map(|q| Pauli::ALL[(code >> (2 * q)) & 3])
                    .collect(),
            )
        })
    }
}

fn i_pow(n: usize) -> Complex64 {
    match n % 4 {
        0 => Complex64::new(1.0, 0.0),
        1 => Complex64::new(0.0, 1.0),
        2 => Complex64::new(-1.0, 0.0),
        _ => Complex64::new(0.0, -1.0),
    }
}

impl FromStr for PauliString {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let paulis = s
            .chars()
            .rev()
            .map(|c| match c {
                'I' => Ok(Pauli::I),
                'X' => Ok(Pauli::X),
                'Y' => Ok(Pauli::Y),
                'Z' => Ok(Pauli::Z),
                other => Err(PrimitiveError::InvalidObservable(format!(
                    "'{other}' in Pauli label '{s}'"
                ))),
            })
            .collect::<PrimitiveResultT<_>>()?;
        Ok(Self { paulis })
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label: String = self.paulis.iter().rev().map(|p| p.label()).collect();
        write!(f, "{label}")
    }
}

/// Weighted sum of Pauli strings of one width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observable {
    num_qubits: usize,
    terms: Vec<(PauliString, Complex64)>,
}

impl Observable {
    /// Build from `(label, coefficient)` pairs. All labels must have the
    /// same length.
    pub fn from_labels<C: Into<Complex64>>(
        terms: impl IntoIterator<Item = (impl AsRef<str>, C)>,
    ) -> PrimitiveResultT<Self> {
        let terms = terms
            .into_iter()
            .map(|(label, c)| -> PrimitiveResultT<(PauliString, Complex64)> {
                Ok((label.as_ref().parse()?, c.into()))
            })
            .collect::<PrimitiveResultT<Vec<_>>>()?;
        Self::from_terms(terms)
    }

    /// Build from Pauli terms. All strings must have the same width.
    pub fn from_terms(terms: Vec<(PauliString, Complex64)>) -> PrimitiveResultT<Self> {
        let Some(num_qubits) = terms.first().map(|(p, _)| p.num_qubits()) else {
            return Err(PrimitiveError::InvalidObservable(
                "an observable needs at least one term".into(),
            ));
        };
        if let Some((p, _)) = terms.iter().find(|(p, _)| p.num_qubits() != num_qubits) {
            return Err(PrimitiveError::InvalidObservable(format!(
                "term '{p}' acts on {} qubits, expected {num_qubits}",
                p.num_qubits()
            )));
        }
        Ok(Self { num_qubits, terms })
    }

    /// Decompose a dense `2^n × 2^n` operator into Pauli terms,
    /// `c_P = Tr(P · M) / 2^n`. Negligible coefficients are dropped.
    pub fn from_dense_operator(matrix: &Array2<Complex64>) -> PrimitiveResultT<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols || !rows.is_power_of_two() {
            return Err(PrimitiveError::InvalidObservable(format!(
                "a {rows}x{cols} matrix is not an operator on qubits"
            )));
        }
        let num_qubits = rows.trailing_zeros() as usize;
        #[allow(clippy::cast_precision_loss)]
        let scale = rows as f64;

        let terms = PauliString::all(num_qubits)
            .filter_map(|p| {
                let c = p.trace_with(matrix) / scale;
                (c.norm() >= DECOMPOSITION_TOLERANCE).then_some((p, c))
            })
            .collect();
        Ok(Self { num_qubits, terms })
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The terms.
    pub fn terms(&self) -> &[(PauliString, Complex64)] {
        &self.terms
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether there are no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether every coefficient is real.
    pub fn has_real_coefficients(&self) -> bool {
        self.terms.iter().all(|(_, c)| c.im == 0.0)
    }

    /// `Σ c_P ⟨ψ|P|ψ⟩`.
    pub fn expectation(&self, state: &[Complex64]) -> Complex64 {
        self.terms
            .iter()
            .map(|(p, c)| *c * p.expectation(state))
            .sum()
    }
}

impl From<PauliString> for Observable {
    fn from(pauli: PauliString) -> Self {
        Self {
            num_qubits: pauli.num_qubits(),
            terms: vec![(pauli, Complex64::new(1.0, 0.0))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn test_label_roundtrip_puts_qubit_zero_right() {
        let p: PauliString = "XIZ".parse().unwrap();
        assert_eq!(p.get(0), Some(Pauli::Z));
        assert_eq!(p.get(2), Some(Pauli::X));
        assert_eq!(p.to_string(), "XIZ");
        assert!("XQ".parse::<PauliString>().is_err());
    }

    #[test]
    fn test_single_qubit_expectations() {
        let zero = [c(1.0), c(0.0)];
        let plus = [c(FRAC_1_SQRT_2), c(FRAC_1_SQRT_2)];
        let plus_i = [c(FRAC_1_SQRT_2), Complex64::new(0.0, FRAC_1_SQRT_2)];

        let ev = |label: &str, state: &[Complex64]| {
            label.parse::<PauliString>().unwrap().expectation(state)
        };
        assert!((ev("Z", &zero) - c(1.0)).norm() < 1e-12);
        assert!((ev("X", &plus) - c(1.0)).norm() < 1e-12);
        assert!((ev("Y", &plus_i) - c(1.0)).norm() < 1e-12);
        assert!(ev("Y", &plus).norm() < 1e-12);
    }

    #[test]
    fn test_two_qubit_order() {
        // |01>: qubit 0 is 1
        let state = [c(0.0), c(1.0), c(0.0), c(0.0)];
        let iz = Observable::from_labels([("IZ", 1.0)]).unwrap();
        let zi = Observable::from_labels([("ZI", 1.0)]).unwrap();
        assert!((iz.expectation(&state) - c(-1.0)).norm() < 1e-12);
        assert!((zi.expectation(&state) - c(1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_decompose_dense_operator() {
        // Y ⊗ Z + 0.5 I ⊗ X on qubits (1, 0)
        let original =
            Observable::from_labels([("YZ", Complex64::new(1.0, 0.0)), ("IX", c(0.5))]).unwrap();
        // <j|O|k> = Σ c_P i^{n_Y} (-1)^{|k ∧ zy|} [j = k ⊕ x]
        let mut matrix = Array2::<Complex64>::zeros((4, 4));
        for k in 0..4 {
            for j in 0..4 {
                matrix[[j, k]] = original
                    .terms()
                    .iter()
                    .map(|(p, coeff)| {
                        let (x, zy, ny) = p.masks();
                        if j == k ^ x {
                            let sign = if (k & zy).count_ones() % 2 == 1 { -1.0 } else { 1.0 };
                            *coeff * i_pow(ny) * sign
                        } else {
                            c(0.0)
                        }
                    })
                    .sum();
            }
        }

        let decomposed = Observable::from_dense_operator(&matrix).unwrap();
        assert_eq!(decomposed.num_qubits(), 2);
        assert_eq!(decomposed.len(), 2);
        for (p, coeff) in decomposed.terms() {
            let expected = original
                .terms()
                .iter()
                .find(|(q, _)| q == p)
                .map(|(_, c)| *c)
                .unwrap();
            assert!((*coeff - expected).norm() < 1e-12);
        }
        assert!(Observable::from_dense_operator(&Array2::zeros((3, 3))).is_err());
    }
}
