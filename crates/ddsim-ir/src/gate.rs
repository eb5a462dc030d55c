//! Standard gate set and gate matrices.
//!
//! Matrices use little-endian operand order: for a gate applied to operands
//! `[o0, o1, ...]`, basis index `k` has bit `j` equal to the state of `o_j`.
//! A controlled gate therefore expects its control(s) first.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;

use crate::error::IrResult;
use crate::parameter::ParameterExpression;

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase gate.
    P(ParameterExpression),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around X.
    CRx(ParameterExpression),
    /// Controlled rotation around Y.
    CRy(ParameterExpression),
    /// Controlled rotation around Z.
    CRz(ParameterExpression),
    /// Controlled phase gate.
    CP(ParameterExpression),
    /// XX rotation gate.
    RXX(ParameterExpression),
    /// YY rotation gate.
    RYY(ParameterExpression),
    /// ZZ rotation gate.
    RZZ(ParameterExpression),
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(_, _, _) => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RYY(_) => "ryy",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::CRx(_)
            | StandardGate::CRy(_)
            | StandardGate::CRz(_)
            | StandardGate::CP(_)
            | StandardGate::RXX(_)
            | StandardGate::RYY(_)
            | StandardGate::RZZ(_) => 2,
            StandardGate::CCX | StandardGate::CSwap => 3,
            _ => 1,
        }
    }

    /// Parameters of this gate, in constructor order.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p) => vec![p],
            StandardGate::U(a, b, c) => vec![a, b, c],
            _ => vec![],
        }
    }

    /// Check if any parameter still holds a free symbol.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Substitute parameter values into every parameter of this gate.
    #[must_use]
    pub fn substitute(&self, values: &FxHashMap<String, f64>) -> Self {
        let s = |p: &ParameterExpression| p.substitute(values);
        match self {
            StandardGate::Rx(p) => StandardGate::Rx(s(p)),
            StandardGate::Ry(p) => StandardGate::Ry(s(p)),
            StandardGate::Rz(p) => StandardGate::Rz(s(p)),
            StandardGate::P(p) => StandardGate::P(s(p)),
            StandardGate::U(a, b, c) => StandardGate::U(s(a), s(b), s(c)),
            StandardGate::CRx(p) => StandardGate::CRx(s(p)),
            StandardGate::CRy(p) => StandardGate::CRy(s(p)),
            StandardGate::CRz(p) => StandardGate::CRz(s(p)),
            StandardGate::CP(p) => StandardGate::CP(s(p)),
            StandardGate::RXX(p) => StandardGate::RXX(s(p)),
            StandardGate::RYY(p) => StandardGate::RYY(s(p)),
            StandardGate::RZZ(p) => StandardGate::RZZ(s(p)),
            other => other.clone(),
        }
    }

    /// Dense unitary of this gate, row-major, `2^k × 2^k` for a `k`-qubit gate.
    ///
    /// Fails with [`IrError::UnboundParameter`](crate::IrError::UnboundParameter)
    /// if a parameter is still symbolic.
    pub fn matrix(&self) -> IrResult<Vec<Complex64>> {
        let m = match self {
            StandardGate::I => one_qubit([[c(1.0, 0.0), ZERO], [ZERO, c(1.0, 0.0)]]),
            StandardGate::X => one_qubit(PAULI_X),
            StandardGate::Y => one_qubit(PAULI_Y),
            StandardGate::Z => one_qubit(PAULI_Z),
            StandardGate::H => {
                let h = c(FRAC_1_SQRT_2, 0.0);
                one_qubit([[h, h], [h, -h]])
            }
            StandardGate::S => one_qubit(phase(std::f64::consts::FRAC_PI_2)),
            StandardGate::Sdg => one_qubit(phase(-std::f64::consts::FRAC_PI_2)),
            StandardGate::T => one_qubit(phase(std::f64::consts::FRAC_PI_4)),
            StandardGate::Tdg => one_qubit(phase(-std::f64::consts::FRAC_PI_4)),
            StandardGate::SX => one_qubit(sx(1.0)),
            StandardGate::SXdg => one_qubit(sx(-1.0)),
            StandardGate::Rx(t) => one_qubit(rx(t.value()?)),
            StandardGate::Ry(t) => one_qubit(ry(t.value()?)),
            StandardGate::Rz(t) => one_qubit(rz(t.value()?)),
            StandardGate::P(t) => one_qubit(phase(t.value()?)),
            StandardGate::U(theta, phi, lambda) => {
                one_qubit(u3(theta.value()?, phi.value()?, lambda.value()?))
            }
            StandardGate::CX => controlled(PAULI_X),
            StandardGate::CY => controlled(PAULI_Y),
            StandardGate::CZ => controlled(PAULI_Z),
            StandardGate::CH => {
                let h = c(FRAC_1_SQRT_2, 0.0);
                controlled([[h, h], [h, -h]])
            }
            StandardGate::CRx(t) => controlled(rx(t.value()?)),
            StandardGate::CRy(t) => controlled(ry(t.value()?)),
            StandardGate::CRz(t) => controlled(rz(t.value()?)),
            StandardGate::CP(t) => controlled(phase(t.value()?)),
            StandardGate::Swap => permutation(4, &[(1, 2)]),
            StandardGate::ISwap => {
                let mut m = vec![ZERO; 16];
                m[0] = ONE;
                m[4 + 2] = c(0.0, 1.0);
                m[2 * 4 + 1] = c(0.0, 1.0);
                m[15] = ONE;
                m
            }
            StandardGate::RXX(t) => two_axis_rotation(t.value()?, -1.0),
            StandardGate::RYY(t) => two_axis_rotation(t.value()?, 1.0),
            StandardGate::RZZ(t) => {
                let (lo, hi) = (
                    Complex64::from_polar(1.0, -t.value()? / 2.0),
                    Complex64::from_polar(1.0, t.value()? / 2.0),
                );
                let mut m = vec![ZERO; 16];
                m[0] = lo;
                m[5] = hi;
                m[10] = hi;
                m[15] = lo;
                m
            }
            StandardGate::CCX => permutation(8, &[(3, 7)]),
            StandardGate::CSwap => permutation(8, &[(3, 5)]),
        };
        Ok(m)
    }
}

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const PAULI_X: [[Complex64; 2]; 2] = [[ZERO, ONE], [ONE, ZERO]];
const PAULI_Y: [[Complex64; 2]; 2] = [
    [ZERO, Complex64::new(0.0, -1.0)],
    [Complex64::new(0.0, 1.0), ZERO],
];
const PAULI_Z: [[Complex64; 2]; 2] = [[ONE, ZERO], [ZERO, Complex64::new(-1.0, 0.0)]];

#[inline]
fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn one_qubit(u: [[Complex64; 2]; 2]) -> Vec<Complex64> {
    vec![u[0][0], u[0][1], u[1][0], u[1][1]]
}

/// Control on operand 0, `u` on operand 1.
fn controlled(u: [[Complex64; 2]; 2]) -> Vec<Complex64> {
    let mut m = vec![ZERO; 16];
    m[0] = ONE;
    m[2 * 4 + 2] = ONE;
    for (r, row) in u.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            m[(1 + 2 * r) * 4 + (1 + 2 * col)] = *value;
        }
    }
    m
}

fn permutation(dim: usize, swaps: &[(usize, usize)]) -> Vec<Complex64> {
    let mut perm: Vec<usize> = (0..dim).collect();
    for &(a, b) in swaps {
        perm.swap(a, b);
    }
    let mut m = vec![ZERO; dim * dim];
    for (row, &col) in perm.iter().enumerate() {
        m[row * dim + col] = ONE;
    }
    m
}

fn phase(theta: f64) -> [[Complex64; 2]; 2] {
    [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, theta)]]
}

fn sx(sign: f64) -> [[Complex64; 2]; 2] {
    let a = c(0.5, 0.5 * sign);
    let b = c(0.5, -0.5 * sign);
    [[a, b], [b, a]]
}

fn rx(theta: f64) -> [[Complex64; 2]; 2] {
    let (s, co) = (theta / 2.0).sin_cos();
    [[c(co, 0.0), c(0.0, -s)], [c(0.0, -s), c(co, 0.0)]]
}

fn ry(theta: f64) -> [[Complex64; 2]; 2] {
    let (s, co) = (theta / 2.0).sin_cos();
    [[c(co, 0.0), c(-s, 0.0)], [c(s, 0.0), c(co, 0.0)]]
}

fn rz(theta: f64) -> [[Complex64; 2]; 2] {
    [
        [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, theta / 2.0)],
    ]
}

fn u3(theta: f64, phi: f64, lambda: f64) -> [[Complex64; 2]; 2] {
    let (s, co) = (theta / 2.0).sin_cos();
    [
        [c(co, 0.0), -Complex64::from_polar(s, lambda)],
        [
            Complex64::from_polar(s, phi),
            Complex64::from_polar(co, phi + lambda),
        ],
    ]
}

/// `exp(-i θ/2 · A⊗A)` for A = X or Y. `corner_sign` is the sign of the
/// imaginary `sin` entry at the `|00>`/`|11>` corners (-1 for XX, +1 for YY).
fn two_axis_rotation(theta: f64, corner_sign: f64) -> Vec<Complex64> {
    let (s, co) = (theta / 2.0).sin_cos();
    let mut m = vec![ZERO; 16];
    for k in 0..4 {
        m[k * 4 + k] = c(co, 0.0);
    }
    let outer = c(0.0, corner_sign * s);
    let inner = c(0.0, -s);
    m[3] = outer;
    m[3 * 4] = outer;
    m[4 + 2] = inner;
    m[2 * 4 + 1] = inner;
    m
}
