//! Result containers returned by the primitives.

use std::ops::Index;

use ndarray::ArrayD;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::bit_array::BitArray;

/// Per-register shot data of one sampler PUB, in circuit register order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBin {
    shape: Vec<usize>,
    registers: Vec<(String, BitArray)>,
}

impl DataBin {
    pub(crate) fn new(shape: Vec<usize>, registers: Vec<(String, BitArray)>) -> Self {
        Self { shape, registers }
    }

    /// The PUB shape shared by every register.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Samples of the register called `name`.
    pub fn get(&self, name: &str) -> Option<&BitArray> {
        self.registers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bits)| bits)
    }

    /// Register names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registers.iter().map(|(n, _)| n.as_str())
    }

    /// `(name, samples)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BitArray)> {
        self.registers.iter().map(|(n, b)| (n.as_str(), b))
    }

    /// Number of registers.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Whether the circuit had no classical registers.
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

/// Result of one sampler PUB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerPubResult {
    /// One [`BitArray`] per classical register.
    pub data: DataBin,
    /// `{"shots", "circuit_metadata"}`.
    pub metadata: Map<String, Value>,
}

/// Expectation values, real unless some observable has a complex
/// coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectationValues {
    /// Real values.
    Real(ArrayD<f64>),
    /// Complex values.
    Complex(ArrayD<Complex64>),
}

impl ExpectationValues {
    /// Shape `(*pub_shape, num_observables)`.
    pub fn shape(&self) -> &[usize] {
        match self {
            ExpectationValues::Real(a) => a.shape(),
            ExpectationValues::Complex(a) => a.shape(),
        }
    }

    /// The real values, if real.
    pub fn as_real(&self) -> Option<&ArrayD<f64>> {
        match self {
            ExpectationValues::Real(a) => Some(a),
            ExpectationValues::Complex(_) => None,
        }
    }

    /// The values as complex numbers.
    pub fn to_complex(&self) -> ArrayD<Complex64> {
        match self {
            ExpectationValues::Real(a) => a.mapv(|v| Complex64::new(v, 0.0)),
            ExpectationValues::Complex(a) => a.clone(),
        }
    }
}

/// Result of one estimator PUB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorPubResult {
    /// Expectation values, shape `(*pub_shape, num_observables)`.
    pub evs: ExpectationValues,
    /// Standard errors. Zero for exact evaluation.
    pub stds: ArrayD<f64>,
    /// `{"target_precision", "circuit_metadata"}`.
    pub metadata: Map<String, Value>,
}

/// Ordered per-PUB results of one primitive run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveResult<T> {
    pub_results: Vec<T>,
    /// Run-level metadata.
    pub metadata: Map<String, Value>,
}

impl<T> PrimitiveResult<T> {
    pub(crate) fn new(pub_results: Vec<T>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("version".into(), json!(2));
        Self {
            pub_results,
            metadata,
        }
    }

    /// Number of PUB results.
    pub fn len(&self) -> usize {
        self.pub_results.len()
    }

    /// Whether the run had no PUBs.
    pub fn is_empty(&self) -> bool {
        self.pub_results.is_empty()
    }

    /// PUB results in submission order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.pub_results.iter()
    }

    /// Take the PUB results.
    pub fn into_pub_results(self) -> Vec<T> {
        self.pub_results
    }
}

impl<T> Index<usize> for PrimitiveResult<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.pub_results[index]
    }
}

impl<'a, T> IntoIterator for &'a PrimitiveResult<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
