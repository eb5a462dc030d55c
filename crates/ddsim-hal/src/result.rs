//! Experiment result types.
//!
//! Bitstring ordering: the rightmost bit corresponds to the lowest-indexed
//! classical bit. For example, the string `"01"` means clbit 0 holds `1`
//! and clbit 1 holds `0`. Experiment results store counts keyed by the
//! hexadecimal value of that bitstring (`"0x1"`).

use chrono::{DateTime, Utc};
use ddsim_ir::{Circuit, ClassicalRegister, QuantumRegister};
use ndarray::Array2;
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HalError, HalResult};
use crate::job::JobId;

/// Measurement counts from circuit execution.
///
/// Maps bitstrings to occurrence counts. Serializes as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts {
    /// Map from bitstring to count.
    counts: FxHashMap<String, u64>,
}

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create counts from an iterator of (bitstring, count) pairs.
    /// Duplicate bitstrings are accumulated.
    pub fn from_pairs(iter: impl IntoIterator<Item = (impl Into<String>, u64)>) -> Self {
        let mut counts = Self::new();
        for (k, v) in iter {
            counts.insert(k, v);
        }
        counts
    }

    /// Insert a count for a bitstring.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        let key = bitstring.into();
        *self.counts.entry(key).or_default() += count;
    }

    /// Get the count for a bitstring.
    pub fn get(&self, bitstring: &str) -> u64 {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Iterate over (bitstring, count) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.counts.iter()
    }

    /// Get the total number of shots.
    pub fn total_shots(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Get probabilities for each bitstring.
    #[allow(clippy::cast_precision_loss)]
    pub fn probabilities(&self) -> FxHashMap<String, f64> {
        let total = self.total_shots() as f64;
        if total == 0.0 {
            return FxHashMap::default();
        }
        self.counts
            .iter()
            .map(|(k, &v)| (k.clone(), v as f64 / total))
            .collect()
    }

    /// Get sorted counts (by bitstring).
    pub fn sorted(&self) -> Vec<(&String, &u64)> {
        let mut items: Vec<_> = self.counts.iter().collect();
        items.sort();
        items
    }

    /// Get the number of unique bitstrings.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check if counts are empty.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Re-key binary bitstrings to hexadecimal.
    pub fn to_hex(&self) -> HalResult<Counts> {
        let mut hex = Counts::new();
        for (bits, &count) in &self.counts {
            hex.insert(bin_to_hex(bits)?, count);
        }
        Ok(hex)
    }

    /// Re-key hexadecimal keys to binary bitstrings of `width` characters.
    pub fn to_binary(&self, width: usize) -> HalResult<Counts> {
        let mut bin = Counts::new();
        for (hex, &count) in &self.counts {
            bin.insert(hex_to_bin(hex, width)?, count);
        }
        Ok(bin)
    }
}

impl FromIterator<(String, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (key, value) in iter {
            counts.insert(key, value);
        }
        counts
    }
}

/// Convert a binary bitstring of any width to a `0x`-prefixed hex string.
pub fn bin_to_hex(bits: &str) -> HalResult<String> {
    let digits: Vec<u8> = bits
        .bytes()
        .map(|b| match b {
            b'0' => Ok(0),
            b'1' => Ok(1),
            _ => Err(HalError::SimulationFailure(format!(
                "'{bits}' is not a binary bitstring"
            ))),
        })
        .collect::<HalResult<_>>()?;

    let pad = (4 - digits.len() % 4) % 4;
    let mut hex = String::from("0x");
    let padded: Vec<u8> = std::iter::repeat_n(0, pad).chain(digits).collect();
    for nibble in padded.chunks(4) {
        let value = nibble.iter().fold(0u32, |acc, &bit| (acc << 1) | u32::from(bit));
        if hex.len() == 2 && value == 0 {
            continue;
        }
        hex.push(char::from_digit(value, 16).unwrap_or('0'));
    }
    if hex.len() == 2 {
        hex.push('0');
    }
    Ok(hex)
}

/// Convert a `0x`-prefixed hex string to a binary bitstring of `width`
/// characters.
pub fn hex_to_bin(hex: &str, width: usize) -> HalResult<String> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    let mut bits = String::with_capacity(digits.len() * 4);
    for ch in digits.chars() {
        let value = ch
            .to_digit(16)
            .ok_or_else(|| HalError::SimulationFailure(format!("'{hex}' is not a hex key")))?;
        bits.push_str(&format!("{value:04b}"));
    }
    let significant = bits.trim_start_matches('0');
    if significant.len() > width {
        return Err(HalError::SimulationFailure(format!(
            "'{hex}' does not fit into {width} bits"
        )));
    }
    Ok(format!("{significant:0>width$}"))
}

/// Register layout of the circuit an experiment ran, used to split
/// bitstrings per classical register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentHeader {
    /// Circuit name.
    pub name: String,
    /// Number of qubits.
    pub n_qubits: usize,
    /// Number of classical bits.
    pub memory_slots: usize,
    /// Quantum registers.
    pub qregs: Vec<QuantumRegister>,
    /// Classical registers.
    pub cregs: Vec<ClassicalRegister>,
    /// Circuit metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ExperimentHeader {
    /// Describe a circuit.
    pub fn from_circuit(circuit: &Circuit) -> Self {
        Self {
            name: circuit.name().to_string(),
            n_qubits: circuit.num_qubits(),
            memory_slots: circuit.num_clbits(),
            qregs: circuit.qregs().to_vec(),
            cregs: circuit.cregs().to_vec(),
            metadata: circuit.metadata().clone(),
        }
    }
}

/// Payload of one experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentData {
    /// Hex-keyed counts (sampling runners).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<Counts>,
    /// Dense unitary (unitary runner).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unitary: Option<Array2<Complex64>>,
    /// Unitary construction time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub construction_time: Option<f64>,
    /// Decision-diagram node count of the unitary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dd_nodes: Option<usize>,
    /// Wall-clock time of the engine call in seconds.
    pub time_taken: f64,
}

/// Normalized result of one circuit run by one runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Shots performed.
    pub shots: u32,
    /// Whether the run succeeded.
    pub success: bool,
    /// Status text.
    pub status: String,
    /// Raw seed used, `-1` when unseeded.
    pub seed: i64,
    /// Result payload.
    pub data: ExperimentData,
    /// Runner-specific metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Register layout of the circuit.
    pub header: ExperimentHeader,
}

impl ExperimentResult {
    /// Counts re-keyed to binary bitstrings over the circuit's classical bits
    /// (or its qubits when it has no classical bits).
    pub fn binary_counts(&self) -> HalResult<Counts> {
        let counts = self.data.counts.as_ref().ok_or_else(|| {
            HalError::SimulationFailure(format!("experiment '{}' has no counts", self.header.name))
        })?;
        let width = if self.header.memory_slots > 0 {
            self.header.memory_slots
        } else {
            self.header.n_qubits
        };
        counts.to_binary(width)
    }
}

/// Results of a batch of experiments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResult {
    /// Backend that produced the results.
    pub backend_name: String,
    /// Version of the backend.
    pub backend_version: String,
    /// Job that produced the results.
    pub job_id: JobId,
    /// Whether every experiment succeeded.
    pub success: bool,
    /// One result per circuit, in submission order.
    pub results: Vec<ExperimentResult>,
    /// Completion time.
    pub date: DateTime<Utc>,
    /// Wall-clock time of the whole batch in seconds.
    pub time_taken: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_basic() {
        let mut counts = Counts::new();
        counts.insert("00", 500);
        counts.insert("11", 500);
        counts.insert("11", 24);

        assert_eq!(counts.get("00"), 500);
        assert_eq!(counts.get("11"), 524);
        assert_eq!(counts.get("01"), 0);
        assert_eq!(counts.total_shots(), 1024);
    }

    #[test]
    fn test_counts_probabilities() {
        let counts = Counts::from_pairs([("00", 300), ("01", 200), ("10", 300), ("11", 200)]);

        let probs = counts.probabilities();
        assert!((probs["00"] - 0.3).abs() < 1e-10);
        assert!((probs["01"] - 0.2).abs() < 1e-10);
    }

    #[test]
    fn test_bin_to_hex() {
        assert_eq!(bin_to_hex("0").unwrap(), "0x0");
        assert_eq!(bin_to_hex("0000").unwrap(), "0x0");
        assert_eq!(bin_to_hex("11").unwrap(), "0x3");
        assert_eq!(bin_to_hex("1010").unwrap(), "0xa");
        assert_eq!(bin_to_hex("100000000").unwrap(), "0x100");
        assert!(bin_to_hex("012").is_err());
    }

    #[test]
    fn test_hex_to_bin() {
        assert_eq!(hex_to_bin("0x0", 3).unwrap(), "000");
        assert_eq!(hex_to_bin("0x3", 4).unwrap(), "0011");
        assert_eq!(hex_to_bin("0x100", 9).unwrap(), "100000000");
        assert!(hex_to_bin("0x10", 4).is_err());
        assert!(hex_to_bin("0xg", 4).is_err());
    }

    #[test]
    fn test_wide_keys_roundtrip() {
        let bits = format!("1{}", "0".repeat(99));
        let hex = bin_to_hex(&bits).unwrap();
        assert_eq!(hex_to_bin(&hex, 100).unwrap(), bits);
    }

    #[test]
    fn test_counts_rekey() {
        let counts = Counts::from_pairs([("011", 7), ("100", 3)]);
        let hex = counts.to_hex().unwrap();
        assert_eq!(hex.get("0x3"), 7);
        assert_eq!(hex.get("0x4"), 3);
        assert_eq!(hex.to_binary(3).unwrap(), counts);
    }
}
