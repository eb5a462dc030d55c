//! Qubit, classical bit and register types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a qubit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    /// The qubit index as a `usize`, for bit masks and array indexing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// Index of a classical bit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl ClbitId {
    /// The bit index as a `usize`.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

/// A named, contiguous block of qubits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantumRegister {
    /// Register name.
    pub name: String,
    /// Number of qubits in the register.
    pub size: u32,
    /// Index of the register's first qubit in the circuit.
    pub offset: u32,
}

impl QuantumRegister {
    /// The qubit at `index` within this register.
    pub fn qubit(&self, index: u32) -> Option<QubitId> {
        (index < self.size).then(|| QubitId(self.offset + index))
    }

    /// All qubits of this register, in register order.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        (self.offset..self.offset + self.size).map(QubitId)
    }
}

/// A named, contiguous block of classical bits.
///
/// Bit `i` of the register is circuit clbit `offset + i`. In a measured
/// bitstring the register's bit 0 is the rightmost character of its slice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassicalRegister {
    /// Register name.
    pub name: String,
    /// Number of bits in the register.
    pub size: u32,
    /// Index of the register's first bit in the circuit.
    pub offset: u32,
}

impl ClassicalRegister {
    /// The classical bit at `index` within this register.
    pub fn clbit(&self, index: u32) -> Option<ClbitId> {
        (index < self.size).then(|| ClbitId(self.offset + index))
    }

    /// All bits of this register, in register order.
    pub fn clbits(&self) -> impl Iterator<Item = ClbitId> + '_ {
        (self.offset..self.offset + self.size).map(ClbitId)
    }

    /// Whether two registers share any classical bit.
    pub fn overlaps(&self, other: &ClassicalRegister) -> bool {
        self.offset < other.offset + other.size && other.offset < self.offset + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display() {
        assert_eq!(QubitId(3).to_string(), "q3");
        assert_eq!(ClbitId(1).to_string(), "c1");
    }

    #[test]
    fn test_register_bits() {
        let creg = ClassicalRegister {
            name: "c".into(),
            size: 2,
            offset: 2,
        };
        let bits: Vec<_> = creg.clbits().collect();
        assert_eq!(bits, vec![ClbitId(2), ClbitId(3)]);
        assert_eq!(creg.clbit(2), None);
    }

    #[test]
    fn test_register_overlap() {
        let a = ClassicalRegister {
            name: "a".into(),
            size: 2,
            offset: 0,
        };
        let b = ClassicalRegister {
            name: "b".into(),
            size: 2,
            offset: 2,
        };
        let c = ClassicalRegister {
            name: "c".into(),
            size: 2,
            offset: 1,
        };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }
}
