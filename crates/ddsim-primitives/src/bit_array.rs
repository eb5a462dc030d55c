//! Packed shot samples for one classical register.
//!
//! Layout is `(*shape, num_shots, num_bytes)`. Each shot is stored as
//! big-endian bytes, so bit `k` of the register lives in byte
//! `num_bytes - 1 - k / 8` at position `k % 8`.

use ndarray::{ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

use ddsim_hal::Counts;

use crate::error::{PrimitiveError, PrimitiveResultT};

/// Shot samples of one classical register across a PUB's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitArray {
    array: ArrayD<u8>,
    num_bits: usize,
}

impl BitArray {
    /// Wrap a `(*shape, num_shots, num_bytes)` array.
    pub fn new(array: ArrayD<u8>, num_bits: usize) -> PrimitiveResultT<Self> {
        let ndim = array.ndim();
        if ndim < 2 {
            return Err(PrimitiveError::InvalidShape(format!(
                "a bit array needs shots and bytes axes, got {ndim} axes"
            )));
        }
        let num_bytes = array.shape()[ndim - 1];
        if num_bytes != num_bits.div_ceil(8) {
            return Err(PrimitiveError::InvalidShape(format!(
                "{num_bits} bits do not fit {num_bytes} bytes"
            )));
        }
        Ok(Self { array, num_bits })
    }

    /// Lay out `counts` (one entry per coordinate of `shape`, row-major)
    /// as shots. Within one coordinate, shots appear grouped by outcome in
    /// ascending bitstring order. Every entry must hold the same number of
    /// shots.
    pub fn from_counts(
        shape: &[usize],
        counts: &[Counts],
        num_bits: usize,
    ) -> PrimitiveResultT<Self> {
        let size: usize = shape.iter().product();
        if counts.len() != size {
            return Err(PrimitiveError::InvalidShape(format!(
                "{} count sets for shape {shape:?}",
                counts.len()
            )));
        }
        let num_shots = counts.first().map_or(0, |c| c.total_shots());
        if let Some(other) = counts.iter().find(|c| c.total_shots() != num_shots) {
            return Err(PrimitiveError::InvalidShape(format!(
                "count sets with {num_shots} and {} shots",
                other.total_shots()
            )));
        }
        let num_shots = usize::try_from(num_shots)
            .map_err(|_| PrimitiveError::InvalidShape(format!("{num_shots} shots")))?;
        let num_bytes = num_bits.div_ceil(8);

        let mut data = Vec::with_capacity(size * num_shots * num_bytes);
        for entry in counts {
            for (bits, &count) in entry.sorted() {
                let packed = pack_bitstring(bits, num_bytes)?;
                for _ in 0..count {
                    data.extend_from_slice(&packed);
                }
            }
        }

        let mut full = shape.to_vec();
        full.extend([num_shots, num_bytes]);
        let array = ArrayD::from_shape_vec(IxDyn(&full), data)
            .map_err(|e| PrimitiveError::InvalidShape(e.to_string()))?;
        Ok(Self { array, num_bits })
    }

    /// Leading shape, without the shots and bytes axes.
    pub fn shape(&self) -> &[usize] {
        &self.array.shape()[..self.array.ndim() - 2]
    }

    /// Number of leading entries.
    pub fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// Shots per entry.
    pub fn num_shots(&self) -> usize {
        self.array.shape()[self.array.ndim() - 2]
    }

    /// Bits per shot.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Bytes per shot.
    pub fn num_bytes(&self) -> usize {
        self.array.shape()[self.array.ndim() - 1]
    }

    /// The packed array.
    pub fn array(&self) -> &ArrayD<u8> {
        &self.array
    }

    /// Sub-array at `index` along the first leading axis.
    pub fn get(&self, index: usize) -> PrimitiveResultT<BitArray> {
        let Some(&len) = self.shape().first() else {
            return Err(PrimitiveError::InvalidShape(
                "cannot index a scalar bit array".into(),
            ));
        };
        if index >= len {
            return Err(PrimitiveError::InvalidShape(format!(
                "index {index} out of range for axis of length {len}"
            )));
        }
        Ok(Self {
            array: self.array.index_axis(Axis(0), index).to_owned(),
            num_bits: self.num_bits,
        })
    }

    /// Every shot as a bitstring (bit 0 rightmost), in storage order.
    pub fn get_bitstrings(&self) -> Vec<String> {
        self.shots().iter().map(|shot| self.unpack(shot)).collect()
    }

    /// Outcome histogram over all entries.
    pub fn get_counts(&self) -> Counts {
        self.shots()
            .iter()
            .map(|shot| (self.unpack(shot), 1))
            .collect()
    }

    /// Outcome histogram keyed by integer value. Fails above 64 bits.
    pub fn get_int_counts(&self) -> PrimitiveResultT<Vec<(u64, u64)>> {
        if self.num_bits > 64 {
            return Err(PrimitiveError::InvalidShape(format!(
                "{} bits do not fit an integer",
                self.num_bits
            )));
        }
        let mut values: Vec<u64> = self
            .shots()
            .iter()
            .map(|shot| shot.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
            .collect();
        values.sort_unstable();

        let mut counts: Vec<(u64, u64)> = Vec::new();
        for v in values {
            match counts.last_mut() {
                Some((last, n)) if *last == v => *n += 1,
                _ => counts.push((v, 1)),
            }
        }
        Ok(counts)
    }

    fn shots(&self) -> Vec<Vec<u8>> {
        let num_bytes = self.num_bytes();
        if num_bytes == 0 {
            return vec![Vec::new(); self.size() * self.num_shots()];
        }
        let flat: Vec<u8> = self.array.iter().copied().collect();
        flat.chunks(num_bytes).map(<[u8]>::to_vec).collect()
    }

    fn unpack(&self, shot: &[u8]) -> String {
        let n = shot.len();
        (0..self.num_bits)
            .rev()
            .map(|k| {
                if (shot[n - 1 - k / 8] >> (k % 8)) & 1 == 1 {
                    '1'
                } else {
                    '0'
                }
            })
            .collect()
    }
}

fn pack_bitstring(bits: &str, num_bytes: usize) -> PrimitiveResultT<Vec<u8>> {
    if bits.len() > num_bytes * 8 {
        return Err(PrimitiveError::InvalidShape(format!(
            "bitstring '{bits}' is wider than {num_bytes} bytes"
        )));
    }
    let mut packed = vec![0u8; num_bytes];
    for (k, c) in bits.bytes().rev().enumerate() {
        match c {
            b'0' => {}
            b'1' => packed[num_bytes - 1 - k / 8] |= 1 << (k % 8),
            other => {
                return Err(PrimitiveError::InvalidShape(format!(
                    "'{}' in bitstring '{bits}'",
                    other as char
                )));
            }
        }
    }
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_layout() {
        let counts = Counts::from_pairs([("01", 2), ("10", 1)]);
        let bits = BitArray::from_counts(&[], &[counts.clone()], 2).unwrap();
        assert_eq!(bits.shape(), &[] as &[usize]);
        assert_eq!(bits.num_shots(), 3);
        assert_eq!(bits.num_bytes(), 1);
        assert_eq!(bits.get_bitstrings(), vec!["01", "01", "10"]);
        assert_eq!(bits.get_counts(), counts);
        assert_eq!(bits.get_int_counts().unwrap(), vec![(1, 2), (2, 1)]);
        assert!(bits.get(0).is_err());
    }

    #[test]
    fn test_multi_byte_packing() {
        let key = "1000000001";
        let bits = BitArray::from_counts(&[], &[Counts::from_pairs([(key, 1)])], 10).unwrap();
        assert_eq!(bits.num_bytes(), 2);
        assert_eq!(bits.array().as_slice().unwrap(), &[0b10, 0b1]);
        assert_eq!(bits.get_bitstrings(), vec![key]);
        assert_eq!(bits.get_int_counts().unwrap(), vec![(513, 1)]);
    }

    #[test]
    fn test_leading_shape_and_indexing() {
        let counts = vec![
            Counts::from_pairs([("0", 2)]),
            Counts::from_pairs([("1", 2)]),
        ];
        let bits = BitArray::from_counts(&[2], &counts, 1).unwrap();
        assert_eq!(bits.shape(), &[2]);
        assert_eq!(bits.get(1).unwrap().get_counts(), counts[1]);
        assert_eq!(bits.get_counts().get("0"), 2);
        assert!(bits.get(2).is_err());

        let uneven = vec![Counts::from_pairs([("0", 2)]), Counts::from_pairs([("1", 3)])];
        assert!(BitArray::from_counts(&[2], &uneven, 1).is_err());
    }

    #[test]
    fn test_zero_width_register() {
        let bits = BitArray::from_counts(&[], &[Counts::from_pairs([("", 4)])], 0).unwrap();
        assert_eq!(bits.num_bytes(), 0);
        assert_eq!(bits.num_shots(), 4);
        assert_eq!(bits.get_counts().get(""), 4);
    }
}
