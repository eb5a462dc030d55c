//! Unitary construction and decision-diagram node counting.

use ddsim_hal::{ConstructionMode, HalError, HalResult};
use ndarray::{Array2, ShapeBuilder};
use num_complex::Complex64;
use rustc_hash::FxHashMap;

use crate::program::Operation;
use crate::statevector::apply_matrix;

/// Gate lists at most this long are composed directly in recursive mode.
const RECURSION_LEAF: usize = 4;

/// Magnitude below which a decision-diagram edge weight counts as zero.
const DD_TOLERANCE: f64 = 1e-12;

/// Quantization step used to identify equal normalized weights.
const DD_QUANTUM: f64 = 1e-9;

/// Build the unitary of a measurement-free operation list.
pub(crate) fn build(
    num_qubits: usize,
    ops: &[Operation],
    mode: ConstructionMode,
) -> HalResult<Array2<Complex64>> {
    match mode {
        ConstructionMode::Sequential => sequential(num_qubits, ops),
        ConstructionMode::Recursive => recursive(num_qubits, ops),
    }
}

/// Apply every gate, left to right, to the columns of the identity.
fn sequential(num_qubits: usize, ops: &[Operation]) -> HalResult<Array2<Complex64>> {
    let dim = 1usize << num_qubits;
    // column-major: column j occupies data[j * dim..(j + 1) * dim]
    let mut data = vec![Complex64::new(0.0, 0.0); dim * dim];
    for j in 0..dim {
        data[j * dim + j] = Complex64::new(1.0, 0.0);
    }
    for op in ops {
        if let Operation::Gate { qubits, matrix } = op {
            for column in data.chunks_mut(dim) {
                apply_matrix(column, qubits, matrix);
            }
        }
    }
    Array2::from_shape_vec((dim, dim).f(), data)
        .map_err(|e| HalError::SimulationFailure(format!("unitary layout: {e}")))
}

/// Build both halves of the gate list independently and multiply them.
fn recursive(num_qubits: usize, ops: &[Operation]) -> HalResult<Array2<Complex64>> {
    if ops.len() <= RECURSION_LEAF {
        return sequential(num_qubits, ops);
    }
    let (first, second) = ops.split_at(ops.len() / 2);
    let left = recursive(num_qubits, first)?;
    let right = recursive(num_qubits, second)?;
    Ok(right.dot(&left))
}

/// Edge of a decision diagram: a weight pointing at a node. Node 0 is the
/// terminal.
type Edge = (Complex64, usize);

type NodeKey = ([usize; 4], [(i64, i64); 4]);

/// Number of non-terminal nodes of the canonical matrix decision diagram of
/// `matrix`: distinct sub-blocks after normalizing by their largest entry.
pub(crate) fn count_dd_nodes(matrix: &Array2<Complex64>) -> usize {
    let dim = matrix.nrows();
    if dim <= 1 {
        return 0;
    }
    let mut unique: FxHashMap<NodeKey, usize> = FxHashMap::default();
    build_node(matrix, 0, 0, dim, &mut unique);
    unique.len()
}

fn build_node(
    matrix: &Array2<Complex64>,
    row: usize,
    col: usize,
    size: usize,
    unique: &mut FxHashMap<NodeKey, usize>,
) -> Edge {
    if size == 1 {
        let w = matrix[[row, col]];
        return if w.norm() < DD_TOLERANCE {
            (Complex64::new(0.0, 0.0), 0)
        } else {
            (w, 0)
        };
    }
    let half = size / 2;
    // quadrant order: (top-left, top-right, bottom-left, bottom-right)
    let children = [
        build_node(matrix, row, col, half, unique),
        build_node(matrix, row, col + half, half, unique),
        build_node(matrix, row + half, col, half, unique),
        build_node(matrix, row + half, col + half, half, unique),
    ];

    let mut norm = Complex64::new(0.0, 0.0);
    for (w, _) in &children {
        if w.norm() > norm.norm() + DD_TOLERANCE {
            norm = *w;
        }
    }
    if norm.norm() < DD_TOLERANCE {
        return (Complex64::new(0.0, 0.0), 0);
    }

    let mut ids = [0usize; 4];
    let mut weights = [(0i64, 0i64); 4];
    for (k, (w, id)) in children.iter().enumerate() {
        let normalized = w / norm;
        ids[k] = *id;
        weights[k] = (quantize(normalized.re), quantize(normalized.im));
    }
    let next_id = unique.len() + 1;
    let id = *unique.entry((ids, weights)).or_insert(next_id);
    (norm, id)
}

#[allow(clippy::cast_possible_truncation)]
fn quantize(x: f64) -> i64 {
    (x / DD_QUANTUM).round() as i64
}
