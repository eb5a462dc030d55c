//! Lowering of circuits into engine operations.

use ddsim_hal::{HalError, HalResult};
use ddsim_ir::{Circuit, InstructionKind};
use num_complex::Complex64;

/// One executable step with resolved operands and a dense gate matrix.
#[derive(Debug, Clone)]
pub(crate) enum Operation {
    /// Unitary gate on `qubits` (little-endian operand order).
    Gate {
        qubits: Vec<usize>,
        matrix: Vec<Complex64>,
    },
    /// Measure `qubit` into classical bit `clbit`.
    Measure { qubit: usize, clbit: usize },
    /// Reset `qubit` to |0⟩.
    Reset { qubit: usize },
}

impl Operation {
    /// Whether this is a gate on more than one qubit.
    pub(crate) fn is_multi_qubit_gate(&self) -> bool {
        matches!(self, Operation::Gate { qubits, .. } if qubits.len() > 1)
    }
}

/// Lower every instruction of `circuit`. Barriers are dropped; measurements
/// with several operands are split into single-qubit measurements.
pub(crate) fn compile(circuit: &Circuit) -> HalResult<Vec<Operation>> {
    let mut ops = Vec::with_capacity(circuit.instructions().len());
    for inst in circuit.instructions() {
        match &inst.kind {
            InstructionKind::Gate(gate) => ops.push(Operation::Gate {
                qubits: inst.qubits.iter().map(|q| q.index()).collect(),
                matrix: gate.matrix()?,
            }),
            InstructionKind::Measure => {
                for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                    ops.push(Operation::Measure {
                        qubit: q.index(),
                        clbit: c.index(),
                    });
                }
            }
            InstructionKind::Reset => {
                for q in &inst.qubits {
                    ops.push(Operation::Reset { qubit: q.index() });
                }
            }
            InstructionKind::Barrier => {}
        }
    }
    Ok(ops)
}

/// Lower only the gates of a circuit that must be free of measurements and
/// resets once its final measurements are removed.
pub(crate) fn compile_unitary_part(circuit: &Circuit) -> HalResult<Vec<Operation>> {
    let stripped = circuit.without_final_measurements();
    if stripped.has_measurements() || stripped.has_reset() {
        return Err(HalError::InvalidCircuit(format!(
            "circuit '{}' contains mid-circuit measurement or reset and has no single final state",
            circuit.name()
        )));
    }
    compile(&stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddsim_ir::{ClbitId, QubitId};

    #[test]
    fn test_compile_drops_barriers() {
        let mut circuit = Circuit::with_size("test", 2, 2);
        circuit.h(QubitId(0)).unwrap();
        circuit.barrier_all().unwrap();
        circuit.measure(QubitId(0), ClbitId(1)).unwrap();

        let ops = compile(&circuit).unwrap();
        assert_eq!(ops.len(), 2);
        assert!(matches!(
            ops[1],
            Operation::Measure { qubit: 0, clbit: 1 }
        ));
    }

    #[test]
    fn test_unitary_part_rejects_dynamic_circuits() {
        let mut circuit = Circuit::with_size("test", 1, 1);
        circuit.h(QubitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        assert_eq!(compile_unitary_part(&circuit).unwrap().len(), 1);

        circuit.h(QubitId(0)).unwrap();
        assert!(compile_unitary_part(&circuit).is_err());
    }
}
