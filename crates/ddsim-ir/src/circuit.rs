//! High-level circuit builder API.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};
use crate::parameter::{ParameterExpression, compare_parameter_names};
use crate::qubit::{ClassicalRegister, ClbitId, QuantumRegister, QubitId};

/// A quantum circuit.
///
/// Instructions are kept as a flat list in program order. Every instruction is
/// checked against the circuit's qubits and classical bits when appended, so a
/// `Circuit` is always well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Quantum registers, in creation order.
    qregs: Vec<QuantumRegister>,
    /// Classical registers, in creation order.
    cregs: Vec<ClassicalRegister>,
    /// Total number of qubits.
    num_qubits: u32,
    /// Total number of classical bits.
    num_clbits: u32,
    /// Program-ordered instruction list.
    instructions: Vec<Instruction>,
    /// Free-form metadata carried into experiment results.
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qregs: vec![],
            cregs: vec![],
            num_qubits: 0,
            num_clbits: 0,
            instructions: vec![],
            metadata: Map::new(),
        }
    }

    /// Create a circuit with a quantum register `q` and, if `num_clbits > 0`,
    /// a classical register `c`.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        if num_qubits > 0 {
            circuit.push_qreg("q".into(), num_qubits);
        }
        if num_clbits > 0 {
            circuit.push_creg("c".into(), num_clbits);
        }
        circuit
    }

    /// Add a quantum register with multiple qubits.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<QubitId>> {
        let name = name.into();
        if self.qregs.iter().any(|r| r.name == name) {
            return Err(IrError::DuplicateRegister(name));
        }
        Ok(self.push_qreg(name, size).qubits().collect())
    }

    /// Add a classical register backed by `size` new classical bits.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<ClbitId>> {
        let name = name.into();
        if self.cregs.iter().any(|r| r.name == name) {
            return Err(IrError::DuplicateRegister(name));
        }
        Ok(self.push_creg(name, size).clbits().collect())
    }

    /// Add a classical register aliasing `size` existing bits starting at
    /// `offset`. The new register may overlap other registers.
    pub fn add_creg_alias(
        &mut self,
        name: impl Into<String>,
        offset: u32,
        size: u32,
    ) -> IrResult<&ClassicalRegister> {
        let name = name.into();
        if self.cregs.iter().any(|r| r.name == name) {
            return Err(IrError::DuplicateRegister(name));
        }
        let end = offset + size;
        if end > self.num_clbits {
            return Err(IrError::ClbitNotFound {
                clbit: ClbitId(end.saturating_sub(1)),
            });
        }
        self.cregs.push(ClassicalRegister { name, size, offset });
        Ok(&self.cregs[self.cregs.len() - 1])
    }

    fn push_qreg(&mut self, name: String, size: u32) -> &QuantumRegister {
        self.qregs.push(QuantumRegister {
            name,
            size,
            offset: self.num_qubits,
        });
        self.num_qubits += size;
        &self.qregs[self.qregs.len() - 1]
    }

    fn push_creg(&mut self, name: String, size: u32) -> &ClassicalRegister {
        self.cregs.push(ClassicalRegister {
            name,
            size,
            offset: self.num_clbits,
        });
        self.num_clbits += size;
        &self.cregs[self.cregs.len() - 1]
    }

    /// Append an instruction after checking its operands.
    pub fn append(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.check_operands(&instruction)?;
        self.instructions.push(instruction);
        Ok(self)
    }

    fn check_operands(&self, instruction: &Instruction) -> IrResult<()> {
        let gate_name = || Some(instruction.name().to_string());
        let mut seen = BTreeSet::new();
        for &qubit in &instruction.qubits {
            if qubit.0 >= self.num_qubits {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name(),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name(),
                });
            }
        }
        for &clbit in &instruction.clbits {
            if clbit.0 >= self.num_clbits {
                return Err(IrError::ClbitNotFound { clbit });
            }
        }
        match &instruction.kind {
            InstructionKind::Gate(gate) if gate.num_qubits() as usize != instruction.qubits.len() => {
                Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: gate.num_qubits(),
                    got: instruction.qubits.len() as u32,
                })
            }
            InstructionKind::Measure if instruction.qubits.len() != instruction.clbits.len() => {
                Err(IrError::MeasureArityMismatch {
                    qubits: instruction.qubits.len(),
                    clbits: instruction.clbits.len(),
                })
            }
            _ => Ok(()),
        }
    }

    fn apply_gate(
        &mut self,
        gate: StandardGate,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.append(Instruction::gate(gate, qubits))
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::H, [qubit])
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::X, [qubit])
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Y, [qubit])
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Z, [qubit])
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::S, [qubit])
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Sdg, [qubit])
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::T, [qubit])
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::SX, [qubit])
    }

    /// Apply Rx rotation gate.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Rx(theta.into()), [qubit])
    }

    /// Apply Ry rotation gate.
    pub fn ry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Ry(theta.into()), [qubit])
    }

    /// Apply Rz rotation gate.
    pub fn rz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Rz(theta.into()), [qubit])
    }

    /// Apply phase gate.
    pub fn p(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::P(theta.into()), [qubit])
    }

    /// Apply the universal single-qubit gate U(θ, φ, λ).
    pub fn u(
        &mut self,
        theta: impl Into<ParameterExpression>,
        phi: impl Into<ParameterExpression>,
        lambda: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(
            StandardGate::U(theta.into(), phi.into(), lambda.into()),
            [qubit],
        )
    }

    // =========================================================================
    // Multi-qubit gates
    // =========================================================================

    /// Apply CNOT gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CX, [control, target])
    }

    /// Apply controlled-Z gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CZ, [control, target])
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::Swap, [q1, q2])
    }

    /// Apply controlled phase gate.
    pub fn cp(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CP(theta.into()), [control, target])
    }

    /// Apply ZZ rotation gate.
    pub fn rzz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        q1: QubitId,
        q2: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::RZZ(theta.into()), [q1, q2])
    }

    /// Apply Toffoli gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply_gate(StandardGate::CCX, [c1, c2, target])
    }

    /// Apply any standard gate.
    pub fn gate(
        &mut self,
        gate: StandardGate,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.apply_gate(gate, qubits)
    }

    // =========================================================================
    // Non-unitary operations
    // =========================================================================

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.append(Instruction::measure(qubit, clbit))
    }

    /// Add a `meas` register, a barrier, and measure qubit `i` into `meas[i]`.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        let clbits = self.add_creg("meas", self.num_qubits)?;
        self.barrier_all()?;
        for (i, clbit) in clbits.into_iter().enumerate() {
            self.measure(QubitId(i as u32), clbit)?;
        }
        Ok(self)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::reset(qubit))
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.append(Instruction::barrier(qubits))
    }

    /// Apply a barrier to all qubits.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        self.append(Instruction::barrier((0..self.num_qubits).map(QubitId)))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits as usize
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits as usize
    }

    /// Quantum registers, in creation order.
    pub fn qregs(&self) -> &[QuantumRegister] {
        &self.qregs
    }

    /// Classical registers, in creation order.
    pub fn cregs(&self) -> &[ClassicalRegister] {
        &self.cregs
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Circuit metadata.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Mutable circuit metadata.
    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.metadata
    }

    /// Count of each instruction name.
    pub fn count_ops(&self) -> FxHashMap<String, usize> {
        let mut ops = FxHashMap::default();
        for inst in &self.instructions {
            *ops.entry(inst.name().to_string()).or_insert(0) += 1;
        }
        ops
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Names of all free parameters, in natural name order.
    pub fn parameters(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for gate in self.instructions.iter().filter_map(Instruction::as_gate) {
            for param in gate.parameters() {
                names.extend(param.symbols());
            }
        }
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort_by(|a, b| compare_parameter_names(a, b));
        names
    }

    /// Number of free parameters.
    pub fn num_parameters(&self) -> usize {
        self.parameters().len()
    }

    /// Return a copy with every parameter replaced by its value.
    ///
    /// Fails if a free parameter has no value or a bound expression does not
    /// evaluate to a finite number. Extra entries in `values` are ignored.
    pub fn bind(&self, values: &FxHashMap<String, f64>) -> IrResult<Circuit> {
        let mut bound = self.clone();
        for inst in &mut bound.instructions {
            if let InstructionKind::Gate(gate) = &mut inst.kind {
                let substituted = gate.substitute(values);
                for param in substituted.parameters() {
                    param.value()?;
                }
                *gate = substituted;
            }
        }
        Ok(bound)
    }

    // =========================================================================
    // Measurement analysis
    // =========================================================================

    /// Whether the circuit contains any measurement.
    pub fn has_measurements(&self) -> bool {
        self.instructions.iter().any(Instruction::is_measure)
    }

    /// Whether the circuit contains any reset.
    pub fn has_reset(&self) -> bool {
        self.instructions.iter().any(Instruction::is_reset)
    }

    /// Indices of measurements that are final: no later gate, reset or
    /// measurement touches the measured qubit.
    fn final_measure_positions(&self) -> Vec<usize> {
        let mut touched_later = vec![false; self.num_qubits()];
        let mut positions = vec![];
        for (idx, inst) in self.instructions.iter().enumerate().rev() {
            if inst.is_barrier() {
                continue;
            }
            if inst.is_measure() && inst.qubits.iter().all(|q| !touched_later[q.index()]) {
                positions.push(idx);
            }
            for q in &inst.qubits {
                touched_later[q.index()] = true;
            }
        }
        positions.reverse();
        positions
    }

    /// Whether some measurement is followed by another operation on its qubit.
    pub fn has_mid_circuit_measurement(&self) -> bool {
        let total = self.instructions.iter().filter(|i| i.is_measure()).count();
        total != self.final_measure_positions().len()
    }

    /// Whether simulation needs per-shot state collapse (mid-circuit
    /// measurement or reset).
    pub fn is_dynamic(&self) -> bool {
        self.has_reset() || self.has_mid_circuit_measurement()
    }

    /// Final `(qubit, clbit)` measurement pairs in program order.
    pub fn final_measurements(&self) -> Vec<(QubitId, ClbitId)> {
        self.final_measure_positions()
            .into_iter()
            .flat_map(|idx| {
                let inst = &self.instructions[idx];
                inst.qubits.iter().copied().zip(inst.clbits.iter().copied())
            })
            .collect()
    }

    /// Return a copy with final measurements and the barriers after the last
    /// unitary operation removed. Registers are kept.
    pub fn without_final_measurements(&self) -> Circuit {
        let finals: BTreeSet<usize> = self.final_measure_positions().into_iter().collect();
        let mut stripped = self.clone();
        stripped.instructions = self
            .instructions
            .iter()
            .enumerate()
            .filter(|(idx, _)| !finals.contains(idx))
            .map(|(_, inst)| inst.clone())
            .collect();
        while stripped
            .instructions
            .last()
            .is_some_and(Instruction::is_barrier)
        {
            stripped.instructions.pop();
        }
        stripped
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        let q0 = QubitId(0);
        let q1 = QubitId(1);

        circuit
            .h(q0)?
            .cx(q0, q1)?
            .measure(q0, ClbitId(0))?
            .measure(q1, ClbitId(1))?;

        Ok(circuit)
    }

    /// Create a GHZ state circuit.
    pub fn ghz(n: u32) -> IrResult<Self> {
        if n == 0 {
            return Ok(Self::new("ghz_0"));
        }

        let mut circuit = Self::with_size("ghz", n, n);
        circuit.h(QubitId(0))?;
        for i in 0..n - 1 {
            circuit.cx(QubitId(i), QubitId(i + 1))?;
        }
        for i in 0..n {
            circuit.measure(QubitId(i), ClbitId(i))?;
        }

        Ok(circuit)
    }

    /// Hardware-efficient real-amplitude ansatz without measurements.
    ///
    /// Each repetition is an `ry` layer followed by a reverse-linear `cx`
    /// ladder; a final `ry` layer closes the circuit. Parameters are
    /// `θ[0]..θ[n * (reps + 1) - 1]` in application order.
    pub fn real_amplitudes(num_qubits: u32, reps: u32) -> IrResult<Self> {
        let mut circuit = Self::with_size("RealAmplitudes", num_qubits, 0);
        let mut next = 0usize;
        let mut rotation_layer = |circuit: &mut Self| -> IrResult<()> {
            for q in 0..num_qubits {
                circuit.ry(ParameterExpression::vector_element("θ", next), QubitId(q))?;
                next += 1;
            }
            Ok(())
        };

        for _ in 0..reps {
            rotation_layer(&mut circuit)?;
            for q in (0..num_qubits.saturating_sub(1)).rev() {
                circuit.cx(QubitId(q), QubitId(q + 1))?;
            }
        }
        rotation_layer(&mut circuit)?;

        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_new_circuit() {
        let circuit = Circuit::new("test");
        assert_eq!(circuit.name(), "test");
        assert_eq!(circuit.num_qubits(), 0);
        assert_eq!(circuit.num_clbits(), 0);
        assert!(circuit.cregs().is_empty());
    }

    #[test]
    fn test_add_registers() {
        let mut circuit = Circuit::new("test");
        let qreg = circuit.add_qreg("q", 4).unwrap();
        let b = circuit.add_creg("b", 2).unwrap();
        let c = circuit.add_creg("c", 2).unwrap();

        assert_eq!(qreg.len(), 4);
        assert_eq!(b, vec![ClbitId(0), ClbitId(1)]);
        assert_eq!(c, vec![ClbitId(2), ClbitId(3)]);
        assert_eq!(circuit.cregs()[1].offset, 2);
        assert!(matches!(
            circuit.add_creg("b", 1),
            Err(IrError::DuplicateRegister(_))
        ));
    }

    #[test]
    fn test_operand_checks() {
        let mut circuit = Circuit::with_size("test", 2, 1);
        assert!(matches!(
            circuit.h(QubitId(2)),
            Err(IrError::QubitNotFound { .. })
        ));
        assert!(matches!(
            circuit.cx(QubitId(0), QubitId(0)),
            Err(IrError::DuplicateQubit { .. })
        ));
        assert!(matches!(
            circuit.measure(QubitId(0), ClbitId(1)),
            Err(IrError::ClbitNotFound { .. })
        ));
        assert!(matches!(
            circuit.gate(StandardGate::CX, [QubitId(0)]),
            Err(IrError::QubitCountMismatch { .. })
        ));
        assert!(circuit.instructions().is_empty());
    }

    #[test]
    fn test_bell_state() {
        let circuit = Circuit::bell().unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.count_ops()["measure"], 2);
        assert!(!circuit.has_mid_circuit_measurement());
    }

    #[test]
    fn test_measure_all_adds_meas_register() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.measure_all().unwrap();

        assert_eq!(circuit.cregs().len(), 1);
        assert_eq!(circuit.cregs()[0].name, "meas");
        assert_eq!(circuit.num_clbits(), 3);
        assert_eq!(circuit.final_measurements().len(), 3);
    }

    #[test]
    fn test_parameters_are_naturally_sorted() {
        let circuit = Circuit::real_amplitudes(4, 2).unwrap();
        let params = circuit.parameters();
        assert_eq!(params.len(), 12);
        assert_eq!(params[2], "θ[2]");
        assert_eq!(params[10], "θ[10]");
    }

    #[test]
    fn test_bind() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.rx(PI / 2.0, QubitId(0)).unwrap();
        circuit
            .ry(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();

        assert!(matches!(
            circuit.bind(&FxHashMap::default()),
            Err(IrError::UnboundParameter(name)) if name == "theta"
        ));

        let mut values = FxHashMap::default();
        values.insert("theta".to_string(), 0.5);
        let bound = circuit.bind(&values).unwrap();
        assert!(bound.parameters().is_empty());
        assert_eq!(
            bound.instructions()[1].as_gate(),
            Some(&StandardGate::Ry(ParameterExpression::Constant(0.5)))
        );
        // the original is untouched
        assert_eq!(circuit.parameters(), vec!["theta"]);
    }

    #[test]
    fn test_mid_circuit_measurement_detection() {
        let mut circuit = Circuit::with_size("test", 2, 2);
        circuit
            .h(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .barrier_all()
            .unwrap()
            .measure(QubitId(1), ClbitId(1))
            .unwrap();
        assert!(!circuit.has_mid_circuit_measurement());

        circuit.x(QubitId(0)).unwrap();
        assert!(circuit.has_mid_circuit_measurement());
        assert!(circuit.is_dynamic());
        assert_eq!(
            circuit.final_measurements(),
            vec![(QubitId(1), ClbitId(1))]
        );
    }

    #[test]
    fn test_without_final_measurements() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure_all().unwrap();

        let stripped = circuit.without_final_measurements();
        assert_eq!(stripped.instructions().len(), 2);
        assert!(!stripped.has_measurements());
        assert_eq!(stripped.cregs().len(), 1);
    }

    #[test]
    fn test_creg_alias_may_overlap() {
        let mut circuit = Circuit::with_size("test", 2, 2);
        let alias = circuit.add_creg_alias("hi", 1, 1).unwrap().clone();
        assert!(alias.overlaps(&circuit.cregs()[0]));
        assert_eq!(circuit.num_clbits(), 2);
        assert!(circuit.add_creg_alias("bad", 1, 2).is_err());
    }
}
