//! Classical (truth-table) simulation of reversible circuits.
//!
//! Every gate of the classical basis maps basis states to basis states, so a
//! circuit over `{X, CX, CCX, MCX}` is fully described by how it permutes
//! bit-strings. This module executes that permutation directly.

use crate::circuit::Circuit;
use crate::error::{IrError, IrResult};
use crate::gate::GateKind;
use crate::qubit::QubitId;

/// One row of a truth table: input bits and the resulting output bits.
pub type TruthRow = (Vec<bool>, Vec<bool>);

impl Circuit {
    /// Run the circuit on a classical initial state.
    ///
    /// `initial` gives the values of the first `initial.len()` qubits; the
    /// remaining qubits start at 0. Returns the final value of every qubit.
    pub fn simulate(&self, initial: &[bool]) -> IrResult<Vec<bool>> {
        if initial.len() > self.num_qubits() {
            return Err(IrError::InputLengthMismatch {
                expected: self.num_qubits(),
                got: initial.len(),
            });
        }

        let mut state = vec![false; self.num_qubits()];
        state[..initial.len()].copy_from_slice(initial);

        for gate in self.gates() {
            match &gate.kind {
                GateKind::Barrier => {}
                GateKind::X | GateKind::CX | GateKind::CCX | GateKind::MCX(_) => {
                    if let Some((target, controls)) = gate.qubits.split_last() {
                        if controls.iter().all(|q| state[q.index()]) {
                            state[target.index()] ^= true;
                        }
                    }
                }
                GateKind::Opaque(name) => return Err(IrError::NonClassicalGate(name.clone())),
            }
        }

        Ok(state)
    }

    /// Run the circuit with selected qubits set and all others at 0.
    pub fn simulate_with(&self, assignment: &[(QubitId, bool)]) -> IrResult<Vec<bool>> {
        let mut initial = vec![false; self.num_qubits()];
        for &(qubit, value) in assignment {
            let slot = initial
                .get_mut(qubit.index())
                .ok_or(IrError::QubitOutOfRange {
                    qubit,
                    num_qubits: u32::try_from(self.num_qubits()).unwrap_or(u32::MAX),
                    gate_name: None,
                })?;
            *slot = value;
        }
        self.simulate(&initial)
    }

    /// Enumerate all `2^k` assignments of `inputs` and read `outputs`.
    ///
    /// Rows are ordered with the first input as the most significant bit,
    /// so the first row is all zeros and the last row is all ones.
    pub fn truth_table(&self, inputs: &[QubitId], outputs: &[QubitId]) -> IrResult<Vec<TruthRow>> {
        for &qubit in outputs {
            self.check_range(qubit, None)?;
        }
        let k = inputs.len();
        let mut rows = Vec::with_capacity(1 << k);

        for row in 0..(1_usize << k) {
            let bits: Vec<bool> = (0..k).map(|i| (row >> (k - 1 - i)) & 1 == 1).collect();
            let assignment: Vec<(QubitId, bool)> =
                inputs.iter().copied().zip(bits.iter().copied()).collect();
            let state = self.simulate_with(&assignment)?;
            let out = outputs.iter().map(|q| state[q.index()]).collect();
            rows.push((bits, out));
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::circuit::Circuit;
    use crate::error::IrError;
    use crate::gate::{AppliedGate, GateKind};
    use crate::qubit::QubitId;

    #[test]
    fn test_toffoli_truth_table() {
        let mut circuit = Circuit::with_size("ccx", 3);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();

        let table = circuit
            .truth_table(&[QubitId(0), QubitId(1)], &[QubitId(2)])
            .unwrap();
        let outputs: Vec<bool> = table.iter().map(|(_, out)| out[0]).collect();
        assert_eq!(outputs, vec![false, false, false, true]);
    }

    #[test]
    fn test_initial_state_is_padded() {
        let mut circuit = Circuit::with_size("pad", 3);
        circuit.cx(QubitId(0), QubitId(2)).unwrap();
        let state = circuit.simulate(&[true]).unwrap();
        assert_eq!(state, vec![true, false, true]);
    }

    #[test]
    fn test_opaque_gate_is_rejected() {
        let mut circuit = Circuit::with_size("h", 1);
        circuit
            .append_gate(AppliedGate::new(GateKind::Opaque("h".into()), [QubitId(0)]))
            .unwrap();
        assert!(matches!(
            circuit.simulate(&[false]),
            Err(IrError::NonClassicalGate(_))
        ));
    }

    #[test]
    fn test_truth_table_rejects_unknown_output() {
        let mut circuit = Circuit::with_size("cx", 2);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        assert!(matches!(
            circuit.truth_table(&[QubitId(0)], &[QubitId(5)]),
            Err(IrError::QubitOutOfRange { .. })
        ));
    }

    #[test]
    fn test_too_many_initial_values() {
        let circuit = Circuit::with_size("small", 1);
        assert!(matches!(
            circuit.simulate(&[true, true]),
            Err(IrError::InputLengthMismatch { .. })
        ));
    }
}
