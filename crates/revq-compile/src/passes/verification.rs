//! Verification that compiled circuits leave no garbage behind.
//!
//! After compilation with uncomputation, every qubit that is neither an
//! input nor an output must be back at 0 and every input must hold its
//! original value. This pass checks both by classical simulation over all
//! input assignments.

use revq_ir::{Circuit, GateKind, QubitId};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};

/// Analysis pass checking that scratch qubits are clean and inputs intact.
pub struct UncomputeVerification {
    inputs: Vec<QubitId>,
    outputs: Vec<QubitId>,
    max_inputs: usize,
}

impl UncomputeVerification {
    /// Create the pass for the given input and output qubits.
    pub fn new(inputs: Vec<QubitId>, outputs: Vec<QubitId>) -> Self {
        Self {
            inputs,
            outputs,
            max_inputs: 16,
        }
    }

    /// Skip circuits with more than `max` inputs.
    #[must_use]
    pub fn with_max_inputs(mut self, max: usize) -> Self {
        self.max_inputs = max.min(32);
        self
    }

    fn fail(&self, reason: String) -> CompileError {
        CompileError::PassFailed {
            name: self.name().to_string(),
            reason,
        }
    }
}

impl Pass for UncomputeVerification {
    fn name(&self) -> &'static str {
        "uncompute_verification"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, circuit: &mut Circuit) -> CompileResult<()> {
        let outputs: FxHashSet<QubitId> = self.outputs.iter().copied().collect();
        let inputs: FxHashSet<QubitId> = self.inputs.iter().copied().collect();
        let k = self.inputs.len();
        if k > self.max_inputs {
            return Err(self.fail(format!(
                "{k} inputs exceed the limit of {}",
                self.max_inputs
            )));
        }

        for row in 0..(1_u64 << k) {
            let assignment: Vec<(QubitId, bool)> = self
                .inputs
                .iter()
                .enumerate()
                .map(|(i, q)| (*q, (row >> i) & 1 == 1))
                .collect();
            let state = circuit.simulate_with(&assignment)?;

            for &(qubit, value) in &assignment {
                if !outputs.contains(&qubit) && state[qubit.index()] != value {
                    return Err(self.fail(format!("input {qubit} modified for row {row:#b}")));
                }
            }
            for (idx, bit) in state.iter().enumerate() {
                let qubit = QubitId::from(idx);
                if *bit && !inputs.contains(&qubit) && !outputs.contains(&qubit) {
                    return Err(self.fail(format!("qubit {qubit} left at 1 for row {row:#b}")));
                }
            }
        }

        debug!("{}: {} rows clean", self.name(), 1_u64 << k);
        Ok(())
    }

    fn should_run(&self, circuit: &Circuit) -> bool {
        self.inputs.len() <= self.max_inputs
            && circuit
                .gates()
                .iter()
                .all(|g| !matches!(g.kind, GateKind::Opaque(_)))
    }
}
