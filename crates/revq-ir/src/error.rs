//! Error types for the IR crate.

use crate::qubit::QubitId;
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit index is not allocated in the circuit.
    #[error("Qubit {qubit} out of range (circuit has {num_qubits} qubits){}", format_gate_context(.gate_name))]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// Number of qubits currently allocated.
        num_qubits: u32,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Duplicate qubit in one gate application.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Gate applied to the wrong number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    ArityMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: usize,
        /// Actual number of qubits provided.
        got: usize,
    },

    /// Symbol has no value in the evaluation environment.
    #[error("Symbol '{0}' is not bound")]
    UnboundSymbol(String),

    /// Expression has no classical semantics.
    #[error("Expression '{0}' cannot be evaluated classically")]
    NotEvaluable(String),

    /// Classical simulation hit a non-classical gate.
    #[error("Gate '{0}' has no classical semantics")]
    NonClassicalGate(String),

    /// Wrong number of input values.
    #[error("Expected {expected} input values, got {got}")]
    InputLengthMismatch {
        /// Expected number of values.
        expected: usize,
        /// Actual number of values provided.
        got: usize,
    },
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
