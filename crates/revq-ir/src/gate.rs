//! Gate kinds and applied gates.

use serde::{Deserialize, Serialize};

use crate::qubit::QubitId;

/// Gates understood by the reversible core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    /// NOT.
    X,
    /// Controlled NOT.
    CX,
    /// Toffoli (doubly-controlled NOT).
    CCX,
    /// Multiply-controlled NOT with the given number of controls.
    MCX(usize),
    /// Section delimiter; semantically a no-op.
    Barrier,
    /// Hybrid operation applied atomically; the name selects the operation.
    Opaque(String),
}

impl GateKind {
    /// Canonical NOT-family gate for `controls` control qubits.
    pub fn for_controls(controls: usize) -> Self {
        match controls {
            0 => GateKind::X,
            1 => GateKind::CX,
            2 => GateKind::CCX,
            n => GateKind::MCX(n),
        }
    }

    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::X => "x",
            GateKind::CX => "cx",
            GateKind::CCX => "ccx",
            GateKind::MCX(_) => "mcx",
            GateKind::Barrier => "barrier",
            GateKind::Opaque(name) => name,
        }
    }

    /// Number of qubits the gate acts on, if fixed.
    pub fn num_qubits(&self) -> Option<usize> {
        match self {
            GateKind::X => Some(1),
            GateKind::CX => Some(2),
            GateKind::CCX => Some(3),
            GateKind::MCX(n) => Some(n + 1),
            GateKind::Barrier | GateKind::Opaque(_) => None,
        }
    }

    /// Check if this gate belongs to the classical basis `{X, CX, CCX, MCX}`.
    #[inline]
    pub fn is_classical(&self) -> bool {
        matches!(
            self,
            GateKind::X | GateKind::CX | GateKind::CCX | GateKind::MCX(_)
        )
    }

    /// Check if this is a barrier.
    #[inline]
    pub fn is_barrier(&self) -> bool {
        matches!(self, GateKind::Barrier)
    }

    /// Check if applying the gate twice is the identity.
    ///
    /// Opaque operations are assumed to be involutions when they are used
    /// inside uncomputed scopes; only the classical basis is reported here.
    pub fn is_self_inverse(&self) -> bool {
        self.is_classical()
    }
}

/// A gate applied to concrete qubits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedGate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Operands; for classical gates the last one is the target.
    pub qubits: Vec<QubitId>,
    /// Optional numeric parameter (hybrid gates only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<f64>,
}

impl AppliedGate {
    /// Create a gate application without parameter.
    pub fn new(kind: GateKind, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind,
            qubits: qubits.into_iter().collect(),
            param: None,
        }
    }

    /// Attach a parameter.
    #[must_use]
    pub fn with_param(mut self, param: f64) -> Self {
        self.param = Some(param);
        self
    }

    /// NOT on `target`.
    pub fn x(target: QubitId) -> Self {
        Self::new(GateKind::X, [target])
    }

    /// CNOT from `control` to `target`.
    pub fn cx(control: QubitId, target: QubitId) -> Self {
        Self::new(GateKind::CX, [control, target])
    }

    /// Toffoli with two controls.
    pub fn ccx(c0: QubitId, c1: QubitId, target: QubitId) -> Self {
        Self::new(GateKind::CCX, [c0, c1, target])
    }

    /// Multiply-controlled NOT, choosing the canonical kind for the number of controls.
    pub fn mcx(controls: &[QubitId], target: QubitId) -> Self {
        let mut qubits = controls.to_vec();
        qubits.push(target);
        Self::new(GateKind::for_controls(controls.len()), qubits)
    }

    /// The last operand, which is the target of classical gates.
    pub fn target(&self) -> Option<QubitId> {
        self.qubits.last().copied()
    }

    /// All operands but the last.
    pub fn controls(&self) -> &[QubitId] {
        match self.qubits.split_last() {
            Some((_, controls)) => controls,
            None => &[],
        }
    }

    /// Get the name of the gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        self.kind.is_barrier()
    }
}
