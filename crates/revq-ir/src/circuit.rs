//! Reversible circuit and its qubit resource manager.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IrError, IrResult};
use crate::gate::{AppliedGate, GateKind};
use crate::qubit::QubitId;
use crate::symbol::Symbol;

/// One logged operation: the gates it emitted and the qubit it writes.
///
/// Every logged operation changes only its target; replaying its gates in
/// reverse order inverts it because the basis is self-inverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LogEntry {
    gates: Vec<AppliedGate>,
    target: QubitId,
}

/// A reversible circuit over the classical NOT-family basis.
///
/// Besides the gate list, the circuit owns every resource a compilation
/// needs: the qubit name map, the ancilla pool and the logs used to
/// uncompute scratch values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Most recent name of each qubit.
    labels: Vec<Symbol>,
    /// Explicit names bound to qubits; several names may share one qubit.
    qubit_map: FxHashMap<Symbol, QubitId>,
    /// Qubits that carry at least one explicit name.
    bound: FxHashSet<QubitId>,
    /// Emitted gates, in order.
    gates: Vec<AppliedGate>,
    /// Every logged operation, including uncomputation replays.
    history: Vec<LogEntry>,
    /// Operations whose effect has not been undone yet.
    computed: Vec<LogEntry>,
    /// Scratch qubits that have not been promoted.
    ancillas: BTreeSet<QubitId>,
    /// Ancillas known to hold 0 and available for reuse.
    free_ancillas: BTreeSet<QubitId>,
    /// Ancillas whose value is no longer needed.
    marked: BTreeSet<QubitId>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: vec![],
            qubit_map: FxHashMap::default(),
            bound: FxHashSet::default(),
            gates: vec![],
            history: vec![],
            computed: vec![],
            ancillas: BTreeSet::new(),
            free_ancillas: BTreeSet::new(),
            marked: BTreeSet::new(),
        }
    }

    /// Create a circuit with `num_qubits` unnamed qubits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32) -> Self {
        let mut circuit = Self::new(name);
        for _ in 0..num_qubits {
            circuit.add_qubit(None);
        }
        circuit
    }

    /// Copy of this circuit's qubits, names and ancilla sets without gates.
    pub fn empty_like(&self) -> Self {
        Self {
            name: self.name.clone(),
            labels: self.labels.clone(),
            qubit_map: self.qubit_map.clone(),
            bound: self.bound.clone(),
            gates: vec![],
            history: vec![],
            computed: vec![],
            ancillas: self.ancillas.clone(),
            free_ancillas: BTreeSet::new(),
            marked: BTreeSet::new(),
        }
    }

    /// Copy of this circuit's qubits carrying a different gate list.
    pub fn with_gates(&self, gates: impl IntoIterator<Item = AppliedGate>) -> IrResult<Self> {
        let mut circuit = self.empty_like();
        for gate in gates {
            circuit.append_gate(gate)?;
        }
        Ok(circuit)
    }

    // =========================================================================
    // Qubit allocation
    // =========================================================================

    /// Append a fresh qubit, optionally bound to a name.
    ///
    /// Unnamed qubits are labelled by position (`q{index}`).
    pub fn add_qubit(&mut self, name: Option<Symbol>) -> QubitId {
        let id = QubitId::from(self.labels.len());
        match name {
            Some(name) => {
                self.qubit_map.insert(name.clone(), id);
                self.bound.insert(id);
                self.labels.push(name);
            }
            None => self.labels.push(Symbol::new(format!("q{}", id.0))),
        }
        id
    }

    /// Append a fresh scratch qubit.
    pub fn add_ancilla(&mut self, is_free: bool) -> QubitId {
        let id = QubitId::from(self.labels.len());
        self.labels.push(Symbol::new(format!("anc{}", id.0)));
        self.ancillas.insert(id);
        if is_free {
            self.free_ancillas.insert(id);
        }
        id
    }

    /// Take an ancilla holding 0, allocating one when the pool is empty.
    pub fn get_free_ancilla(&mut self) -> QubitId {
        match self.free_ancillas.pop_first() {
            Some(id) => id,
            None => self.add_ancilla(false),
        }
    }

    /// Bind `name` to `qubit`.
    ///
    /// With `promote`, an ancilla becomes a permanent qubit that is never
    /// reclaimed implicitly.
    pub fn map_qubit(&mut self, name: Symbol, qubit: QubitId, promote: bool) -> IrResult<()> {
        self.check_range(qubit, None)?;
        self.labels[qubit.index()] = name.clone();
        self.qubit_map.insert(name, qubit);
        self.bound.insert(qubit);
        if promote && self.ancillas.remove(&qubit) {
            self.free_ancillas.remove(&qubit);
            self.marked.remove(&qubit);
        }
        Ok(())
    }

    /// Mark an ancilla for uncomputation; other qubits are ignored.
    pub fn mark_ancilla(&mut self, qubit: QubitId) -> bool {
        self.ancillas.contains(&qubit) && self.marked.insert(qubit)
    }

    /// Withdraw a mark placed by [`Circuit::mark_ancilla`].
    pub fn unmark_ancilla(&mut self, qubit: QubitId) -> bool {
        self.marked.remove(&qubit)
    }

    // =========================================================================
    // Gate application
    // =========================================================================

    /// Validate and append a gate.
    pub fn append(
        &mut self,
        kind: GateKind,
        qubits: impl IntoIterator<Item = QubitId>,
        param: Option<f64>,
    ) -> IrResult<()> {
        let mut gate = AppliedGate::new(kind, qubits);
        gate.param = param;
        self.append_gate(gate)
    }

    /// Validate and append an already built gate.
    pub fn append_gate(&mut self, gate: AppliedGate) -> IrResult<()> {
        self.validate(&gate)?;
        match gate.target() {
            Some(target) if !gate.is_barrier() => self.record(LogEntry {
                gates: vec![gate],
                target,
            }),
            _ => self.gates.push(gate),
        }
        Ok(())
    }

    /// Append `X(flip) · gate · X(flip)` as a single logged operation.
    ///
    /// Uncomputation replays the three gates together, so the temporary flip
    /// of `flip` is never separated from the gate it conditions.
    pub fn append_conjugated(&mut self, flip: QubitId, gate: AppliedGate) -> IrResult<()> {
        self.validate(&gate)?;
        let flip_gate = AppliedGate::x(flip);
        self.validate(&flip_gate)?;
        let target = match gate.target() {
            Some(target) if gate.kind.is_classical() => target,
            _ => {
                return Err(IrError::ArityMismatch {
                    gate_name: gate.name().to_string(),
                    expected: 1,
                    got: 0,
                });
            }
        };
        if target == flip {
            return Err(IrError::DuplicateQubit {
                qubit: flip,
                gate_name: Some(gate.name().to_string()),
            });
        }
        self.record(LogEntry {
            gates: vec![flip_gate.clone(), gate, flip_gate],
            target,
        });
        Ok(())
    }

    /// Apply X.
    pub fn x(&mut self, target: QubitId) -> IrResult<&mut Self> {
        self.append_gate(AppliedGate::x(target))?;
        Ok(self)
    }

    /// Apply CX.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.append_gate(AppliedGate::cx(control, target))?;
        Ok(self)
    }

    /// Apply CCX.
    pub fn ccx(&mut self, c0: QubitId, c1: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.append_gate(AppliedGate::ccx(c0, c1, target))?;
        Ok(self)
    }

    /// Apply the canonical NOT-family gate for the given controls.
    pub fn mcx(&mut self, controls: &[QubitId], target: QubitId) -> IrResult<&mut Self> {
        self.append_gate(AppliedGate::mcx(controls, target))?;
        Ok(self)
    }

    /// Apply a barrier across `qubits`, or across every qubit when empty.
    pub fn barrier(&mut self, qubits: &[QubitId]) -> IrResult<&mut Self> {
        let qubits = if qubits.is_empty() {
            (0..self.labels.len()).map(QubitId::from).collect()
        } else {
            qubits.to_vec()
        };
        self.append_gate(AppliedGate::new(GateKind::Barrier, qubits))?;
        Ok(self)
    }

    /// Append every gate of `other`, relabelling its qubit `i` as `mapping[i]`.
    pub fn append_circuit(&mut self, other: &Circuit, mapping: &[QubitId]) -> IrResult<()> {
        if mapping.len() < other.num_qubits() {
            return Err(IrError::InputLengthMismatch {
                expected: other.num_qubits(),
                got: mapping.len(),
            });
        }
        for gate in &other.gates {
            let mut mapped = gate.clone();
            mapped.qubits = gate.qubits.iter().map(|q| mapping[q.index()]).collect();
            self.append_gate(mapped)?;
        }
        Ok(())
    }

    pub(crate) fn check_range(&self, qubit: QubitId, gate_name: Option<&str>) -> IrResult<()> {
        if qubit.index() >= self.labels.len() {
            return Err(IrError::QubitOutOfRange {
                qubit,
                num_qubits: u32::try_from(self.labels.len()).unwrap_or(u32::MAX),
                gate_name: gate_name.map(str::to_string),
            });
        }
        Ok(())
    }

    fn validate(&self, gate: &AppliedGate) -> IrResult<()> {
        let name = gate.name();
        if let Some(expected) = gate.kind.num_qubits() {
            if expected != gate.qubits.len() {
                return Err(IrError::ArityMismatch {
                    gate_name: name.to_string(),
                    expected,
                    got: gate.qubits.len(),
                });
            }
        } else if matches!(gate.kind, GateKind::Opaque(_)) && gate.qubits.is_empty() {
            return Err(IrError::ArityMismatch {
                gate_name: name.to_string(),
                expected: 1,
                got: 0,
            });
        }

        let mut seen = FxHashSet::default();
        for &qubit in &gate.qubits {
            self.check_range(qubit, Some(name))?;
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: Some(name.to_string()),
                });
            }
        }
        Ok(())
    }

    fn record(&mut self, entry: LogEntry) {
        self.gates.extend(entry.gates.iter().cloned());
        self.history.push(entry.clone());
        self.computed.push(entry);
    }

    /// Emit the inverse of `entry` and log it in the history only.
    fn replay(&mut self, entry: &LogEntry) {
        let gates: Vec<AppliedGate> = entry.gates.iter().rev().cloned().collect();
        self.gates.extend(gates.iter().cloned());
        self.history.push(LogEntry {
            gates,
            target: entry.target,
        });
    }

    // =========================================================================
    // Uncomputation
    // =========================================================================

    /// Drive every marked ancilla back to 0 and return the reclaimed qubits.
    ///
    /// Operations still in the computed log whose target is marked are
    /// replayed newest first, then retired from the log.
    pub fn uncompute(&mut self, extra_marks: impl IntoIterator<Item = QubitId>) -> BTreeSet<QubitId> {
        for qubit in extra_marks {
            self.mark_ancilla(qubit);
        }
        if self.marked.is_empty() {
            return BTreeSet::new();
        }

        let marked = std::mem::take(&mut self.marked);
        let (undo, kept): (Vec<LogEntry>, Vec<LogEntry>) = std::mem::take(&mut self.computed)
            .into_iter()
            .partition(|entry| marked.contains(&entry.target));
        self.computed = kept;

        for entry in undo.iter().rev() {
            self.replay(entry);
        }

        debug!(
            "Uncomputed {} ancillas with {} operations",
            marked.len(),
            undo.len()
        );
        self.free_ancillas.extend(marked.iter().copied());
        marked
    }

    /// Replay the whole history in reverse, skipping operations on `keep`.
    ///
    /// Afterwards every qubit outside `keep` holds its initial value, provided
    /// that a kept qubit never changes after it is first read by an operation
    /// on a qubit outside `keep`. Returns the qubits that were rewound.
    pub fn uncompute_all(&mut self, keep: &[QubitId]) -> BTreeSet<QubitId> {
        let keep: FxHashSet<QubitId> = keep.iter().copied().collect();
        let snapshot = self.history.clone();
        let mut rewound = BTreeSet::new();

        for entry in snapshot.iter().rev() {
            if !keep.contains(&entry.target) {
                self.replay(entry);
                rewound.insert(entry.target);
            }
        }

        self.computed.retain(|entry| keep.contains(&entry.target));
        self.marked.clear();
        let reclaimed: Vec<QubitId> = self
            .ancillas
            .iter()
            .copied()
            .filter(|q| !keep.contains(q))
            .collect();
        self.free_ancillas.extend(reclaimed);

        debug!(
            "Uncomputed all: {} qubits rewound, {} kept",
            rewound.len(),
            keep.len()
        );
        rewound
    }

    /// Delete adjacent pairs of identical self-inverse gates.
    ///
    /// A single barrier between the pair does not prevent cancellation.
    /// Cancellation cascades, so `X CX CX X` disappears entirely. Returns the
    /// number of gates removed.
    pub fn remove_identities(&mut self) -> usize {
        let mut out: Vec<AppliedGate> = Vec::with_capacity(self.gates.len());
        let mut removed = 0;

        for gate in std::mem::take(&mut self.gates) {
            if gate.kind.is_self_inverse() {
                let len = out.len();
                if out.last() == Some(&gate) {
                    out.pop();
                    removed += 2;
                    continue;
                }
                if len >= 2 && out[len - 1].is_barrier() && out[len - 2] == gate {
                    out.remove(len - 2);
                    removed += 2;
                    continue;
                }
            }
            out.push(gate);
        }

        self.gates = out;
        if removed > 0 {
            debug!("Removed {} identity gates", removed);
        }
        removed
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.labels.len()
    }

    /// Number of gates, barriers excluded.
    pub fn num_gates(&self) -> usize {
        self.gates.iter().filter(|g| !g.is_barrier()).count()
    }

    /// Emitted gates, in order.
    pub fn gates(&self) -> &[AppliedGate] {
        &self.gates
    }

    /// Look up the qubit bound to a name.
    pub fn qubit(&self, name: &str) -> Option<QubitId> {
        self.qubit_map.get(name).copied()
    }

    /// Most recent name of a qubit.
    pub fn label(&self, qubit: QubitId) -> Option<&Symbol> {
        self.labels.get(qubit.index())
    }

    /// All qubit labels, indexed by qubit.
    pub fn labels(&self) -> &[Symbol] {
        &self.labels
    }

    /// Explicit name to qubit bindings.
    pub fn qubit_map(&self) -> &FxHashMap<Symbol, QubitId> {
        &self.qubit_map
    }

    /// Scratch qubits that have not been promoted.
    pub fn ancillas(&self) -> &BTreeSet<QubitId> {
        &self.ancillas
    }

    /// Ancillas currently available for reuse.
    pub fn free_ancillas(&self) -> &BTreeSet<QubitId> {
        &self.free_ancillas
    }

    /// Ancillas waiting for uncomputation.
    pub fn marked_ancillas(&self) -> &BTreeSet<QubitId> {
        &self.marked
    }

    /// Check if a qubit is an unpromoted ancilla.
    pub fn is_ancilla(&self, qubit: QubitId) -> bool {
        self.ancillas.contains(&qubit)
    }

    /// Check if a qubit is an ancilla that no name refers to.
    pub fn is_disposable(&self, qubit: QubitId) -> bool {
        self.ancillas.contains(&qubit) && !self.bound.contains(&qubit)
    }

    /// Number of operations not yet uncomputed.
    pub fn num_live_operations(&self) -> usize {
        self.computed.len()
    }

    /// Gate counts by gate name, barriers excluded.
    pub fn gate_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for gate in self.gates.iter().filter(|g| !g.is_barrier()) {
            *counts.entry(gate.name().to_string()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_qubits_and_names() {
        let mut circuit = Circuit::new("test");
        let a = circuit.add_qubit(Some(Symbol::from("a")));
        let q = circuit.add_qubit(None);

        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.qubit("a"), Some(a));
        assert_eq!(circuit.label(q).map(Symbol::as_str), Some("q1"));
        assert!(circuit.qubit("q1").is_none());
    }

    #[test]
    fn test_append_rejects_duplicates_and_range() {
        let mut circuit = Circuit::with_size("test", 2);
        assert!(matches!(
            circuit.cx(QubitId(0), QubitId(0)),
            Err(IrError::DuplicateQubit { .. })
        ));
        assert!(matches!(
            circuit.x(QubitId(2)),
            Err(IrError::QubitOutOfRange { .. })
        ));
        assert!(matches!(
            circuit.append(GateKind::CCX, [QubitId(0), QubitId(1)], None),
            Err(IrError::ArityMismatch { expected: 3, got: 2, .. })
        ));
        assert_eq!(circuit.num_gates(), 0);
    }

    #[test]
    fn test_free_ancilla_reuse() {
        let mut circuit = Circuit::new("test");
        let free = circuit.add_ancilla(true);
        assert_eq!(circuit.get_free_ancilla(), free);
        let fresh = circuit.get_free_ancilla();
        assert_ne!(fresh, free);
        assert!(circuit.is_ancilla(fresh));
        assert!(circuit.free_ancillas().is_empty());
    }

    #[test]
    fn test_promotion_stops_marking() {
        let mut circuit = Circuit::new("test");
        let anc = circuit.get_free_ancilla();
        assert!(circuit.is_disposable(anc));
        circuit.map_qubit(Symbol::from("d"), anc, true).unwrap();
        assert!(!circuit.is_ancilla(anc));
        assert!(!circuit.mark_ancilla(anc));
        assert_eq!(circuit.qubit("d"), Some(anc));
    }

    #[test]
    fn test_uncompute_replays_marked_operations() {
        let mut circuit = Circuit::with_size("test", 2);
        let anc = circuit.get_free_ancilla();
        let out = circuit.add_qubit(Some(Symbol::from("out")));
        circuit.ccx(QubitId(0), QubitId(1), anc).unwrap();
        circuit.cx(anc, out).unwrap();

        let reclaimed = circuit.uncompute([anc]);
        assert!(reclaimed.contains(&anc));
        assert!(circuit.free_ancillas().contains(&anc));
        assert_eq!(circuit.num_gates(), 3);
        assert_eq!(circuit.gates()[2], AppliedGate::ccx(QubitId(0), QubitId(1), anc));
        assert_eq!(circuit.num_live_operations(), 1);
    }

    #[test]
    fn test_conjugated_operation_is_replayed_whole() {
        let mut circuit = Circuit::with_size("test", 2);
        let anc = circuit.get_free_ancilla();
        circuit
            .append_conjugated(QubitId(1), AppliedGate::ccx(QubitId(0), QubitId(1), anc))
            .unwrap();
        assert_eq!(circuit.num_gates(), 3);

        circuit.uncompute([anc]);
        assert_eq!(circuit.num_gates(), 6);
        assert_eq!(circuit.gates()[3], AppliedGate::x(QubitId(1)));
        assert_eq!(circuit.gates()[5], AppliedGate::x(QubitId(1)));
    }

    #[test]
    fn test_remove_identities_cascades() {
        let mut circuit = Circuit::with_size("test", 2);
        circuit.x(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.x(QubitId(0)).unwrap();
        assert_eq!(circuit.remove_identities(), 4);
        assert_eq!(circuit.num_gates(), 0);
    }

    #[test]
    fn test_remove_identities_across_barrier() {
        let mut circuit = Circuit::with_size("test", 2);
        circuit.x(QubitId(0)).unwrap();
        circuit.barrier(&[]).unwrap();
        circuit.x(QubitId(0)).unwrap();
        circuit.x(QubitId(1)).unwrap();

        assert_eq!(circuit.remove_identities(), 2);
        assert_eq!(circuit.num_gates(), 1);
        assert!(circuit.gates()[0].is_barrier());
    }

    #[test]
    fn test_remove_identities_keeps_distinct_gates() {
        let mut circuit = Circuit::with_size("test", 2);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.cx(QubitId(1), QubitId(0)).unwrap();
        assert_eq!(circuit.remove_identities(), 0);
        assert_eq!(circuit.num_gates(), 2);
    }

    #[test]
    fn test_append_circuit_with_mapping() {
        let mut inner = Circuit::with_size("inner", 2);
        inner.cx(QubitId(0), QubitId(1)).unwrap();

        let mut outer = Circuit::with_size("outer", 3);
        outer.append_circuit(&inner, &[QubitId(2), QubitId(0)]).unwrap();
        assert_eq!(outer.gates()[0], AppliedGate::cx(QubitId(2), QubitId(0)));
    }

    #[test]
    fn test_gate_counts() {
        let mut circuit = Circuit::with_size("test", 4);
        circuit.x(QubitId(0)).unwrap();
        circuit.x(QubitId(1)).unwrap();
        circuit
            .mcx(&[QubitId(0), QubitId(1), QubitId(2)], QubitId(3))
            .unwrap();
        circuit.barrier(&[]).unwrap();

        let counts = circuit.gate_counts();
        assert_eq!(counts.get("x"), Some(&2));
        assert_eq!(counts.get("mcx"), Some(&1));
        assert!(!counts.contains_key("barrier"));
    }
}
