//! Expression memoization map.

use revq_ir::{Expression, QubitId, Symbol};
use rustc_hash::{FxHashMap, FxHashSet};

/// Cache from a compiled expression to the qubit currently holding its value.
///
/// Entries must be dropped as soon as the qubit they point to is reclaimed or
/// rewritten; a stale entry would let a later reference read garbage.
#[derive(Debug, Clone, Default)]
pub struct ExpQMap {
    entries: FxHashMap<Expression, QubitId>,
}

impl ExpQMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Qubit holding the value of `expr`, if any.
    pub fn get(&self, expr: &Expression) -> Option<QubitId> {
        self.entries.get(expr).copied()
    }

    /// Check whether `expr` is cached.
    pub fn contains(&self, expr: &Expression) -> bool {
        self.entries.contains_key(expr)
    }

    /// Record that `qubit` holds the value of `expr`.
    pub fn insert(&mut self, expr: Expression, qubit: QubitId) {
        self.entries.insert(expr, qubit);
    }

    /// Qubits referenced by at least one entry.
    pub fn qubits(&self) -> FxHashSet<QubitId> {
        self.entries.values().copied().collect()
    }

    /// Drop every entry pointing to `qubit`; returns how many were dropped.
    pub fn remove_by_value(&mut self, qubit: QubitId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, q| *q != qubit);
        before - self.entries.len()
    }

    /// Drop every entry whose expression mentions `sym`.
    pub fn remove_referencing(&mut self, sym: &Symbol) -> usize {
        let before = self.entries.len();
        self.entries.retain(|expr, _| !expr.contains_symbol(sym));
        before - self.entries.len()
    }

    /// Number of cached expressions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
