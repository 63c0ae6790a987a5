//! Recovery of boolean expressions from classical circuit sections.
//!
//! A section is a maximal run of consecutive gates from the classical basis.
//! Forward substitution turns it into one expression per touched qubit,
//! written over the values the qubits held when the section started:
//!
//! ```text
//! X(t)          t := !t
//! CX(c, t)      t := c ^ t
//! MCX(c.., t)   t := (c0 & .. & cn) ^ t
//! ```

use revq_ir::{AppliedGate, Circuit, Expression, GateKind, QubitId, Symbol};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompileError, CompileResult};

/// A decompiled run of classical gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// The gates of the run.
    pub gates: Vec<AppliedGate>,
    /// Final value of every modified qubit, by symbol, in first-write order.
    pub expressions: Vec<(Symbol, Expression)>,
    /// Every qubit the run touches with its symbol, in first-touch order.
    pub symbols: Vec<(Symbol, QubitId)>,
    /// Index of the first gate in the circuit.
    pub start: usize,
    /// Index one past the last gate in the circuit.
    pub end: usize,
}

impl Section {
    /// Qubits touched by the section, in first-touch order.
    pub fn qubits(&self) -> Vec<QubitId> {
        self.symbols.iter().map(|(_, q)| *q).collect()
    }

    /// Symbols of the touched qubits, in first-touch order.
    pub fn symbol_names(&self) -> Vec<Symbol> {
        self.symbols.iter().map(|(s, _)| s.clone()).collect()
    }

    /// Final expression of a symbol; untouched symbols keep their value.
    pub fn expression_of(&self, sym: &Symbol) -> Expression {
        self.expressions
            .iter()
            .find(|(s, _)| s == sym)
            .map(|(_, e)| e.clone())
            .unwrap_or_else(|| Expression::Ref(sym.clone()))
    }

    /// Number of gates.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Check if the section has no gates.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

/// Splits a circuit into classical sections.
#[derive(Debug, Clone, Default)]
pub struct Decompiler {
    max_expression_size: Option<usize>,
}

impl Decompiler {
    /// Create a decompiler producing maximal sections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Close a section early when one of its expressions would exceed
    /// `max` nodes.
    #[must_use]
    pub fn with_max_expression_size(mut self, max: usize) -> Self {
        self.max_expression_size = Some(max);
        self
    }

    /// Decompile every classical section of `circuit`, in circuit order.
    pub fn decompile(&self, circuit: &Circuit) -> CompileResult<Vec<Section>> {
        let names = unique_symbols(circuit);
        let mut sections = vec![];
        let mut builder: Option<SectionBuilder> = None;

        for (idx, gate) in circuit.gates().iter().enumerate() {
            if !gate.kind.is_classical() {
                if let Some(done) = builder.take() {
                    sections.push(done.finish(&names));
                }
                continue;
            }

            if let (Some(max), Some(current)) = (self.max_expression_size, builder.as_ref()) {
                if !current.is_empty() && current.size_after(gate) > max {
                    if let Some(done) = builder.take() {
                        sections.push(done.finish(&names));
                    }
                }
            }
            builder
                .get_or_insert_with(|| SectionBuilder::new(idx))
                .push(gate, &names)?;
        }
        if let Some(done) = builder {
            sections.push(done.finish(&names));
        }

        debug!(
            "Decompiled '{}' into {} sections",
            circuit.name(),
            sections.len()
        );
        Ok(sections)
    }
}

/// Decompile every classical section of `circuit` with default settings.
pub fn decompile(circuit: &Circuit) -> CompileResult<Vec<Section>> {
    Decompiler::new().decompile(circuit)
}

/// One symbol per qubit: the label, or `label@index` when labels collide.
///
/// A generated name that is already some qubit's label gets a further
/// `#n` suffix, so every symbol stays distinct.
fn unique_symbols(circuit: &Circuit) -> Vec<Symbol> {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for label in circuit.labels() {
        *counts.entry(label.as_str()).or_insert(0) += 1;
    }
    let mut taken: FxHashSet<String> = counts
        .iter()
        .filter(|(_, n)| **n == 1)
        .map(|(label, _)| (*label).to_string())
        .collect();

    circuit
        .labels()
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            if counts.get(label.as_str()).copied().unwrap_or(0) <= 1 {
                return label.clone();
            }
            let base = format!("{label}@{idx}");
            let mut name = base.clone();
            let mut n = 1;
            while taken.contains(&name) {
                name = format!("{base}#{n}");
                n += 1;
            }
            taken.insert(name.clone());
            Symbol::new(name)
        })
        .collect()
}

struct SectionBuilder {
    start: usize,
    gates: Vec<AppliedGate>,
    order: Vec<QubitId>,
    written: Vec<QubitId>,
    exprs: FxHashMap<QubitId, Expression>,
    sizes: FxHashMap<QubitId, usize>,
    seen: FxHashSet<QubitId>,
}

impl SectionBuilder {
    fn new(start: usize) -> Self {
        Self {
            start,
            gates: vec![],
            order: vec![],
            written: vec![],
            exprs: FxHashMap::default(),
            sizes: FxHashMap::default(),
            seen: FxHashSet::default(),
        }
    }

    fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    fn size_of(&self, qubit: QubitId) -> usize {
        self.sizes.get(&qubit).copied().unwrap_or(1)
    }

    /// Size of the target expression once `gate` is applied.
    fn size_after(&self, gate: &AppliedGate) -> usize {
        let controls: usize = gate.controls().iter().map(|q| self.size_of(*q)).sum();
        let target = gate.target().map_or(0, |q| self.size_of(q));
        match gate.controls().len() {
            0 => 1 + target,
            1 => 1 + controls + target,
            _ => 2 + controls + target,
        }
    }

    fn current(&mut self, qubit: QubitId, names: &[Symbol]) -> Expression {
        if self.seen.insert(qubit) {
            self.order.push(qubit);
        }
        match self.exprs.get(&qubit) {
            Some(expr) => expr.clone(),
            None => Expression::Ref(names[qubit.index()].clone()),
        }
    }

    fn push(&mut self, gate: &AppliedGate, names: &[Symbol]) -> CompileResult<()> {
        let target = gate
            .target()
            .ok_or_else(|| CompileError::UnsupportedGate(gate.name().to_string()))?;
        let controls: Vec<Expression> = gate
            .controls()
            .iter()
            .map(|q| self.current(*q, names))
            .collect();
        let old = self.current(target, names);

        let new = match &gate.kind {
            GateKind::X => Expression::not(old),
            GateKind::CX => {
                let mut ops = controls;
                ops.push(old);
                Expression::xor(ops)
            }
            GateKind::CCX | GateKind::MCX(_) => Expression::xor([Expression::and(controls), old]),
            other => return Err(CompileError::UnsupportedGate(other.name().to_string())),
        };

        let size = self.size_after(gate);
        self.sizes.insert(target, size);
        self.exprs.insert(target, new);
        if !self.written.contains(&target) {
            self.written.push(target);
        }
        self.gates.push(gate.clone());
        Ok(())
    }

    fn finish(mut self, names: &[Symbol]) -> Section {
        let symbols = self
            .order
            .iter()
            .map(|q| (names[q.index()].clone(), *q))
            .collect();
        let expressions = self
            .written
            .iter()
            .filter_map(|q| {
                let sym = names[q.index()].clone();
                self.exprs
                    .remove(q)
                    .filter(|expr| expr.as_ref_symbol() != Some(&sym))
                    .map(|expr| (sym, expr))
            })
            .collect();

        Section {
            end: self.start + self.gates.len(),
            start: self.start,
            gates: self.gates,
            expressions,
            symbols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Circuit {
        let mut circuit = Circuit::new("abc");
        for name in ["a", "b", "c"] {
            circuit.add_qubit(Some(Symbol::from(name)));
        }
        circuit
    }

    #[test]
    fn test_toffoli_section() {
        let mut circuit = abc();
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();

        let sections = decompile(&circuit).unwrap();
        assert_eq!(sections.len(), 1);
        let section = &sections[0];
        assert_eq!((section.start, section.end), (0, 1));
        assert_eq!(
            section.symbol_names(),
            vec![Symbol::from("a"), Symbol::from("b"), Symbol::from("c")]
        );
        assert_eq!(
            section.expressions,
            vec![(
                Symbol::from("c"),
                Expression::xor([
                    Expression::and([Expression::symbol("a"), Expression::symbol("b")]),
                    Expression::symbol("c"),
                ])
            )]
        );
        assert_eq!(section.expression_of(&Symbol::from("a")), Expression::symbol("a"));
    }

    #[test]
    fn test_forward_substitution() {
        let mut circuit = abc();
        circuit.x(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let sections = decompile(&circuit).unwrap();
        let b = sections[0].expression_of(&Symbol::from("b"));
        assert_eq!(
            b,
            Expression::xor([Expression::not(Expression::symbol("a")), Expression::symbol("b")])
        );
    }

    #[test]
    fn test_barrier_splits_sections() {
        let mut circuit = abc();
        circuit.x(QubitId(0)).unwrap();
        circuit.barrier(&[]).unwrap();
        circuit.x(QubitId(1)).unwrap();
        circuit.x(QubitId(2)).unwrap();

        let sections = decompile(&circuit).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!((sections[0].start, sections[0].end), (0, 1));
        assert_eq!((sections[1].start, sections[1].end), (2, 4));
        assert_eq!(sections[1].qubits(), vec![QubitId(1), QubitId(2)]);
    }

    #[test]
    fn test_opaque_gate_splits_sections() {
        let mut circuit = abc();
        circuit.x(QubitId(0)).unwrap();
        circuit
            .append(GateKind::Opaque("h".into()), [QubitId(1)], None)
            .unwrap();
        circuit.x(QubitId(0)).unwrap();

        let sections = decompile(&circuit).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].start, 2);
    }

    #[test]
    fn test_colliding_labels_get_unique_symbols() {
        let mut circuit = Circuit::new("dup");
        circuit.add_qubit(Some(Symbol::from("t")));
        circuit.add_qubit(None);
        circuit.map_qubit(Symbol::from("t"), QubitId(1), true).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let sections = decompile(&circuit).unwrap();
        assert_eq!(
            sections[0].symbol_names(),
            vec![Symbol::from("t@0"), Symbol::from("t@1")]
        );
    }

    #[test]
    fn test_generated_symbol_avoids_existing_label() {
        let mut circuit = Circuit::new("dup");
        circuit.add_qubit(Some(Symbol::from("t")));
        circuit.add_qubit(Some(Symbol::from("t")));
        circuit.add_qubit(Some(Symbol::from("t@1")));
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();

        let sections = decompile(&circuit).unwrap();
        let symbols: std::collections::BTreeMap<QubitId, Symbol> = sections[0]
            .symbols
            .iter()
            .map(|(s, q)| (*q, s.clone()))
            .collect();
        assert_eq!(symbols[&QubitId(0)], Symbol::from("t@0"));
        assert_eq!(symbols[&QubitId(1)], Symbol::from("t@1#1"));
        assert_eq!(symbols[&QubitId(2)], Symbol::from("t@1"));
    }

    #[test]
    fn test_expression_size_limit_splits() {
        let mut circuit = Circuit::with_size("pingpong", 2);
        for _ in 0..6 {
            circuit.cx(QubitId(0), QubitId(1)).unwrap();
            circuit.cx(QubitId(1), QubitId(0)).unwrap();
        }

        let whole = decompile(&circuit).unwrap();
        assert_eq!(whole.len(), 1);

        let split = Decompiler::new()
            .with_max_expression_size(16)
            .decompile(&circuit)
            .unwrap();
        assert!(split.len() > 1);
        assert_eq!(split.iter().map(Section::len).sum::<usize>(), 12);
        for section in &split {
            for (_, expr) in &section.expressions {
                assert!(expr.size() <= 16);
            }
        }
    }
}
