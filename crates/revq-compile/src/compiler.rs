//! Lowering of boolean assignments into a reversible circuit.
//!
//! Every operator is lowered into the NOT-family basis so that the value of
//! the expression ends up XOR-ed into a target qubit:
//!
//! | Expression | Gates |
//! |------------|-------|
//! | `!e` | `CX(e, t) X(t)`, or `X(e)` when `e` is a fresh scratch value |
//! | `e1 & .. & en` | `MCX(e1..en, t)` |
//! | `e1 \| e2` | `X(e2) CCX(e1, e2, t) X(e2) CX(e2, t)` |
//! | `e1 ^ .. ^ en` | each operand folded into `t` |
//!
//! Intermediate qubits are marked as soon as their consumer has been emitted
//! and are uncomputed after each assignment, so the ancilla pool stays small.

use revq_ir::{AppliedGate, Assignment, Circuit, Expression, GateKind, Program, QubitId, Symbol};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, instrument};

use crate::error::{CompileError, CompileResult};
use crate::memo::ExpQMap;
use crate::options::CompileOptions;

/// Compiles assignment lists into reversible circuits.
#[derive(Debug, Clone, Default)]
pub struct ExpressionCompiler {
    options: CompileOptions,
}

impl ExpressionCompiler {
    /// Create a compiler with the given options.
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a whole program.
    ///
    /// Input bits become the first qubits of the circuit, in declaration
    /// order. Each output bit lands on a dedicated qubit bound to its name.
    #[instrument(skip(self, program), fields(program = %program.name))]
    pub fn compile(&self, program: &Program) -> CompileResult<Circuit> {
        self.compile_assignments(
            &program.name,
            &program.input_symbols(),
            &program.assignments,
            &program.outputs,
        )
    }

    /// Compile an assignment list over explicit inputs and outputs.
    pub fn compile_assignments(
        &self,
        name: &str,
        inputs: &[Symbol],
        assignments: &[Assignment],
        outputs: &[Symbol],
    ) -> CompileResult<Circuit> {
        let mut ctx = CompileContext::new(name, &self.options);
        ctx.outputs = outputs.iter().cloned().collect();
        for sym in inputs {
            ctx.bind_input(sym.clone());
        }

        for assignment in assignments {
            ctx.compile_assignment(assignment)?;
        }

        let keep = outputs
            .iter()
            .map(|sym| ctx.lookup(sym))
            .collect::<CompileResult<Vec<QubitId>>>()?;
        ctx.finish(&keep);

        info!(
            "Compiled '{}': {} qubits, {} gates",
            name,
            ctx.circuit.num_qubits(),
            ctx.circuit.num_gates()
        );
        Ok(ctx.circuit)
    }
}

/// Mutable state of a single compilation.
pub(crate) struct CompileContext<'a> {
    pub(crate) circuit: Circuit,
    pub(crate) memo: ExpQMap,
    pub(crate) options: &'a CompileOptions,
    /// Current qubit of every symbol.
    pub(crate) env: FxHashMap<Symbol, QubitId>,
    pub(crate) inputs: FxHashSet<Symbol>,
    pub(crate) outputs: FxHashSet<Symbol>,
    false_qubit: Option<QubitId>,
    true_qubit: Option<QubitId>,
}

impl<'a> CompileContext<'a> {
    pub(crate) fn new(name: &str, options: &'a CompileOptions) -> Self {
        Self {
            circuit: Circuit::new(name),
            memo: ExpQMap::new(),
            options,
            env: FxHashMap::default(),
            inputs: FxHashSet::default(),
            outputs: FxHashSet::default(),
            false_qubit: None,
            true_qubit: None,
        }
    }

    pub(crate) fn bind_input(&mut self, sym: Symbol) -> QubitId {
        let qubit = self.circuit.add_qubit(Some(sym.clone()));
        self.inputs.insert(sym.clone());
        self.env.insert(sym, qubit);
        qubit
    }

    pub(crate) fn lookup(&self, sym: &Symbol) -> CompileResult<QubitId> {
        self.env
            .get(sym)
            .copied()
            .ok_or_else(|| CompileError::UnboundSymbol(sym.to_string()))
    }

    fn compile_assignment(&mut self, assignment: &Assignment) -> CompileResult<()> {
        let target = &assignment.target;
        let dest = self
            .outputs
            .contains(target)
            .then(|| self.circuit.add_qubit(None));

        let result = self.compile_expr(&assignment.expr, dest, Some(target))?;
        let result = match dest {
            Some(dest) if dest != result => {
                self.circuit.cx(result, dest)?;
                self.mark(result);
                dest
            }
            _ => result,
        };

        self.rebind(target, &assignment.expr, result);
        self.circuit
            .map_qubit(target.clone(), result, !target.is_synthetic())?;
        self.circuit.unmark_ancilla(result);
        self.reclaim();

        debug!("Assigned {} -> {}", target, result);
        Ok(())
    }

    /// Point `target` at `qubit` and drop memo entries made stale by it.
    pub(crate) fn rebind(&mut self, target: &Symbol, expr: &Expression, qubit: QubitId) {
        if self.env.insert(target.clone(), qubit).is_some() {
            self.memo.remove_referencing(target);
        }
        if self.options.memoize && is_compound(expr) && !expr.contains_symbol(target) {
            self.memo.insert(expr.clone(), qubit);
        }
    }

    /// Uncompute marked ancillas and forget what they held.
    pub(crate) fn reclaim(&mut self) {
        for qubit in self.circuit.uncompute([]) {
            self.memo.remove_by_value(qubit);
        }
    }

    fn finish(&mut self, keep: &[QubitId]) {
        if self.options.uncompute {
            self.circuit.uncompute_all(keep);
            self.memo.clear();
        }
        if self.options.remove_identities {
            self.circuit.remove_identities();
        }
    }

    /// Mark `qubit` for uncomputation if it is an unnamed ancilla.
    pub(crate) fn mark(&mut self, qubit: QubitId) {
        if self.circuit.is_disposable(qubit) {
            self.circuit.mark_ancilla(qubit);
        }
    }

    // =========================================================================
    // Expression lowering
    // =========================================================================

    /// Compile `expr` and return the qubit holding its value.
    ///
    /// `dest`, when given, is a zero qubit the value should land on; the
    /// caller copies the result if a different qubit is returned. `sym` is
    /// the assignment target and is only passed for the root expression.
    pub(crate) fn compile_expr(
        &mut self,
        expr: &Expression,
        dest: Option<QubitId>,
        sym: Option<&Symbol>,
    ) -> CompileResult<QubitId> {
        if self.options.memoize {
            if let Some(qubit) = self.memo.get(expr) {
                return Ok(qubit);
            }
        }

        let qubit = match expr {
            Expression::Const(value) => return self.compile_const(*value, dest),
            Expression::Ref(s) => return self.compile_ref(s, dest, sym),
            Expression::Not(inner) => self.compile_not(inner, dest, sym)?,
            Expression::And(ops) => self.compile_and(ops, dest)?,
            Expression::Or(ops) => self.compile_or(ops, dest)?,
            Expression::Xor(ops) => self.compile_xor(ops, dest, sym)?,
            Expression::Opaque { tag, args } => self.compile_opaque(tag, args)?,
        };

        if self.options.memoize {
            self.memo.insert(expr.clone(), qubit);
        }
        Ok(qubit)
    }

    fn compile_const(&mut self, value: bool, dest: Option<QubitId>) -> CompileResult<QubitId> {
        if let Some(dest) = dest {
            if value {
                self.circuit.x(dest)?;
            }
            return Ok(dest);
        }

        let slot = if value { self.true_qubit } else { self.false_qubit };
        if let Some(qubit) = slot {
            return Ok(qubit);
        }

        let name = if value { "TRUE" } else { "FALSE" };
        let qubit = self.circuit.add_qubit(Some(Symbol::new(name)));
        if value {
            self.circuit.x(qubit)?;
            self.true_qubit = Some(qubit);
        } else {
            self.false_qubit = Some(qubit);
        }
        Ok(qubit)
    }

    fn compile_ref(
        &mut self,
        s: &Symbol,
        dest: Option<QubitId>,
        sym: Option<&Symbol>,
    ) -> CompileResult<QubitId> {
        let qubit = self.lookup(s)?;
        if sym == Some(s) && self.outputs.contains(s) && self.inputs.contains(s) {
            let copy = dest.unwrap_or_else(|| self.circuit.add_qubit(None));
            self.circuit.cx(qubit, copy)?;
            return Ok(copy);
        }
        Ok(qubit)
    }

    fn compile_not(
        &mut self,
        inner: &Expression,
        dest: Option<QubitId>,
        sym: Option<&Symbol>,
    ) -> CompileResult<QubitId> {
        // `x := !x` flips x's qubit.
        if let (Expression::Ref(s), Some(target), None) = (inner, sym, dest) {
            let qubit = self.lookup(s)?;
            if s == target && self.can_overwrite(target, qubit) {
                self.memo.remove_by_value(qubit);
                self.circuit.x(qubit)?;
                return Ok(qubit);
            }
        }

        // Singleton and collapsed And/Or hand back a qubit that may already
        // be cached for a sibling; only a qubit produced by `inner` is ours.
        let held = self.memo.qubits();
        let operand = self.compile_expr(inner, None, None)?;
        let fresh = is_compound(inner) && !held.contains(&operand);

        if dest.is_none() && fresh && self.circuit.is_disposable(operand) {
            self.memo.remove_by_value(operand);
            self.circuit.x(operand)?;
            return Ok(operand);
        }

        let out = self.scratch(dest);
        self.circuit.cx(operand, out)?.x(out)?;
        self.mark(operand);
        Ok(out)
    }

    fn compile_and(&mut self, ops: &[Expression], dest: Option<QubitId>) -> CompileResult<QubitId> {
        let controls = self.compile_operands(ops, "and")?;
        if let ([only], None) = (controls.as_slice(), dest) {
            return Ok(*only);
        }

        let out = self.scratch(dest);
        self.circuit.mcx(&controls, out)?;
        for qubit in controls {
            self.mark(qubit);
        }
        Ok(out)
    }

    fn compile_or(&mut self, ops: &[Expression], dest: Option<QubitId>) -> CompileResult<QubitId> {
        let (lhs, rhs) = self.compile_or_operands(ops)?;
        if lhs == rhs && dest.is_none() {
            return Ok(lhs);
        }

        let out = self.scratch(dest);
        self.lower_or_into(lhs, rhs, out)?;
        self.mark(lhs);
        self.mark(rhs);
        Ok(out)
    }

    fn compile_xor(
        &mut self,
        ops: &[Expression],
        dest: Option<QubitId>,
        sym: Option<&Symbol>,
    ) -> CompileResult<QubitId> {
        if ops.is_empty() {
            return Err(CompileError::EmptyOperands("xor"));
        }

        // `x := x ^ ..` accumulates into x's qubit, as long as no other
        // operand reads x.
        let mut in_place = None;
        if let (Some(target), None) = (sym, dest) {
            if let Some(pos) = ops.iter().position(|e| e.as_ref_symbol() == Some(target)) {
                let others_clean = ops
                    .iter()
                    .enumerate()
                    .all(|(i, e)| i == pos || !e.contains_symbol(target));
                if let (true, Some(&qubit)) = (others_clean, self.env.get(target)) {
                    if self.can_overwrite(target, qubit) {
                        in_place = Some((pos, qubit));
                    }
                }
            }
        }

        let out = match in_place {
            Some((_, qubit)) => {
                self.memo.remove_by_value(qubit);
                qubit
            }
            None => self.scratch(dest),
        };

        for (i, op) in ops.iter().enumerate() {
            if in_place.is_some_and(|(pos, _)| pos == i) {
                continue;
            }
            self.fold_into(op, out)?;
        }
        Ok(out)
    }

    /// XOR the value of `expr` into `out`.
    fn fold_into(&mut self, expr: &Expression, out: QubitId) -> CompileResult<()> {
        let cached = self.options.memoize && self.memo.contains(expr);
        match expr {
            Expression::Const(true) => {
                self.circuit.x(out)?;
            }
            Expression::Const(false) => {}
            Expression::Not(inner) => {
                self.fold_into(inner, out)?;
                self.circuit.x(out)?;
            }
            Expression::And(ops) if !cached => {
                let controls = self.compile_operands(ops, "and")?;
                self.circuit.mcx(&controls, out)?;
                for qubit in controls {
                    self.mark(qubit);
                }
            }
            Expression::Or(ops) if !cached => {
                let (lhs, rhs) = self.compile_or_operands(ops)?;
                self.lower_or_into(lhs, rhs, out)?;
                self.mark(lhs);
                self.mark(rhs);
            }
            _ => {
                let qubit = self.compile_expr(expr, None, None)?;
                self.circuit.cx(qubit, out)?;
                self.mark(qubit);
            }
        }
        Ok(())
    }

    fn compile_opaque(&mut self, tag: &str, args: &[Expression]) -> CompileResult<QubitId> {
        let qubits = self.compile_operands(args, "opaque")?;
        let last = *qubits.last().ok_or(CompileError::EmptyOperands("opaque"))?;
        self.memo.remove_by_value(last);
        self.circuit
            .append(GateKind::Opaque(tag.to_string()), qubits, None)?;
        Ok(last)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Compile operands in order, dropping repeated qubits.
    fn compile_operands(
        &mut self,
        ops: &[Expression],
        op_name: &'static str,
    ) -> CompileResult<Vec<QubitId>> {
        if ops.is_empty() {
            return Err(CompileError::EmptyOperands(op_name));
        }
        let mut qubits = Vec::with_capacity(ops.len());
        for op in ops {
            let qubit = self.compile_expr(op, None, None)?;
            if !qubits.contains(&qubit) {
                qubits.push(qubit);
            }
        }
        Ok(qubits)
    }

    fn compile_or_operands(&mut self, ops: &[Expression]) -> CompileResult<(QubitId, QubitId)> {
        let [lhs, rhs] = ops else {
            return Err(CompileError::MalformedOr(ops.len()));
        };
        let lhs = self.compile_expr(lhs, None, None)?;
        let rhs = self.compile_expr(rhs, None, None)?;
        Ok((lhs, rhs))
    }

    /// XOR `lhs | rhs` into `out`.
    fn lower_or_into(&mut self, lhs: QubitId, rhs: QubitId, out: QubitId) -> CompileResult<()> {
        if lhs == rhs {
            self.circuit.cx(lhs, out)?;
            return Ok(());
        }
        // out ^= lhs & !rhs, then out ^= rhs.
        self.circuit
            .append_conjugated(rhs, AppliedGate::ccx(lhs, rhs, out))?;
        self.circuit.cx(rhs, out)?;
        Ok(())
    }

    /// Check that rewriting `qubit` changes the value of `target` only.
    fn can_overwrite(&self, target: &Symbol, qubit: QubitId) -> bool {
        self.true_qubit != Some(qubit)
            && self.false_qubit != Some(qubit)
            && self.env.iter().all(|(s, q)| s == target || *q != qubit)
    }

    fn scratch(&mut self, dest: Option<QubitId>) -> QubitId {
        dest.unwrap_or_else(|| self.circuit.get_free_ancilla())
    }
}

/// Expressions that occupy a qubit of their own once compiled.
fn is_compound(expr: &Expression) -> bool {
    !matches!(expr, Expression::Const(_) | Expression::Ref(_))
}
