//! Decompile, simplify and recompile peephole optimizer.
//!
//! Each classical section of a circuit is decompiled into one expression per
//! modified qubit, simplified, and recompiled in place over the same qubits.
//! A candidate replaces the original section only if it
//!
//! - is strictly shorter,
//! - touches no qubit outside the section, and
//! - computes the same function, checked by exhaustive evaluation.
//!
//! Qubits outside `preserve` are assumed to start at 0. A qubit that no
//! earlier gate has touched therefore still holds 0 when its section starts,
//! which lets constant folding remove gates that only act on known zeros.

use revq_ir::{Assignment, Circuit, Expression, QubitId, Symbol};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, instrument};

use crate::compiler::ExpressionCompiler;
use crate::decompiler::{Decompiler, Section};
use crate::error::CompileResult;
use crate::options::CompileOptions;
use crate::simplify::{AlgebraicSimplifier, Simplifier};

/// Section-wise boolean optimizer.
#[derive(Debug, Clone)]
pub struct BooleanOptimizer<S = AlgebraicSimplifier> {
    simplifier: S,
    compiler: ExpressionCompiler,
}

impl BooleanOptimizer<AlgebraicSimplifier> {
    /// Create an optimizer using the algebraic simplifier.
    pub fn new(options: CompileOptions) -> Self {
        Self::with_simplifier(AlgebraicSimplifier::new(), options)
    }
}

impl Default for BooleanOptimizer<AlgebraicSimplifier> {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl<S: Simplifier> BooleanOptimizer<S> {
    /// Create an optimizer with a custom simplifier.
    pub fn with_simplifier(simplifier: S, options: CompileOptions) -> Self {
        Self {
            simplifier,
            compiler: ExpressionCompiler::new(options),
        }
    }

    fn options(&self) -> &CompileOptions {
        self.compiler.options()
    }

    /// Optimize `circuit`, keeping the final value of every qubit.
    ///
    /// With `preserve = None` all qubits are treated as inputs. Otherwise
    /// qubits outside `preserve` are assumed to start at 0.
    #[instrument(skip_all, fields(circuit = circuit.name()))]
    pub fn optimize(&self, circuit: &Circuit, preserve: Option<&[QubitId]>) -> CompileResult<Circuit> {
        let sections = Decompiler::new()
            .with_max_expression_size(self.options().max_expression_size)
            .decompile(circuit)?;
        let first_touch = first_touch(circuit);
        let preserve: Option<FxHashSet<QubitId>> = preserve.map(|p| p.iter().copied().collect());

        let mut replacements: Vec<Option<Circuit>> = sections
            .iter()
            .rev()
            .map(|section| self.rewrite_section(section, &first_touch, preserve.as_ref()))
            .collect::<CompileResult<_>>()?;
        replacements.reverse();

        let rewritten = replacements.iter().filter(|r| r.is_some()).count();
        let gates = circuit.gates();
        let mut out = circuit.empty_like();
        let mut cursor = 0;
        for (section, replacement) in sections.iter().zip(&replacements) {
            for gate in &gates[cursor..section.start] {
                out.append_gate(gate.clone())?;
            }
            match replacement {
                Some(candidate) => out.append_circuit(candidate, &section.qubits())?,
                None => {
                    for gate in &section.gates {
                        out.append_gate(gate.clone())?;
                    }
                }
            }
            cursor = section.end;
        }
        for gate in &gates[cursor..] {
            out.append_gate(gate.clone())?;
        }
        out.remove_identities();

        info!(
            "Optimized '{}': {} -> {} gates, {} of {} sections rewritten",
            circuit.name(),
            circuit.num_gates(),
            out.num_gates(),
            rewritten,
            sections.len()
        );
        Ok(out)
    }

    /// Build a verified replacement for one section, if a shorter one exists.
    fn rewrite_section(
        &self,
        section: &Section,
        first_touch: &[Option<usize>],
        preserve: Option<&FxHashSet<QubitId>>,
    ) -> CompileResult<Option<Circuit>> {
        let zeroed: FxHashSet<Symbol> = match preserve {
            None => FxHashSet::default(),
            Some(keep) => section
                .symbols
                .iter()
                .filter(|(_, q)| {
                    !keep.contains(q) && first_touch[q.index()].is_some_and(|t| t >= section.start)
                })
                .map(|(s, _)| s.clone())
                .collect(),
        };
        let zeros: FxHashMap<Symbol, Expression> = zeroed
            .iter()
            .map(|s| (s.clone(), Expression::Const(false)))
            .collect();

        let mut assignments = vec![];
        for (sym, expr) in &section.expressions {
            let simplified = self.simplifier.simplify(&expr.substitute(&zeros));
            let unchanged = if zeroed.contains(sym) {
                simplified == Expression::Const(false)
            } else {
                simplified.as_ref_symbol() == Some(sym)
            };
            if !unchanged {
                assignments.push(Assignment::new(sym.clone(), simplified));
            }
        }

        let symbols = section.symbol_names();
        let span = format!("section[{}..{}]", section.start, section.end);
        let candidate = match self
            .compiler
            .compile_in_place(&span, &symbols, &assignments, &zeroed)
        {
            Ok(candidate) => candidate,
            Err(err) => {
                debug!("{} kept: {}", span, err);
                return Ok(None);
            }
        };

        if candidate.num_qubits() != symbols.len() {
            debug!("{} kept: candidate needs scratch qubits", span);
            return Ok(None);
        }
        if candidate.num_gates() >= section.len() {
            return Ok(None);
        }
        if !self.equivalent(section, &candidate, &zeros)? {
            debug!("{} kept: candidate failed verification", span);
            return Ok(None);
        }

        debug!(
            "{} rewritten: {} -> {} gates",
            span,
            section.len(),
            candidate.num_gates()
        );
        Ok(Some(candidate))
    }

    /// Check that `candidate` leaves every section qubit as the section does.
    fn equivalent(
        &self,
        section: &Section,
        candidate: &Circuit,
        zeros: &FxHashMap<Symbol, Expression>,
    ) -> CompileResult<bool> {
        let rewritten: FxHashMap<Symbol, Expression> = Decompiler::new()
            .decompile(candidate)?
            .into_iter()
            .flat_map(|s| s.expressions)
            .collect();

        for (sym, _) in &section.symbols {
            let before = section.expression_of(sym).substitute(zeros);
            let after = rewritten
                .get(sym)
                .cloned()
                .unwrap_or_else(|| Expression::Ref(sym.clone()))
                .substitute(zeros);
            if !self.same_function(&before, &after) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn same_function(&self, lhs: &Expression, rhs: &Expression) -> bool {
        if lhs == rhs {
            return true;
        }
        let vars: Vec<Symbol> = lhs.symbols().union(&rhs.symbols()).cloned().collect();
        if vars.len() > self.options().max_verify_inputs.min(32) {
            return false;
        }

        (0..1_u64 << vars.len()).all(|row| {
            let env: FxHashMap<Symbol, bool> = vars
                .iter()
                .enumerate()
                .map(|(i, s)| (s.clone(), (row >> i) & 1 == 1))
                .collect();
            matches!((lhs.eval(&env), rhs.eval(&env)), (Ok(a), Ok(b)) if a == b)
        })
    }
}

/// Optimize with default options.
pub fn optimize(circuit: &Circuit, preserve: Option<&[QubitId]>) -> CompileResult<Circuit> {
    BooleanOptimizer::default().optimize(circuit, preserve)
}

/// Index of the first non-barrier gate touching each qubit.
fn first_touch(circuit: &Circuit) -> Vec<Option<usize>> {
    let mut first = vec![None; circuit.num_qubits()];
    for (idx, gate) in circuit.gates().iter().enumerate() {
        if gate.is_barrier() {
            continue;
        }
        for q in &gate.qubits {
            first[q.index()].get_or_insert(idx);
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use revq_ir::AppliedGate;

    #[test]
    fn test_double_x_disappears() {
        let mut circuit = Circuit::with_size("xx", 1);
        circuit.x(QubitId(0)).unwrap();
        circuit.x(QubitId(0)).unwrap();

        let optimized = optimize(&circuit, None).unwrap();
        assert_eq!(optimized.num_gates(), 0);
        assert_eq!(optimized.num_qubits(), 1);
    }

    #[test]
    fn test_xor_chain_cancels() {
        // CX(a, t) X(t) CX(a, t) X(t) is the identity on t.
        let mut circuit = Circuit::with_size("chain", 2);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.x(QubitId(1)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.x(QubitId(1)).unwrap();

        let optimized = optimize(&circuit, None).unwrap();
        assert_eq!(optimized.num_gates(), 0);
    }

    #[test]
    fn test_zero_qubit_constant_folding() {
        // t starts at 0, so CCX(a, t, u) does nothing.
        let mut circuit = Circuit::with_size("fold", 3);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        circuit.cx(QubitId(0), QubitId(2)).unwrap();

        let preserve = [QubitId(0)];
        let optimized = optimize(&circuit, Some(&preserve)).unwrap();
        assert_eq!(optimized.gates(), &[AppliedGate::cx(QubitId(0), QubitId(2))]);

        // Without the zero assumption the Toffoli has to stay.
        let kept = optimize(&circuit, None).unwrap();
        assert_eq!(kept.num_gates(), 2);
    }

    #[test]
    fn test_preserved_qubit_is_not_assumed_zero() {
        let mut circuit = Circuit::with_size("keep", 3);
        circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();

        let preserve = [QubitId(0), QubitId(1)];
        let optimized = optimize(&circuit, Some(&preserve)).unwrap();
        assert_eq!(optimized.num_gates(), 1);
    }

    #[test]
    fn test_barrier_sections_optimized_separately() {
        let mut circuit = Circuit::with_size("split", 2);
        circuit.x(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.x(QubitId(0)).unwrap();
        circuit.barrier(&[]).unwrap();
        circuit.cx(QubitId(1), QubitId(0)).unwrap();

        let optimized = optimize(&circuit, None).unwrap();
        assert!(optimized.num_gates() <= circuit.num_gates());
        for bits in 0..4u8 {
            let input = [bits & 2 != 0, bits & 1 != 0];
            assert_eq!(
                circuit.simulate(&input).unwrap(),
                optimized.simulate(&input).unwrap()
            );
        }
        assert!(optimized.gates().iter().any(AppliedGate::is_barrier));
    }
}
