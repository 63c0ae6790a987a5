//! In-place recompilation of simultaneous assignments.
//!
//! The optimizer rewrites a decompiled section as a set of simultaneous
//! assignments `s := f_s(entry values)` over a fixed set of qubits. Each
//! assignment has to end up on the qubit already holding its target, and
//! every expression must read the values the qubits had when the section
//! started.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use revq_ir::{Assignment, Circuit, Symbol};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::compiler::{CompileContext, ExpressionCompiler};
use crate::error::{CompileError, CompileResult};

impl ExpressionCompiler {
    /// Compile simultaneous assignments over `symbols` in place.
    ///
    /// Qubit `i` of the returned circuit is `symbols[i]`. Targets listed in
    /// `zeroed` are known to hold 0 on entry and may receive a copy; every
    /// other target must be updated on its own qubit. Scratch qubits may be
    /// allocated after the symbol qubits and are returned to 0 after each
    /// assignment.
    pub fn compile_in_place(
        &self,
        name: &str,
        symbols: &[Symbol],
        assignments: &[Assignment],
        zeroed: &FxHashSet<Symbol>,
    ) -> CompileResult<Circuit> {
        let order = schedule(assignments)?;

        let mut ctx = CompileContext::new(name, self.options());
        for sym in symbols {
            ctx.bind_input(sym.clone());
        }

        for idx in order {
            let Assignment { target, expr } = &assignments[idx];
            let qubit = ctx.lookup(target)?;
            let dest = zeroed.contains(target).then_some(qubit);

            let result = ctx.compile_expr(expr, dest, Some(target))?;
            if result != qubit {
                if dest.is_none() {
                    return Err(CompileError::NotInPlace(target.to_string()));
                }
                ctx.circuit.cx(result, qubit)?;
                ctx.mark(result);
            }

            ctx.memo.remove_referencing(target);
            ctx.memo.remove_by_value(qubit);
            ctx.reclaim();
        }

        debug!(
            "In-place compile of {} assignments: {} gates",
            assignments.len(),
            ctx.circuit.num_gates()
        );
        Ok(ctx.circuit)
    }
}

/// Order assignments so that every reader of a symbol runs before the
/// assignment that overwrites it.
fn schedule(assignments: &[Assignment]) -> CompileResult<Vec<usize>> {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<NodeIndex> = (0..assignments.len()).map(|i| graph.add_node(i)).collect();

    for (i, writer) in assignments.iter().enumerate() {
        for (j, reader) in assignments.iter().enumerate() {
            if i != j && reader.expr.contains_symbol(&writer.target) {
                graph.add_edge(nodes[j], nodes[i], ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(|node| graph[node]).collect()),
        Err(cycle) => Err(CompileError::NotInPlace(
            assignments[graph[cycle.node_id()]].target.to_string(),
        )),
    }
}
