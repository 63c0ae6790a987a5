//! Algebraic simplification of boolean expressions.

use std::collections::BTreeSet;

use revq_ir::Expression;

/// A semantics-preserving expression rewriter.
///
/// The optimizer is generic over this trait so that a stronger normalizer
/// (a BDD or SAT based one, for instance) can replace the default rules.
pub trait Simplifier: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Return an expression equivalent to `expr`.
    fn simplify(&self, expr: &Expression) -> Expression;
}

/// Local rewrite rules applied bottom-up until nothing changes.
///
/// Rules:
///
/// - constant folding through every operator
/// - `!!x = x`, `!(x ^ ..) = x ^ .. ^ 1`
/// - `And` and `Xor` are flattened and their operands sorted
/// - `x & x = x`, `x & !x = 0`, `x | x = x`, `x | !x = 1`
/// - `x ^ x = 0`, negations are pulled out of `Xor` operands
/// - single-operand `And` and `Xor` collapse to the operand
#[derive(Debug, Clone)]
pub struct AlgebraicSimplifier {
    max_rounds: usize,
}

impl AlgebraicSimplifier {
    /// Create a simplifier with the default round limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the number of bottom-up rounds.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    fn round(&self, expr: &Expression) -> Expression {
        match expr {
            Expression::Const(_) | Expression::Ref(_) => expr.clone(),
            Expression::Not(inner) => negate(self.round(inner)),
            Expression::And(ops) => conjunction(ops.iter().map(|op| self.round(op))),
            Expression::Or(ops) => disjunction(ops.iter().map(|op| self.round(op)).collect()),
            Expression::Xor(ops) => parity(ops.iter().map(|op| self.round(op))),
            Expression::Opaque { tag, args } => Expression::Opaque {
                tag: tag.clone(),
                args: args.iter().map(|arg| self.round(arg)).collect(),
            },
        }
    }
}

impl Default for AlgebraicSimplifier {
    fn default() -> Self {
        Self { max_rounds: 8 }
    }
}

impl Simplifier for AlgebraicSimplifier {
    fn name(&self) -> &str {
        "algebraic"
    }

    fn simplify(&self, expr: &Expression) -> Expression {
        let mut current = expr.clone();
        for _ in 0..self.max_rounds {
            let next = self.round(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

fn negate(inner: Expression) -> Expression {
    match inner {
        Expression::Const(value) => Expression::Const(!value),
        Expression::Not(x) => *x,
        Expression::Xor(ops) => parity(ops.into_iter().chain([Expression::Const(true)])),
        other => Expression::not(other),
    }
}

fn conjunction(ops: impl Iterator<Item = Expression>) -> Expression {
    let mut terms = BTreeSet::new();
    let mut pending: Vec<Expression> = ops.collect();

    while let Some(op) = pending.pop() {
        match op {
            Expression::Const(true) => {}
            Expression::Const(false) => return Expression::Const(false),
            Expression::And(inner) => pending.extend(inner),
            other => {
                terms.insert(other);
            }
        }
    }

    if terms.iter().any(|t| terms.contains(&negate(t.clone()))) {
        return Expression::Const(false);
    }

    let mut terms: Vec<Expression> = terms.into_iter().collect();
    match terms.len() {
        0 => Expression::Const(true),
        1 => terms.remove(0),
        _ => Expression::And(terms),
    }
}

/// Binary disjunction rules; more than two surviving operands are nested.
fn disjunction(ops: Vec<Expression>) -> Expression {
    let mut terms: Vec<Expression> = vec![];
    for op in ops {
        match op {
            Expression::Const(true) => return Expression::Const(true),
            Expression::Const(false) => {}
            other if terms.contains(&other) => {}
            other => terms.push(other),
        }
    }

    if terms.iter().any(|t| terms.contains(&negate(t.clone()))) {
        return Expression::Const(true);
    }

    match terms.len() {
        0 => Expression::Const(false),
        1 => terms.remove(0),
        _ => terms
            .into_iter()
            .rev()
            .reduce(|acc, lhs| Expression::or(lhs, acc))
            .unwrap_or(Expression::Const(false)),
    }
}

fn parity(ops: impl Iterator<Item = Expression>) -> Expression {
    let mut flip = false;
    let mut odd: BTreeSet<Expression> = BTreeSet::new();
    let mut pending: Vec<Expression> = ops.collect();

    while let Some(op) = pending.pop() {
        match op {
            Expression::Const(value) => flip ^= value,
            Expression::Not(inner) => {
                flip ^= true;
                pending.push(*inner);
            }
            Expression::Xor(inner) => pending.extend(inner),
            other => {
                // x ^ x = 0
                if !odd.remove(&other) {
                    odd.insert(other);
                }
            }
        }
    }

    let mut terms: Vec<Expression> = odd.into_iter().collect();
    match (terms.len(), flip) {
        (0, _) => Expression::Const(flip),
        (1, false) => terms.remove(0),
        (1, true) => Expression::not(terms.remove(0)),
        (_, false) => Expression::Xor(terms),
        (_, true) => {
            terms.push(Expression::Const(true));
            Expression::Xor(terms)
        }
    }
}
