//! Boolean expression trees.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::symbol::Symbol;

/// An immutable boolean expression.
///
/// `Or` is binary: a well-formed `Or` always holds exactly two operands.
/// `Opaque` is a hybrid leaf naming an operation the compiler applies to the
/// compiled qubits of its arguments without interpreting it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Expression {
    /// Boolean constant.
    Const(bool),
    /// Reference to a bound symbol.
    Ref(Symbol),
    /// Negation.
    Not(Box<Expression>),
    /// Conjunction of one or more operands.
    And(Vec<Expression>),
    /// Disjunction of exactly two operands.
    Or(Vec<Expression>),
    /// Exclusive or of one or more operands.
    Xor(Vec<Expression>),
    /// Uninterpreted hybrid operation.
    Opaque {
        /// Name of the operation applied to the argument qubits.
        tag: String,
        /// Arguments, compiled before the operation is applied.
        args: Vec<Expression>,
    },
}

impl Expression {
    /// Boolean constant.
    pub fn constant(value: bool) -> Self {
        Expression::Const(value)
    }

    /// Reference to a symbol.
    pub fn symbol(name: impl Into<Symbol>) -> Self {
        Expression::Ref(name.into())
    }

    /// Negation of an expression.
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    /// Conjunction.
    pub fn and(operands: impl IntoIterator<Item = Expression>) -> Self {
        Expression::And(operands.into_iter().collect())
    }

    /// Binary disjunction.
    pub fn or(lhs: Expression, rhs: Expression) -> Self {
        Expression::Or(vec![lhs, rhs])
    }

    /// Exclusive or.
    pub fn xor(operands: impl IntoIterator<Item = Expression>) -> Self {
        Expression::Xor(operands.into_iter().collect())
    }

    /// Hybrid operation.
    pub fn opaque(tag: impl Into<String>, args: impl IntoIterator<Item = Expression>) -> Self {
        Expression::Opaque {
            tag: tag.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Check if this is a constant.
    pub fn as_const(&self) -> Option<bool> {
        match self {
            Expression::Const(value) => Some(*value),
            _ => None,
        }
    }

    /// Get the symbol if this is a plain reference.
    pub fn as_ref_symbol(&self) -> Option<&Symbol> {
        match self {
            Expression::Ref(sym) => Some(sym),
            _ => None,
        }
    }

    /// Direct children of this node.
    pub fn operands(&self) -> &[Expression] {
        match self {
            Expression::Const(_) | Expression::Ref(_) => &[],
            Expression::Not(inner) => std::slice::from_ref(inner.as_ref()),
            Expression::And(ops) | Expression::Or(ops) | Expression::Xor(ops) => ops,
            Expression::Opaque { args, .. } => args,
        }
    }

    /// Check structural well-formedness of the whole tree.
    pub fn is_well_formed(&self) -> bool {
        let node_ok = match self {
            Expression::Or(ops) => ops.len() == 2,
            Expression::And(ops) | Expression::Xor(ops) => !ops.is_empty(),
            Expression::Opaque { args, .. } => !args.is_empty(),
            Expression::Const(_) | Expression::Ref(_) | Expression::Not(_) => true,
        };
        node_ok && self.operands().iter().all(Expression::is_well_formed)
    }

    /// Collect every symbol referenced by this expression.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        if let Expression::Ref(sym) = self {
            out.insert(sym.clone());
        }
        for op in self.operands() {
            op.collect_symbols(out);
        }
    }

    /// Check whether the expression mentions `sym`.
    pub fn contains_symbol(&self, sym: &Symbol) -> bool {
        match self {
            Expression::Ref(s) => s == sym,
            _ => self.operands().iter().any(|op| op.contains_symbol(sym)),
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.operands().iter().map(Expression::size).sum::<usize>()
    }

    /// Replace references according to `map`; unmapped symbols are kept.
    #[must_use]
    pub fn substitute(&self, map: &FxHashMap<Symbol, Expression>) -> Expression {
        match self {
            Expression::Const(_) => self.clone(),
            Expression::Ref(sym) => map.get(sym).cloned().unwrap_or_else(|| self.clone()),
            Expression::Not(inner) => Expression::not(inner.substitute(map)),
            Expression::And(ops) => Expression::And(ops.iter().map(|e| e.substitute(map)).collect()),
            Expression::Or(ops) => Expression::Or(ops.iter().map(|e| e.substitute(map)).collect()),
            Expression::Xor(ops) => Expression::Xor(ops.iter().map(|e| e.substitute(map)).collect()),
            Expression::Opaque { tag, args } => Expression::Opaque {
                tag: tag.clone(),
                args: args.iter().map(|e| e.substitute(map)).collect(),
            },
        }
    }

    /// Evaluate the expression under a symbol assignment.
    ///
    /// `Or` is evaluated as n-ary disjunction so that malformed trees still
    /// have a reference meaning; `Opaque` has none and yields an error.
    pub fn eval(&self, env: &FxHashMap<Symbol, bool>) -> IrResult<bool> {
        match self {
            Expression::Const(value) => Ok(*value),
            Expression::Ref(sym) => env
                .get(sym)
                .copied()
                .ok_or_else(|| IrError::UnboundSymbol(sym.to_string())),
            Expression::Not(inner) => Ok(!inner.eval(env)?),
            Expression::And(ops) => {
                let mut acc = true;
                for op in ops {
                    acc &= op.eval(env)?;
                }
                Ok(acc)
            }
            Expression::Or(ops) => {
                let mut acc = false;
                for op in ops {
                    acc |= op.eval(env)?;
                }
                Ok(acc)
            }
            Expression::Xor(ops) => {
                let mut acc = false;
                for op in ops {
                    acc ^= op.eval(env)?;
                }
                Ok(acc)
            }
            Expression::Opaque { .. } => Err(IrError::NotEvaluable(self.to_string())),
        }
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::Const(value)
    }
}

impl From<Symbol> for Expression {
    fn from(sym: Symbol) -> Self {
        Expression::Ref(sym)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, ops: &[Expression], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{op}")?;
            }
            f.write_str(")")
        }

        match self {
            Expression::Const(true) => f.write_str("1"),
            Expression::Const(false) => f.write_str("0"),
            Expression::Ref(sym) => write!(f, "{sym}"),
            Expression::Not(inner) => write!(f, "!{inner}"),
            Expression::And(ops) => join(f, ops, " & "),
            Expression::Or(ops) => join(f, ops, " | "),
            Expression::Xor(ops) => join(f, ops, " ^ "),
            Expression::Opaque { tag, args } => {
                f.write_str(tag)?;
                join(f, args, ", ")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, bool)]) -> FxHashMap<Symbol, bool> {
        pairs.iter().map(|(k, v)| (Symbol::from(*k), *v)).collect()
    }

    #[test]
    fn test_eval_basic_operators() {
        let a = Expression::symbol("a");
        let b = Expression::symbol("b");
        let e = Expression::and([a.clone(), Expression::not(b.clone())]);

        assert!(e.eval(&env(&[("a", true), ("b", false)])).unwrap());
        assert!(!e.eval(&env(&[("a", true), ("b", true)])).unwrap());

        let x = Expression::xor([a.clone(), b.clone(), Expression::constant(true)]);
        assert!(x.eval(&env(&[("a", true), ("b", true)])).unwrap());

        let o = Expression::or(a, b);
        assert!(!o.eval(&env(&[("a", false), ("b", false)])).unwrap());
    }

    #[test]
    fn test_eval_unbound_symbol() {
        let e = Expression::symbol("missing");
        assert!(matches!(
            e.eval(&FxHashMap::default()),
            Err(IrError::UnboundSymbol(_))
        ));
    }

    #[test]
    fn test_opaque_not_evaluable() {
        let e = Expression::opaque("h", [Expression::symbol("a")]);
        assert!(matches!(
            e.eval(&env(&[("a", true)])),
            Err(IrError::NotEvaluable(_))
        ));
    }

    #[test]
    fn test_well_formedness() {
        let a = Expression::symbol("a");
        assert!(Expression::or(a.clone(), a.clone()).is_well_formed());
        assert!(!Expression::Or(vec![a.clone(), a.clone(), a.clone()]).is_well_formed());
        assert!(!Expression::not(Expression::And(vec![])).is_well_formed());
    }

    #[test]
    fn test_symbols_and_substitute() {
        let e = Expression::xor([
            Expression::symbol("b"),
            Expression::and([Expression::symbol("a"), Expression::symbol("b")]),
        ]);
        let syms: Vec<_> = e.symbols().into_iter().map(|s| s.to_string()).collect();
        assert_eq!(syms, vec!["a", "b"]);
        assert!(e.contains_symbol(&Symbol::from("a")));
        assert!(!e.contains_symbol(&Symbol::from("c")));

        let mut map = FxHashMap::default();
        map.insert(Symbol::from("a"), Expression::constant(false));
        let substituted = e.substitute(&map);
        assert!(!substituted.contains_symbol(&Symbol::from("a")));
        assert_eq!(e.size(), 5);
    }

    #[test]
    fn test_display() {
        let e = Expression::and([
            Expression::symbol("a"),
            Expression::not(Expression::symbol("b")),
        ]);
        assert_eq!(e.to_string(), "(a & !b)");
        let h = Expression::opaque("h", [Expression::symbol("q")]);
        assert_eq!(h.to_string(), "h(q)");
    }
}
