//! Assignment lists produced by the front end.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::expression::Expression;
use crate::symbol::Symbol;

/// A single `target := expr` binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    /// Symbol receiving the value.
    pub target: Symbol,
    /// Expression computing the value.
    pub expr: Expression,
}

impl Assignment {
    /// Create a new assignment.
    pub fn new(target: impl Into<Symbol>, expr: Expression) -> Self {
        Self {
            target: target.into(),
            expr,
        }
    }
}

/// A named bit-vector argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgGroup {
    /// Argument name.
    pub name: String,
    /// Bits of the argument, in declaration order.
    pub bits: Vec<Symbol>,
}

impl ArgGroup {
    /// Create an argument from explicit bit symbols.
    pub fn new(name: impl Into<String>, bits: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            name: name.into(),
            bits: bits.into_iter().collect(),
        }
    }

    /// A single-bit argument whose bit symbol is the argument name.
    pub fn bit(name: impl Into<String>) -> Self {
        let name = name.into();
        let sym = Symbol::new(&name);
        Self {
            name,
            bits: vec![sym],
        }
    }

    /// A `width`-bit argument with bits named `name.0 .. name.{width-1}`.
    pub fn vector(name: impl Into<String>, width: usize) -> Self {
        let name = name.into();
        let bits = (0..width).map(|i| Symbol::new(format!("{name}.{i}"))).collect();
        Self { name, bits }
    }
}

/// A complete boolean program: arguments, assignments and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Name of the compiled function.
    pub name: String,
    /// Argument groups, in declaration order.
    pub inputs: Vec<ArgGroup>,
    /// Assignments in evaluation order.
    pub assignments: Vec<Assignment>,
    /// Output bits, in order.
    pub outputs: Vec<Symbol>,
}

impl Program {
    /// Create an empty program.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: vec![],
            assignments: vec![],
            outputs: vec![],
        }
    }

    /// Add an argument group.
    #[must_use]
    pub fn with_input(mut self, group: ArgGroup) -> Self {
        self.inputs.push(group);
        self
    }

    /// Add an assignment.
    #[must_use]
    pub fn with_assignment(mut self, target: impl Into<Symbol>, expr: Expression) -> Self {
        self.assignments.push(Assignment::new(target, expr));
        self
    }

    /// Add an output bit.
    #[must_use]
    pub fn with_output(mut self, sym: impl Into<Symbol>) -> Self {
        self.outputs.push(sym.into());
        self
    }

    /// All input bit symbols, flattened in declaration order.
    pub fn input_symbols(&self) -> Vec<Symbol> {
        self.inputs.iter().flat_map(|g| g.bits.iter().cloned()).collect()
    }

    /// Evaluate the program directly on the IR.
    ///
    /// `values` holds one boolean per input bit, in [`Program::input_symbols`]
    /// order. Returns the output bits in order.
    pub fn evaluate(&self, values: &[bool]) -> IrResult<Vec<bool>> {
        let inputs = self.input_symbols();
        if inputs.len() != values.len() {
            return Err(IrError::InputLengthMismatch {
                expected: inputs.len(),
                got: values.len(),
            });
        }

        let mut env: FxHashMap<Symbol, bool> = inputs.into_iter().zip(values.iter().copied()).collect();
        for assignment in &self.assignments {
            let value = assignment.expr.eval(&env)?;
            env.insert(assignment.target.clone(), value);
        }

        self.outputs
            .iter()
            .map(|sym| {
                env.get(sym)
                    .copied()
                    .ok_or_else(|| IrError::UnboundSymbol(sym.to_string()))
            })
            .collect()
    }
}
