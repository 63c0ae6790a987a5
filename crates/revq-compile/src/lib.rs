//! Revq Compilation Framework
//!
//! This crate turns boolean programs into reversible circuits and shrinks
//! already compiled circuits again. It provides three cooperating pieces:
//!
//! 1. **Compilation**: [`ExpressionCompiler`] lowers assignment lists into the
//!    NOT-family basis, memoizing shared sub-expressions and uncomputing
//!    every scratch qubit
//! 2. **Decompilation**: [`decompile`] recovers one boolean expression per
//!    qubit from each classical section of a circuit
//! 3. **Optimization**: [`BooleanOptimizer`] chains the two through a
//!    [`Simplifier`] and splices in a replacement only when it is shorter
//!    and verified equivalent
//!
//! # Architecture
//!
//! ```text
//! Program ──► ExpressionCompiler ──► Circuit
//!                                       │
//!                     ┌─────────────────┘
//!                     ▼
//!               Decompiler ──► Simplifier ──► ExpressionCompiler (in place)
//!                     │                                │
//!                     └────────── verified splice ◄────┘
//! ```
//!
//! # Example: Compile and Optimize
//!
//! ```rust
//! use revq_compile::{ExpressionCompiler, PassManagerBuilder};
//! use revq_ir::{ArgGroup, Expression, Program};
//!
//! let program = Program::new("majority")
//!     .with_input(ArgGroup::bit("a"))
//!     .with_input(ArgGroup::bit("b"))
//!     .with_input(ArgGroup::bit("c"))
//!     .with_assignment(
//!         "_ret",
//!         Expression::xor([
//!             Expression::and([Expression::symbol("a"), Expression::symbol("b")]),
//!             Expression::and([Expression::symbol("a"), Expression::symbol("c")]),
//!             Expression::and([Expression::symbol("b"), Expression::symbol("c")]),
//!         ]),
//!     )
//!     .with_output("_ret");
//!
//! let mut circuit = ExpressionCompiler::default().compile(&program).unwrap();
//! let inputs: Vec<_> = (0..3u32).map(Into::into).collect();
//!
//! let pm = PassManagerBuilder::new()
//!     .with_optimization_level(2)
//!     .with_preserve(inputs)
//!     .build();
//! pm.run(&mut circuit).unwrap();
//!
//! let state = circuit.simulate(&[true, true, false]).unwrap();
//! assert!(state[circuit.qubit("_ret").unwrap().index()]);
//! ```
//!
//! # Optimization Levels
//!
//! | Level | Passes Included |
//! |-------|-----------------|
//! | 0 | None |
//! | 1 | Identity cancellation |
//! | 2 | + Boolean peephole optimization |
//! | 3 | + A second optimization round |

pub mod compiler;
pub mod decompiler;
pub mod error;
mod inplace;
pub mod manager;
pub mod memo;
pub mod optimizer;
pub mod options;
pub mod pass;
pub mod passes;
pub mod simplify;

pub use compiler::ExpressionCompiler;
pub use decompiler::{decompile, Decompiler, Section};
pub use error::{CompileError, CompileResult};
pub use manager::{PassManager, PassManagerBuilder};
pub use memo::ExpQMap;
pub use optimizer::{optimize, BooleanOptimizer};
pub use options::CompileOptions;
pub use pass::{Pass, PassKind};
pub use simplify::{AlgebraicSimplifier, Simplifier};
