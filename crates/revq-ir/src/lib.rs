//! Revq Intermediate Representation
//!
//! This crate provides the shared data model of the revq reversible-logic
//! compiler: boolean expressions over named bits, the assignment lists the
//! front end produces, and the [`Circuit`] that compiled programs land in.
//!
//! # Core Components
//!
//! - **Symbols and expressions**: [`Symbol`], [`Expression`] form a closed
//!   expression tree with structural equality and hashing
//! - **Programs**: [`Assignment`], [`ArgGroup`] and [`Program`] describe a
//!   function as an ordered assignment list
//! - **Gates**: [`GateKind`] and [`AppliedGate`] cover the classical
//!   NOT-family basis plus barriers and opaque hybrid operations
//! - **Circuit**: [`Circuit`] owns qubits, the name map, the ancilla pool and
//!   the logs used for uncomputation
//!
//! # Example: Computing an AND into an Ancilla
//!
//! ```rust
//! use revq_ir::{Circuit, Symbol};
//!
//! let mut circuit = Circuit::new("and");
//! let a = circuit.add_qubit(Some(Symbol::from("a")));
//! let b = circuit.add_qubit(Some(Symbol::from("b")));
//! let anc = circuit.get_free_ancilla();
//!
//! circuit.ccx(a, b, anc).unwrap();
//! assert_eq!(circuit.simulate(&[true, true]).unwrap(), vec![true, true, true]);
//!
//! // Replaying the Toffoli returns the ancilla to 0.
//! circuit.uncompute([anc]);
//! assert_eq!(circuit.simulate(&[true, true]).unwrap(), vec![true, true, false]);
//! assert!(circuit.free_ancillas().contains(&anc));
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `X` | 1 | NOT |
//! | `CX` | 2 | Controlled NOT |
//! | `CCX` | 3 | Toffoli |
//! | `MCX(n)` | n + 1 | Multiply-controlled NOT |
//! | `Barrier` | any | Section delimiter, no effect |
//! | `Opaque(name)` | any | Hybrid operation, applied atomically |

pub mod circuit;
pub mod error;
pub mod expression;
pub mod gate;
pub mod program;
pub mod qubit;
pub mod simulate;
pub mod symbol;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use expression::Expression;
pub use gate::{AppliedGate, GateKind};
pub use program::{ArgGroup, Assignment, Program};
pub use qubit::QubitId;
pub use simulate::TruthRow;
pub use symbol::Symbol;
