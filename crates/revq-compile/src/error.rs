//! Error types for the compilation crate.

use thiserror::Error;

/// Errors that can occur during compilation, decompilation and optimization.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] revq_ir::IrError),

    /// Expression refers to a symbol that has no qubit yet.
    #[error("Symbol '{0}' is not bound to a qubit")]
    UnboundSymbol(String),

    /// `Or` must have exactly two operands when it reaches the compiler.
    #[error("Or expects exactly 2 operands, got {0}")]
    MalformedOr(usize),

    /// Operator without operands.
    #[error("'{0}' requires at least one operand")]
    EmptyOperands(&'static str),

    /// Gate inside a classical section that forward substitution cannot handle.
    #[error("Gate '{0}' cannot be decompiled")]
    UnsupportedGate(String),

    /// Section-mode assignment could not be placed on its own qubit.
    #[error("Assignment to '{0}' cannot be compiled in place")]
    NotInPlace(String),

    /// Pass execution failed.
    #[error("Pass '{name}' failed: {reason}")]
    PassFailed { name: String, reason: String },
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
