//! Compiler and optimizer configuration.

use serde::{Deserialize, Serialize};

/// Knobs shared by the expression compiler and the boolean optimizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Reuse the qubit of an already compiled sub-expression.
    pub memoize: bool,
    /// Return every non-output qubit to 0 at the end of a compilation.
    pub uncompute: bool,
    /// Cancel adjacent identical gates as a final step.
    pub remove_identities: bool,
    /// Largest number of free symbols an equivalence check may enumerate.
    pub max_verify_inputs: usize,
    /// Largest decompiled expression (in nodes) before a section is split.
    pub max_expression_size: usize,
}

impl CompileOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable memoization.
    #[must_use]
    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    /// Enable or disable the final uncomputation.
    #[must_use]
    pub fn with_uncompute(mut self, uncompute: bool) -> Self {
        self.uncompute = uncompute;
        self
    }

    /// Enable or disable identity removal.
    #[must_use]
    pub fn with_remove_identities(mut self, remove: bool) -> Self {
        self.remove_identities = remove;
        self
    }

    /// Set the equivalence-check bound.
    #[must_use]
    pub fn with_max_verify_inputs(mut self, max: usize) -> Self {
        self.max_verify_inputs = max;
        self
    }

    /// Set the decompiled expression size bound.
    #[must_use]
    pub fn with_max_expression_size(mut self, max: usize) -> Self {
        self.max_expression_size = max;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            memoize: true,
            uncompute: true,
            remove_identities: true,
            max_verify_inputs: 16,
            max_expression_size: 4096,
        }
    }
}
