//! Boolean peephole optimization pass.

use revq_ir::{Circuit, QubitId};

use crate::error::CompileResult;
use crate::optimizer::BooleanOptimizer;
use crate::options::CompileOptions;
use crate::pass::{Pass, PassKind};

/// Runs the [`BooleanOptimizer`] over the whole circuit.
pub struct BooleanOptimization {
    preserve: Option<Vec<QubitId>>,
    optimizer: BooleanOptimizer,
}

impl BooleanOptimization {
    /// Create the pass. Qubits outside `preserve` are assumed to start at 0.
    pub fn new(preserve: Option<Vec<QubitId>>, options: CompileOptions) -> Self {
        Self {
            preserve,
            optimizer: BooleanOptimizer::new(options),
        }
    }
}

impl Default for BooleanOptimization {
    fn default() -> Self {
        Self::new(None, CompileOptions::default())
    }
}

impl Pass for BooleanOptimization {
    fn name(&self) -> &'static str {
        "boolean_optimization"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> CompileResult<()> {
        *circuit = self.optimizer.optimize(circuit, self.preserve.as_deref())?;
        Ok(())
    }
}
