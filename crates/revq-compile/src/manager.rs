//! Pass manager for post-compilation circuit passes.

use revq_ir::{Circuit, QubitId};
use tracing::{debug, info, instrument};

use crate::error::CompileResult;
use crate::options::CompileOptions;
use crate::pass::Pass;
use crate::passes::{BooleanOptimization, RemoveIdentities, UncomputeVerification};

/// Manages and executes a sequence of circuit passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes on the given circuit.
    #[instrument(skip(self, circuit), fields(circuit = circuit.name()))]
    pub fn run(&self, circuit: &mut Circuit) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on circuit with {} qubits",
            self.passes.len(),
            circuit.num_qubits()
        );

        for pass in &self.passes {
            if pass.should_run(circuit) {
                debug!("Running pass: {}", pass.name());
                pass.run(circuit)?;
                debug!("Pass {} completed, gates: {}", pass.name(), circuit.num_gates());
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!("Pass manager completed, gates: {}", circuit.num_gates());
        Ok(())
    }

    /// Names of the passes, in order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating pass managers with preset configurations.
pub struct PassManagerBuilder {
    /// Optimization level (0-3).
    optimization_level: u8,
    options: CompileOptions,
    preserve: Option<Vec<QubitId>>,
    verify: Option<(Vec<QubitId>, Vec<QubitId>)>,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            optimization_level: 1,
            options: CompileOptions::default(),
            preserve: None,
            verify: None,
        }
    }

    /// Set the optimization level.
    ///
    /// - Level 0: No passes
    /// - Level 1: Identity cancellation (default)
    /// - Level 2: Boolean peephole optimization
    /// - Level 3: Boolean peephole optimization, run twice
    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level.min(3);
        self
    }

    /// Set the options used by the optimizer.
    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Qubits whose initial value is significant; all others start at 0.
    #[must_use]
    pub fn with_preserve(mut self, preserve: Vec<QubitId>) -> Self {
        self.preserve = Some(preserve);
        self
    }

    /// Append an [`UncomputeVerification`] pass for these inputs and outputs.
    #[must_use]
    pub fn with_verification(mut self, inputs: Vec<QubitId>, outputs: Vec<QubitId>) -> Self {
        self.verify = Some((inputs, outputs));
        self
    }

    /// Build the pass manager.
    pub fn build(self) -> PassManager {
        let mut pm = PassManager::new();

        if self.optimization_level >= 2 {
            pm.add_pass(BooleanOptimization::new(
                self.preserve.clone(),
                self.options.clone(),
            ));
        }
        if self.optimization_level >= 3 {
            pm.add_pass(BooleanOptimization::new(self.preserve, self.options.clone()));
        }
        if self.optimization_level >= 1 {
            pm.add_pass(RemoveIdentities);
        }

        // Verification goes last so it sees the output of every other pass.
        if let Some((inputs, outputs)) = self.verify {
            pm.add_pass(
                UncomputeVerification::new(inputs, outputs)
                    .with_max_inputs(self.options.max_verify_inputs),
            );
        }

        pm
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pass_manager() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
        assert_eq!(pm.len(), 0);
    }

    #[test]
    fn test_pass_manager_run() {
        let pm = PassManager::new();
        let mut circuit = Circuit::with_size("test", 2);
        circuit.x(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        pm.run(&mut circuit).unwrap();
        assert_eq!(circuit.num_gates(), 2);
    }

    #[test]
    fn test_pass_manager_builder_levels() {
        assert!(PassManagerBuilder::new()
            .with_optimization_level(0)
            .build()
            .is_empty());

        let pm = PassManagerBuilder::new()
            .with_optimization_level(2)
            .with_verification(vec![QubitId(0)], vec![QubitId(1)])
            .build();
        assert_eq!(
            pm.pass_names(),
            vec!["boolean_optimization", "remove_identities", "uncompute_verification"]
        );
    }

    #[test]
    fn test_builder_run_removes_identities() {
        let mut circuit = Circuit::with_size("xx", 1);
        circuit.x(QubitId(0)).unwrap();
        circuit.x(QubitId(0)).unwrap();

        PassManagerBuilder::new().build().run(&mut circuit).unwrap();
        assert_eq!(circuit.num_gates(), 0);
    }
}
