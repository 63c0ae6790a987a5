//! Pass trait and types for circuit passes.

use revq_ir::Circuit;

use crate::error::CompileResult;

/// The kind of circuit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Analysis pass that reads but does not modify the circuit.
    Analysis,
    /// Transformation pass that modifies the circuit.
    Transformation,
}

/// A pass that operates on a compiled circuit.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given circuit.
    ///
    /// Analysis passes must leave the circuit untouched and report problems
    /// through the returned error.
    fn run(&self, circuit: &mut Circuit) -> CompileResult<()>;

    /// Check if this pass should run on the current circuit.
    fn should_run(&self, _circuit: &Circuit) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestPass;

    impl Pass for TestPass {
        fn name(&self) -> &'static str {
            "test"
        }

        fn kind(&self) -> PassKind {
            PassKind::Transformation
        }

        fn run(&self, _circuit: &mut Circuit) -> CompileResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pass_kind() {
        let pass = TestPass;
        assert_eq!(pass.kind(), PassKind::Transformation);
        assert_eq!(pass.name(), "test");
        assert!(pass.should_run(&Circuit::new("empty")));
    }
}
