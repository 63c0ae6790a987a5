//! Identity cancellation pass.

use revq_ir::Circuit;
use tracing::debug;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};

/// Removes adjacent pairs of identical self-inverse gates.
///
/// A single barrier between the two gates does not block cancellation, and
/// cancellations cascade: `X(0) CX(0,1) CX(0,1) X(0)` becomes empty.
pub struct RemoveIdentities;

impl Pass for RemoveIdentities {
    fn name(&self) -> &'static str {
        "remove_identities"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, circuit: &mut Circuit) -> CompileResult<()> {
        let removed = circuit.remove_identities();
        debug!("{}: removed {} gates", self.name(), removed);
        Ok(())
    }

    fn should_run(&self, circuit: &Circuit) -> bool {
        circuit.num_gates() > 1
    }
}
