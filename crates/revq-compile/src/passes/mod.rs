//! Built-in circuit passes.

mod boolean;
mod cleanup;
mod verification;

pub use boolean::BooleanOptimization;
pub use cleanup::RemoveIdentities;
pub use verification::UncomputeVerification;
