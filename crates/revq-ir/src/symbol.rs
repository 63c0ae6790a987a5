//! Symbolic names for boolean values.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Prefix reserved for front-end temporaries.
const SYNTHETIC_PREFIX: &str = "__";

/// An immutable name identifying a logical boolean value.
///
/// Symbols are opaque: the compiler attaches no meaning to their structure,
/// with the single exception of synthetic temporaries created through
/// [`Symbol::synthetic`], which are never promoted to permanent qubits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Create a symbol from a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Create a front-end temporary.
    pub fn synthetic(hint: impl fmt::Display) -> Self {
        Self::new(format!("{SYNTHETIC_PREFIX}{hint}"))
    }

    /// Check whether this symbol names a front-end temporary.
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_PREFIX)
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(Arc::from(name))
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}
