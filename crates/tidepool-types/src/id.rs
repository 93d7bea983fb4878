use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one shell session.
///
/// The numeric value appears literally in rewritten source text (as the
/// index into the interpreter's session container), so `Display` renders
/// the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShellId(pub u32);

impl ShellId {
    /// The numeric value of this id.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
