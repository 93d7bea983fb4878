//! Runtime error types for the tidepool evaluator.

use std::fmt;

use crate::value::Value;

/// Evaluation error: runtime faults plus the unwinding variants the
/// evaluator uses internally for control flow.
#[derive(Debug, Clone)]
pub enum EvalError {
    /// Read of a name with no binding anywhere in scope.
    UndefinedVariable(String),
    /// Operation applied to a value of the wrong shape.
    TypeError(String),
    /// Step budget exhausted; almost always a runaway loop.
    GasExhausted,
    /// Call nesting exceeded the depth cap.
    StackOverflow,
    /// A host object rejected the operation (service failures surface
    /// through here).
    Host(String),
    /// `return` unwinding (internal control flow).
    Return(Value),
    /// `break` unwinding (internal control flow).
    Break,
    /// `continue` unwinding (internal control flow).
    Continue,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedVariable(name) => write!(f, "{name} is not defined"),
            Self::TypeError(msg) => write!(f, "type error: {msg}"),
            Self::GasExhausted => write!(f, "evaluation step budget exhausted"),
            Self::StackOverflow => write!(f, "maximum call depth exceeded"),
            Self::Host(msg) => write!(f, "{msg}"),
            Self::Return(_) => write!(f, "return"),
            Self::Break => write!(f, "break"),
            Self::Continue => write!(f, "continue"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
