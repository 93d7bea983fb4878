//! Sandboxed tree-walking interpreter for shell submissions.
//!
//! The evaluator executes rewritten submission trees directly. It owns
//! nothing of the shell itself: sessions, queries and cursors reach in
//! through [`NativeObject`] values grafted into the global scope, and
//! everything else is plain expression evaluation with the host
//! language's coercion rules.

mod env;
mod error;
mod evaluator;
mod native;
mod value;

pub use env::{EnvRef, Environment};
pub use error::{EvalError, EvalResult};
pub use evaluator::{Evaluator, DEFAULT_GAS_LIMIT, MAX_CALL_DEPTH};
pub use native::NativeObject;
pub use value::{format_number, json_to_value, value_to_json, FunctionValue, Value};
