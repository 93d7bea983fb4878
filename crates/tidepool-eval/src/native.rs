//! The host-object seam.
//!
//! Everything the shell grafts into the interpreter (the namespace
//! root, session views, queries, cursors) implements [`NativeObject`].
//! The evaluator routes property reads, property writes, method calls,
//! and `new` through this trait without knowing what stands behind it.

use std::any::Any;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// A host object reachable from evaluated code.
///
/// Defaults mirror how a plain object behaves: unknown properties read
/// as Undefined, writes vanish, and calling or constructing is a type
/// error. Implementors override only the seams they serve.
pub trait NativeObject {
    /// Short name used in diagnostics, e.g. `"Cursor"`.
    fn type_name(&self) -> &str;

    /// Property read, shared by dot and computed access (computed keys
    /// arrive stringified).
    fn get(&self, _property: &str) -> Value {
        Value::Undefined
    }

    /// Property write. The default discards the value the way sloppy
    /// assignment onto a frozen object does.
    fn set(&self, _property: &str, _value: Value) -> EvalResult<()> {
        Ok(())
    }

    /// Method invocation `object.method(args)`.
    fn call_method(&self, method: &str, _args: &[Value]) -> EvalResult<Value> {
        Err(EvalError::TypeError(format!(
            "{}.{method} is not a function",
            self.type_name()
        )))
    }

    /// Constructor invocation `new object(args)`.
    fn construct(&self, _args: &[Value]) -> EvalResult<Value> {
        Err(EvalError::TypeError(format!(
            "{} is not a constructor",
            self.type_name()
        )))
    }

    /// String coercion.
    fn display_text(&self) -> String {
        "[object Object]".to_string()
    }

    /// Downcast support for host code that needs the concrete type
    /// back (the pipeline recognizes cursors this way).
    fn as_any(&self) -> &dyn Any;
}
