//! The host object graph behind the shell namespace global.
//!
//! Rewritten source reaches the outside world only through that one
//! global: `.shells[ID].vars` for per-session namespaces, `new
//! ...Query(shell, collection)` for domain access, and
//! `.keyword.evaluate(...)` for reserved commands. Each link in the
//! chain is a small [`NativeObject`].

use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

use tidepool_eval::{EvalError, EvalResult, NativeObject, Value};
use tidepool_types::ShellId;

use crate::keyword;
use crate::query::QueryNative;
use crate::service::DataService;
use crate::session::{SessionRef, ShellRegistry};

/// The namespace root itself.
pub struct NamespaceRoot {
    registry: Rc<ShellRegistry>,
    service: Arc<dyn DataService>,
}

impl NamespaceRoot {
    pub fn new(registry: Rc<ShellRegistry>, service: Arc<dyn DataService>) -> Self {
        Self { registry, service }
    }
}

impl NativeObject for NamespaceRoot {
    fn type_name(&self) -> &str {
        "Tidepool"
    }

    fn get(&self, property: &str) -> Value {
        match property {
            "shells" => Value::Native(Rc::new(ShellsView { registry: self.registry.clone() })),
            "keyword" => Value::Native(Rc::new(KeywordNative { registry: self.registry.clone() })),
            "Query" => Value::Native(Rc::new(QueryConstructor { service: self.service.clone() })),
            _ => Value::Undefined,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `shells` container, indexed by shell id.
struct ShellsView {
    registry: Rc<ShellRegistry>,
}

impl NativeObject for ShellsView {
    fn type_name(&self) -> &str {
        "Shells"
    }

    fn get(&self, property: &str) -> Value {
        let id = match property.parse::<u32>() {
            Ok(index) => ShellId(index),
            Err(_) => return Value::Undefined,
        };
        match self.registry.get(id) {
            Some(session) => Value::Native(Rc::new(ShellHandle { session })),
            None => Value::Undefined,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One registered session as seen from shell code.
pub struct ShellHandle {
    session: SessionRef,
}

impl ShellHandle {
    pub(crate) fn session(&self) -> &SessionRef {
        &self.session
    }
}

impl NativeObject for ShellHandle {
    fn type_name(&self) -> &str {
        "Shell"
    }

    fn get(&self, property: &str) -> Value {
        match property {
            "vars" => self.session.vars_value(),
            _ => Value::Undefined,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Dispatcher for reserved keyword lines.
struct KeywordNative {
    registry: Rc<ShellRegistry>,
}

impl NativeObject for KeywordNative {
    fn type_name(&self) -> &str {
        "Keyword"
    }

    fn call_method(&self, method: &str, args: &[Value]) -> EvalResult<Value> {
        match method {
            "evaluate" => keyword::evaluate(&self.registry, args),
            _ => Err(EvalError::TypeError(format!(
                "{}.{method} is not a function",
                self.type_name()
            ))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Constructor the member-access rewrite targets: `new Query(shell,
/// collection)` yields the [`QueryNative`] for that collection.
struct QueryConstructor {
    service: Arc<dyn DataService>,
}

impl NativeObject for QueryConstructor {
    fn type_name(&self) -> &str {
        "Query"
    }

    fn construct(&self, args: &[Value]) -> EvalResult<Value> {
        let session = match args.first() {
            Some(Value::Native(native)) => match native.as_any().downcast_ref::<ShellHandle>() {
                Some(handle) => handle.session().clone(),
                None => {
                    return Err(EvalError::TypeError(
                        "Query expects a shell handle".to_string(),
                    ))
                }
            },
            _ => {
                return Err(EvalError::TypeError(
                    "Query expects a shell handle".to_string(),
                ))
            }
        };
        let collection = match args.get(1) {
            Some(value) => value.to_string(),
            None => {
                return Err(EvalError::TypeError(
                    "Query expects a collection name".to_string(),
                ))
            }
        };
        let resource = session
            .resource()
            .cloned()
            .ok_or_else(|| EvalError::Host("shell is disabled".to_string()))?;
        tracing::debug!(shell = %session.id(), collection = %collection, "query bound");
        Ok(Value::Native(Rc::new(QueryNative::new(
            session,
            self.service.clone(),
            resource,
            collection,
        ))))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
