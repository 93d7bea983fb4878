//! The lazy query/cursor protocol.
//!
//! `db.collection.find(...)` never touches the service. It builds a
//! [`CursorState`] in the `Pending` phase and hands back a
//! [`CursorNative`]; the find request is dispatched at most once, the
//! first time a consuming operation (`hasNext`, `next`, batch printing)
//! needs results. Chained cursor wrappers share one state, so however
//! many handles shell code holds, the collection is asked exactly once.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tidepool_eval::{json_to_value, value_to_json, EvalError, EvalResult, NativeObject, Value};

use crate::service::{DataService, ResourceId};
use crate::session::SessionRef;

/// Line shown whenever a service request fails mid-session.
pub(crate) const SERVER_ERROR_LINE: &str = "ERROR: server error occured";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorPhase {
    Pending,
    Executed,
}

/// Shared lifecycle of one query invocation.
pub struct CursorState {
    session: SessionRef,
    service: Arc<dyn DataService>,
    resource: ResourceId,
    collection: String,
    filter: Option<JsonValue>,
    projection: Option<JsonValue>,
    phase: RefCell<CursorPhase>,
    /// Materialized results, reversed so the next document in server
    /// order pops off the end.
    results: RefCell<Vec<Value>>,
}

impl CursorState {
    fn new(
        session: SessionRef,
        service: Arc<dyn DataService>,
        resource: ResourceId,
        collection: String,
        filter: Option<JsonValue>,
        projection: Option<JsonValue>,
    ) -> Rc<Self> {
        Rc::new(Self {
            session,
            service,
            resource,
            collection,
            filter,
            projection,
            phase: RefCell::new(CursorPhase::Pending),
            results: RefCell::new(Vec::new()),
        })
    }

    pub fn is_executed(&self) -> bool {
        *self.phase.borrow() == CursorPhase::Executed
    }

    /// Dispatch the find request if it has not run yet. Returns true
    /// when results are available. On a service failure the error line
    /// goes to the display, the cursor stays `Pending` so a later
    /// operation can retry, and the caller gets `false`.
    pub fn execute_if_pending(&self) -> bool {
        if self.is_executed() {
            return true;
        }
        tracing::debug!(collection = %self.collection, "dispatching find");
        match self.service.find(
            &self.resource,
            &self.collection,
            self.filter.as_ref(),
            self.projection.as_ref(),
        ) {
            Ok(documents) => {
                let mut stored: Vec<Value> = documents.iter().map(json_to_value).collect();
                stored.reverse();
                *self.results.borrow_mut() = stored;
                *self.phase.borrow_mut() = CursorPhase::Executed;
                true
            }
            Err(err) => {
                self.session.report(SERVER_ERROR_LINE);
                tracing::error!(
                    collection = %self.collection,
                    error = %err,
                    "find failed, cursor stays pending"
                );
                false
            }
        }
    }

    /// True when at least one unconsumed result remains.
    pub fn has_next(&self) -> bool {
        if !self.execute_if_pending() {
            return false;
        }
        !self.results.borrow().is_empty()
    }

    /// The next result in server order. Past the end this reports an
    /// error line and yields `Undefined`.
    pub fn next(&self) -> Value {
        if !self.execute_if_pending() {
            return Value::Undefined;
        }
        let popped = self.results.borrow_mut().pop();
        match popped {
            Some(document) => document,
            None => {
                self.session.report("ERROR: no more results to show");
                tracing::debug!(collection = %self.collection, "cursor exhausted");
                Value::Undefined
            }
        }
    }

    /// Sort is accepted but not yet forwarded to the service. On an
    /// executed cursor it only warns; results are never reordered
    /// locally.
    pub fn sort(this: &Rc<Self>, _order: &[Value]) -> Value {
        if this.is_executed() {
            this.warn_executed("sort");
        } else {
            tracing::debug!(collection = %this.collection, "sort recorded, not dispatched");
        }
        Value::Native(Rc::new(CursorNative { state: this.clone() }))
    }

    fn warn_executed(&self, method: &str) {
        self.session
            .report(&format!("Warning: Cannot call {method} on an already executed cursor."));
        tracing::warn!(collection = %self.collection, method, "modifier after execution");
    }

    /// Print the next batch of results. Executes the query if needed,
    /// records this cursor as the session's continuation target, and
    /// announces when more results remain.
    pub fn print_batch(this: &Rc<Self>) {
        if !this.execute_if_pending() {
            return;
        }
        this.session.set_last_used_cursor(this);
        let size = match this.session.shell_batch_size() {
            Some(size) => size,
            None => {
                this.session
                    .report("ERROR: Please set DBQuery.shellBatchSize to a valid numerical value.");
                tracing::warn!("batch aborted, DBQuery.shellBatchSize is not numeric");
                return;
            }
        };
        let mut batch = Vec::new();
        {
            let mut results = this.results.borrow_mut();
            // Strict comparison against the raw size: a fractional
            // setting rounds up, a negative one prints nothing.
            while (batch.len() as f64) < size {
                match results.pop() {
                    Some(document) => batch.push(document),
                    None => break,
                }
            }
        }
        let lines: Vec<String> = batch
            .iter()
            .map(|document| value_to_json(document).unwrap_or(JsonValue::Null).to_string())
            .collect();
        if !lines.is_empty() {
            this.session.display().append_lines(&lines);
            tracing::debug!(collection = %this.collection, count = lines.len(), "printed batch");
        }
        if this.has_next() {
            this.session.report("Type \"it\" for more");
        }
    }
}

/// The value `db.collection` evaluates to after rewriting.
pub struct QueryNative {
    session: SessionRef,
    service: Arc<dyn DataService>,
    resource: ResourceId,
    collection: String,
}

impl QueryNative {
    pub(crate) fn new(
        session: SessionRef,
        service: Arc<dyn DataService>,
        resource: ResourceId,
        collection: String,
    ) -> Self {
        Self { session, service, resource, collection }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn find(&self, args: &[Value]) -> EvalResult<Value> {
        let filter = json_arg(args.first());
        let projection = json_arg(args.get(1));
        tracing::debug!(collection = %self.collection, "find builds a pending cursor");
        let state = CursorState::new(
            self.session.clone(),
            self.service.clone(),
            self.resource.clone(),
            self.collection.clone(),
            filter,
            projection,
        );
        Ok(Value::Native(Rc::new(CursorNative { state })))
    }

    fn insert(&self, args: &[Value]) -> EvalResult<Value> {
        let document = args
            .first()
            .and_then(value_to_json)
            .unwrap_or(JsonValue::Null);
        tracing::debug!(collection = %self.collection, "dispatching insert");
        if let Err(err) = self.service.insert(&self.resource, &self.collection, &document) {
            self.session.report(SERVER_ERROR_LINE);
            tracing::error!(collection = %self.collection, error = %err, "insert failed");
        }
        Ok(Value::Undefined)
    }
}

impl NativeObject for QueryNative {
    fn type_name(&self) -> &str {
        "Query"
    }

    fn call_method(&self, method: &str, args: &[Value]) -> EvalResult<Value> {
        match method {
            "find" => self.find(args),
            "insert" => self.insert(args),
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

/// User-facing cursor handle. Thin: all state lives in the shared
/// [`CursorState`], so `it` and chained wrappers observe every
/// consumed document.
pub struct CursorNative {
    state: Rc<CursorState>,
}

impl CursorNative {
    pub fn state(&self) -> &Rc<CursorState> {
        &self.state
    }

    pub fn print_batch(&self) {
        CursorState::print_batch(&self.state);
    }
}

impl NativeObject for CursorNative {
    fn type_name(&self) -> &str {
        "Cursor"
    }

    fn call_method(&self, method: &str, args: &[Value]) -> EvalResult<Value> {
        match method {
            "hasNext" => Ok(Value::Bool(self.state.has_next())),
            "next" => Ok(self.state.next()),
            "sort" => Ok(CursorState::sort(&self.state, args)),
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

/// Convert an optional call argument for the wire. Absent, `undefined`
/// and `null` arguments are all omitted from the request.
fn json_arg(arg: Option<&Value>) -> Option<JsonValue> {
    match arg {
        None | Some(Value::Undefined) | Some(Value::Null) => None,
        Some(value) => value_to_json(value),
    }
}
