//! The shell engine and its submission pipeline.
//!
//! One engine owns the interpreter, the session registry, and the data
//! service handle. A submission runs through a fixed pipeline: echo the
//! raw line, rewrite it for the session, split the rewritten text into
//! top-level statements, then evaluate statement by statement. The
//! first faulting statement is reported with its own source text and
//! ends the submission; earlier statements keep their effects.

use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;
use tidepool_eval::{EvalError, Evaluator, Value};
use tidepool_parser::parse_source;
use tidepool_rewrite::{rewrite_source, split_statements, SHELL_NAMESPACE};
use tidepool_types::{ShellId, SyntaxError};

use crate::config::ShellConfig;
use crate::display::ResponseDisplay;
use crate::keepalive::KeepAliveHandle;
use crate::natives::NamespaceRoot;
use crate::query::CursorNative;
use crate::service::{DataService, ServiceError};
use crate::session::{SessionRef, ShellRegistry, ShellSession};

/// Errors from engine-level operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No session is registered under this id.
    #[error("unknown shell {0}")]
    UnknownShell(ShellId),

    /// Resource creation failed. The session was registered anyway,
    /// permanently disabled, so its display still answers submissions.
    #[error("shell {id}: could not create a service resource")]
    ResourceCreation {
        id: ShellId,
        #[source]
        source: ServiceError,
    },
}

/// What one top-level statement came to.
#[derive(Debug)]
pub enum StatementOutcome {
    /// The statement evaluated to `value`. `Undefined` prints nothing.
    Value { statement: String, value: Value },

    /// The statement faulted. Anything after it was skipped.
    Fault { statement: String, error: EvalError },
}

/// Structured result of one submission, alongside whatever the
/// session's display received.
#[derive(Debug)]
pub enum SubmissionReport {
    /// The session is disabled; nothing was evaluated.
    InputDisabled,

    /// The submission never reached evaluation.
    ParseError(SyntaxError),

    /// Statements ran, up to the first fault if there was one.
    Evaluated { rewritten: String, outcomes: Vec<StatementOutcome> },
}

/// The engine: sessions, interpreter, service.
pub struct ShellEngine {
    config: ShellConfig,
    registry: Rc<ShellRegistry>,
    service: Arc<dyn DataService>,
    evaluator: Evaluator,
    keep_alive: Vec<KeepAliveHandle>,
}

impl ShellEngine {
    pub fn new(config: ShellConfig, service: Arc<dyn DataService>) -> Self {
        let registry = Rc::new(ShellRegistry::new());
        let mut evaluator = Evaluator::new(config.gas_limit);
        let root = NamespaceRoot::new(registry.clone(), service.clone());
        evaluator.define_global(SHELL_NAMESPACE, Value::Native(Rc::new(root)));
        Self { config, registry, service, evaluator, keep_alive: Vec::new() }
    }

    pub fn registry(&self) -> &Rc<ShellRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Create a session backed by a fresh service resource and start
    /// its keep-alive cadence. On failure the session is registered
    /// anyway but disabled, and the failure is returned with its id.
    pub fn create_shell(
        &mut self,
        display: Rc<dyn ResponseDisplay>,
    ) -> Result<ShellId, EngineError> {
        let id = self.registry.allocate_id();
        match self.service.create_resource() {
            Ok(resource) => {
                tracing::info!(shell = %id, resource = %resource, "shell created");
                self.keep_alive.push(KeepAliveHandle::spawn(
                    self.service.clone(),
                    resource.clone(),
                    self.config.keep_alive_interval(),
                ));
                let session =
                    ShellSession::new(id, Some(resource), display, self.config.shell_batch_size);
                self.registry.insert(session);
                Ok(id)
            }
            Err(err) => {
                let line = match &err {
                    ServiceError::Malformed(_) => "ERROR: No res_id received! Shell disabled.",
                    _ => "Failed to create resources on DB on server",
                };
                display.append_line(line);
                tracing::error!(shell = %id, error = %err, "resource creation failed, shell disabled");
                let session = ShellSession::new(id, None, display, self.config.shell_batch_size);
                self.registry.insert(session);
                Err(EngineError::ResourceCreation { id, source: err })
            }
        }
    }

    /// Run one submission through the pipeline.
    pub fn handle_submission(
        &mut self,
        id: ShellId,
        raw: &str,
    ) -> Result<SubmissionReport, EngineError> {
        let session = self.registry.get(id).ok_or(EngineError::UnknownShell(id))?;
        session.report(raw);

        if !session.is_enabled() {
            session.report("ERROR: shell is disabled");
            tracing::warn!(shell = %id, "submission to disabled shell");
            return Ok(SubmissionReport::InputDisabled);
        }

        let rewritten = match rewrite_source(raw, id) {
            Ok(rewritten) => rewritten,
            Err(err) => {
                session.report("ERROR: syntax parsing error");
                tracing::debug!(shell = %id, error = %err, "submission failed to parse");
                return Ok(SubmissionReport::ParseError(err));
            }
        };

        let statements = match split_statements(&rewritten) {
            Ok(statements) => statements,
            Err(err) => {
                // The rewritten text came out of our own renderer, so
                // reaching this arm means a rewrite bug. Reported the
                // same way as a parse failure of the input.
                session.report("ERROR: syntax parsing error");
                tracing::error!(shell = %id, error = %err, rewritten = %rewritten, "rewritten source failed to parse");
                return Ok(SubmissionReport::ParseError(err));
            }
        };

        self.evaluator.reset_gas();
        let mut outcomes = Vec::with_capacity(statements.len());
        for statement in statements {
            match self.eval_statement(&session, &statement) {
                Ok(value) => outcomes.push(StatementOutcome::Value { statement, value }),
                Err(error) => {
                    session.report(&format!("ERROR: eval error on: {statement}"));
                    tracing::debug!(shell = %id, statement = %statement, error = %error, "statement faulted");
                    outcomes.push(StatementOutcome::Fault { statement, error });
                    break;
                }
            }
        }
        Ok(SubmissionReport::Evaluated { rewritten, outcomes })
    }

    /// Evaluate one statement and route its value: cursors print a
    /// batch, any other defined value prints directly.
    fn eval_statement(&mut self, session: &SessionRef, statement: &str) -> Result<Value, EvalError> {
        let tree = parse_source(statement).map_err(|err| EvalError::Host(err.to_string()))?;
        let value = self.evaluator.eval_program(&Rc::new(tree))?;
        match &value {
            Value::Undefined => {}
            Value::Native(native) => match native.as_any().downcast_ref::<CursorNative>() {
                Some(cursor) => cursor.print_batch(),
                None => session.report(&value.to_string()),
            },
            other => session.report(&other.to_string()),
        }
        Ok(value)
    }
}
