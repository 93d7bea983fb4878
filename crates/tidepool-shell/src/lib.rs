//! Shell sessions, the query/cursor protocol, and the submission
//! pipeline.
//!
//! ```text
//! raw input → echo → rewrite → split → evaluate per statement
//!                                         │
//!                            cursor value → print batch
//!                            other value  → print value
//!                            fault        → attribute to statement
//! ```
//!
//! The engine evaluates every session inside one interpreter; isolation
//! comes entirely from the rewrite layer routing identifiers through
//! per-session namespaces. Domain access goes through [`DataService`],
//! with an HTTP client for deployments and an in-memory double for
//! tests.

mod config;
mod display;
mod engine;
mod http;
mod keepalive;
mod keyword;
mod natives;
mod query;
mod service;
mod session;

pub use tidepool_types::ShellId;

pub use config::ShellConfig;
pub use display::{RecordingDisplay, ResponseDisplay};
pub use engine::{EngineError, ShellEngine, StatementOutcome, SubmissionReport};
pub use http::HttpDataService;
pub use keepalive::KeepAliveHandle;
pub use natives::NamespaceRoot;
pub use query::{CursorNative, CursorState, QueryNative};
pub use service::{DataService, MemoryDataService, ResourceId, ServiceError};
pub use session::{SessionRef, ShellRegistry, ShellSession};
