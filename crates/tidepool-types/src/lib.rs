//! Shared types for the tidepool shell.
//!
//! This crate defines the rewritable syntax tree, source spans, the
//! syntax error type, and the session identifier used across all
//! pipeline stages.

mod error;
mod id;
mod span;
pub mod tree;

pub use error::SyntaxError;
pub use id::ShellId;
pub use span::{SourceFile, Span};
pub use tree::{
    AssignOp, BinaryOp, LogicalOp, Node, NodeId, NodeKind, Tree, TreeBuilder, UnaryOp, UpdateOp,
};

/// Result type used by the parsing stages.
pub type Result<T> = std::result::Result<T, SyntaxError>;
