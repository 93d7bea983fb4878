//! Source rewriting for shell submissions.
//!
//! Raw input typed into a shell runs against shared interpreter globals,
//! so a bare `var x = 5` in one session would be visible to every other
//! session. This crate virtualizes a submission before evaluation:
//!
//! 1. A pre-parse **keyword pass** diverts statements that open with a
//!    reserved shell word (`help`, `it`, ...) into calls on the keyword
//!    dispatcher, since those statements are not expression syntax.
//! 2. A **tree pass** parses the result and rewrites nodes bottom-up:
//!    free identifiers move into the session's `vars` namespace, `db`
//!    member accesses become query constructions, and top-level
//!    declarations lose their binding forms so nothing ever reaches the
//!    shared global scope.
//!
//! The rewritten text is ordinary source again and evaluates with no
//! special cases in the interpreter.

mod mutate;
mod rules;
mod scope;

pub use mutate::{apply_rules, rewrite_source, split_statements, statement_texts, swap_keywords};
pub use scope::{enclosing_function, is_inside_function, local_identifiers};

/// The namespace object every rewritten reference routes through.
pub const SHELL_NAMESPACE: &str = "tidepool";

/// The identifier whose member accesses denote collections.
pub const DOMAIN_ROOT: &str = "db";

/// Statement-leading tokens handled by the keyword dispatcher rather
/// than the interpreter.
pub const RESERVED_KEYWORDS: [&str; 4] = ["help", "it", "show", "use"];
