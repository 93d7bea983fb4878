//! Reserved keyword commands.
//!
//! Bare `help`, `show`, `it` and `use` lines are swapped by the
//! rewriter into `tidepool.keyword.evaluate(ID, 'kw', ...)` calls and
//! land here. The argument list mirrors the swapped form: shell id,
//! keyword, then up to three raw tokens from the input line.

use tidepool_eval::{EvalError, EvalResult, Value};
use tidepool_types::ShellId;

use crate::query::CursorState;
use crate::session::{SessionRef, ShellRegistry};

/// Entry point behind `tidepool.keyword.evaluate`.
pub(crate) fn evaluate(registry: &ShellRegistry, args: &[Value]) -> EvalResult<Value> {
    let id = match args.first() {
        Some(Value::Number(n)) => ShellId(*n as u32),
        _ => {
            return Err(EvalError::TypeError(
                "keyword evaluation requires a numeric shell id".to_string(),
            ))
        }
    };
    let session = registry
        .get(id)
        .ok_or_else(|| EvalError::Host(format!("unknown shell {id}")))?;
    let keyword = match args.get(1) {
        Some(Value::Str(keyword)) => keyword.clone(),
        _ => {
            return Err(EvalError::TypeError(
                "keyword evaluation requires a keyword string".to_string(),
            ))
        }
    };
    // A fifth argument means the input line carried a third token after
    // the keyword, which help and show reject.
    let extra_token = args.len() >= 5;
    match keyword.as_str() {
        "help" | "show" => {
            if extra_token {
                session.report(&format!("Too many parameters to {keyword}."));
                tracing::debug!(keyword = %keyword, "too many parameters");
            } else if keyword == "help" {
                help(&session);
            } else {
                show(&session);
            }
        }
        "it" => it(&session),
        "use" => use_db(&session),
        other => {
            session.report(&format!("Unknown keyword: {other}."));
            tracing::debug!(keyword = %other, "unknown keyword");
        }
    }
    Ok(Value::Undefined)
}

fn help(session: &SessionRef) {
    let lines = [
        "db.collection.find(query, projection)   query a collection",
        "db.collection.insert(document)          insert a document",
        "cursor.hasNext() / cursor.next()        walk query results",
        "it                                      print the next batch of results",
        "help                                    show this message",
    ];
    for line in lines {
        session.report(line);
    }
}

fn show(_session: &SessionRef) {
    tracing::debug!("show keyword is not implemented");
}

fn it(session: &SessionRef) {
    if let Some(cursor) = session.last_used_cursor() {
        if cursor.has_next() {
            CursorState::print_batch(&cursor);
            return;
        }
    }
    session.report("no cursor");
    tracing::debug!("it without a continuable cursor");
}

fn use_db(session: &SessionRef) {
    session.report("Cannot change db: functionality disabled.");
    tracing::debug!("use keyword rejected");
}
