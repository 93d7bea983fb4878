//! The two-pass source mutator and statement splitting.

use tidepool_parser::parse_source;
use tidepool_types::{NodeKind, Result, ShellId, Tree};

use crate::{rules, RESERVED_KEYWORDS, SHELL_NAMESPACE};

/// Rewrite one raw submission for the given session: keyword pass, then
/// tree pass. The returned text is ordinary source, ready to evaluate.
///
/// A lex or parse failure of the keyword-swapped text surfaces here;
/// the caller reports it and skips evaluation.
pub fn rewrite_source(source: &str, shell_id: ShellId) -> Result<String> {
    let swapped = swap_keywords(source, shell_id);
    let mut tree = parse_source(&swapped)?;
    apply_rules(&mut tree, shell_id);
    let rewritten = tree.render();
    tracing::debug!(shell = %shell_id, "rewrote submission to '{}'", rewritten);
    Ok(rewritten)
}

/// Apply the rewrite rules to every node, in ascending id order. Ids
/// ascend children-first, so this is the bottom-up walk the rules
/// require.
pub fn apply_rules(tree: &mut Tree, shell_id: ShellId) {
    let ids: Vec<_> = tree.ids().collect();
    for id in ids {
        match tree.kind(id) {
            NodeKind::FunctionDecl { .. } => {
                rules::rewrite_function_declaration(tree, id, shell_id);
            }
            NodeKind::Ident(_) => rules::rewrite_identifier(tree, id, shell_id),
            NodeKind::Member { .. } => rules::rewrite_member_access(tree, id, shell_id),
            NodeKind::VarDecl => rules::rewrite_var_declaration(tree, id),
            _ => {}
        }
    }
}

/// Divert reserved-keyword statements to the dispatcher.
///
/// The raw text is split on `;`, with whitespace around each `;`
/// belonging to the separator. A piece whose first whitespace-delimited
/// token is exactly one of [`RESERVED_KEYWORDS`] becomes a
/// `tidepool.keyword.evaluate(ID, ...)` call carrying every token as a
/// quoted argument; other pieces pass through. Pieces are rejoined with
/// `"; "`.
///
/// This runs before parsing because keyword statements (`show
/// collections`) are not expression syntax.
pub fn swap_keywords(source: &str, shell_id: ShellId) -> String {
    let pieces: Vec<&str> = source.split(';').collect();
    let last = pieces.len() - 1;
    let swapped: Vec<String> = pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            let mut text: &str = piece;
            if i > 0 {
                text = text.trim_start();
            }
            if i < last {
                text = text.trim_end();
            }
            let tokens: Vec<&str> = text.split_whitespace().collect();
            match tokens.first() {
                Some(first) if RESERVED_KEYWORDS.contains(first) => {
                    keyword_call(shell_id, &tokens)
                }
                _ => text.to_string(),
            }
        })
        .collect();
    swapped.join("; ")
}

/// Build the dispatcher call for one keyword statement: every token
/// becomes a single-quoted string argument after the shell id.
fn keyword_call(shell_id: ShellId, tokens: &[&str]) -> String {
    let mut args = vec![shell_id.to_string()];
    args.extend(
        tokens
            .iter()
            .map(|token| format!("'{}'", escape_single_quoted(token))),
    );
    format!("{SHELL_NAMESPACE}.keyword.evaluate({})", args.join(", "))
}

/// Escape a token for inclusion in a single-quoted string literal.
fn escape_single_quoted(token: &str) -> String {
    token.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Top-level statement texts of a source string, in order. The
/// evaluation pipeline uses these to attribute a fault to the statement
/// that raised it.
pub fn split_statements(source: &str) -> Result<Vec<String>> {
    let tree = parse_source(source)?;
    Ok(statement_texts(&tree))
}

/// Top-level statement texts of an already-parsed tree.
pub fn statement_texts(tree: &Tree) -> Vec<String> {
    tree.children(tree.root())
        .iter()
        .map(|&stmt| tree.span_text(stmt).to_string())
        .collect()
}
