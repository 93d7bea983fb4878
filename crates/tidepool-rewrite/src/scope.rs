//! Scope analysis over the syntax tree.
//!
//! The input language is function-scoped: only function declarations and
//! function expressions introduce scopes. An identifier is "local" when
//! any enclosing function binds it, whether as the function's own name,
//! a parameter, or a `var` declared directly in the body block. Local
//! identifiers stay untouched by the rewrite; everything else is free
//! and gets namespaced.

use std::collections::BTreeSet;

use tidepool_types::{NodeId, NodeKind, Tree};

/// The function node enclosing `id`, if any. Walks from the parent, so
/// a function node is not its own enclosure.
pub fn enclosing_function(tree: &Tree, id: NodeId) -> Option<NodeId> {
    let mut current = tree.parent(id);
    while let Some(node) = current {
        if tree.kind(node).is_function() {
            return Some(node);
        }
        current = tree.parent(node);
    }
    None
}

/// Returns `true` if `id` sits anywhere inside a function body.
pub fn is_inside_function(tree: &Tree, id: NodeId) -> bool {
    enclosing_function(tree, id).is_some()
}

/// Every identifier bound locally around `id`.
///
/// For each enclosing function, from innermost outward: the function's
/// own name (when it has one), its parameters, and the names declared
/// by `var` statements directly in its body block. `var`s in nested
/// blocks do not contribute; only membership matters, so shadowing
/// order is irrelevant.
pub fn local_identifiers(tree: &Tree, id: NodeId) -> BTreeSet<String> {
    let mut identifiers = BTreeSet::new();
    let mut function = enclosing_function(tree, id);
    while let Some(node) = function {
        match tree.kind(node) {
            NodeKind::FunctionDecl { name, params } => {
                identifiers.insert(name.clone());
                identifiers.extend(params.iter().cloned());
            }
            NodeKind::FunctionExpr { name, params } => {
                if let Some(name) = name {
                    identifiers.insert(name.clone());
                }
                identifiers.extend(params.iter().cloned());
            }
            _ => {}
        }
        collect_body_vars(tree, node, &mut identifiers);
        function = enclosing_function(tree, node);
    }
    identifiers
}

/// Names declared by `var` statements directly in a function's body.
fn collect_body_vars(tree: &Tree, function: NodeId, identifiers: &mut BTreeSet<String>) {
    let body = match tree.children(function).first() {
        Some(&body) if matches!(tree.kind(body), NodeKind::Block) => body,
        _ => return,
    };
    for &stmt in tree.children(body) {
        if !matches!(tree.kind(stmt), NodeKind::VarDecl) {
            continue;
        }
        for &declarator in tree.children(stmt) {
            if let Some(&ident) = tree.children(declarator).first() {
                if let NodeKind::Ident(name) = tree.kind(ident) {
                    identifiers.insert(name.clone());
                }
            }
        }
    }
}
