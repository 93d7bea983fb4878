//! The per-node rewrite rules.
//!
//! Each rule inspects one node and either leaves it alone or installs a
//! replacement text. The driver visits nodes in ascending id order,
//! which is bottom-up, so by the time a rule reads a child's text every
//! rewrite beneath it has already landed. An ancestor's replacement
//! supersedes anything set on its descendants.

use tidepool_types::{NodeId, NodeKind, ShellId, Tree};

use crate::{scope, DOMAIN_ROOT, SHELL_NAMESPACE};

/// The per-session variable namespace, e.g. `tidepool.shells[3].vars`.
fn vars_prefix(shell_id: ShellId) -> String {
    format!("{SHELL_NAMESPACE}.shells[{shell_id}].vars")
}

/// Rewrite a top-level function declaration into an assignment of a
/// function expression, so the name lands in the session's `vars`
/// object instead of the interpreter globals.
///
/// `function inc(x) { ... }` becomes
/// `tidepool.shells[ID].vars.inc = function (x) { ... }`.
///
/// Declarations inside a function stay as they are: they bind into
/// that function's scope, which is already session-private.
pub(crate) fn rewrite_function_declaration(tree: &mut Tree, id: NodeId, shell_id: ShellId) {
    if scope::is_inside_function(tree, id) {
        return;
    }
    let (name, params) = match tree.kind(id) {
        NodeKind::FunctionDecl { name, params } => (name.clone(), params.join(", ")),
        _ => return,
    };
    let body = match tree.children(id).first() {
        Some(&body) => body,
        None => return,
    };
    let body_text = tree.text_of(body);
    let replacement = format!(
        "{}.{name} = function ({params}) {body_text}",
        vars_prefix(shell_id)
    );
    tree.set_text(id, replacement);
}

/// Namespace a free identifier: `x` becomes
/// `tidepool.shells[ID].vars.x`.
///
/// Skipped when the identifier is locally bound (§scope) or is the
/// receiver of the keyword dispatcher call injected by the keyword
/// pass. Property names, object keys, and function names/parameters
/// are not identifier nodes at all, so they never reach this rule.
pub(crate) fn rewrite_identifier(tree: &mut Tree, id: NodeId, shell_id: ShellId) {
    let name = match tree.kind(id) {
        NodeKind::Ident(name) => name.clone(),
        _ => return,
    };
    if scope::local_identifiers(tree, id).contains(&name) {
        return;
    }
    if is_dispatch_receiver(tree, id) {
        return;
    }
    tree.set_text(id, format!("{}.{name}", vars_prefix(shell_id)));
}

/// Returns `true` when `id` is the receiver of
/// `X.keyword.evaluate(...)`. The keyword pass injects that call before
/// the tree pass runs, so during the walk it looks like ordinary user
/// input; reserving the receiver keeps the dispatcher reachable.
fn is_dispatch_receiver(tree: &Tree, id: NodeId) -> bool {
    let parent = match tree.parent(id) {
        Some(parent) => parent,
        None => return false,
    };
    let keyword_member = matches!(
        tree.kind(parent),
        NodeKind::Member { property: Some(prop) } if prop == "keyword"
    );
    if !keyword_member {
        return false;
    }
    let grandparent = match tree.parent(parent) {
        Some(grandparent) => grandparent,
        None => return false,
    };
    let evaluate_member = matches!(
        tree.kind(grandparent),
        NodeKind::Member { property: Some(prop) } if prop == "evaluate"
    );
    if !evaluate_member {
        return false;
    }
    match tree.parent(grandparent) {
        Some(great) => matches!(tree.kind(great), NodeKind::Call),
        None => false,
    }
}

/// Rewrite `db.<collection>` into a query construction:
/// `new tidepool.Query(tidepool.shells[ID], "collection")`.
///
/// Applies only when the object side is exactly the bare identifier
/// `db`. A dot-access property names the collection literally and is
/// quoted; a computed property contributes its current (possibly
/// rewritten) text verbatim. The identifier rule has usually renamed
/// the `db` child by now; this whole-node replacement supersedes it.
pub(crate) fn rewrite_member_access(tree: &mut Tree, id: NodeId, shell_id: ShellId) {
    let property = match tree.kind(id) {
        NodeKind::Member { property } => property.clone(),
        _ => return,
    };
    let children = tree.children(id).to_vec();
    let object = match children.first() {
        Some(&object) => object,
        None => return,
    };
    match tree.kind(object) {
        NodeKind::Ident(name) if name == DOMAIN_ROOT => {}
        _ => return,
    }

    let collection_arg = match property {
        Some(name) => format!("\"{name}\""),
        None => match children.get(1) {
            Some(&prop) => tree.text_of(prop),
            None => return,
        },
    };

    let old = tree.span_text(id).to_string();
    let replacement = format!(
        "new {SHELL_NAMESPACE}.Query({SHELL_NAMESPACE}.shells[{shell_id}], {collection_arg})"
    );
    tracing::debug!("member access '{}' rewritten to '{}'", old, replacement);
    tree.set_text(id, replacement);
}

/// Rewrite a top-level `var` declaration into an IIFE of plain
/// assignments.
///
/// `var a = 1, b;` becomes `(function () { <a's text> = 1; }()); `.
/// The declarator left-hand sides were already namespaced by the
/// identifier rule, so the assignments land in the session's `vars`
/// object, and the wrapper yields Undefined just as a `var` statement
/// would. Declarators without initializers contribute nothing. A
/// declaration in a `for` header keeps its own statement separator,
/// so no `"; "` is appended there.
///
/// Declarations inside functions are untouched: they must keep their
/// binding form for the function's scope to work.
pub(crate) fn rewrite_var_declaration(tree: &mut Tree, id: NodeId) {
    if scope::is_inside_function(tree, id) {
        return;
    }
    let declarators = tree.children(id).to_vec();
    let assignments: Vec<String> = declarators
        .iter()
        .map(|&declarator| {
            if tree.children(declarator).len() < 2 {
                String::new()
            } else {
                format!("{};", tree.text_of(declarator))
            }
        })
        .collect();

    let mut replacement = format!("(function () {{ {} }}())", assignments.join(" "));
    let in_for_header = match tree.parent(id) {
        Some(parent) => matches!(tree.kind(parent), NodeKind::For { .. }),
        None => false,
    };
    if !in_for_header {
        replacement.push_str("; ");
    }
    tree.set_text(id, replacement);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidepool_parser::parse_source;

    fn shell() -> ShellId {
        ShellId(7)
    }

    fn rewrite(source: &str) -> String {
        let mut tree = parse_source(source).unwrap();
        crate::apply_rules(&mut tree, shell());
        tree.render()
    }

    #[test]
    fn test_free_identifier_is_namespaced() {
        assert_eq!(rewrite("x"), "tidepool.shells[7].vars.x");
    }

    #[test]
    fn test_dot_property_name_untouched() {
        assert_eq!(
            rewrite("x.length"),
            "tidepool.shells[7].vars.x.length"
        );
    }

    #[test]
    fn test_object_key_untouched_value_rewritten() {
        assert_eq!(
            rewrite("({age: age})"),
            "({age: tidepool.shells[7].vars.age})"
        );
    }

    #[test]
    fn test_dispatch_receiver_reserved() {
        let source = "tidepool.keyword.evaluate(7, 'help')";
        assert_eq!(rewrite(source), source);
    }

    #[test]
    fn test_dispatch_shape_without_call_is_not_reserved() {
        assert_eq!(
            rewrite("tidepool.keyword.evaluate"),
            "tidepool.shells[7].vars.tidepool.keyword.evaluate"
        );
    }

    #[test]
    fn test_member_rule_quotes_plain_collection() {
        assert_eq!(
            rewrite("db.users"),
            "new tidepool.Query(tidepool.shells[7], \"users\")"
        );
    }

    #[test]
    fn test_member_rule_computed_string() {
        assert_eq!(
            rewrite("db['users']"),
            "new tidepool.Query(tidepool.shells[7], 'users')"
        );
    }

    #[test]
    fn test_member_rule_computed_identifier_is_namespaced() {
        assert_eq!(
            rewrite("db[name]"),
            "new tidepool.Query(tidepool.shells[7], tidepool.shells[7].vars.name)"
        );
    }

    #[test]
    fn test_top_level_var_becomes_iife() {
        assert_eq!(
            rewrite("var x = 5;"),
            "(function () { tidepool.shells[7].vars.x = 5; }()); "
        );
    }

    #[test]
    fn test_var_without_initializer_contributes_nothing() {
        assert_eq!(rewrite("var x;"), "(function () {  }()); ");
    }

    #[test]
    fn test_function_declaration_becomes_assignment() {
        assert_eq!(
            rewrite("function inc(x) { return x + 1; }"),
            "tidepool.shells[7].vars.inc = function (x) { return x + 1; }"
        );
    }

    #[test]
    fn test_local_identifiers_survive() {
        assert_eq!(
            rewrite("function f(a) { var b = a; return b; }"),
            "tidepool.shells[7].vars.f = function (a) { var b = a; return b; }"
        );
    }
}
