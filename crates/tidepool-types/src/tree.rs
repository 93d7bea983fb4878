//! Rewritable syntax tree for submitted shell input.
//!
//! Nodes live in an arena owned by [`Tree`] and are addressed by
//! [`NodeId`]; there are no parent pointers to chase, only indices.
//! Every node carries the byte [`Span`] it was parsed from plus an
//! optional replacement text. Rendering splices the original source
//! around each child's current text, so a node that was never rewritten
//! reproduces its source bytes exactly, comments and whitespace included.
//!
//! The arena is filled children-first: a child's index is always smaller
//! than its parent's. Walking ids in ascending order is therefore a
//! bottom-up traversal, which is exactly the order the rewrite rules
//! need so that an ancestor reading a child's text sees the child's
//! replacement, not its original source.

use crate::Span;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────
// NodeId
// ─────────────────────────────────────────────────────────────────────

/// Index of a node in a [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The arena index of this node.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────

/// Binary arithmetic and comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// `==`
    Eq,
    /// `===`
    StrictEq,
    /// `!=`
    NotEq,
    /// `!==`
    StrictNotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

/// Short-circuiting logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

/// Assignment operators, plain and compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, `None` for
    /// plain `=`.
    pub fn compound(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::RemAssign => Some(BinaryOp::Rem),
        }
    }
}

/// `++` / `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

// ─────────────────────────────────────────────────────────────────────
// NodeKind
// ─────────────────────────────────────────────────────────────────────

/// The closed set of node kinds in the shell's input language.
///
/// Child layouts are fixed per kind and documented inline. Tokens that
/// never need rewriting or evaluation on their own (parentheses, commas,
/// `.`-access property names, object-literal keys, parameter lists) are
/// not nodes; they live in the source gaps between children and are
/// reproduced verbatim by rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Root of one submission; children are the top-level statements.
    Program,

    // ── Statements ──────────────────────────────────────────────

    /// Children: `[expr]`. The span includes a trailing `;` if present.
    ExpressionStmt,
    /// Children: one `VarDeclarator` per declared name.
    VarDecl,
    /// Children: `[ident]` or `[ident, init]`.
    VarDeclarator,
    /// `function name(params) { ... }`. Children: `[body]`.
    FunctionDecl { name: String, params: Vec<String> },
    /// Children: the contained statements.
    Block,
    /// Children: `[test, consequent]` or `[test, consequent, alternate]`.
    If,
    /// Classic three-clause loop. Children: the present clauses in
    /// `[init, test, update]` order, then the body.
    For {
        has_init: bool,
        has_test: bool,
        has_update: bool,
    },
    /// Children: `[test, body]`.
    While,
    /// Children: `[body, test]`.
    DoWhile,
    /// Children: `[]` or `[expr]`.
    Return,
    Break,
    Continue,
    /// A lone `;`.
    Empty,

    // ── Expressions ─────────────────────────────────────────────

    Ident(String),
    Number(f64),
    /// Cooked value, escapes resolved.
    Str(String),
    Bool(bool),
    Null,
    /// Children: the elements.
    Array,
    /// Children: `Property` nodes.
    Object,
    /// One `key: value` pair; the key text lives in the gap.
    /// Children: `[value]`.
    Property { key: String },
    /// `function (params) { ... }`, optionally named. Children: `[body]`.
    FunctionExpr {
        name: Option<String>,
        params: Vec<String>,
    },
    /// Member access. Dot access stores the property name here and has
    /// children `[object]`; computed access stores `None` and has
    /// children `[object, property]`.
    Member { property: Option<String> },
    /// Children: `[callee, args...]`.
    Call,
    /// `new callee(args)`. Children: `[callee, args...]`.
    New,
    /// Children: `[target, value]`.
    Assign(AssignOp),
    /// Children: `[left, right]`.
    Binary(BinaryOp),
    /// Children: `[left, right]`.
    Logical(LogicalOp),
    /// Children: `[operand]`.
    Unary(UnaryOp),
    /// Children: `[target]`.
    Update { op: UpdateOp, prefix: bool },
    /// `test ? consequent : alternate`. Children: `[test, consequent, alternate]`.
    Conditional,
    /// Comma expression. Children: the expressions in order.
    Sequence,
}

impl NodeKind {
    /// Returns `true` for the two function-introducing kinds, which are
    /// the scope boundaries of the input language.
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            NodeKind::FunctionDecl { .. } | NodeKind::FunctionExpr { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────────
// Node & Tree
// ─────────────────────────────────────────────────────────────────────

/// A single node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    /// Children in source order. Each child's span is a sub-range of
    /// this node's span, and sibling spans do not overlap.
    pub children: Vec<NodeId>,
    /// Replacement text set by a rewrite rule. When present it wins over
    /// splice-based rendering for this node and its whole subtree.
    replacement: Option<String>,
}

/// An arena syntax tree over one source string.
#[derive(Debug, Clone)]
pub struct Tree {
    source: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// The source text this tree was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The root node (always `Program`).
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// The kind of a node.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// The span of a node.
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    /// The parent of a node, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// The children of a node, in source order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena holds no nodes. Trees built through
    /// [`TreeBuilder`] always have at least the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in ascending order. Children precede parents, so
    /// this is a bottom-up traversal order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// The original source slice for a node, ignoring any replacement.
    pub fn span_text(&self, id: NodeId) -> &str {
        self.span(id).slice(&self.source)
    }

    /// Install replacement text for a node. Rendering of every ancestor
    /// picks it up; the node's own subtree is no longer consulted.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.index()].replacement = Some(text.into());
    }

    /// Returns `true` if a rewrite rule has replaced this node's text.
    pub fn is_rewritten(&self, id: NodeId) -> bool {
        self.nodes[id.index()].replacement.is_some()
    }

    /// The current text of a node: its replacement if set, otherwise its
    /// original source with each child's current text spliced in.
    pub fn text_of(&self, id: NodeId) -> String {
        let node = self.node(id);
        if let Some(replacement) = &node.replacement {
            return replacement.clone();
        }
        if node.children.is_empty() {
            return self.span_text(id).to_string();
        }
        let mut out = String::new();
        let mut cursor = node.span.start as usize;
        for &child in &node.children {
            let child_span = self.span(child);
            out.push_str(&self.source[cursor..child_span.start as usize]);
            out.push_str(&self.text_of(child));
            cursor = child_span.end as usize;
        }
        out.push_str(&self.source[cursor..node.span.end as usize]);
        out
    }

    /// Render the whole tree back to text.
    pub fn render(&self) -> String {
        self.text_of(self.root)
    }
}

// ─────────────────────────────────────────────────────────────────────
// TreeBuilder
// ─────────────────────────────────────────────────────────────────────

/// Incremental arena construction, used by the parser.
///
/// Nodes must be added children-first; `add` wires the parent link of
/// every child passed to it.
pub struct TreeBuilder {
    source: String,
    nodes: Vec<Node>,
}

impl TreeBuilder {
    /// Start building a tree over the given source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            nodes: Vec::new(),
        }
    }

    /// The kind of an already-added node. The parser uses this to
    /// validate assignment and update targets after building them.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// Add a node whose children have already been added. Returns its id.
    pub fn add(&mut self, kind: NodeKind, span: Span, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for &child in &children {
            debug_assert!(child.index() < id.index(), "children must be added first");
            debug_assert!(
                span.contains(self.nodes[child.index()].span),
                "child span must lie within parent span"
            );
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
            children,
            replacement: None,
        });
        id
    }

    /// Finish the tree with the given root node.
    pub fn build(self, root: NodeId) -> Tree {
        debug_assert_eq!(root.index(), self.nodes.len() - 1, "root must be added last");
        Tree {
            source: self.source,
            nodes: self.nodes,
            root,
        }
    }
}
