//! Core statement and expression evaluator.
//!
//! The evaluator walks a parsed [`Tree`] and produces [`Value`]s. It is
//! built for rewritten shell submissions: one long-lived global scope
//! per session, function values that keep their defining tree alive
//! across submissions, and every host touchpoint behind the
//! [`NativeObject`](crate::NativeObject) trait. A gas counter bounds
//! total steps and a depth counter bounds call nesting, so hostile
//! input cannot hang or crash the host.

use std::collections::BTreeMap;
use std::rc::Rc;

use tidepool_types::{AssignOp, BinaryOp, LogicalOp, NodeId, NodeKind, Tree, UnaryOp, UpdateOp};

use crate::env::{EnvRef, Environment};
use crate::error::{EvalError, EvalResult};
use crate::value::{FunctionValue, Value};

/// Step budget for one submission unless the host configures its own.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// Call nesting cap. Each interpreted call recurses on the host stack,
/// so this stays well below the host's own limit.
pub const MAX_CALL_DEPTH: usize = 64;

/// Dense array storage cap; writes addressing slots past this are
/// rejected instead of allocating.
const MAX_ARRAY_LEN: usize = 1 << 20;

/// The core evaluator. One instance lives per shell session and keeps
/// the session's global scope across submissions.
pub struct Evaluator {
    globals: EnvRef,
    gas: u64,
    gas_limit: u64,
    call_depth: usize,
}

impl Evaluator {
    /// Create an evaluator with the given gas limit and an empty
    /// global scope.
    pub fn new(gas_limit: u64) -> Self {
        Self {
            globals: Environment::root(),
            gas: 0,
            gas_limit,
            call_depth: 0,
        }
    }

    /// Shared handle to the global scope.
    pub fn globals(&self) -> EnvRef {
        self.globals.clone()
    }

    /// Bind a name in the global scope. The host uses this to graft
    /// its namespace root in before the first submission.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().define(name, value);
    }

    /// Restart the step budget. The host calls this once per
    /// submission so one runaway loop cannot starve the next input.
    pub fn reset_gas(&mut self) {
        self.gas = 0;
    }

    /// Steps consumed since the last reset.
    pub fn gas_used(&self) -> u64 {
        self.gas
    }

    /// Consume one unit of gas. Returns an error if exhausted.
    fn tick(&mut self) -> EvalResult<()> {
        self.gas += 1;
        if self.gas > self.gas_limit {
            Err(EvalError::GasExhausted)
        } else {
            Ok(())
        }
    }

    // ══════════════════════════════════════════════════════════════════
    // Statement evaluation
    // ══════════════════════════════════════════════════════════════════

    /// Evaluate every statement of a program in the global scope and
    /// return the last statement's value.
    pub fn eval_program(&mut self, tree: &Rc<Tree>) -> EvalResult<Value> {
        self.eval_statement(tree, tree.root())
    }

    /// Evaluate one statement in the global scope.
    pub fn eval_statement(&mut self, tree: &Rc<Tree>, stmt: NodeId) -> EvalResult<Value> {
        let env = self.globals.clone();
        self.eval_stmt_in(tree, stmt, &env)
    }

    /// Evaluate a statement in a given scope. Expression statements
    /// yield their expression's value; every other statement kind
    /// yields Undefined.
    fn eval_stmt_in(&mut self, tree: &Rc<Tree>, id: NodeId, env: &EnvRef) -> EvalResult<Value> {
        self.tick()?;
        match tree.kind(id) {
            NodeKind::Program => {
                let mut last = Value::Undefined;
                for &stmt in tree.children(id) {
                    last = self.eval_stmt_in(tree, stmt, env)?;
                }
                Ok(last)
            }
            NodeKind::ExpressionStmt => self.eval_expr_in(tree, tree.children(id)[0], env),
            NodeKind::VarDecl => self.eval_var_decl(tree, id, env),
            NodeKind::FunctionDecl { name, params } => {
                let function = self.make_function(tree, id, Some(name.clone()), params.clone(), env);
                env.borrow_mut().define(name, function);
                Ok(Value::Undefined)
            }
            // Blocks do not open a scope: `var` is function-scoped in
            // the input language.
            NodeKind::Block => {
                for &stmt in tree.children(id) {
                    self.eval_stmt_in(tree, stmt, env)?;
                }
                Ok(Value::Undefined)
            }
            NodeKind::If => {
                let children = tree.children(id);
                if self.eval_expr_in(tree, children[0], env)?.is_truthy() {
                    self.eval_stmt_in(tree, children[1], env)?;
                } else if let Some(&alternate) = children.get(2) {
                    self.eval_stmt_in(tree, alternate, env)?;
                }
                Ok(Value::Undefined)
            }
            NodeKind::While => {
                let children = tree.children(id);
                loop {
                    if !self.eval_expr_in(tree, children[0], env)?.is_truthy() {
                        break;
                    }
                    match self.eval_stmt_in(tree, children[1], env) {
                        Ok(_) | Err(EvalError::Continue) => {}
                        Err(EvalError::Break) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(Value::Undefined)
            }
            NodeKind::DoWhile => {
                let children = tree.children(id);
                loop {
                    match self.eval_stmt_in(tree, children[0], env) {
                        Ok(_) | Err(EvalError::Continue) => {}
                        Err(EvalError::Break) => break,
                        Err(other) => return Err(other),
                    }
                    if !self.eval_expr_in(tree, children[1], env)?.is_truthy() {
                        break;
                    }
                }
                Ok(Value::Undefined)
            }
            NodeKind::For {
                has_init,
                has_test,
                has_update,
            } => self.eval_for(tree, id, *has_init, *has_test, *has_update, env),
            NodeKind::Return => {
                let value = match tree.children(id).first() {
                    Some(&expr) => self.eval_expr_in(tree, expr, env)?,
                    None => Value::Undefined,
                };
                Err(EvalError::Return(value))
            }
            NodeKind::Break => Err(EvalError::Break),
            NodeKind::Continue => Err(EvalError::Continue),
            NodeKind::Empty => Ok(Value::Undefined),
            // Anything else is an expression used in statement position.
            _ => self.eval_expr_in(tree, id, env),
        }
    }

    fn eval_var_decl(&mut self, tree: &Rc<Tree>, id: NodeId, env: &EnvRef) -> EvalResult<Value> {
        for &declarator in tree.children(id) {
            let parts = tree.children(declarator);
            let name = match tree.kind(parts[0]) {
                NodeKind::Ident(name) => name.clone(),
                _ => return Err(EvalError::TypeError("malformed declaration".to_string())),
            };
            let value = match parts.get(1) {
                Some(&init) => self.eval_expr_in(tree, init, env)?,
                None => Value::Undefined,
            };
            env.borrow_mut().define(&name, value);
        }
        Ok(Value::Undefined)
    }

    fn eval_for(
        &mut self,
        tree: &Rc<Tree>,
        id: NodeId,
        has_init: bool,
        has_test: bool,
        has_update: bool,
        env: &EnvRef,
    ) -> EvalResult<Value> {
        let children = tree.children(id);
        let mut next = 0;
        let mut clause = |present: bool| {
            if present {
                let child = children[next];
                next += 1;
                Some(child)
            } else {
                None
            }
        };
        let init = clause(has_init);
        let test = clause(has_test);
        let update = clause(has_update);
        let body = children[next];

        if let Some(init) = init {
            // The init clause is either a declaration or an expression.
            self.eval_stmt_in(tree, init, env)?;
        }
        loop {
            if let Some(test) = test {
                if !self.eval_expr_in(tree, test, env)?.is_truthy() {
                    break;
                }
            }
            match self.eval_stmt_in(tree, body, env) {
                Ok(_) | Err(EvalError::Continue) => {}
                Err(EvalError::Break) => break,
                Err(other) => return Err(other),
            }
            if let Some(update) = update {
                self.eval_expr_in(tree, update, env)?;
            }
        }
        Ok(Value::Undefined)
    }

    // ══════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════

    /// Evaluate an expression in a given scope.
    fn eval_expr_in(&mut self, tree: &Rc<Tree>, id: NodeId, env: &EnvRef) -> EvalResult<Value> {
        self.tick()?;
        match tree.kind(id) {
            NodeKind::Number(n) => Ok(Value::Number(*n)),
            NodeKind::Str(s) => Ok(Value::Str(s.clone())),
            NodeKind::Bool(b) => Ok(Value::Bool(*b)),
            NodeKind::Null => Ok(Value::Null),
            NodeKind::Ident(name) => env
                .borrow()
                .get(name)
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),

            NodeKind::Array => {
                let mut elements = Vec::with_capacity(tree.children(id).len());
                for &element in tree.children(id) {
                    elements.push(self.eval_expr_in(tree, element, env)?);
                }
                Ok(Value::array(elements))
            }
            NodeKind::Object => self.eval_object(tree, id, env),
            NodeKind::FunctionExpr { name, params } => {
                Ok(self.make_function(tree, id, name.clone(), params.clone(), env))
            }

            NodeKind::Member { .. } => {
                let (object, key) = self.eval_member_parts(tree, id, env)?;
                self.read_member(&object, &key)
            }
            NodeKind::Call => self.eval_call(tree, id, env),
            NodeKind::New => self.eval_new(tree, id, env),

            NodeKind::Assign(op) => self.eval_assign(tree, id, *op, env),
            NodeKind::Binary(op) => {
                let children = tree.children(id);
                let left = self.eval_expr_in(tree, children[0], env)?;
                let right = self.eval_expr_in(tree, children[1], env)?;
                Ok(apply_binary(*op, &left, &right))
            }
            NodeKind::Logical(op) => {
                let children = tree.children(id);
                let left = self.eval_expr_in(tree, children[0], env)?;
                match op {
                    LogicalOp::And if !left.is_truthy() => Ok(left),
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    _ => self.eval_expr_in(tree, children[1], env),
                }
            }
            NodeKind::Unary(op) => self.eval_unary(tree, id, *op, env),
            NodeKind::Update { op, prefix } => self.eval_update(tree, id, *op, *prefix, env),
            NodeKind::Conditional => {
                let children = tree.children(id);
                if self.eval_expr_in(tree, children[0], env)?.is_truthy() {
                    self.eval_expr_in(tree, children[1], env)
                } else {
                    self.eval_expr_in(tree, children[2], env)
                }
            }
            NodeKind::Sequence => {
                let mut last = Value::Undefined;
                for &expr in tree.children(id) {
                    last = self.eval_expr_in(tree, expr, env)?;
                }
                Ok(last)
            }

            _ => Err(EvalError::TypeError(format!(
                "cannot evaluate '{}' as an expression",
                tree.span_text(id)
            ))),
        }
    }

    fn eval_object(&mut self, tree: &Rc<Tree>, id: NodeId, env: &EnvRef) -> EvalResult<Value> {
        let mut fields = BTreeMap::new();
        for &property in tree.children(id) {
            if let NodeKind::Property { key } = tree.kind(property) {
                let key = key.clone();
                let value = self.eval_expr_in(tree, tree.children(property)[0], env)?;
                fields.insert(key, value);
            }
        }
        Ok(Value::object(fields))
    }

    fn eval_unary(
        &mut self,
        tree: &Rc<Tree>,
        id: NodeId,
        op: UnaryOp,
        env: &EnvRef,
    ) -> EvalResult<Value> {
        let operand_id = tree.children(id)[0];
        // `typeof` on a bare unbound name answers instead of throwing.
        if op == UnaryOp::TypeOf {
            if let NodeKind::Ident(name) = tree.kind(operand_id) {
                let answer = match env.borrow().get(name) {
                    Some(value) => value.type_of(),
                    None => "undefined",
                };
                return Ok(Value::Str(answer.to_string()));
            }
        }
        let operand = self.eval_expr_in(tree, operand_id, env)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!operand.is_truthy()),
            UnaryOp::Neg => Value::Number(-operand.to_number()),
            UnaryOp::Plus => Value::Number(operand.to_number()),
            UnaryOp::TypeOf => Value::Str(operand.type_of().to_string()),
        })
    }

    // ── Assignment and updates ────────────────────────────────────────

    fn eval_assign(
        &mut self,
        tree: &Rc<Tree>,
        id: NodeId,
        op: AssignOp,
        env: &EnvRef,
    ) -> EvalResult<Value> {
        let children = tree.children(id);
        let target = children[0];
        let rhs = children[1];
        match tree.kind(target) {
            NodeKind::Ident(name) => {
                let name = name.clone();
                let value = match op.compound() {
                    None => self.eval_expr_in(tree, rhs, env)?,
                    Some(binary) => {
                        let current = env
                            .borrow()
                            .get(&name)
                            .ok_or_else(|| EvalError::UndefinedVariable(name.clone()))?;
                        let operand = self.eval_expr_in(tree, rhs, env)?;
                        apply_binary(binary, &current, &operand)
                    }
                };
                self.assign_name(&name, value.clone(), env);
                Ok(value)
            }
            NodeKind::Member { .. } => {
                let (object, key) = self.eval_member_parts(tree, target, env)?;
                let value = match op.compound() {
                    None => self.eval_expr_in(tree, rhs, env)?,
                    Some(binary) => {
                        let current = self.read_member(&object, &key)?;
                        let operand = self.eval_expr_in(tree, rhs, env)?;
                        apply_binary(binary, &current, &operand)
                    }
                };
                self.write_member(&object, &key, value.clone())?;
                Ok(value)
            }
            _ => Err(EvalError::TypeError("invalid assignment target".to_string())),
        }
    }

    fn eval_update(
        &mut self,
        tree: &Rc<Tree>,
        id: NodeId,
        op: UpdateOp,
        prefix: bool,
        env: &EnvRef,
    ) -> EvalResult<Value> {
        let target = tree.children(id)[0];
        let delta = match op {
            UpdateOp::Increment => 1.0,
            UpdateOp::Decrement => -1.0,
        };
        let (old, new) = match tree.kind(target) {
            NodeKind::Ident(name) => {
                let name = name.clone();
                let current = env
                    .borrow()
                    .get(&name)
                    .ok_or_else(|| EvalError::UndefinedVariable(name.clone()))?;
                let old = current.to_number();
                self.assign_name(&name, Value::Number(old + delta), env);
                (old, old + delta)
            }
            NodeKind::Member { .. } => {
                let (object, key) = self.eval_member_parts(tree, target, env)?;
                let old = self.read_member(&object, &key)?.to_number();
                self.write_member(&object, &key, Value::Number(old + delta))?;
                (old, old + delta)
            }
            _ => return Err(EvalError::TypeError("invalid update target".to_string())),
        };
        Ok(Value::Number(if prefix { new } else { old }))
    }

    /// Write through the nearest binding of `name`, falling back to a
    /// fresh global the way sloppy-mode assignment does.
    fn assign_name(&mut self, name: &str, value: Value, env: &EnvRef) {
        if !env.borrow_mut().set(name, value.clone()) {
            self.globals.borrow_mut().define(name, value);
        }
    }

    // ── Member access ─────────────────────────────────────────────────

    /// Evaluate a member expression's object and property key. The key
    /// is the stored name for dot access, or the stringified computed
    /// expression for bracket access.
    fn eval_member_parts(
        &mut self,
        tree: &Rc<Tree>,
        id: NodeId,
        env: &EnvRef,
    ) -> EvalResult<(Value, String)> {
        let object = self.eval_expr_in(tree, tree.children(id)[0], env)?;
        let key = match tree.kind(id) {
            NodeKind::Member {
                property: Some(name),
            } => name.clone(),
            _ => self
                .eval_expr_in(tree, tree.children(id)[1], env)?
                .to_string(),
        };
        Ok((object, key))
    }

    fn read_member(&self, object: &Value, key: &str) -> EvalResult<Value> {
        match object {
            Value::Object(fields) => {
                Ok(fields.borrow().get(key).cloned().unwrap_or(Value::Undefined))
            }
            Value::Array(elements) => {
                if key == "length" {
                    return Ok(Value::Number(elements.borrow().len() as f64));
                }
                Ok(match array_index(key) {
                    Some(index) => elements.borrow().get(index).cloned().unwrap_or(Value::Undefined),
                    None => Value::Undefined,
                })
            }
            Value::Str(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                Ok(match array_index(key) {
                    Some(index) => s
                        .chars()
                        .nth(index)
                        .map(|c| Value::Str(c.to_string()))
                        .unwrap_or(Value::Undefined),
                    None => Value::Undefined,
                })
            }
            Value::Native(native) => Ok(native.get(key)),
            Value::Undefined | Value::Null => Err(EvalError::TypeError(format!(
                "cannot read property '{key}' of {}",
                object.type_name()
            ))),
            _ => Ok(Value::Undefined),
        }
    }

    fn write_member(&self, object: &Value, key: &str, value: Value) -> EvalResult<()> {
        match object {
            Value::Object(fields) => {
                fields.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
            Value::Array(elements) => {
                if key == "length" {
                    let n = value.to_number();
                    if n.fract() != 0.0 || !(0.0..=MAX_ARRAY_LEN as f64).contains(&n) {
                        return Err(EvalError::TypeError("invalid array length".to_string()));
                    }
                    elements.borrow_mut().resize(n as usize, Value::Undefined);
                    return Ok(());
                }
                if let Some(index) = array_index(key) {
                    if index >= MAX_ARRAY_LEN {
                        return Err(EvalError::TypeError(format!(
                            "array index {index} is out of range"
                        )));
                    }
                    let mut elements = elements.borrow_mut();
                    if index >= elements.len() {
                        elements.resize(index + 1, Value::Undefined);
                    }
                    elements[index] = value;
                }
                Ok(())
            }
            Value::Native(native) => native.set(key, value),
            Value::Undefined | Value::Null => Err(EvalError::TypeError(format!(
                "cannot set property '{key}' of {}",
                object.type_name()
            ))),
            // Writes onto other primitives vanish.
            _ => Ok(()),
        }
    }

    // ── Calls ─────────────────────────────────────────────────────────

    fn eval_call(&mut self, tree: &Rc<Tree>, id: NodeId, env: &EnvRef) -> EvalResult<Value> {
        let children = tree.children(id);
        let callee = children[0];
        if matches!(tree.kind(callee), NodeKind::Member { .. }) {
            let (receiver, method) = self.eval_member_parts(tree, callee, env)?;
            let args = self.eval_args(tree, &children[1..], env)?;
            return self.call_member(tree, callee, &receiver, &method, args);
        }
        let function = self.eval_expr_in(tree, callee, env)?;
        let args = self.eval_args(tree, &children[1..], env)?;
        match function {
            Value::Function(function) => self.call_function(&function, args),
            _ => Err(EvalError::TypeError(format!(
                "{} is not a function",
                tree.span_text(callee)
            ))),
        }
    }

    fn call_member(
        &mut self,
        tree: &Rc<Tree>,
        callee: NodeId,
        receiver: &Value,
        method: &str,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        if let Value::Native(native) = receiver {
            return native.call_method(method, &args);
        }
        match self.read_member(receiver, method)? {
            Value::Function(function) => self.call_function(&function, args),
            _ => Err(EvalError::TypeError(format!(
                "{} is not a function",
                tree.span_text(callee)
            ))),
        }
    }

    fn eval_new(&mut self, tree: &Rc<Tree>, id: NodeId, env: &EnvRef) -> EvalResult<Value> {
        let children = tree.children(id);
        let callee = self.eval_expr_in(tree, children[0], env)?;
        let args = self.eval_args(tree, &children[1..], env)?;
        match callee {
            Value::Native(native) => native.construct(&args),
            _ => Err(EvalError::TypeError(format!(
                "{} is not a constructor",
                tree.span_text(children[0])
            ))),
        }
    }

    fn eval_args(
        &mut self,
        tree: &Rc<Tree>,
        args: &[NodeId],
        env: &EnvRef,
    ) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for &arg in args {
            values.push(self.eval_expr_in(tree, arg, env)?);
        }
        Ok(values)
    }

    /// Invoke a user-defined function. The call scope is a child of
    /// the captured definition scope; a named function sees itself
    /// under its own name, which is what makes recursion work for
    /// named function expressions.
    pub fn call_function(
        &mut self,
        function: &Rc<FunctionValue>,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(EvalError::StackOverflow);
        }
        let env = Environment::child(&function.env);
        {
            let mut scope = env.borrow_mut();
            if let Some(name) = &function.name {
                scope.define(name, Value::Function(function.clone()));
            }
            for (i, param) in function.params.iter().enumerate() {
                scope.define(param, args.get(i).cloned().unwrap_or(Value::Undefined));
            }
        }
        self.call_depth += 1;
        let result = self.eval_stmt_in(&function.tree, function.body, &env);
        self.call_depth -= 1;
        match result {
            Ok(_) => Ok(Value::Undefined),
            Err(EvalError::Return(value)) => Ok(value),
            Err(other) => Err(other),
        }
    }

    fn make_function(
        &self,
        tree: &Rc<Tree>,
        node: NodeId,
        name: Option<String>,
        params: Vec<String>,
        env: &EnvRef,
    ) -> Value {
        Value::Function(Rc::new(FunctionValue {
            name,
            params,
            body: tree.children(node)[0],
            node,
            tree: tree.clone(),
            env: env.clone(),
        }))
    }
}

// ══════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    use std::cmp::Ordering;
    match op {
        BinaryOp::Add => binary_add(left, right),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(loose_equals(left, right)),
        BinaryOp::NotEq => Value::Bool(!loose_equals(left, right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Less => Value::Bool(relational(left, right) == Some(Ordering::Less)),
        BinaryOp::LessEq => Value::Bool(matches!(
            relational(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Greater => Value::Bool(relational(left, right) == Some(Ordering::Greater)),
        BinaryOp::GreaterEq => Value::Bool(matches!(
            relational(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
    }
}

/// `+` is string concatenation as soon as either primitive side is a
/// string, numeric addition otherwise.
fn binary_add(left: &Value, right: &Value) -> Value {
    let lp = left.coerce_primitive();
    let rp = right.coerce_primitive();
    if matches!(lp, Value::Str(_)) || matches!(rp, Value::Str(_)) {
        Value::Str(format!("{lp}{rp}"))
    } else {
        Value::Number(lp.to_number() + rp.to_number())
    }
}

/// Relational comparison: string order when both primitives are
/// strings, numeric order otherwise. `None` means incomparable (NaN),
/// which makes every relational operator answer false.
fn relational(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    let lp = left.coerce_primitive();
    let rp = right.coerce_primitive();
    if let (Value::Str(a), Value::Str(b)) = (&lp, &rp) {
        return Some(a.cmp(b));
    }
    lp.to_number().partial_cmp(&rp.to_number())
}

/// Abstract (`==`) equality: null and undefined match each other,
/// numbers and strings compare numerically, booleans collapse to
/// numbers, reference values collapse to primitives against a
/// primitive, and everything else falls back to strict equality.
fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Number(_), Value::Str(_)) | (Value::Str(_), Value::Number(_)) => {
            left.to_number() == right.to_number()
        }
        (Value::Bool(_), _) => loose_equals(&Value::Number(left.to_number()), right),
        (_, Value::Bool(_)) => loose_equals(left, &Value::Number(right.to_number())),
        (
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_),
            Value::Number(_) | Value::Str(_),
        ) => loose_equals(&left.coerce_primitive(), right),
        (
            Value::Number(_) | Value::Str(_),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_),
        ) => loose_equals(left, &right.coerce_primitive()),
        _ => left.strict_equals(right),
    }
}

fn array_index(key: &str) -> Option<usize> {
    key.parse().ok()
}
