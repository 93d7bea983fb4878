//! End-to-end evaluator tests: parse real source, run it, check the
//! resulting values, coercions, control flow and sandbox limits.

use std::any::Any;
use std::rc::Rc;

use tidepool_eval::{
    EvalError, EvalResult, Evaluator, NativeObject, Value, DEFAULT_GAS_LIMIT,
};
use tidepool_parser::parse_source;

/// Parse and evaluate a program with a given evaluator, returning the
/// last statement's value.
fn eval_with(evaluator: &mut Evaluator, source: &str) -> Value {
    let tree = Rc::new(parse_source(source).expect("source should parse"));
    evaluator
        .eval_program(&tree)
        .expect("evaluation should succeed")
}

/// Parse and evaluate a program in a fresh evaluator.
fn eval(source: &str) -> Value {
    let mut evaluator = Evaluator::new(DEFAULT_GAS_LIMIT);
    eval_with(&mut evaluator, source)
}

fn eval_err(source: &str) -> EvalError {
    let mut evaluator = Evaluator::new(DEFAULT_GAS_LIMIT);
    let tree = Rc::new(parse_source(source).expect("source should parse"));
    evaluator
        .eval_program(&tree)
        .expect_err("evaluation should fail")
}

fn num(source: &str) -> f64 {
    match eval(source) {
        Value::Number(n) => n,
        other => panic!("expected a number from {source:?}, got {other:?}"),
    }
}

fn text(source: &str) -> String {
    eval(source).to_string()
}

fn boolean(source: &str) -> bool {
    match eval(source) {
        Value::Bool(b) => b,
        other => panic!("expected a boolean from {source:?}, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Operators & coercions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(num("1 + 2 * 3"), 7.0);
    assert_eq!(num("(1 + 2) * 3"), 9.0);
    assert_eq!(num("7 / 2"), 3.5);
    assert_eq!(num("10 % 3"), 1.0);
    assert!(num("1 / 0").is_infinite());
}

#[test]
fn test_string_concatenation() {
    assert_eq!(text("'a' + 1"), "a1");
    assert_eq!(text("1 + 2 + 'x'"), "3x");
    assert_eq!(text("'x' + 1 + 2"), "x12");
    assert_eq!(text("[1, 2] + ''"), "1,2");
}

#[test]
fn test_unary_operators() {
    assert_eq!(num("-'5'"), -5.0);
    assert_eq!(num("+true"), 1.0);
    assert!(boolean("!0"));
    assert!(!boolean("!'text'"));
}

#[test]
fn test_loose_equality() {
    assert!(boolean("1 == '1'"));
    assert!(boolean("1 == true"));
    assert!(boolean("'' == 0"));
    assert!(!boolean("null == 0"));
    assert!(boolean("var u; u == null"));
}

#[test]
fn test_strict_equality() {
    assert!(boolean("1 === 1"));
    assert!(!boolean("1 === '1'"));
    assert!(boolean("var a = [1]; a === a"));
    assert!(!boolean("[1] === [1]"));
}

#[test]
fn test_relational_comparison() {
    assert!(boolean("2 < 10"));
    assert!(boolean("'apple' < 'banana'"));
    // Two strings compare lexicographically, not numerically.
    assert!(!boolean("'2' < '10'"));
    // NaN is incomparable.
    assert!(!boolean("0 < 'x'"));
    assert!(boolean("3 >= 3"));
}

#[test]
fn test_logical_operators_return_operands() {
    assert_eq!(text("0 || 'fallback'"), "fallback");
    assert_eq!(num("1 && 2"), 2.0);
    assert_eq!(num("0 && 2"), 0.0);
}

#[test]
fn test_conditional_and_sequence() {
    assert_eq!(num("1 ? 2 : 3"), 2.0);
    assert_eq!(num("0 ? 2 : 3"), 3.0);
    assert_eq!(num("(1, 2, 3)"), 3.0);
}

#[test]
fn test_typeof() {
    assert_eq!(text("typeof 1"), "number");
    assert_eq!(text("typeof 'x'"), "string");
    assert_eq!(text("typeof null"), "object");
    assert_eq!(text("var f = function () {}; typeof f"), "function");
    // Unbound names answer instead of throwing.
    assert_eq!(text("typeof ghost"), "undefined");
}

// ─────────────────────────────────────────────────────────────────────
// Variables & assignment
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_var_declaration_and_assignment() {
    assert_eq!(num("var x = 5; x + 1"), 6.0);
    assert_eq!(num("var a, b; a = b = 7; a"), 7.0);
    assert!(matches!(eval("var x; x"), Value::Undefined));
}

#[test]
fn test_compound_assignment() {
    assert_eq!(num("var x = 5; x += 2; x *= 3; x"), 21.0);
    assert_eq!(text("var s = 'a'; s += 1; s"), "a1");
}

#[test]
fn test_update_operators() {
    assert_eq!(num("var i = 5; var j = i++; j * 10 + i"), 56.0);
    assert_eq!(num("var i = 5; var j = ++i; j * 10 + i"), 66.0);
    assert_eq!(num("var a = [3]; a[0]--; a[0]"), 2.0);
}

#[test]
fn test_undefined_variable_error() {
    let err = eval_err("nope");
    assert!(matches!(err, EvalError::UndefinedVariable(_)));
    assert_eq!(err.to_string(), "nope is not defined");
}

#[test]
fn test_sloppy_assignment_creates_global() {
    assert_eq!(num("function f() { ghost = 9; } f(); ghost"), 9.0);
}

#[test]
fn test_statement_completion_values() {
    assert!(matches!(eval("var x = 1;"), Value::Undefined));
    assert!(matches!(eval("if (1) { 5; }"), Value::Undefined));
    assert_eq!(num("5;"), 5.0);
}

// ─────────────────────────────────────────────────────────────────────
// Objects, arrays & strings
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_object_literal_access() {
    assert_eq!(num("var o = {a: 1, 'b c': 2}; o.a + o['b c']"), 3.0);
    assert!(matches!(eval("var o = {}; o.missing"), Value::Undefined));
}

#[test]
fn test_nested_member_write() {
    assert_eq!(num("var o = {a: {}}; o.a.b = 5; o.a.b"), 5.0);
}

#[test]
fn test_member_of_undefined_fails() {
    let err = eval_err("var u; u.x");
    assert!(err
        .to_string()
        .contains("cannot read property 'x' of undefined"));
}

#[test]
fn test_array_literals_and_length() {
    assert_eq!(num("var a = [1, 2, 3]; a[0] + a[2]"), 4.0);
    assert_eq!(num("[1, 2, 3].length"), 3.0);
}

#[test]
fn test_array_write_grows() {
    assert_eq!(num("var a = []; a[2] = 9; a.length"), 3.0);
    assert!(matches!(eval("var a = []; a[2] = 9; a[1]"), Value::Undefined));
}

#[test]
fn test_array_length_truncates() {
    assert_eq!(num("var a = [1, 2, 3]; a.length = 1; a.length"), 1.0);
}

#[test]
fn test_string_length_and_index() {
    assert_eq!(num("'hello'.length"), 5.0);
    assert_eq!(text("'hello'[1]"), "e");
}

// ─────────────────────────────────────────────────────────────────────
// Functions & scope
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_function_declaration_and_call() {
    assert_eq!(num("function add(a, b) { return a + b; } add(2, 3)"), 5.0);
}

#[test]
fn test_missing_arguments_are_undefined() {
    assert!(matches!(
        eval("function f(a) { return a; } f()"),
        Value::Undefined
    ));
}

#[test]
fn test_function_without_return_yields_undefined() {
    assert!(matches!(eval("function f() { 5; } f()"), Value::Undefined));
}

#[test]
fn test_closures_capture_environment() {
    let source = "
        function counter() {
            var n = 0;
            return function () { n += 1; return n; };
        }
        var c = counter();
        c(); c(); c()
    ";
    assert_eq!(num(source), 3.0);
}

#[test]
fn test_named_function_expression_sees_itself() {
    let source = "var f = function fact(n) { return n < 2 ? 1 : n * fact(n - 1); }; f(5)";
    assert_eq!(num(source), 120.0);
}

#[test]
fn test_recursion() {
    let source = "
        function fib(n) {
            if (n < 2) { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        fib(10)
    ";
    assert_eq!(num(source), 55.0);
}

#[test]
fn test_calling_a_non_function_fails() {
    let err = eval_err("var x = 5; x()");
    assert!(err.to_string().contains("x is not a function"));
}

// ─────────────────────────────────────────────────────────────────────
// Control flow
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_for_loop() {
    assert_eq!(num("var s = 0; for (var i = 0; i < 5; i++) { s += i; } s"), 10.0);
}

#[test]
fn test_while_with_break_and_continue() {
    let source = "
        var s = 0;
        var i = 0;
        while (true) {
            i++;
            if (i > 5) { break; }
            if (i == 2) { continue; }
            s += i;
        }
        s
    ";
    assert_eq!(num(source), 13.0);
}

#[test]
fn test_continue_runs_for_update() {
    let source = "var s = 0; for (var i = 0; i < 5; i++) { if (i == 2) { continue; } s += i; } s";
    assert_eq!(num(source), 8.0);
}

#[test]
fn test_do_while_runs_at_least_once() {
    assert_eq!(num("var n = 0; do { n++; } while (false); n"), 1.0);
}

// ─────────────────────────────────────────────────────────────────────
// Sessions & sandbox limits
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_globals_persist_across_programs() {
    let mut evaluator = Evaluator::new(DEFAULT_GAS_LIMIT);
    eval_with(&mut evaluator, "var x = 41;");
    assert!(matches!(
        eval_with(&mut evaluator, "x + 1"),
        Value::Number(n) if n == 42.0
    ));
}

#[test]
fn test_functions_outlive_their_submission() {
    // The defining tree is dropped after the first program; the
    // function value keeps it alive.
    let mut evaluator = Evaluator::new(DEFAULT_GAS_LIMIT);
    eval_with(&mut evaluator, "function double(n) { return n * 2; }");
    assert!(matches!(
        eval_with(&mut evaluator, "double(21)"),
        Value::Number(n) if n == 42.0
    ));
}

#[test]
fn test_gas_exhaustion_stops_runaway_loops() {
    let mut evaluator = Evaluator::new(500);
    let tree = Rc::new(parse_source("while (true) {}").expect("source should parse"));
    let err = evaluator
        .eval_program(&tree)
        .expect_err("the loop should run out of gas");
    assert!(matches!(err, EvalError::GasExhausted));
}

#[test]
fn test_gas_resets_between_submissions() {
    let mut evaluator = Evaluator::new(200);
    let tree = Rc::new(parse_source("var i = 0; while (i < 20) { i++; }").expect("parse"));
    evaluator.eval_program(&tree).expect("first run fits");
    evaluator.reset_gas();
    evaluator.eval_program(&tree).expect("second run fits after reset");
}

#[test]
fn test_call_depth_cap() {
    let err = eval_err("function f() { return f(); } f()");
    assert!(matches!(err, EvalError::StackOverflow));
    assert_eq!(err.to_string(), "maximum call depth exceeded");
}

// ─────────────────────────────────────────────────────────────────────
// Native objects
// ─────────────────────────────────────────────────────────────────────

/// Minimal host object used to exercise the native seam.
struct Probe;

impl NativeObject for Probe {
    fn type_name(&self) -> &str {
        "Probe"
    }

    fn get(&self, property: &str) -> Value {
        match property {
            "answer" => Value::Number(42.0),
            _ => Value::Undefined,
        }
    }

    fn call_method(&self, method: &str, args: &[Value]) -> EvalResult<Value> {
        match method {
            "sum" => Ok(Value::Number(args.iter().map(Value::to_number).sum())),
            _ => Err(EvalError::TypeError(format!(
                "{}.{method} is not a function",
                self.type_name()
            ))),
        }
    }

    fn construct(&self, args: &[Value]) -> EvalResult<Value> {
        Ok(Value::Number(args.len() as f64))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn probe_evaluator() -> Evaluator {
    let mut evaluator = Evaluator::new(DEFAULT_GAS_LIMIT);
    evaluator.define_global("host", Value::Native(Rc::new(Probe)));
    evaluator
}

#[test]
fn test_native_property_reads() {
    let mut evaluator = probe_evaluator();
    assert!(matches!(
        eval_with(&mut evaluator, "host.answer"),
        Value::Number(n) if n == 42.0
    ));
    assert!(matches!(
        eval_with(&mut evaluator, "host.missing"),
        Value::Undefined
    ));
}

#[test]
fn test_native_method_dispatch() {
    let mut evaluator = probe_evaluator();
    assert!(matches!(
        eval_with(&mut evaluator, "host.sum(1, 2, 3)"),
        Value::Number(n) if n == 6.0
    ));
}

#[test]
fn test_native_unknown_method_fails() {
    let mut evaluator = probe_evaluator();
    let tree = Rc::new(parse_source("host.nope()").expect("parse"));
    let err = evaluator.eval_program(&tree).expect_err("should fail");
    assert!(err.to_string().contains("Probe.nope is not a function"));
}

#[test]
fn test_native_construct() {
    let mut evaluator = probe_evaluator();
    assert!(matches!(
        eval_with(&mut evaluator, "new host(1, 2)"),
        Value::Number(n) if n == 2.0
    ));
}

#[test]
fn test_native_writes_are_discarded() {
    let mut evaluator = probe_evaluator();
    assert!(matches!(
        eval_with(&mut evaluator, "host.x = 5; host.x"),
        Value::Undefined
    ));
}

#[test]
fn test_new_on_non_native_fails() {
    let err = eval_err("var f = function () {}; new f()");
    assert!(err.to_string().contains("is not a constructor"));
}
