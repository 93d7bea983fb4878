//! The interpreter's value universe and its coercion rules.
//!
//! Coercions follow the host language the shell emulates: string
//! conversion via [`fmt::Display`], numeric conversion via
//! [`Value::to_number`], truthiness via [`Value::is_truthy`]. Arrays,
//! objects, functions and natives are reference values; equality on
//! them is identity.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tidepool_types::{NodeId, Tree};

use crate::env::EnvRef;
use crate::native::NativeObject;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<BTreeMap<String, Value>>>),
    Function(Rc<FunctionValue>),
    Native(Rc<dyn NativeObject>),
}

/// A user-defined function: parameters, body, the tree it was parsed
/// from, and the environment it closed over.
pub struct FunctionValue {
    pub name: Option<String>,
    pub params: Vec<String>,
    /// The body block node within `tree`.
    pub body: NodeId,
    /// The whole function node, used for source-text printing.
    pub node: NodeId,
    pub tree: Rc<Tree>,
    pub env: EnvRef,
}

impl Value {
    /// Convenience constructor for an array value.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Convenience constructor for an object value.
    pub fn object(fields: BTreeMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(fields)))
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Native(native) => native.type_name(),
        }
    }

    /// The `typeof` operator's answer, quirks included: `null` is an
    /// `"object"`, and so is every array and native.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) | Value::Object(_) | Value::Native(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Boolean coercion: everything is truthy except Undefined, Null,
    /// `false`, `0`, `NaN`, and the empty string.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Numeric coercion. Reference values go through their string form
    /// first, which reproduces the usual results: `[] → 0`, `[5] → 5`,
    /// `{} → NaN`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => parse_number(s),
            other => parse_number(&other.to_string()),
        }
    }

    /// Collapse a reference value to its primitive (string) form;
    /// primitives pass through. This is the first step of `+` and the
    /// relational operators.
    pub fn coerce_primitive(&self) -> Value {
        match self {
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_) => {
                Value::Str(self.to_string())
            }
            other => other.clone(),
        }
    }

    /// Strict equality: same type, same value; reference values
    /// compare by identity. `NaN` is not equal to itself.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// String-to-number coercion: blank strings are zero, anything else
/// parses fully or is `NaN`.
fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Number-to-string coercion: no decimal point on integral values, no
/// negative zero, `NaN` and the infinities by name.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(elements) => {
                // Elements join on commas; holes and nulls are blank.
                let parts: Vec<String> = elements
                    .borrow()
                    .iter()
                    .map(|element| match element {
                        Value::Undefined | Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(function) => {
                write!(f, "{}", function.tree.span_text(function.node))
            }
            Value::Native(native) => write!(f, "{}", native.display_text()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Array(elements) => write!(f, "Array(len={})", elements.borrow().len()),
            Value::Object(fields) => write!(f, "Object(len={})", fields.borrow().len()),
            Value::Function(function) => {
                write!(f, "Function({})", function.name.as_deref().unwrap_or("?"))
            }
            Value::Native(native) => write!(f, "Native({})", native.type_name()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// JSON bridge
// ─────────────────────────────────────────────────────────────────────

/// Convert a value to JSON the way `JSON.stringify` would: Undefined,
/// functions and natives vanish (`None`), except inside arrays, where
/// they become `null`. Non-finite numbers become `null`.
pub fn value_to_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Undefined | Value::Function(_) | Value::Native(_) => None,
        Value::Null => Some(serde_json::Value::Null),
        Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
        Value::Number(n) => Some(number_to_json(*n)),
        Value::Str(s) => Some(serde_json::Value::String(s.clone())),
        Value::Array(elements) => {
            let items: Vec<serde_json::Value> = elements
                .borrow()
                .iter()
                .map(|element| value_to_json(element).unwrap_or(serde_json::Value::Null))
                .collect();
            Some(serde_json::Value::Array(items))
        }
        Value::Object(fields) => {
            let mut map = serde_json::Map::new();
            for (key, field) in fields.borrow().iter() {
                if let Some(json) = value_to_json(field) {
                    map.insert(key.clone(), json);
                }
            }
            Some(serde_json::Value::Object(map))
        }
    }
}

/// Integral doubles become integer JSON numbers, so a document typed
/// as `{n: 1}` serializes back as `{"n":1}` and not `{"n":1.0}`.
/// Non-finite numbers have no JSON form and become null.
fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e18 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Convert JSON into a value. Lossless except for numbers outside the
/// f64 range.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => {
            Value::array(items.iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => {
            let fields = map
                .iter()
                .map(|(key, item)| (key.clone(), json_to_value(item)))
                .collect();
            Value::object(fields)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(3.14), "3.14");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_display_coercions() {
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
        let arr = Value::array(vec![
            Value::Number(1.0),
            Value::Null,
            Value::Str("x".into()),
        ]);
        assert_eq!(arr.to_string(), "1,,x");
        assert_eq!(
            Value::object(BTreeMap::new()).to_string(),
            "[object Object]"
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::Str("0".into()).is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn test_to_number_coercions() {
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::Null.to_number(), 0.0);
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert_eq!(Value::Str("  42 ".into()).to_number(), 42.0);
        assert_eq!(Value::Str(String::new()).to_number(), 0.0);
        assert!(Value::Str("4x".into()).to_number().is_nan());
        assert_eq!(Value::array(vec![]).to_number(), 0.0);
        assert_eq!(Value::array(vec![Value::Number(5.0)]).to_number(), 5.0);
        assert!(Value::object(BTreeMap::new()).to_number().is_nan());
    }

    #[test]
    fn test_strict_equality_is_identity_for_references() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = Value::array(vec![Value::Number(1.0)]);
        assert!(a.strict_equals(&a.clone()));
        assert!(!a.strict_equals(&b));
        assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
        assert!(Value::Number(0.0).strict_equals(&Value::Number(-0.0)));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
    }

    #[test]
    fn test_value_to_json_drops_undefined_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("keep".to_string(), Value::Number(1.0));
        fields.insert("drop".to_string(), Value::Undefined);
        let json = value_to_json(&Value::object(fields)).unwrap();
        assert_eq!(json, serde_json::json!({"keep": 1}));
    }

    #[test]
    fn test_value_to_json_nulls_undefined_in_arrays() {
        let json =
            value_to_json(&Value::array(vec![Value::Number(1.0), Value::Undefined])).unwrap();
        assert_eq!(json, serde_json::json!([1, null]));
    }

    #[test]
    fn test_number_json_forms() {
        assert_eq!(value_to_json(&Value::Number(3.0)).unwrap().to_string(), "3");
        assert_eq!(value_to_json(&Value::Number(2.5)).unwrap().to_string(), "2.5");
        assert_eq!(
            value_to_json(&Value::Number(f64::NAN)).unwrap(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn test_json_round_trip() {
        let json = serde_json::json!({"name": "ada", "tags": ["a", "b"], "n": 3});
        let value = json_to_value(&json);
        assert_eq!(value_to_json(&value).unwrap(), json);
    }
}
