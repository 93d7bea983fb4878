//! Lexically chained variable environments.
//!
//! Unlike a plain scope stack, environments here are reference-counted
//! and parent-linked: a function value captures the environment it was
//! defined in, and a call builds a child of that capture. Lookups walk
//! the chain outward; assignment updates the nearest binding.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to an environment.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One scope: its bindings plus a link to the enclosing scope.
#[derive(Debug)]
pub struct Environment {
    bindings: BTreeMap<String, Value>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a root environment with no parent.
    pub fn root() -> EnvRef {
        Rc::new(RefCell::new(Self {
            bindings: BTreeMap::new(),
            parent: None,
        }))
    }

    /// Create a child environment chained to `parent`.
    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            bindings: BTreeMap::new(),
            parent: Some(parent.clone()),
        }))
    }

    /// Define (or redefine) a name in this scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }

    /// Look a name up, walking outward through the chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            return Some(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.borrow().get(name),
            None => None,
        }
    }

    /// Update the nearest existing binding of `name`. Returns `false`
    /// when no scope in the chain binds it.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        if self.bindings.contains_key(name) {
            self.bindings.insert(name.to_string(), value);
            return true;
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().set(name, value),
            None => false,
        }
    }

    /// Returns `true` if this scope or an ancestor binds `name`.
    pub fn is_bound(&self, name: &str) -> bool {
        if self.bindings.contains_key(name) {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.borrow().is_bound(name),
            None => false,
        }
    }
}
