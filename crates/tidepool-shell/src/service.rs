//! The data service boundary.
//!
//! Sessions never talk to storage directly; they hold a [`ResourceId`]
//! and go through a [`DataService`]. The engine is written against the
//! trait, so tests run on [`MemoryDataService`] while deployments use
//! the HTTP client in [`crate::HttpDataService`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Opaque server-side resource handle backing one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from the data service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never completed (connection refused, timeout, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with a non-zero status envelope.
    #[error("service reported status {status}: {message}")]
    Remote { status: i64, message: String },

    /// The response did not have the expected shape.
    #[error("malformed service response: {0}")]
    Malformed(String),
}

/// Operations a session may perform against its resource.
pub trait DataService: Send + Sync {
    /// Allocate a fresh resource for a new session.
    fn create_resource(&self) -> Result<ResourceId, ServiceError>;

    /// Fetch every document in `collection` matching `filter`, shaped
    /// by `projection`. `None` means the caller passed nothing.
    fn find(
        &self,
        resource: &ResourceId,
        collection: &str,
        filter: Option<&JsonValue>,
        projection: Option<&JsonValue>,
    ) -> Result<Vec<JsonValue>, ServiceError>;

    /// Insert one document into `collection`.
    fn insert(
        &self,
        resource: &ResourceId,
        collection: &str,
        document: &JsonValue,
    ) -> Result<(), ServiceError>;

    /// Signal that the resource is still in use.
    fn keep_alive(&self, resource: &ResourceId) -> Result<(), ServiceError>;
}

// ══════════════════════════════════════════════════════════════════
// In-memory service
// ══════════════════════════════════════════════════════════════════

#[derive(Default)]
struct MemoryState {
    next_resource: u32,
    collections: BTreeMap<String, Vec<JsonValue>>,
    find_calls: Vec<String>,
    insert_calls: Vec<String>,
    keep_alive_calls: u32,
    fail_creates: bool,
    fail_finds: bool,
    fail_inserts: bool,
}

/// In-memory [`DataService`] with per-operation dispatch counters and
/// failure injection. Collections are shared across resources, which
/// matches a service pointed at one database.
#[derive(Default)]
pub struct MemoryDataService {
    state: Mutex<MemoryState>,
}

impl MemoryDataService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Preload `collection` with documents.
    pub fn seed(&self, collection: &str, documents: Vec<JsonValue>) {
        self.state()
            .collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Current contents of `collection`.
    pub fn documents(&self, collection: &str) -> Vec<JsonValue> {
        self.state().collections.get(collection).cloned().unwrap_or_default()
    }

    /// How many find requests `collection` has received.
    pub fn find_count(&self, collection: &str) -> usize {
        self.state().find_calls.iter().filter(|name| *name == collection).count()
    }

    /// Find requests across all collections.
    pub fn total_finds(&self) -> usize {
        self.state().find_calls.len()
    }

    /// How many insert requests `collection` has received.
    pub fn insert_count(&self, collection: &str) -> usize {
        self.state().insert_calls.iter().filter(|name| *name == collection).count()
    }

    pub fn keep_alive_count(&self) -> u32 {
        self.state().keep_alive_calls
    }

    pub fn fail_creates(&self, fail: bool) {
        self.state().fail_creates = fail;
    }

    pub fn fail_finds(&self, fail: bool) {
        self.state().fail_finds = fail;
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.state().fail_inserts = fail;
    }
}

/// Top-level equality match. A non-object filter matches everything.
fn matches_filter(document: &JsonValue, filter: Option<&JsonValue>) -> bool {
    match filter {
        Some(JsonValue::Object(wanted)) => match document.as_object() {
            Some(fields) => wanted.iter().all(|(key, value)| fields.get(key) == Some(value)),
            None => wanted.is_empty(),
        },
        _ => true,
    }
}

/// Keep only keys the projection maps to a truthy value.
fn apply_projection(document: &JsonValue, projection: Option<&JsonValue>) -> JsonValue {
    let keys = match projection {
        Some(JsonValue::Object(keys)) if !keys.is_empty() => keys,
        _ => return document.clone(),
    };
    let fields = match document.as_object() {
        Some(fields) => fields,
        None => return document.clone(),
    };
    let kept = fields
        .iter()
        .filter(|(name, _)| keys.get(name.as_str()).is_some_and(included))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    JsonValue::Object(kept)
}

fn included(flag: &JsonValue) -> bool {
    match flag {
        JsonValue::Null => false,
        JsonValue::Bool(enabled) => *enabled,
        JsonValue::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

impl DataService for MemoryDataService {
    fn create_resource(&self) -> Result<ResourceId, ServiceError> {
        let mut state = self.state();
        if state.fail_creates {
            return Err(ServiceError::Remote {
                status: -1,
                message: "resource creation refused".to_string(),
            });
        }
        let id = ResourceId::new(format!("res-{}", state.next_resource));
        state.next_resource += 1;
        Ok(id)
    }

    fn find(
        &self,
        _resource: &ResourceId,
        collection: &str,
        filter: Option<&JsonValue>,
        projection: Option<&JsonValue>,
    ) -> Result<Vec<JsonValue>, ServiceError> {
        let mut state = self.state();
        state.find_calls.push(collection.to_string());
        if state.fail_finds {
            return Err(ServiceError::Remote {
                status: -1,
                message: "find refused".to_string(),
            });
        }
        let documents = state.collections.get(collection).cloned().unwrap_or_default();
        Ok(documents
            .iter()
            .filter(|document| matches_filter(document, filter))
            .map(|document| apply_projection(document, projection))
            .collect())
    }

    fn insert(
        &self,
        _resource: &ResourceId,
        collection: &str,
        document: &JsonValue,
    ) -> Result<(), ServiceError> {
        let mut state = self.state();
        state.insert_calls.push(collection.to_string());
        if state.fail_inserts {
            return Err(ServiceError::Remote {
                status: -1,
                message: "insert refused".to_string(),
            });
        }
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(())
    }

    fn keep_alive(&self, _resource: &ResourceId) -> Result<(), ServiceError> {
        let mut state = self.state();
        state.keep_alive_calls += 1;
        Ok(())
    }
}
