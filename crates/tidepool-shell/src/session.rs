//! Shell sessions and the registry that owns them.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tidepool_eval::Value;
use tidepool_types::ShellId;

use crate::display::ResponseDisplay;
use crate::query::CursorState;
use crate::service::ResourceId;

/// Shared handle to one session.
pub type SessionRef = Rc<ShellSession>;

/// One shell session: its virtualized namespace, its service resource,
/// its display, and the continuation shortcut for `it`.
pub struct ShellSession {
    id: ShellId,
    /// Backing map for `tidepool.shells[ID].vars`. Handing out clones
    /// of the `Rc` keeps namespace identity stable across accesses.
    vars: Rc<RefCell<BTreeMap<String, Value>>>,
    /// `None` when resource creation failed. Such a session stays
    /// registered but never evaluates input.
    resource: Option<ResourceId>,
    display: Rc<dyn ResponseDisplay>,
    /// Cursor most recently printed as a batch. Weak so the shortcut
    /// never keeps an otherwise dead cursor alive.
    last_used_cursor: RefCell<Weak<CursorState>>,
}

impl ShellSession {
    pub(crate) fn new(
        id: ShellId,
        resource: Option<ResourceId>,
        display: Rc<dyn ResponseDisplay>,
        batch_size: f64,
    ) -> SessionRef {
        let mut db_query = BTreeMap::new();
        db_query.insert("shellBatchSize".to_string(), Value::Number(batch_size));
        let mut vars = BTreeMap::new();
        vars.insert("DBQuery".to_string(), Value::object(db_query));
        Rc::new(Self {
            id,
            vars: Rc::new(RefCell::new(vars)),
            resource,
            display,
            last_used_cursor: RefCell::new(Weak::new()),
        })
    }

    pub fn id(&self) -> ShellId {
        self.id
    }

    /// A session without a resource is permanently disabled.
    pub fn is_enabled(&self) -> bool {
        self.resource.is_some()
    }

    pub fn resource(&self) -> Option<&ResourceId> {
        self.resource.as_ref()
    }

    pub fn display(&self) -> &Rc<dyn ResponseDisplay> {
        &self.display
    }

    /// Append one line to the session's display.
    pub fn report(&self, line: &str) {
        self.display.append_line(line);
    }

    /// The namespace as an interpreter value.
    pub fn vars_value(&self) -> Value {
        Value::Object(self.vars.clone())
    }

    /// `DBQuery.shellBatchSize`, if it is currently a real number.
    pub fn shell_batch_size(&self) -> Option<f64> {
        let vars = self.vars.borrow();
        let db_query = match vars.get("DBQuery") {
            Some(Value::Object(fields)) => fields.clone(),
            _ => return None,
        };
        let size = db_query.borrow().get("shellBatchSize").cloned();
        match size {
            Some(Value::Number(n)) if !n.is_nan() => Some(n),
            _ => None,
        }
    }

    pub(crate) fn set_last_used_cursor(&self, cursor: &Rc<CursorState>) {
        *self.last_used_cursor.borrow_mut() = Rc::downgrade(cursor);
    }

    pub fn last_used_cursor(&self) -> Option<Rc<CursorState>> {
        self.last_used_cursor.borrow().upgrade()
    }
}

/// All sessions of one engine, keyed by shell id.
#[derive(Default)]
pub struct ShellRegistry {
    sessions: RefCell<BTreeMap<ShellId, SessionRef>>,
    next_id: Cell<u32>,
}

impl ShellRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&self) -> ShellId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ShellId(id)
    }

    pub(crate) fn insert(&self, session: SessionRef) {
        self.sessions.borrow_mut().insert(session.id(), session);
    }

    pub fn get(&self, id: ShellId) -> Option<SessionRef> {
        self.sessions.borrow().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::RecordingDisplay;

    fn session(resource: Option<ResourceId>) -> SessionRef {
        ShellSession::new(ShellId(0), resource, Rc::new(RecordingDisplay::new()), 20.0)
    }

    #[test]
    fn test_new_session_seeds_batch_size() {
        let session = session(Some(ResourceId::new("res-0")));
        assert!(session.is_enabled());
        assert_eq!(session.shell_batch_size(), Some(20.0));
    }

    #[test]
    fn test_batch_size_follows_namespace_writes() {
        let session = session(Some(ResourceId::new("res-0")));
        match session.vars_value() {
            Value::Object(vars) => match vars.borrow().get("DBQuery") {
                Some(Value::Object(db_query)) => {
                    db_query
                        .borrow_mut()
                        .insert("shellBatchSize".to_string(), Value::Str("lots".to_string()));
                }
                other => panic!("expected DBQuery object, got {other:?}"),
            },
            other => panic!("expected vars object, got {other:?}"),
        }
        assert_eq!(session.shell_batch_size(), None);
    }

    #[test]
    fn test_session_without_resource_is_disabled() {
        let session = session(None);
        assert!(!session.is_enabled());
    }

    #[test]
    fn test_registry_allocates_sequential_ids() {
        let registry = ShellRegistry::new();
        assert_eq!(registry.allocate_id(), ShellId(0));
        assert_eq!(registry.allocate_id(), ShellId(1));
        let session = session(None);
        registry.insert(session.clone());
        assert!(registry.get(ShellId(0)).is_some());
        assert!(registry.get(ShellId(7)).is_none());
        assert_eq!(registry.len(), 1);
    }
}
