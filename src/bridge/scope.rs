use crate::{
    utils::{
        sync::{Arc, Weak},
        ScopeId,
    },
    value::{PropertyKey, PropertyStore, ScriptValue},
};
use std::fmt::{self, Debug, Formatter};

/// A scripting scope that adapters can be parented to.
#[derive(Clone)]
pub struct Scope(Arc<ScopeData>);

struct ScopeData {
    id: ScopeId,
    name: String,
    globals: PropertyStore,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(ScopeData {
            id: ScopeId::next(),
            name: name.into(),
            globals: PropertyStore::new(),
        }))
    }

    pub fn id(&self) -> ScopeId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn define(&self, name: &str, value: ScriptValue) {
        self.0.globals.set(PropertyKey::name(name), value);
    }

    pub fn lookup(&self, name: &str) -> Option<ScriptValue> {
        self.0.globals.get(&PropertyKey::name(name))
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope(Arc::downgrade(&self.0))
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.id, self.0.name)
    }
}

/// Non-owning reference to a [`Scope`].
#[derive(Clone, Default)]
pub struct WeakScope(Weak<ScopeData>);

impl WeakScope {
    pub fn upgrade(&self) -> Option<Scope> {
        self.0.upgrade().map(Scope)
    }
}

impl Debug for WeakScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(scope) => write!(f, "{scope:?}"),
            None => write!(f, "<gone>"),
        }
    }
}
