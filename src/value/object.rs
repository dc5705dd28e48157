use crate::{
    bridge::{ConstructorAdapter, FunctionAdapter, InstanceAdapter, Scope},
    error::BridgeError,
    types::TypeHandle,
    utils::sync::{Arc, Mutex},
    value::{Hint, PropertyKey, PropertyStore, ScriptValue},
};
use enum_dispatch::enum_dispatch;
use std::{
    any::Any,
    fmt::{self, Debug, Formatter},
};

/// A host object that can be exposed to scripts.
pub trait HostObject: Any + Send + Sync {
    fn host_type(&self) -> TypeHandle;

    fn as_any(&self) -> &dyn Any;

    fn to_text(&self) -> String {
        self.host_type().full_name()
    }

    /// Numeric value, for objects that wrap a number.
    fn as_number(&self) -> Option<f64> {
        None
    }

    /// Textual value, for objects that wrap a string.
    fn as_text(&self) -> Option<String> {
        None
    }

    /// Self-describing objects keep their own adapter here instead of in
    /// the bridge's identity map.
    fn adapter_slot(&self) -> Option<&AdapterSlot> {
        None
    }
}

impl dyn HostObject {
    pub fn downcast_ref<T: HostObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: HostObject>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

pub type HostObjectRef = Arc<dyn HostObject>;

/// Identity of a host object: the address of its allocation.
pub fn host_identity(host: &HostObjectRef) -> usize {
    Arc::as_ptr(host) as *const () as usize
}

/// Back-reference from a self-describing host object to its adapter.
///
/// The slot holds the adapter strongly, so the pair stays alive until the
/// host lets go with [`AdapterSlot::clear`] (or the bridge is told to
/// release the object).
#[derive(Default)]
pub struct AdapterSlot {
    adapter: Mutex<Option<Arc<InstanceAdapter>>>,
}

impl AdapterSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<InstanceAdapter>> {
        self.adapter.lock().clone()
    }

    pub(crate) fn store(&self, adapter: Arc<InstanceAdapter>) {
        *self.adapter.lock() = Some(adapter);
    }

    /// Drops the stored adapter; returns whether one was present.
    pub fn clear(&self) -> bool {
        // Take first so the adapter is dropped outside the slot lock.
        let taken = self.adapter.lock().take();
        taken.is_some()
    }

    pub fn is_occupied(&self) -> bool {
        self.adapter.lock().is_some()
    }
}

impl Debug for AdapterSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.adapter.lock().as_ref() {
            Some(adapter) => write!(f, "AdapterSlot({})", adapter.id()),
            None => write!(f, "AdapterSlot(empty)"),
        }
    }
}

/// Property lookup and invocation hooks the scripting runtime calls on
/// objects it does not own.
#[enum_dispatch]
pub trait ScriptObjectOps {
    fn class_name(&self) -> String;

    fn get(&self, key: &str, scope: &Scope) -> Result<ScriptValue, BridgeError>;

    fn put(&self, key: &str, value: ScriptValue, scope: &Scope) -> Result<(), BridgeError>;

    fn get_index(&self, index: u32, scope: &Scope) -> Result<ScriptValue, BridgeError>;

    fn put_index(&self, index: u32, value: ScriptValue, scope: &Scope) -> Result<(), BridgeError>;

    fn delete(&self, key: &str) -> bool;

    fn call(
        &self,
        this: &ScriptValue,
        args: &[ScriptValue],
        scope: &Scope,
    ) -> Result<ScriptValue, BridgeError> {
        let _ = (this, args, scope);
        Err(BridgeError::NotCallable(self.class_name()))
    }

    fn construct(&self, args: &[ScriptValue], scope: &Scope) -> Result<ScriptValue, BridgeError> {
        let _ = (args, scope);
        Err(BridgeError::NotConstructible(self.class_name()))
    }

    /// `value instanceof self`
    fn has_instance(&self, value: &ScriptValue) -> bool {
        let _ = value;
        false
    }

    fn default_value(&self, hint: Hint) -> ScriptValue;
}

#[enum_dispatch(ScriptObjectOps)]
#[derive(Clone)]
pub enum ScriptObject {
    Plain(PlainObject),
    Instance(Arc<InstanceAdapter>),
    Constructor(Arc<ConstructorAdapter>),
    Function(Arc<FunctionAdapter>),
}

impl ScriptObject {
    fn address(&self) -> usize {
        match self {
            ScriptObject::Plain(p) => Arc::as_ptr(&p.0) as usize,
            ScriptObject::Instance(a) => Arc::as_ptr(a) as usize,
            ScriptObject::Constructor(c) => Arc::as_ptr(c) as usize,
            ScriptObject::Function(f) => Arc::as_ptr(f) as usize,
        }
    }

    pub fn same_object(&self, other: &ScriptObject) -> bool {
        self.address() == other.address()
    }
}

impl Debug for ScriptObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptObject::Plain(p) => write!(f, "[object {}]", p.0.class_name),
            ScriptObject::Instance(a) => write!(f, "[{} {}]", a.class_name(), a.id()),
            ScriptObject::Constructor(c) => write!(f, "[constructor {}]", c.class_name()),
            ScriptObject::Function(func) => write!(f, "[function {}]", func.name()),
        }
    }
}

/// An ordinary scripting object with nothing but ad hoc properties.
#[derive(Clone)]
pub struct PlainObject(Arc<PlainData>);

struct PlainData {
    class_name: String,
    properties: PropertyStore,
}

impl PlainObject {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self(Arc::new(PlainData {
            class_name: class_name.into(),
            properties: PropertyStore::new(),
        }))
    }
}

impl ScriptObjectOps for PlainObject {
    fn class_name(&self) -> String {
        self.0.class_name.clone()
    }

    fn get(&self, key: &str, _scope: &Scope) -> Result<ScriptValue, BridgeError> {
        Ok(self.0.properties.get(&PropertyKey::name(key)).unwrap_or_default())
    }

    fn put(&self, key: &str, value: ScriptValue, _scope: &Scope) -> Result<(), BridgeError> {
        self.0.properties.set(PropertyKey::name(key), value);
        Ok(())
    }

    fn get_index(&self, index: u32, _scope: &Scope) -> Result<ScriptValue, BridgeError> {
        Ok(self.0.properties.get(&PropertyKey::Index(index)).unwrap_or_default())
    }

    fn put_index(&self, index: u32, value: ScriptValue, _scope: &Scope) -> Result<(), BridgeError> {
        self.0.properties.set(PropertyKey::Index(index), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> bool {
        self.0.properties.remove(&PropertyKey::name(key))
    }

    fn default_value(&self, hint: Hint) -> ScriptValue {
        match hint {
            Hint::String => ScriptValue::Str(format!("[object {}]", self.0.class_name)),
            Hint::Number => ScriptValue::Float(f64::NAN),
        }
    }
}
