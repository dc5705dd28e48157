use crate::{
    bridge::{Bridge, FunctionAdapter, Scope},
    error::BridgeError,
    types::{HostError, TypeDescriptor, TypeHandle},
    utils::sync::Arc,
    value::{
        Hint, HostObjectRef, HostValue, PropertyKey, PropertyStore, ScriptObject, ScriptObjectOps,
        ScriptValue,
    },
};
use std::fmt::{self, Debug, Formatter};
use tracing::{debug, warn};

/// Produces fresh host objects for a constructor.
#[derive(Clone)]
pub struct Instantiator(Arc<dyn Fn() -> Result<HostObjectRef, HostError> + Send + Sync>);

impl Instantiator {
    pub fn new<F>(instantiate: F) -> Self
    where
        F: Fn() -> Result<HostObjectRef, HostError> + Send + Sync + 'static,
    {
        Self(Arc::new(instantiate))
    }

    /// Uses the class's zero-argument constructor.
    pub fn default_for(ty: &TypeHandle) -> Self {
        let ty = ty.clone();
        Self::new(move || ty.instantiate())
    }

    pub fn instantiate(&self) -> Result<HostObjectRef, HostError> {
        (self.0)()
    }
}

impl Debug for Instantiator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Instantiator")
    }
}

/// The scripting constructor function for a host class.
pub struct ConstructorAdapter {
    name: String,
    descriptor: Arc<TypeDescriptor>,
    instantiator: Instantiator,
    statics: PropertyStore,
    bridge: Bridge,
}

impl ConstructorAdapter {
    pub fn new(name: impl Into<String>, descriptor: Arc<TypeDescriptor>, instantiator: Instantiator, bridge: Bridge) -> Self {
        Self {
            name: name.into(),
            descriptor,
            instantiator,
            statics: PropertyStore::new(),
            bridge,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }
}

impl ScriptObjectOps for Arc<ConstructorAdapter> {
    fn class_name(&self) -> String {
        self.name.clone()
    }

    fn get(&self, key: &str, scope: &Scope) -> Result<ScriptValue, BridgeError> {
        if let Some(value) = self.descriptor.static_constant(key) {
            return self.bridge.expose_to_script(value.clone(), scope);
        }
        if let Some(set) = self.descriptor.method(key) {
            if set.operations().iter().any(|op| op.is_static) {
                let function = FunctionAdapter::new(set.clone(), None, self.bridge.clone());
                return Ok(ScriptValue::Object(ScriptObject::Function(Arc::new(function))));
            }
        }
        match key {
            "name" => Ok(ScriptValue::Str(self.name.clone())),
            _ => Ok(self.statics.get(&PropertyKey::name(key)).unwrap_or_default()),
        }
    }

    fn put(&self, key: &str, value: ScriptValue, _scope: &Scope) -> Result<(), BridgeError> {
        let store_key = PropertyKey::name(key);
        if value.is_undefined() {
            self.statics.remove(&store_key);
            return Ok(());
        }
        if self.descriptor.static_constant(key).is_some() {
            return Err(BridgeError::not_settable(key));
        }
        self.statics.set(store_key, value);
        Ok(())
    }

    fn get_index(&self, index: u32, _scope: &Scope) -> Result<ScriptValue, BridgeError> {
        Ok(self.statics.get(&PropertyKey::Index(index)).unwrap_or_default())
    }

    fn put_index(&self, index: u32, value: ScriptValue, _scope: &Scope) -> Result<(), BridgeError> {
        self.statics.set(PropertyKey::Index(index), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> bool {
        self.statics.remove(&PropertyKey::name(key))
    }

    fn call(&self, _this: &ScriptValue, args: &[ScriptValue], scope: &Scope) -> Result<ScriptValue, BridgeError> {
        self.construct(args, scope)
    }

    /// Arguments are ignored; the instantiator takes none.
    fn construct(&self, _args: &[ScriptValue], scope: &Scope) -> Result<ScriptValue, BridgeError> {
        let host = self.instantiator.instantiate().map_err(|err| {
            warn!(type_name = %self.name, error = %err, "host instantiation failed");
            BridgeError::Construction {
                type_name: self.name.clone(),
                message: err.to_string(),
            }
        })?;
        debug!(type_name = %self.name, "constructed host object");
        self.bridge.expose_to_script(HostValue::Object(host), scope)
    }

    fn has_instance(&self, value: &ScriptValue) -> bool {
        let Some(target) = self.descriptor.host_type() else {
            return false;
        };
        value
            .as_instance()
            .is_some_and(|adapter| adapter.host().host_type().is_subclass_of(&target))
    }

    fn default_value(&self, hint: Hint) -> ScriptValue {
        match hint {
            Hint::String => ScriptValue::Str(format!("function {}() {{ [native code] }}", self.name)),
            Hint::Number => ScriptValue::Float(f64::NAN),
        }
    }
}
