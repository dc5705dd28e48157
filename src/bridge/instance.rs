use crate::{
    bridge::{dispatch::invoke_operation, Bridge, FunctionAdapter, Scope, WeakScope},
    error::BridgeError,
    types::{HostOperation, OperationSet, TypeDescriptor},
    utils::{
        sync::{Arc, Mutex, RwLock},
        AdapterId,
    },
    value::{
        coercion, Hint, HostObjectRef, PropertyKey, PropertyStore, ScriptObject, ScriptObjectOps,
        ScriptValue,
    },
};
use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
};
use tracing::trace;

/// Scripting view of one host object.
pub struct InstanceAdapter {
    id: AdapterId,
    host: HostObjectRef,
    descriptor: Arc<TypeDescriptor>,
    parent: RwLock<WeakScope>,
    overlay: PropertyStore,
    functions: Mutex<HashMap<String, Arc<FunctionAdapter>>>,
    bridge: Bridge,
}

impl Debug for InstanceAdapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceAdapter")
            .field("id", &self.id)
            .field("type", &self.descriptor.type_name())
            .field("parent", &*self.parent.read())
            .finish()
    }
}

impl Drop for InstanceAdapter {
    fn drop(&mut self) {
        trace!(adapter = %self.id, "instance adapter dropped");
    }
}

impl InstanceAdapter {
    pub(crate) fn new(host: HostObjectRef, descriptor: Arc<TypeDescriptor>, scope: &Scope, bridge: Bridge) -> Self {
        Self {
            id: AdapterId::next(),
            host,
            descriptor,
            parent: RwLock::new(scope.downgrade()),
            overlay: PropertyStore::new(),
            functions: Mutex::new(HashMap::new()),
            bridge,
        }
    }

    pub fn id(&self) -> AdapterId {
        self.id
    }

    pub fn host(&self) -> &HostObjectRef {
        &self.host
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn parent_scope(&self) -> Option<Scope> {
        self.parent.read().upgrade()
    }

    pub(crate) fn reparent(&self, scope: &Scope) {
        *self.parent.write() = scope.downgrade();
    }

    /// Number of ad hoc properties scripts have attached.
    pub fn overlay_len(&self) -> usize {
        self.overlay.len()
    }

    fn invoke(&self, op: &HostOperation, args: &[ScriptValue], scope: &Scope) -> Result<ScriptValue, BridgeError> {
        invoke_operation(&self.bridge, op, Some(&self.host), args, scope)
    }

    fn function(&self, set: &Arc<OperationSet>) -> ScriptValue {
        let function = self
            .functions
            .lock()
            .entry(set.name().to_string())
            .or_insert_with(|| {
                Arc::new(FunctionAdapter::new(
                    set.clone(),
                    Some(self.host.clone()),
                    self.bridge.clone(),
                ))
            })
            .clone();
        ScriptValue::Object(ScriptObject::Function(function))
    }

    fn indexer_label(&self) -> String {
        format!("{}[index]", self.descriptor.type_name())
    }
}

impl ScriptObjectOps for Arc<InstanceAdapter> {
    fn class_name(&self) -> String {
        self.descriptor.type_name().to_string()
    }

    fn get(&self, key: &str, scope: &Scope) -> Result<ScriptValue, BridgeError> {
        if let Some(property) = self.descriptor.property(key) {
            let getter = property
                .getter
                .as_ref()
                .ok_or_else(|| BridgeError::not_readable(key))?;
            return self.invoke(getter, &[], scope);
        }
        if let Some(set) = self.descriptor.method(key) {
            return Ok(self.function(set));
        }
        if let Some(value) = self.descriptor.static_constant(key) {
            return self.bridge.expose_to_script(value.clone(), scope);
        }
        if let Some(value) = self.overlay.get(&PropertyKey::name(key)) {
            return Ok(value);
        }
        if let Some(getter) = self.descriptor.name_indexer().and_then(|i| i.getter.as_ref()) {
            let value = self.invoke(getter, &[ScriptValue::from(key)], scope)?;
            if !value.is_nullish() {
                return Ok(value);
            }
        }
        Ok(ScriptValue::Undefined)
    }

    fn put(&self, key: &str, value: ScriptValue, scope: &Scope) -> Result<(), BridgeError> {
        let overlay_key = PropertyKey::name(key);
        if value.is_undefined() {
            self.overlay.remove(&overlay_key);
            return Ok(());
        }
        if let Some(property) = self.descriptor.property(key) {
            let setter = property
                .setter
                .as_ref()
                .ok_or_else(|| BridgeError::not_settable(key))?;
            self.invoke(setter, &[value], scope)?;
            return Ok(());
        }
        if self.descriptor.static_constant(key).is_some() {
            return Err(BridgeError::not_settable(key));
        }
        if !self.overlay.contains(&overlay_key) && self.descriptor.method(key).is_none() {
            if let Some(setter) = self.descriptor.name_indexer().and_then(|i| i.setter.as_ref()) {
                self.invoke(setter, &[ScriptValue::from(key), value], scope)?;
                return Ok(());
            }
        }
        self.overlay.set(overlay_key, value);
        Ok(())
    }

    fn get_index(&self, index: u32, scope: &Scope) -> Result<ScriptValue, BridgeError> {
        match self.descriptor.integer_indexer() {
            Some(indexer) => {
                let getter = indexer
                    .getter
                    .as_ref()
                    .ok_or_else(|| BridgeError::not_readable(self.indexer_label()))?;
                self.invoke(getter, &[ScriptValue::Int(i64::from(index))], scope)
            }
            None => Ok(self
                .overlay
                .get(&PropertyKey::Index(index))
                .unwrap_or_default()),
        }
    }

    fn put_index(&self, index: u32, value: ScriptValue, scope: &Scope) -> Result<(), BridgeError> {
        let overlay_key = PropertyKey::Index(index);
        if value.is_undefined() {
            self.overlay.remove(&overlay_key);
            return Ok(());
        }
        match self.descriptor.integer_indexer() {
            Some(indexer) => {
                let setter = indexer
                    .setter
                    .as_ref()
                    .ok_or_else(|| BridgeError::not_settable(self.indexer_label()))?;
                self.invoke(setter, &[ScriptValue::Int(i64::from(index)), value], scope)?;
            }
            None => self.overlay.set(overlay_key, value),
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> bool {
        self.overlay.remove(&PropertyKey::name(key))
    }

    fn has_instance(&self, value: &ScriptValue) -> bool {
        let target = self.host.host_type();
        value
            .as_instance()
            .is_some_and(|adapter| adapter.host.host_type().is_subclass_of(&target))
    }

    fn default_value(&self, hint: Hint) -> ScriptValue {
        match hint {
            Hint::String => ScriptValue::Str(self.host.to_text()),
            Hint::Number => {
                let number = self
                    .host
                    .as_number()
                    .or_else(|| self.host.as_text().map(|text| coercion::parse_number(&text)))
                    .unwrap_or_else(|| coercion::parse_number(&self.host.to_text()));
                ScriptValue::Float(number)
            }
        }
    }
}
