use crate::{
    bridge::{Bridge, Scope},
    error::BridgeError,
    types::{HostError, HostOperation, OperationBody, OperationSet},
    utils::sync::Arc,
    value::{Hint, HostObjectRef, HostValue, PropertyKey, PropertyStore, ScriptObjectOps, ScriptValue},
};
use tracing::debug;

/// Runs `op` against `receiver` with scripting arguments and converts the
/// result back for `scope`.
pub(crate) fn invoke_operation(
    bridge: &Bridge,
    op: &HostOperation,
    receiver: Option<&HostObjectRef>,
    args: &[ScriptValue],
    scope: &Scope,
) -> Result<ScriptValue, BridgeError> {
    let invocation_error = |source: HostError| BridgeError::Invocation {
        operation: op.signature(),
        source,
    };

    match op.body() {
        OperationBody::Script(body) => body(args).map_err(invocation_error),
        OperationBody::Host(body) => {
            let host_args = op
                .params
                .iter()
                .zip(args)
                .map(|(kind, arg)| bridge.unwrap_from_script(arg, kind))
                .collect::<Result<Vec<HostValue>, _>>()?;
            let result = body(receiver, &host_args).map_err(invocation_error)?;
            bridge.expose_to_script(result, scope)
        }
    }
}

/// The scripting function value behind a method name.
pub struct FunctionAdapter {
    set: Arc<OperationSet>,
    receiver: Option<HostObjectRef>,
    properties: PropertyStore,
    bridge: Bridge,
}

impl FunctionAdapter {
    pub(crate) fn new(set: Arc<OperationSet>, receiver: Option<HostObjectRef>, bridge: Bridge) -> Self {
        Self {
            set,
            receiver,
            properties: PropertyStore::new(),
            bridge,
        }
    }

    pub fn name(&self) -> &str {
        self.set.name()
    }

    pub fn operations(&self) -> &OperationSet {
        &self.set
    }

    fn store(&self, key: PropertyKey, value: ScriptValue) {
        if value.is_undefined() {
            self.properties.remove(&key);
        } else {
            self.properties.set(key, value);
        }
    }
}

impl ScriptObjectOps for Arc<FunctionAdapter> {
    fn class_name(&self) -> String {
        "Function".to_string()
    }

    fn get(&self, key: &str, _scope: &Scope) -> Result<ScriptValue, BridgeError> {
        Ok(match key {
            "name" => ScriptValue::Str(self.name().to_string()),
            "length" => {
                let arity = self.set.operations().iter().map(|op| op.params.len()).min();
                ScriptValue::Int(arity.unwrap_or(0) as i64)
            }
            _ => self.properties.get(&PropertyKey::name(key)).unwrap_or_default(),
        })
    }

    fn put(&self, key: &str, value: ScriptValue, _scope: &Scope) -> Result<(), BridgeError> {
        if matches!(key, "name" | "length") {
            return Err(BridgeError::not_settable(key));
        }
        self.store(PropertyKey::name(key), value);
        Ok(())
    }

    fn get_index(&self, index: u32, _scope: &Scope) -> Result<ScriptValue, BridgeError> {
        Ok(self.properties.get(&PropertyKey::Index(index)).unwrap_or_default())
    }

    fn put_index(&self, index: u32, value: ScriptValue, _scope: &Scope) -> Result<(), BridgeError> {
        self.store(PropertyKey::Index(index), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> bool {
        self.properties.remove(&PropertyKey::name(key))
    }

    fn call(&self, this: &ScriptValue, args: &[ScriptValue], scope: &Scope) -> Result<ScriptValue, BridgeError> {
        let op = self.set.resolve(args)?;
        let receiver = match (op.is_static, &self.receiver) {
            (true, _) => None,
            (false, Some(bound)) => Some(bound.clone()),
            (false, None) => this.as_instance().map(|adapter| adapter.host().clone()),
        };
        debug!(operation = %op.signature(), args = args.len(), "invoking host operation");
        invoke_operation(&self.bridge, op, receiver.as_ref(), args, scope)
    }

    fn default_value(&self, hint: Hint) -> ScriptValue {
        match hint {
            Hint::String => ScriptValue::Str(format!("function {}() {{ [native code] }}", self.name())),
            Hint::Number => ScriptValue::Float(f64::NAN),
        }
    }
}
