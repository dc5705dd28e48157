//! Conversions between host values and scripting values.
use crate::{
    bridge::{Bridge, InstanceAdapter, Scope},
    error::BridgeError,
    types::ValueKind,
    utils::sync::Arc,
    value::{coercion, HostObjectRef, HostValue, ScriptObject, ScriptValue},
};
use tracing::trace;

impl Bridge {
    /// Converts a host value for use by scripts parented to `scope`.
    ///
    /// Host objects are wrapped in instance adapters; exposing the same live
    /// object twice yields the same adapter, re-parented to `scope`.
    pub fn expose_to_script(&self, value: HostValue, scope: &Scope) -> Result<ScriptValue, BridgeError> {
        let converted = match value {
            HostValue::Str(s) => ScriptValue::Str(s),
            HostValue::Script(v) => v,
            HostValue::Bool(b) => ScriptValue::Bool(b),
            HostValue::Array(items) => ScriptValue::Array(
                items
                    .into_iter()
                    .map(|item| self.expose_to_script(item, scope))
                    .collect::<Result<_, _>>()?,
            ),
            HostValue::Null => ScriptValue::Null,
            HostValue::Object(host) => {
                ScriptValue::Object(ScriptObject::Instance(self.adapter_for(host, scope)?))
            }
            HostValue::Int(i) => ScriptValue::Int(i64::from(i)),
            HostValue::Long(l) => ScriptValue::Int(l),
            HostValue::Double(d) => ScriptValue::Float(d),
            HostValue::Char(c) => ScriptValue::Str(c.to_string()),
        };
        Ok(converted)
    }

    fn adapter_for(&self, host: HostObjectRef, scope: &Scope) -> Result<Arc<InstanceAdapter>, BridgeError> {
        let build = || -> Result<Arc<InstanceAdapter>, BridgeError> {
            let descriptor = self.describe(&host.host_type())?;
            let adapter = InstanceAdapter::new(host.clone(), descriptor, scope, self.clone());
            trace!(adapter = %adapter.id(), type_name = adapter.descriptor().type_name(), "new instance adapter");
            Ok(Arc::new(adapter))
        };
        let adapter = match host.adapter_slot() {
            Some(slot) => self.identity().slot_or_insert_with(slot, build)?,
            None => self.identity().get_or_insert_with(&host, build)?,
        };
        adapter.reparent(scope);
        Ok(adapter)
    }

    /// Converts a scripting value into what a host parameter of kind
    /// `declared` expects.
    pub fn unwrap_from_script(&self, value: &ScriptValue, declared: &ValueKind) -> Result<HostValue, BridgeError> {
        if let Some(adapter) = value.as_instance() {
            return Ok(match declared {
                ValueKind::String => HostValue::Str(adapter.host().to_text()),
                ValueKind::Script => HostValue::Script(value.clone()),
                _ => HostValue::Object(adapter.host().clone()),
            });
        }
        match (declared, value) {
            (ValueKind::Array | ValueKind::Any, ScriptValue::Array(items)) => Ok(HostValue::Array(
                items
                    .iter()
                    .map(|item| self.unwrap_from_script(item, &ValueKind::Any))
                    .collect::<Result<_, _>>()?,
            )),
            _ => coercion::native_to_host(value, declared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{Element, Point};

    #[test]
    fn test_primitives_and_arrays_convert_directly() {
        let bridge = Bridge::default();
        let scope = Scope::new("gateway");

        assert_eq!(bridge.expose_to_script(HostValue::Int(4), &scope).unwrap(), ScriptValue::Int(4));
        assert_eq!(bridge.expose_to_script(HostValue::Char('a'), &scope).unwrap(), ScriptValue::from("a"));
        assert_eq!(bridge.expose_to_script(HostValue::Null, &scope).unwrap(), ScriptValue::Null);
        assert_eq!(
            bridge
                .expose_to_script(HostValue::Array(vec![HostValue::Bool(true), HostValue::Long(7)]), &scope)
                .unwrap(),
            ScriptValue::Array(vec![ScriptValue::Bool(true), ScriptValue::Int(7)])
        );
        assert_eq!(
            bridge.expose_to_script(HostValue::Script(ScriptValue::Undefined), &scope).unwrap(),
            ScriptValue::Undefined
        );
    }

    #[test]
    fn test_exposure_reuses_adapter_and_reparents() {
        let bridge = Bridge::default();
        let first = Scope::new("first");
        let second = Scope::new("second");
        let point: HostObjectRef = Arc::new(Point::default());

        let a = bridge.expose_to_script(HostValue::Object(point.clone()), &first).unwrap();
        let b = bridge.expose_to_script(HostValue::Object(point), &second).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.as_instance().unwrap().parent_scope(), Some(second));
        assert_eq!(bridge.live_adapters(), 1);
    }

    #[test]
    fn test_self_describing_values_bypass_the_map() {
        let bridge = Bridge::default();
        let scope = Scope::new("gateway");
        let element = Arc::new(Element::new("span"));

        let value = bridge.expose_to_script(HostValue::Object(element.clone()), &scope).unwrap();
        assert!(element.is_attached());
        assert_eq!(bridge.live_adapters(), 0);
        drop(value);
        assert!(element.is_attached());
    }

    #[test]
    fn test_unwrap_arrays_elementwise() {
        let bridge = Bridge::default();
        let scope = Scope::new("gateway");
        let point: HostObjectRef = Arc::new(Point::new(1, 2));
        let adapter = bridge.expose_to_script(HostValue::Object(point.clone()), &scope).unwrap();

        let unwrapped = bridge
            .unwrap_from_script(&ScriptValue::Array(vec![adapter.clone(), ScriptValue::Int(3)]), &ValueKind::Array)
            .unwrap();
        match unwrapped {
            HostValue::Array(items) => {
                assert!(matches!(&items[0], HostValue::Object(host) if Arc::ptr_eq(host, &point)));
                assert_eq!(items.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            bridge.unwrap_from_script(&adapter, &ValueKind::Script),
            Ok(HostValue::Script(ScriptValue::Object(_)))
        ));
    }
}
