//! Values on both sides of the bridge.
use crate::{bridge::InstanceAdapter, types::ValueKind, utils::sync::Arc};
use std::fmt::{self, Debug, Formatter};

pub mod coercion;
pub mod object;
pub mod storage;

pub use object::{
    host_identity, AdapterSlot, HostObject, HostObjectRef, PlainObject, ScriptObject,
    ScriptObjectOps,
};
pub use storage::{PropertyKey, PropertyStore};

/// A value as seen by host operations.
#[derive(Clone)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Char(char),
    Str(String),
    Array(Vec<HostValue>),
    Object(HostObjectRef),
    /// A scripting value handed to the host untouched.
    Script(ScriptValue),
}

impl HostValue {
    pub fn object<T: HostObject>(value: Arc<T>) -> Self {
        HostValue::Object(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            HostValue::Int(i) => Some(*i),
            HostValue::Long(l) => i32::try_from(*l).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Int(i) => Some(*i as f64),
            HostValue::Long(l) => Some(*l as f64),
            HostValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HostObjectRef> {
        match self {
            HostValue::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl Debug for HostValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => write!(f, "null"),
            HostValue::Bool(b) => write!(f, "{b}"),
            HostValue::Int(i) => write!(f, "{i}i"),
            HostValue::Long(l) => write!(f, "{l}L"),
            HostValue::Double(d) => write!(f, "{d:?}d"),
            HostValue::Char(c) => write!(f, "{c:?}"),
            HostValue::Str(s) => write!(f, "{s:?}"),
            HostValue::Array(items) => f.debug_list().entries(items).finish(),
            HostValue::Object(o) => write!(f, "{}@{:#x}", o.host_type().full_name(), host_identity(o)),
            HostValue::Script(v) => write!(f, "script {v:?}"),
        }
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Str(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Str(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int(value)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

/// A value in the scripting runtime.
#[derive(Clone, Default)]
pub enum ScriptValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<ScriptValue>),
    Object(ScriptObject),
}

impl ScriptValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, ScriptValue::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, ScriptValue::Undefined | ScriptValue::Null)
    }

    pub fn as_object(&self) -> Option<&ScriptObject> {
        match self {
            ScriptValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Arc<InstanceAdapter>> {
        match self {
            ScriptValue::Object(ScriptObject::Instance(adapter)) => Some(adapter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The kind overload resolution compares against declared parameters.
    pub fn runtime_kind(&self) -> ValueKind {
        match self {
            ScriptValue::Undefined | ScriptValue::Null => ValueKind::Null,
            ScriptValue::Bool(_) => ValueKind::Bool,
            ScriptValue::Int(i) if i32::try_from(*i).is_ok() => ValueKind::Int,
            ScriptValue::Int(_) => ValueKind::Long,
            ScriptValue::Float(_) => ValueKind::Double,
            ScriptValue::Str(_) => ValueKind::String,
            ScriptValue::Array(_) => ValueKind::Array,
            ScriptValue::Object(ScriptObject::Instance(adapter)) => {
                ValueKind::Object(adapter.host().host_type())
            }
            ScriptValue::Object(_) => ValueKind::Script,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Int(_) | ScriptValue::Float(_) => "number",
            ScriptValue::Str(_) => "string",
            ScriptValue::Array(_) => "array",
            ScriptValue::Object(ScriptObject::Function(_) | ScriptObject::Constructor(_)) => "function",
            ScriptValue::Object(_) => "object",
        }
    }
}

impl PartialEq for ScriptValue {
    /// Strict equality; objects compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::Undefined, ScriptValue::Undefined) => true,
            (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Int(b)) => a == b,
            (ScriptValue::Float(a), ScriptValue::Float(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Float(b)) | (ScriptValue::Float(b), ScriptValue::Int(a)) => {
                *a as f64 == *b
            }
            (ScriptValue::Str(a), ScriptValue::Str(b)) => a == b,
            (ScriptValue::Array(a), ScriptValue::Array(b)) => a == b,
            (ScriptValue::Object(a), ScriptValue::Object(b)) => a.same_object(b),
            _ => false,
        }
    }
}

impl Debug for ScriptValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Undefined => write!(f, "undefined"),
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(b) => write!(f, "{b}"),
            ScriptValue::Int(i) => write!(f, "{i}"),
            ScriptValue::Float(x) => write!(f, "{x:?}"),
            ScriptValue::Str(s) => write!(f, "{s:?}"),
            ScriptValue::Array(items) => f.debug_list().entries(items).finish(),
            ScriptValue::Object(o) => write!(f, "{o:?}"),
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::Str(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::Str(value)
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        ScriptValue::Int(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Float(value)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

/// Preferred type for [`ScriptObjectOps::default_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    String,
    Number,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_kinds() {
        assert_eq!(ScriptValue::Int(7).runtime_kind(), ValueKind::Int);
        assert_eq!(ScriptValue::Int(1 << 40).runtime_kind(), ValueKind::Long);
        assert_eq!(ScriptValue::Float(0.5).runtime_kind(), ValueKind::Double);
        assert_eq!(ScriptValue::from("s").runtime_kind(), ValueKind::String);
        assert_eq!(ScriptValue::Undefined.runtime_kind(), ValueKind::Null);
        assert_eq!(
            ScriptValue::Object(ScriptObject::Plain(PlainObject::new("Object"))).runtime_kind(),
            ValueKind::Script
        );
    }

    #[test]
    fn test_strict_equality() {
        assert_eq!(ScriptValue::Int(2), ScriptValue::Float(2.0));
        assert_ne!(ScriptValue::Float(f64::NAN), ScriptValue::Float(f64::NAN));
        assert_ne!(ScriptValue::Null, ScriptValue::Undefined);

        let a = PlainObject::new("Object");
        let b = PlainObject::new("Object");
        let a1 = ScriptValue::Object(ScriptObject::Plain(a.clone()));
        let a2 = ScriptValue::Object(ScriptObject::Plain(a));
        let b1 = ScriptValue::Object(ScriptObject::Plain(b));
        assert_eq!(a1, a2);
        assert_ne!(a1, b1);
    }
}
