//! The host type model.
//!
//! Host classes are registered explicitly through [`HostClass::builder`]; a
//! [`TypeHandle`] is the identity the rest of the bridge keys everything on.
use crate::{
    utils::sync::{Arc, OnceLock, Weak},
    value::{HostObjectRef, HostValue},
};
use std::{
    collections::HashSet,
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
};

pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod members;

pub use descriptor::{
    ClassShutter, DescriptorCache, DescriptorSummary, DiscoveryPolicy, PropertyDescriptor,
    TypeDescriptor,
};
pub use error::{HostError, TypeError};
pub use members::{HostOperation, OperationBody, OperationFlags, OperationSet};

/// Namespace of the root class every host class ultimately extends.
pub const ROOT_NAMESPACE: &str = "core.runtime";
pub const ROOT_CLASS: &str = "Object";

pub type ConstructorFn = Arc<dyn Fn() -> Result<HostObjectRef, HostError> + Send + Sync>;

/// Declared kind of a parameter or return value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Void,
    /// Only ever the runtime kind of a null argument.
    Null,
    Bool,
    Int,
    Long,
    Double,
    Char,
    String,
    Array,
    Object(TypeHandle),
    Any,
    /// The raw scripting value, passed through unconverted.
    Script,
}

impl ValueKind {
    /// Exact-pass comparison between a declared kind and an argument's
    /// runtime kind.
    pub fn is_identical(&self, runtime: &ValueKind) -> bool {
        self == runtime
    }

    /// Best-effort comparison: can an argument of kind `runtime` be
    /// converted to `self` without loss of meaning?
    pub fn is_assignable_from(&self, runtime: &ValueKind) -> bool {
        use ValueKind::*;
        match (self, runtime) {
            (Any | Script, _) => true,
            (declared, actual) if declared == actual => true,
            (Long, Int) | (Double, Int | Long) => true,
            (String | Array | Object(_), Null) => true,
            (Object(target), Object(actual)) => actual.is_subclass_of(target),
            _ => false,
        }
    }
}

impl Debug for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Void => write!(f, "void"),
            ValueKind::Null => write!(f, "null"),
            ValueKind::Bool => write!(f, "boolean"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Long => write!(f, "long"),
            ValueKind::Double => write!(f, "double"),
            ValueKind::Char => write!(f, "char"),
            ValueKind::String => write!(f, "String"),
            ValueKind::Array => write!(f, "Array"),
            ValueKind::Object(ty) => write!(f, "{}", ty.full_name()),
            ValueKind::Any => write!(f, "Object"),
            ValueKind::Script => write!(f, "ScriptValue"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StaticField {
    pub name: String,
    pub value: HostValue,
    pub read_only: bool,
}

/// A registered host class.
pub struct HostClass {
    name: String,
    namespace: String,
    parent: Option<TypeHandle>,
    operations: Vec<HostOperation>,
    static_fields: Vec<StaticField>,
    constructor: Option<ConstructorFn>,
    restriction: Option<String>,
}

impl HostClass {
    pub fn builder(name: impl Into<String>) -> HostClassBuilder {
        HostClassBuilder {
            name: name.into(),
            namespace: String::new(),
            parent: None,
            is_root: false,
            operations: vec![],
            static_fields: vec![],
            constructor: None,
            restriction: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn parent(&self) -> Option<&TypeHandle> {
        self.parent.as_ref()
    }

    /// Operations declared directly on this class.
    pub fn declared_operations(&self) -> &[HostOperation] {
        &self.operations
    }

    pub fn static_fields(&self) -> &[StaticField] {
        &self.static_fields
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn restriction(&self) -> Option<&str> {
        self.restriction.as_deref()
    }
}

/// Fluent registration of a host class.
pub struct HostClassBuilder {
    name: String,
    namespace: String,
    parent: Option<TypeHandle>,
    is_root: bool,
    operations: Vec<HostOperation>,
    static_fields: Vec<StaticField>,
    constructor: Option<ConstructorFn>,
    restriction: Option<String>,
}

impl HostClassBuilder {
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn extends(mut self, parent: &TypeHandle) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    fn root(mut self) -> Self {
        self.is_root = true;
        self
    }

    pub fn operation(mut self, operation: HostOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn static_field(mut self, name: impl Into<String>, value: HostValue, read_only: bool) -> Self {
        self.static_fields.push(StaticField {
            name: name.into(),
            value,
            read_only,
        });
        self
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> Result<HostObjectRef, HostError> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(constructor));
        self
    }

    /// Marks the class as refusing introspection.
    pub fn restricted(mut self, reason: impl Into<String>) -> Self {
        self.restriction = Some(reason.into());
        self
    }

    pub fn build(self) -> TypeHandle {
        let parent = match (self.parent, self.is_root) {
            (_, true) => None,
            (Some(parent), false) => Some(parent),
            (None, false) => Some(TypeHandle::root()),
        };
        let mut operations = self.operations;
        for op in &mut operations {
            op.set_declaring_namespace(&self.namespace);
        }
        TypeHandle(Arc::new(HostClass {
            name: self.name,
            namespace: self.namespace,
            parent,
            operations,
            static_fields: self.static_fields,
            constructor: self.constructor,
            restriction: self.restriction,
        }))
    }
}

/// Shared identity of a host class; equality and hashing are by pointer.
#[derive(Clone)]
pub struct TypeHandle(Arc<HostClass>);

impl Debug for TypeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl std::ops::Deref for TypeHandle {
    type Target = HostClass;

    fn deref(&self) -> &HostClass {
        &self.0
    }
}

impl TypeHandle {
    /// The root class, `core.runtime.Object`.
    pub fn root() -> TypeHandle {
        static ROOT: OnceLock<TypeHandle> = OnceLock::new();
        ROOT.get_or_init(|| {
            HostClass::builder(ROOT_CLASS)
                .namespace(ROOT_NAMESPACE)
                .root()
                .operation(HostOperation::function(
                    "getClass",
                    &[],
                    ValueKind::String,
                    |this, _| {
                        Ok(this
                            .map(|o| HostValue::Str(o.host_type().full_name()))
                            .unwrap_or(HostValue::Null))
                    },
                ))
                .operation(HostOperation::function(
                    "hashCode",
                    &[],
                    ValueKind::Int,
                    |this, _| {
                        let address = this.map(crate::value::host_identity).unwrap_or(0);
                        Ok(HostValue::Int(address as i32))
                    },
                ))
                .operation(HostOperation::function(
                    "equals",
                    &[ValueKind::Any],
                    ValueKind::Bool,
                    |this, args| {
                        let same = match (this, args.first()) {
                            (Some(a), Some(HostValue::Object(b))) => {
                                crate::value::host_identity(a) == crate::value::host_identity(b)
                            }
                            _ => false,
                        };
                        Ok(HostValue::Bool(same))
                    },
                ))
                .operation(HostOperation::function(
                    "toString",
                    &[],
                    ValueKind::String,
                    |this, _| {
                        Ok(this
                            .map(|o| HostValue::Str(o.to_text()))
                            .unwrap_or(HostValue::Null))
                    },
                ))
                .build()
        })
        .clone()
    }

    /// Address of the class allocation; stable for as long as the class lives.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn downgrade(&self) -> WeakTypeHandle {
        WeakTypeHandle(Arc::downgrade(&self.0))
    }

    /// Is this class `ancestor` or derived from it?
    pub fn is_subclass_of(&self, ancestor: &TypeHandle) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == ancestor {
                return true;
            }
            current = ty.parent.as_ref();
        }
        false
    }

    /// Enumerates the public operations of this class, inherited ones
    /// included. A derived declaration hides an inherited one with the same
    /// name and parameter kinds.
    pub fn public_operations(&self) -> Result<Vec<HostOperation>, TypeError> {
        if let Some(reason) = &self.restriction {
            return Err(TypeError::IntrospectionDenied {
                type_name: self.full_name(),
                reason: reason.clone(),
            });
        }

        let mut seen = HashSet::new();
        let mut operations = vec![];
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty != self && ty.restriction.is_some() {
                return Err(TypeError::RestrictedAncestor {
                    type_name: self.full_name(),
                    restricted: ty.full_name(),
                });
            }
            for op in &ty.operations {
                if seen.insert((op.name.clone(), op.params.clone())) {
                    operations.push(op.clone());
                }
            }
            current = ty.parent.as_ref();
        }
        Ok(operations)
    }

    /// Runs the class's zero-argument constructor.
    pub fn instantiate(&self) -> Result<HostObjectRef, HostError> {
        match &self.constructor {
            Some(constructor) => constructor(),
            None => Err(HostError::new(format!(
                "{} has no zero-argument constructor",
                self.full_name()
            ))),
        }
    }
}

/// Weak counterpart of [`TypeHandle`], used by cached descriptors so they
/// do not keep an unloaded class alive.
#[derive(Clone)]
pub struct WeakTypeHandle(Weak<HostClass>);

impl WeakTypeHandle {
    pub fn upgrade(&self) -> Option<TypeHandle> {
        self.0.upgrade().map(TypeHandle)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Does this handle still refer to the live class `ty`?
    pub fn is(&self, ty: &TypeHandle) -> bool {
        self.is_alive() && std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&ty.0))
    }
}

impl Debug for WeakTypeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(ty) => write!(f, "{ty:?}"),
            None => write!(f, "<unloaded>"),
        }
    }
}

impl From<&TypeHandle> for ValueKind {
    fn from(ty: &TypeHandle) -> Self {
        ValueKind::Object(ty.clone())
    }
}
