use crate::{
    error::BridgeError,
    types::{HostError, ValueKind},
    utils::sync::Arc,
    value::{HostObject, HostObjectRef, HostValue, ScriptValue},
};
use std::fmt::{self, Debug, Formatter};
use tracing::trace;

pub type HostFn =
    Arc<dyn Fn(Option<&HostObjectRef>, &[HostValue]) -> Result<HostValue, HostError> + Send + Sync>;
pub type ScriptFn = Arc<dyn Fn(&[ScriptValue]) -> Result<ScriptValue, HostError> + Send + Sync>;

#[derive(Clone)]
pub enum OperationBody {
    /// Receives the receiver (if any) and arguments already coerced to the
    /// declared parameter kinds.
    Host(HostFn),
    /// Receives the scripting arguments untouched.
    Script(ScriptFn),
}

/// Metadata attached to an operation by its declaring class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationFlags {
    /// Never visible to scripts.
    pub hidden: bool,
    /// Do not fold into a property even if the name fits the accessor pattern.
    pub not_property: bool,
    /// Overrides the derived property name.
    pub property_name: Option<String>,
}

#[derive(Clone)]
pub struct HostOperation {
    pub name: String,
    pub params: Vec<ValueKind>,
    pub returns: ValueKind,
    pub is_static: bool,
    pub flags: OperationFlags,
    declaring_namespace: String,
    body: OperationBody,
}

impl HostOperation {
    fn with_body(name: &str, params: &[ValueKind], returns: ValueKind, is_static: bool, body: OperationBody) -> Self {
        Self {
            name: name.to_string(),
            params: params.to_vec(),
            returns,
            is_static,
            flags: OperationFlags::default(),
            declaring_namespace: String::new(),
            body,
        }
    }

    /// An instance operation whose receiver is downcast to `T`.
    pub fn instance<T, F>(name: &str, params: &[ValueKind], returns: ValueKind, body: F) -> Self
    where
        T: HostObject,
        F: Fn(&T, &[HostValue]) -> Result<HostValue, HostError> + Send + Sync + 'static,
    {
        let op_name = name.to_string();
        let host: HostFn = Arc::new(move |this, args| {
            let this = this.ok_or_else(|| HostError::new(format!("{op_name} requires a receiver")))?;
            let target = this.downcast_ref::<T>().ok_or_else(|| {
                HostError::new(format!(
                    "{op_name} called on a {} receiver",
                    this.host_type().full_name()
                ))
            })?;
            body(target, args)
        });
        Self::with_body(name, params, returns, false, OperationBody::Host(host))
    }

    /// An instance operation that works on any receiver.
    pub fn function<F>(name: &str, params: &[ValueKind], returns: ValueKind, body: F) -> Self
    where
        F: Fn(Option<&HostObjectRef>, &[HostValue]) -> Result<HostValue, HostError>
            + Send
            + Sync
            + 'static,
    {
        Self::with_body(name, params, returns, false, OperationBody::Host(Arc::new(body)))
    }

    /// A static operation; the receiver is always `None`.
    pub fn static_fn<F>(name: &str, params: &[ValueKind], returns: ValueKind, body: F) -> Self
    where
        F: Fn(&[HostValue]) -> Result<HostValue, HostError> + Send + Sync + 'static,
    {
        let host: HostFn = Arc::new(move |_, args| body(args));
        Self::with_body(name, params, returns, true, OperationBody::Host(host))
    }

    /// A static operation taking the raw scripting arguments.
    pub fn script<F>(name: &str, body: F) -> Self
    where
        F: Fn(&[ScriptValue]) -> Result<ScriptValue, HostError> + Send + Sync + 'static,
    {
        Self::with_body(
            name,
            &[ValueKind::Script],
            ValueKind::Script,
            true,
            OperationBody::Script(Arc::new(body)),
        )
    }

    pub fn hidden(mut self) -> Self {
        self.flags.hidden = true;
        self
    }

    pub fn not_property(mut self) -> Self {
        self.flags.not_property = true;
        self
    }

    pub fn property_name(mut self, name: impl Into<String>) -> Self {
        self.flags.property_name = Some(name.into());
        self
    }

    pub fn body(&self) -> &OperationBody {
        &self.body
    }

    /// Raw scripting bodies take however many arguments they are given.
    pub fn is_variadic(&self) -> bool {
        matches!(self.body, OperationBody::Script(_))
    }

    pub fn declaring_namespace(&self) -> &str {
        &self.declaring_namespace
    }

    pub(crate) fn set_declaring_namespace(&mut self, namespace: &str) {
        self.declaring_namespace = namespace.to_string();
    }

    /// `name(int, String)`
    pub fn signature(&self) -> String {
        let params: Vec<_> = self.params.iter().map(|p| p.to_string()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl Debug for HostOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_static {
            write!(f, "static ")?;
        }
        write!(f, "{} {}", self.returns, self.signature())
    }
}

/// All the public operations of one class sharing a name.
#[derive(Clone)]
pub struct OperationSet {
    name: String,
    operations: Vec<HostOperation>,
}

impl Debug for OperationSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.operations).finish()
    }
}

impl OperationSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: vec![],
        }
    }

    pub(crate) fn push(&mut self, operation: HostOperation) {
        self.operations.push(operation);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operations(&self) -> &[HostOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Picks the operation to run for `args`.
    ///
    /// An operation whose parameter kinds are identical to the arguments'
    /// runtime kinds always wins. Otherwise the first operation (in
    /// declaration order) whose parameters can all take the corresponding
    /// arguments is used, ignoring surplus arguments; failing that, the
    /// operation with the most parameters that still fit into `args`.
    /// The fallback can pick an operation whose arguments will not coerce
    /// cleanly. Apart from raw scripting operations, an operation never
    /// receives fewer arguments than it declares: when every candidate
    /// wants more, nothing matches.
    pub fn resolve(&self, args: &[ScriptValue]) -> Result<&HostOperation, BridgeError> {
        let kinds: Vec<ValueKind> = args.iter().map(ScriptValue::runtime_kind).collect();

        let exact = self.operations.iter().find(|op| {
            op.params.len() == kinds.len()
                && op.params.iter().zip(&kinds).all(|(p, k)| p.is_identical(k))
        });
        if let Some(op) = exact {
            trace!(operation = %op.signature(), "exact overload match");
            return Ok(op);
        }

        let mut fallback: Option<&HostOperation> = None;
        for op in &self.operations {
            if op.params.len() > kinds.len() && !op.is_variadic() {
                continue;
            }
            if op.params.iter().zip(&kinds).all(|(p, k)| p.is_assignable_from(k)) {
                trace!(operation = %op.signature(), "assignable overload match");
                return Ok(op);
            }
            if fallback.map_or(true, |f| op.params.len() > f.params.len()) {
                fallback = Some(op);
            }
        }

        match fallback {
            Some(op) => {
                trace!(operation = %op.signature(), "falling back to widest overload");
                Ok(op)
            }
            None if self.operations.is_empty() => Err(BridgeError::NoSuchOperation(self.name.clone())),
            None => Err(BridgeError::NoMatchingOperation {
                name: self.name.clone(),
                arity: args.len(),
            }),
        }
    }
}
