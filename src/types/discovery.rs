//! Builds a [`TypeDescriptor`] by walking a class's public operations.
use crate::{
    types::{
        descriptor::{DiscoveryPolicy, PropertyDescriptor, TypeDescriptor},
        members::{HostOperation, OperationSet},
        TypeError, TypeHandle, ValueKind,
    },
    utils::{decapitalize, sync::Arc},
};
use std::collections::HashMap;
use tracing::trace;

pub const INTEGER_GETTER: &str = "item";
pub const INTEGER_SETTER: &str = "setItem";
pub const NAME_GETTER: &str = "namedItem";
pub const NAME_SETTER: &str = "setNamedItem";

enum Accessor {
    Getter(String),
    Setter(String),
}

/// Name after `prefix`, provided it starts with an uppercase letter.
fn accessor_suffix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)
        .filter(|rest| rest.chars().next().is_some_and(char::is_uppercase))
}

fn classify_accessor(op: &HostOperation) -> Option<Accessor> {
    if op.is_static || op.flags.not_property {
        return None;
    }
    let property = |suffix: &str| {
        op.flags
            .property_name
            .clone()
            .unwrap_or_else(|| decapitalize(suffix))
    };
    match op.params.len() {
        0 if op.returns != ValueKind::Void => accessor_suffix(&op.name, "get")
            .or_else(|| accessor_suffix(&op.name, "is"))
            .map(|suffix| Accessor::Getter(property(suffix))),
        1 => accessor_suffix(&op.name, "set").map(|suffix| Accessor::Setter(property(suffix))),
        _ => None,
    }
}

#[derive(Default)]
struct DescriptorBuilder {
    properties: HashMap<String, PropertyDescriptor>,
    methods: HashMap<String, OperationSet>,
    name_indexer: Option<PropertyDescriptor>,
    integer_indexer: Option<PropertyDescriptor>,
}

impl DescriptorBuilder {
    fn fold_accessor(&mut self, accessor: Accessor, op: HostOperation) {
        match accessor {
            Accessor::Getter(name) => {
                let property = self
                    .properties
                    .entry(name.clone())
                    .or_insert_with(|| PropertyDescriptor::new(name, op.returns.clone()));
                if property.getter.is_none() {
                    property.value_kind = op.returns.clone();
                    property.getter = Some(op);
                }
            }
            Accessor::Setter(name) => {
                let property = self
                    .properties
                    .entry(name.clone())
                    .or_insert_with(|| PropertyDescriptor::new(name, op.params[0].clone()));
                if property.setter.is_none() {
                    property.setter = Some(op);
                }
            }
        }
    }

    fn update_indexers(&mut self, op: &HostOperation) {
        if op.is_static {
            return;
        }
        let (slot, label, is_getter) = match (op.name.as_str(), op.params.len()) {
            (INTEGER_GETTER, 1) => (&mut self.integer_indexer, "[item]", true),
            (INTEGER_SETTER, 2) => (&mut self.integer_indexer, "[item]", false),
            (NAME_GETTER, 1) => (&mut self.name_indexer, "[namedItem]", true),
            (NAME_SETTER, 2) => (&mut self.name_indexer, "[namedItem]", false),
            _ => return,
        };
        let value_kind = if is_getter {
            op.returns.clone()
        } else {
            op.params[1].clone()
        };
        let indexer = slot.get_or_insert_with(|| PropertyDescriptor::new(label, value_kind.clone()));
        if is_getter && indexer.getter.is_none() {
            indexer.value_kind = value_kind;
            indexer.getter = Some(op.clone());
        } else if !is_getter && indexer.setter.is_none() {
            indexer.setter = Some(op.clone());
        }
    }

    fn add_method(&mut self, op: HostOperation) {
        self.methods
            .entry(op.name.clone())
            .or_insert_with(|| OperationSet::new(op.name.clone()))
            .push(op);
    }
}

/// Introspects `ty` into a fresh descriptor. Does not consult the cache or
/// the class shutter.
pub fn discover(ty: &TypeHandle, policy: &DiscoveryPolicy) -> Result<TypeDescriptor, TypeError> {
    let mut builder = DescriptorBuilder::default();

    for op in ty.public_operations()? {
        if op.flags.hidden {
            trace!(operation = %op.signature(), "skipping hidden operation");
            continue;
        }
        if policy.is_blocked(op.declaring_namespace()) {
            trace!(
                operation = %op.signature(),
                namespace = op.declaring_namespace(),
                "skipping operation from blocked namespace"
            );
            continue;
        }
        if let Some(accessor) = classify_accessor(&op) {
            builder.fold_accessor(accessor, op);
            continue;
        }
        builder.update_indexers(&op);
        builder.add_method(op);
    }

    let mut static_constants = HashMap::new();
    let mut current = Some(ty);
    while let Some(class) = current {
        for field in class.static_fields().iter().filter(|f| f.read_only) {
            static_constants
                .entry(field.name.clone())
                .or_insert_with(|| field.value.clone());
        }
        current = class.parent();
    }

    Ok(TypeDescriptor {
        host_type: ty.downgrade(),
        type_name: ty.name().to_string(),
        properties: builder.properties,
        methods: builder
            .methods
            .into_iter()
            .map(|(name, set)| (name, Arc::new(set)))
            .collect(),
        static_constants,
        name_indexer: builder.name_indexer,
        integer_indexer: builder.integer_indexer,
    })
}
