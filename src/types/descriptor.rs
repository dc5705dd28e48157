use crate::{
    error::BridgeError,
    types::{
        discovery::discover,
        members::{HostOperation, OperationSet},
        HostClass, TypeHandle, ValueKind, WeakTypeHandle,
    },
    utils::sync::{Arc, DashMap, MapEntry, OnceLock},
    value::HostValue,
};
use serde::Serialize;
use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
};
use tracing::{debug, trace};

/// Namespaces whose operations are never exposed unless configured otherwise.
pub const DEFAULT_BLOCKED_NAMESPACES: &[&str] = &["core.runtime", "core.reflect"];

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub value_kind: ValueKind,
    pub getter: Option<HostOperation>,
    pub setter: Option<HostOperation>,
}

impl PropertyDescriptor {
    pub(crate) fn new(name: impl Into<String>, value_kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            value_kind,
            getter: None,
            setter: None,
        }
    }

    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

/// The scripting-facing shape of one host class.
pub struct TypeDescriptor {
    pub(crate) host_type: WeakTypeHandle,
    pub(crate) type_name: String,
    pub(crate) properties: HashMap<String, PropertyDescriptor>,
    pub(crate) methods: HashMap<String, Arc<OperationSet>>,
    pub(crate) static_constants: HashMap<String, HostValue>,
    pub(crate) name_indexer: Option<PropertyDescriptor>,
    pub(crate) integer_indexer: Option<PropertyDescriptor>,
}

impl Debug for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type", &self.host_type)
            .field("properties", &self.property_names())
            .field("methods", &self.method_names())
            .finish()
    }
}

impl TypeDescriptor {
    /// The described class, unless it has been unloaded since.
    pub fn host_type(&self) -> Option<TypeHandle> {
        self.host_type.upgrade()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&Arc<OperationSet>> {
        self.methods.get(name)
    }

    pub fn static_constant(&self, name: &str) -> Option<&HostValue> {
        self.static_constants.get(name)
    }

    pub fn name_indexer(&self) -> Option<&PropertyDescriptor> {
        self.name_indexer.as_ref()
    }

    pub fn integer_indexer(&self) -> Option<&PropertyDescriptor> {
        self.integer_indexer.as_ref()
    }

    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.properties.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn summary(&self) -> DescriptorSummary {
        let properties = self
            .property_names()
            .into_iter()
            .filter_map(|name| self.properties.get(name))
            .map(|p| PropertySummary {
                name: p.name.clone(),
                kind: p.value_kind.to_string(),
                readable: p.is_readable(),
                writable: p.is_writable(),
            })
            .collect();
        let methods = self
            .method_names()
            .into_iter()
            .filter_map(|name| self.methods.get(name))
            .map(|set| MethodSummary {
                name: set.name().to_string(),
                overloads: set.operations().iter().map(|op| format!("{op:?}")).collect(),
            })
            .collect();
        let mut static_constants: Vec<_> = self.static_constants.keys().cloned().collect();
        static_constants.sort_unstable();

        DescriptorSummary {
            type_name: self
                .host_type()
                .map(|ty| ty.full_name())
                .unwrap_or_else(|| self.type_name.clone()),
            properties,
            methods,
            static_constants,
            name_indexer: self.name_indexer.is_some(),
            integer_indexer: self.integer_indexer.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DescriptorSummary {
    pub type_name: String,
    pub properties: Vec<PropertySummary>,
    pub methods: Vec<MethodSummary>,
    pub static_constants: Vec<String>,
    pub name_indexer: bool,
    pub integer_indexer: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertySummary {
    pub name: String,
    pub kind: String,
    pub readable: bool,
    pub writable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodSummary {
    pub name: String,
    pub overloads: Vec<String>,
}

/// Decides which host classes scripts may see at all.
pub trait ClassShutter: Send + Sync {
    fn visible_to_scripts(&self, class: &HostClass) -> bool;
}

impl<F> ClassShutter for F
where
    F: Fn(&HostClass) -> bool + Send + Sync,
{
    fn visible_to_scripts(&self, class: &HostClass) -> bool {
        self(class)
    }
}

#[derive(Clone)]
pub struct DiscoveryPolicy {
    blocked_namespaces: Vec<String>,
    class_shutter: Option<Arc<dyn ClassShutter>>,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            blocked_namespaces: DEFAULT_BLOCKED_NAMESPACES.iter().map(|s| s.to_string()).collect(),
            class_shutter: None,
        }
    }
}

impl Debug for DiscoveryPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryPolicy")
            .field("blocked_namespaces", &self.blocked_namespaces)
            .field("class_shutter", &self.class_shutter.is_some())
            .finish()
    }
}

impl DiscoveryPolicy {
    pub fn with_blocked_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// True when nothing was changed from [`DiscoveryPolicy::default`].
    pub fn is_default(&self) -> bool {
        self.class_shutter.is_none()
            && self.blocked_namespaces.iter().map(String::as_str).eq(DEFAULT_BLOCKED_NAMESPACES.iter().copied())
    }

    pub fn block_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.blocked_namespaces.push(namespace.into());
        self
    }

    pub fn with_class_shutter(mut self, shutter: impl ClassShutter + 'static) -> Self {
        self.class_shutter = Some(Arc::new(shutter));
        self
    }

    pub fn blocked_namespaces(&self) -> &[String] {
        &self.blocked_namespaces
    }

    /// `namespace` is blocked if it equals a blocked namespace or lies below one.
    pub fn is_blocked(&self, namespace: &str) -> bool {
        self.blocked_namespaces.iter().any(|blocked| {
            namespace == blocked
                || namespace
                    .strip_prefix(blocked.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn is_visible(&self, class: &HostClass) -> bool {
        self.class_shutter
            .as_ref()
            .map_or(true, |shutter| shutter.visible_to_scripts(class))
    }
}

struct CacheEntry {
    host_type: WeakTypeHandle,
    descriptor: Arc<TypeDescriptor>,
}

/// Memoizes descriptors per host class.
///
/// Keys are class addresses. Each entry remembers its class weakly, so an
/// entry whose class was unloaded (and whose address may have been reused)
/// is detected and rebuilt instead of served.
pub struct DescriptorCache {
    policy: DiscoveryPolicy,
    entries: DashMap<usize, CacheEntry>,
}

impl Debug for DescriptorCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorCache")
            .field("policy", &self.policy)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::new(DiscoveryPolicy::default())
    }
}

impl DescriptorCache {
    pub fn new(policy: DiscoveryPolicy) -> Self {
        Self {
            policy,
            entries: DashMap::new(),
        }
    }

    /// The process-wide cache, built with the default policy.
    pub fn shared() -> Arc<DescriptorCache> {
        static SHARED: OnceLock<Arc<DescriptorCache>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(DescriptorCache::default())).clone()
    }

    pub fn policy(&self) -> &DiscoveryPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn describe(&self, ty: &TypeHandle) -> Result<Arc<TypeDescriptor>, BridgeError> {
        let key = ty.identity();
        if let Some(entry) = self.entries.get(&key) {
            if entry.host_type.is(ty) {
                trace!(type_name = %ty.full_name(), "descriptor cache hit");
                return Ok(entry.descriptor.clone());
            }
        }

        if !self.policy.is_visible(ty) {
            return Err(BridgeError::ClassHidden(ty.full_name()));
        }

        // Built outside the map lock; concurrent builders race and the
        // first one published wins.
        let built = Arc::new(discover(ty, &self.policy)?);
        debug!(
            type_name = %ty.full_name(),
            properties = built.properties.len(),
            methods = built.methods.len(),
            "built type descriptor"
        );

        let descriptor = match self.entries.entry(key) {
            MapEntry::Occupied(mut slot) => {
                if slot.get().host_type.is(ty) {
                    slot.get().descriptor.clone()
                } else {
                    slot.insert(CacheEntry {
                        host_type: ty.downgrade(),
                        descriptor: built.clone(),
                    });
                    built
                }
            }
            MapEntry::Vacant(slot) => {
                slot.insert(CacheEntry {
                    host_type: ty.downgrade(),
                    descriptor: built.clone(),
                });
                built
            }
        };
        Ok(descriptor)
    }

    /// Drops entries whose class has been unloaded. Returns how many went.
    pub fn purge_unloaded(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.host_type.is_alive());
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "purged descriptors of unloaded classes");
        }
        purged
    }
}
