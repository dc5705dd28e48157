//! The scripting side of the bridge: adapters, conversions and identity.
use crate::{
    error::BridgeError,
    types::{DescriptorCache, DiscoveryPolicy, TypeDescriptor, TypeHandle},
    utils::sync::Arc,
    value::{HostObjectRef, ScriptObject, ScriptValue},
};
use std::fmt::{self, Debug, Formatter};
use tracing::warn;

pub mod constructor;
pub mod dispatch;
pub mod gateway;
mod identity;
pub mod instance;
pub mod scope;

pub use constructor::{ConstructorAdapter, Instantiator};
pub use dispatch::FunctionAdapter;
pub use instance::InstanceAdapter;
pub use scope::{Scope, WeakScope};

use identity::IdentityCache;

pub const DEFAULT_SWEEP_THRESHOLD: usize = 1024;

const SWEEP_THRESHOLD_VAR: &str = "HOSTBRIDGE_SWEEP_THRESHOLD";
const BLOCKED_NAMESPACES_VAR: &str = "HOSTBRIDGE_BLOCKED_NAMESPACES";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Identity-map insertions between sweeps of dead entries.
    pub sweep_threshold: usize,
    pub policy: DiscoveryPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
            policy: DiscoveryPolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Defaults, overridden by `HOSTBRIDGE_SWEEP_THRESHOLD` and extended by
    /// the comma-separated `HOSTBRIDGE_BLOCKED_NAMESPACES`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(SWEEP_THRESHOLD_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(threshold) if threshold > 0 => config.sweep_threshold = threshold,
                _ => warn!("ignoring invalid {SWEEP_THRESHOLD_VAR}={raw:?}"),
            }
        }
        if let Ok(raw) = std::env::var(BLOCKED_NAMESPACES_VAR) {
            for namespace in raw.split(',').map(str::trim).filter(|ns| !ns.is_empty()) {
                config.policy = config.policy.block_namespace(namespace);
            }
        }
        config
    }
}

struct BridgeShared {
    config: BridgeConfig,
    descriptors: Arc<DescriptorCache>,
    identity: IdentityCache,
}

/// Entry point for scripting-runtime collaborators.
///
/// Cloning is cheap; every clone shares the same descriptor cache and
/// identity map.
#[derive(Clone)]
pub struct Bridge {
    shared: Arc<BridgeShared>,
}

impl Debug for Bridge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("descriptors", &self.shared.descriptors)
            .field("adapters", &self.shared.identity.len())
            .finish()
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl Bridge {
    /// Bridges with the default discovery policy share
    /// [`DescriptorCache::shared`]; any other policy gets a private cache.
    pub fn new(config: BridgeConfig) -> Self {
        let descriptors = if config.policy.is_default() {
            DescriptorCache::shared()
        } else {
            Arc::new(DescriptorCache::new(config.policy.clone()))
        };
        Self::with_descriptor_cache(config, descriptors)
    }

    /// A bridge backed by an existing descriptor cache, such as
    /// [`DescriptorCache::shared`]. The cache's own policy applies.
    pub fn with_descriptor_cache(config: BridgeConfig, descriptors: Arc<DescriptorCache>) -> Self {
        let identity = IdentityCache::new(config.sweep_threshold);
        Self {
            shared: Arc::new(BridgeShared {
                config,
                descriptors,
                identity,
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    pub fn descriptors(&self) -> &Arc<DescriptorCache> {
        &self.shared.descriptors
    }

    pub fn describe(&self, ty: &TypeHandle) -> Result<Arc<TypeDescriptor>, BridgeError> {
        self.shared.descriptors.describe(ty)
    }

    /// The scripting constructor for `ty`, using its zero-argument constructor.
    pub fn constructor_for(&self, ty: &TypeHandle) -> Result<ScriptValue, BridgeError> {
        self.constructor_with(ty, Instantiator::default_for(ty))
    }

    pub fn constructor_with(&self, ty: &TypeHandle, instantiator: Instantiator) -> Result<ScriptValue, BridgeError> {
        let descriptor = self.describe(ty)?;
        let constructor = ConstructorAdapter::new(ty.name(), descriptor, instantiator, self.clone());
        Ok(ScriptValue::Object(ScriptObject::Constructor(Arc::new(constructor))))
    }

    /// Drops the bridge's record of `host`'s adapter, including the one a
    /// self-describing object holds. The next exposure builds a new adapter.
    ///
    /// Only call this when `host` is being disposed of. An adapter scripts
    /// still hold keeps working, but the bridge no longer knows it, so
    /// exposing `host` again yields a second live adapter for it.
    pub fn release(&self, host: &HostObjectRef) -> bool {
        self.shared.identity.invalidate(host)
    }

    /// Removes identity entries whose adapters are gone.
    pub fn sweep(&self) -> usize {
        self.shared.identity.sweep()
    }

    /// Adapters in the identity map still reachable from scripts.
    /// Adapters stored on self-describing objects are not counted.
    pub fn live_adapters(&self) -> usize {
        self.shared.identity.live()
    }

    pub(crate) fn identity(&self) -> &IdentityCache {
        &self.shared.identity
    }
}
