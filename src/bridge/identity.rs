//! "Same host object, same live adapter."
use crate::{
    bridge::InstanceAdapter,
    error::BridgeError,
    utils::sync::{Arc, Mutex, Weak},
    value::{host_identity, AdapterSlot, HostObjectRef},
};
use std::collections::HashMap;
use tracing::{debug, trace};

#[derive(Default)]
struct IdentityMap {
    entries: HashMap<usize, Weak<InstanceAdapter>>,
    inserts_since_sweep: usize,
}

impl IdentityMap {
    fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, adapter| adapter.strong_count() > 0);
        self.inserts_since_sweep = 0;
        before - self.entries.len()
    }
}

/// Weakly maps host objects to their adapters.
///
/// One lock guards both the shared map and every self-describing slot
/// update, so two threads exposing the same object can never each build an
/// adapter for it.
pub(crate) struct IdentityCache {
    inner: Mutex<IdentityMap>,
    sweep_threshold: usize,
}

impl IdentityCache {
    pub fn new(sweep_threshold: usize) -> Self {
        Self {
            inner: Mutex::new(IdentityMap::default()),
            sweep_threshold: sweep_threshold.max(1),
        }
    }

    /// Returns the live adapter for `host`, building one if there is none.
    pub fn get_or_insert_with<F>(&self, host: &HostObjectRef, build: F) -> Result<Arc<InstanceAdapter>, BridgeError>
    where
        F: FnOnce() -> Result<Arc<InstanceAdapter>, BridgeError>,
    {
        let key = host_identity(host);
        let mut map = self.inner.lock();
        if let Some(adapter) = map.entries.get(&key).and_then(Weak::upgrade) {
            trace!(adapter = %adapter.id(), "identity cache hit");
            return Ok(adapter);
        }

        let adapter = build()?;
        map.entries.insert(key, Arc::downgrade(&adapter));
        map.inserts_since_sweep += 1;
        if map.inserts_since_sweep >= self.sweep_threshold {
            let purged = map.sweep();
            debug!(purged, live = map.entries.len(), "swept identity cache");
        }
        Ok(adapter)
    }

    /// Same as [`get_or_insert_with`](Self::get_or_insert_with) for a host
    /// object that stores its own adapter.
    pub fn slot_or_insert_with<F>(&self, slot: &AdapterSlot, build: F) -> Result<Arc<InstanceAdapter>, BridgeError>
    where
        F: FnOnce() -> Result<Arc<InstanceAdapter>, BridgeError>,
    {
        let _guard = self.inner.lock();
        if let Some(adapter) = slot.get() {
            return Ok(adapter);
        }
        let adapter = build()?;
        slot.store(adapter.clone());
        Ok(adapter)
    }

    /// Forgets whatever adapter `host` has, in the map or in its own slot.
    pub fn invalidate(&self, host: &HostObjectRef) -> bool {
        let mut map = self.inner.lock();
        let from_map = map
            .entries
            .remove(&host_identity(host))
            .is_some_and(|adapter| adapter.strong_count() > 0);
        let from_slot = host.adapter_slot().is_some_and(AdapterSlot::clear);
        from_map || from_slot
    }

    pub fn sweep(&self) -> usize {
        self.inner.lock().sweep()
    }

    pub fn live(&self) -> usize {
        self.inner
            .lock()
            .entries
            .values()
            .filter(|adapter| adapter.strong_count() > 0)
            .count()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bridge::{Bridge, Scope},
        demo::{Element, Point},
    };

    fn build(bridge: &Bridge, host: &HostObjectRef, scope: &Scope) -> Result<Arc<InstanceAdapter>, BridgeError> {
        let descriptor = bridge.describe(&host.host_type())?;
        Ok(Arc::new(InstanceAdapter::new(host.clone(), descriptor, scope, bridge.clone())))
    }

    #[test]
    fn test_sweep_runs_at_threshold() {
        let bridge = Bridge::default();
        let scope = Scope::new("identity");
        let cache = IdentityCache::new(2);
        let first: HostObjectRef = Arc::new(Point::default());
        let second: HostObjectRef = Arc::new(Point::default());

        let adapter = cache.get_or_insert_with(&first, || build(&bridge, &first, &scope)).unwrap();
        drop(adapter);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.live(), 0);

        let _kept = cache.get_or_insert_with(&second, || build(&bridge, &second, &scope)).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.live(), 1);
    }

    #[test]
    fn test_dead_entry_is_rebuilt() {
        let bridge = Bridge::default();
        let scope = Scope::new("identity");
        let cache = IdentityCache::new(64);
        let host: HostObjectRef = Arc::new(Point::default());

        let first = cache.get_or_insert_with(&host, || build(&bridge, &host, &scope)).unwrap();
        let again = cache
            .get_or_insert_with(&host, || panic!("live adapter should be reused"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let old_id = first.id();
        drop((first, again));
        let rebuilt = cache.get_or_insert_with(&host, || build(&bridge, &host, &scope)).unwrap();
        assert_ne!(rebuilt.id(), old_id);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_forgets_map_and_slot_entries() {
        let bridge = Bridge::default();
        let scope = Scope::new("identity");
        let cache = IdentityCache::new(64);

        let point: HostObjectRef = Arc::new(Point::default());
        let _adapter = cache.get_or_insert_with(&point, || build(&bridge, &point, &scope)).unwrap();
        assert!(cache.invalidate(&point));
        assert!(!cache.invalidate(&point));
        assert_eq!(cache.len(), 0);

        let element: HostObjectRef = Arc::new(Element::new("div"));
        let slot = element.adapter_slot().unwrap();
        let stored = cache.slot_or_insert_with(slot, || build(&bridge, &element, &scope)).unwrap();
        let same = cache
            .slot_or_insert_with(slot, || panic!("slot should already hold an adapter"))
            .unwrap();
        assert!(Arc::ptr_eq(&stored, &same));
        assert!(cache.invalidate(&element));
        assert!(!slot.is_occupied());
    }
}
