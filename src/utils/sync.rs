//! Basic synchronization primitives.
//!
//! Every lock in the bridge goes through this module so the whole crate agrees
//! on one implementation. Locks are `parking_lot` (no poisoning, const
//! constructors); concurrent maps are `dashmap`.

pub use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc, OnceLock, Weak,
};

pub use dashmap::{mapref::entry::Entry as MapEntry, DashMap};
pub use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
