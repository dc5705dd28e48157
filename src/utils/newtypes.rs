//! Strongly typed identifiers handed out by the bridge.
use crate::utils::sync::{AtomicU64, Ordering};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Allocates the next identifier from a process-wide counter.
            pub fn next() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(1);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of one live instance adapter. A rebuilt adapter for the same
    /// host object always receives a fresh id.
    AdapterId,
    "adapter"
);

define_id!(
    /// Identity of a scripting scope.
    ScopeId,
    "scope"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = AdapterId::next();
        let b = AdapterId::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert!(a.to_string().starts_with("adapter#"));
        assert!(ScopeId::next().to_string().starts_with("scope#"));
    }
}
