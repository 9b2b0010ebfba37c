//! Read results annotated with where they were served from.

use chrono::Utc;
use std::time::Duration;
use steelcat_core::Timestamp;

/// Result of a cache read.
///
/// Carries whether the value came from the in-memory snapshot or straight
/// from the store, and for cache hits, when the snapshot was last fully
/// synchronized.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
    value: T,
    from_cache: bool,
    served_at: Timestamp,
    synced_at: Option<Timestamp>,
}

impl<T> Served<T> {
    /// A value answered from the snapshot.
    pub fn from_cache(value: T, synced_at: Option<Timestamp>) -> Self {
        Self {
            value,
            from_cache: true,
            served_at: Utc::now(),
            synced_at,
        }
    }

    /// A value answered by the store.
    pub fn from_store(value: T) -> Self {
        Self {
            value,
            from_cache: false,
            served_at: Utc::now(),
            synced_at: None,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Check if this was answered from the snapshot.
    pub fn was_cache_hit(&self) -> bool {
        self.from_cache
    }

    pub fn served_at(&self) -> Timestamp {
        self.served_at
    }

    /// Time of the last full reload behind a cache hit. `None` for store reads.
    pub fn synced_at(&self) -> Option<Timestamp> {
        self.synced_at
    }

    /// How long ago the snapshot behind this read was fully synchronized.
    ///
    /// Zero for store reads. Incremental writes keep the snapshot current, so
    /// this measures time since the last full scan, not data staleness.
    pub fn since_sync(&self) -> Duration {
        self.synced_at
            .and_then(|at| (self.served_at - at).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> Served<U>
    where
        F: FnOnce(T) -> U,
    {
        Served {
            value: f(self.value),
            from_cache: self.from_cache,
            served_at: self.served_at,
            synced_at: self.synced_at,
        }
    }
}

impl<T> AsRef<T> for Served<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_served_from_cache() {
        let synced = Utc::now() - chrono::Duration::seconds(5);
        let served = Served::from_cache(42, Some(synced));
        assert!(served.was_cache_hit());
        assert_eq!(served.synced_at(), Some(synced));
        assert!(served.since_sync() >= Duration::from_secs(5));
        assert_eq!(served.into_value(), 42);
    }

    #[test]
    fn test_served_from_store() {
        let served = Served::from_store("plate");
        assert!(!served.was_cache_hit());
        assert_eq!(served.synced_at(), None);
        assert_eq!(served.since_sync(), Duration::ZERO);
    }

    #[test]
    fn test_served_map_keeps_annotation() {
        let served = Served::from_cache(vec![1, 2, 3], None).map(|v| v.len());
        assert!(served.was_cache_hit());
        assert_eq!(*served.value(), 3);
    }
}
