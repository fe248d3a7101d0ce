//! Candidate path cache
//!
//! Path discovery results keyed by token pair, swap direction and pool
//! snapshot epoch. Entries are never expired by time: a new epoch gives a
//! new key, and a new pool set clears the cache.

use dashmap::DashMap;

use crate::types::{Path, PoolTypeFilter, SwapType};

/// Cache key for one discovery request
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct RouteKey {
    pub token_in: String,
    pub token_out: String,
    pub swap_type: SwapType,
    pub timestamp: i64,
    pub pool_type_filter: PoolTypeFilter,
}

impl RouteKey {
    pub fn new(token_in: &str, token_out: &str, swap_type: SwapType, timestamp: i64) -> Self {
        Self {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            swap_type,
            timestamp,
            pool_type_filter: PoolTypeFilter::All,
        }
    }

    pub fn with_pool_type_filter(mut self, filter: PoolTypeFilter) -> Self {
        self.pool_type_filter = filter;
        self
    }
}

/// Concurrent map from `RouteKey` to limit-sorted candidate paths
#[derive(Debug, Default)]
pub struct RouteCache {
    routes: DashMap<RouteKey, Vec<Path>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached paths for a route
    pub fn get(&self, key: &RouteKey) -> Option<Vec<Path>> {
        self.routes.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: RouteKey, paths: Vec<Path>) {
        self.routes.insert(key, paths);
    }

    /// Drop a single route
    pub fn invalidate(&self, key: &RouteKey) -> bool {
        self.routes.remove(key).is_some()
    }

    /// Drop every route (after a new pool set is loaded)
    pub fn clear(&self) {
        self.routes.clear();
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_distinguish_direction_and_epoch() {
        let cache = RouteCache::new();
        cache.insert(RouteKey::new("a", "b", SwapType::ExactIn, 1), Vec::new());

        assert!(cache.get(&RouteKey::new("a", "b", SwapType::ExactIn, 1)).is_some());
        assert!(cache.get(&RouteKey::new("a", "b", SwapType::ExactOut, 1)).is_none());
        assert!(cache.get(&RouteKey::new("a", "b", SwapType::ExactIn, 2)).is_none());
        assert!(cache.get(&RouteKey::new("b", "a", SwapType::ExactIn, 1)).is_none());
        assert!(cache
            .get(&RouteKey::new("a", "b", SwapType::ExactIn, 1).with_pool_type_filter(PoolTypeFilter::Stable))
            .is_none());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = RouteCache::new();
        let key = RouteKey::new("a", "b", SwapType::ExactIn, 1);
        cache.insert(key.clone(), Vec::new());
        cache.insert(RouteKey::new("a", "c", SwapType::ExactIn, 1), Vec::new());
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
