use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::hull::{Boundary, HullOptions, HullType};
use crate::reachability::ReachableSubgraph;

/// Identity of an isochrone computation on one network.
///
/// Floats are keyed by their bit patterns, so only bit-identical requests
/// share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsochroneKey {
    lon: u64,
    lat: u64,
    budget: u64,
    hull_type: HullType,
    alpha: u64,
}

impl IsochroneKey {
    pub fn new(lat: f64, lon: f64, budget: f64, options: HullOptions) -> Self {
        // alpha has no effect on a convex hull
        let alpha = match options.hull_type {
            HullType::Concave => options.alpha,
            HullType::Convex => 0.0,
        };
        Self {
            lon: lon.to_bits(),
            lat: lat.to_bits(),
            budget: budget.to_bits(),
            hull_type: options.hull_type,
            alpha: alpha.to_bits(),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct CachedIsochrone {
    pub boundary: Boundary,
    pub subgraph: ReachableSubgraph,
}

/// Least-recently-used store of computed isochrones, owned by a generator.
pub struct IsochroneCache {
    entries: LruCache<IsochroneKey, CachedIsochrone>,
}

impl IsochroneCache {
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &IsochroneKey) -> Option<&CachedIsochrone> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: IsochroneKey, isochrone: CachedIsochrone) {
        self.entries.put(key, isochrone);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl fmt::Debug for IsochroneCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsochroneCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl fmt::Debug for CachedIsochrone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedIsochrone")
            .field("parts", &self.boundary.part_count())
            .field("nodes", &self.subgraph.node_count())
            .finish()
    }
}
