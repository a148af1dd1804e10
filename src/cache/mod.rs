//! Read cache.
//!
//! Cacheable GETs are listed in a [`CachePolicy`], keyed by a [`Fingerprint`]
//! and stored in a [`ReadCache`]. The [`InvalidationTable`] says which cached
//! reads a successful write removes. Anything not covered is tolerated to be
//! stale for at most one TTL.

mod fingerprint;
mod invalidation;
mod pattern;
mod policy;
mod store;

pub use fingerprint::Fingerprint;
pub use invalidation::{InvalidationRule, InvalidationTable, Target};
pub use pattern::{Captures, EndpointPattern};
pub use policy::CachePolicy;
pub use store::ReadCache;

/// Counters for a [`ReadCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Share of lookups served from the cache, 0.0 when there were none.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
