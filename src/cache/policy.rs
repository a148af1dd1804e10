use chrono::Duration;

use super::EndpointPattern;

/// Which GET endpoints are cached, and for how long.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    default_ttl: Duration,
    endpoints: Vec<(EndpointPattern, Duration)>,
}

impl CachePolicy {
    /// A policy caching nothing.
    pub fn empty(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            endpoints: Vec::new(),
        }
    }

    /// The dashboard's cacheable reads, all at `default_ttl`.
    pub fn standard(default_ttl: Duration) -> Self {
        Self::empty(default_ttl)
            .cache("/clients")
            .cache("/clients/{client_id}/payments")
            .cache("/funnels")
            .cache("/integrations/status")
    }

    /// Caches `pattern` at the default TTL.
    #[must_use]
    pub fn cache(self, pattern: &str) -> Self {
        let ttl = self.default_ttl;
        self.cache_for(pattern, ttl)
    }

    #[must_use]
    pub fn cache_for(mut self, pattern: &str, ttl: Duration) -> Self {
        let pattern = EndpointPattern::parse(pattern);
        self.endpoints.retain(|(existing, _)| !existing.is_same_shape(&pattern));
        self.endpoints.push((pattern, ttl));
        self
    }

    /// TTL for a read of `path`, or `None` if it is not cached.
    pub fn ttl_for(&self, path: &str) -> Option<Duration> {
        self.endpoints
            .iter()
            .find(|(pattern, _)| pattern.matches(path).is_some())
            .map(|(_, ttl)| *ttl)
    }

    pub fn is_cacheable(&self, path: &str) -> bool {
        self.ttl_for(path).is_some()
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointPattern> {
        self.endpoints.iter().map(|(pattern, _)| pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_endpoints() {
        let policy = CachePolicy::standard(Duration::seconds(60));

        assert_eq!(policy.ttl_for("/clients"), Some(Duration::seconds(60)));
        assert!(policy.is_cacheable("/clients/9/payments"));
        assert!(policy.is_cacheable("/integrations/status"));
        assert!(!policy.is_cacheable("/auth/me"));
        assert!(!policy.is_cacheable("/clients/9"));
    }

    #[test]
    fn test_override_ttl() {
        let policy = CachePolicy::standard(Duration::seconds(60))
            .cache_for("/integrations/status", Duration::seconds(5));

        assert_eq!(policy.ttl_for("/integrations/status"), Some(Duration::seconds(5)));
        assert_eq!(policy.endpoints().count(), 4);
    }
}
