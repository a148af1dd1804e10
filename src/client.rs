use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::{CachePolicy, CacheStats, Fingerprint, InvalidationTable, ReadCache};
use crate::credential::{CredentialManager, CredentialStore};
use crate::interceptor::{Navigator, RequestInterceptor};
use crate::permissions::{AccessSnapshot, PermissionResolver};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::{ClientConfig, ClientError};

/// Result of loading data for a gated tab.
#[derive(Debug, Clone, PartialEq)]
pub enum TabView<T> {
    Granted(T),
    /// The tab is hidden for this role/override combination. Render the
    /// "contact an administrator" surface; nothing was fetched.
    Restricted,
}

impl<T> TabView<T> {
    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::Restricted)
    }

    pub fn granted(self) -> Option<T> {
        match self {
            Self::Granted(value) => Some(value),
            Self::Restricted => None,
        }
    }
}

/// The API surface UI code talks to.
///
/// Reads listed in the [`CachePolicy`] are served from the [`ReadCache`] while
/// fresh. Successful writes drop the reads the [`InvalidationTable`] pairs
/// them with before returning. A rejected session clears the cache.
pub struct ApiClient {
    interceptor: Arc<RequestInterceptor>,
    cache: Arc<ReadCache>,
    policy: CachePolicy,
    invalidation: InvalidationTable,
    resolver: PermissionResolver,
    cache_enabled: bool,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let credentials = Arc::new(CredentialManager::new(store, config.credential.ttl));
        let interceptor = Arc::new(RequestInterceptor::new(
            transport,
            credentials,
            navigator,
            config.timeouts.clone(),
        ));

        let cache = Arc::new(ReadCache::new());
        let on_invalid = Arc::clone(&cache);
        interceptor.on_session_invalid(move || {
            on_invalid.clear();
        });

        Self {
            interceptor,
            cache,
            policy: CachePolicy::standard(config.cache.default_ttl),
            invalidation: InvalidationTable::standard(),
            resolver: PermissionResolver::default(),
            cache_enabled: config.cache.enabled,
        }
    }

    #[must_use]
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_invalidation_table(mut self, table: InvalidationTable) -> Self {
        self.invalidation = table;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: PermissionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn interceptor(&self) -> &Arc<RequestInterceptor> {
        &self.interceptor
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        self.interceptor.credentials()
    }

    pub fn cache(&self) -> &ReadCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub fn cache_policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn invalidation_table(&self) -> &InvalidationTable {
        &self.invalidation
    }

    /// GET returning the raw body. `Value::Null` if the session was rejected.
    ///
    /// # Errors
    ///
    /// Whatever the interceptor surfaces: `Transient`, `Validation`, `Http`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, params), err))]
    pub async fn get_value(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, ClientError> {
        let ttl = if self.cache_enabled {
            self.policy.ttl_for(path)
        } else {
            None
        };

        if ttl.is_some() {
            let scope = self.credentials().current().and_then(|c| c.org_id);
            let key = Fingerprint::new(scope, path, params);
            if let Some(value) = self.cache.get(key.as_str()) {
                log::trace!(target: "orgsession::cache", "msg=\"cache hit\" key=\"{key}\"");
                return Ok(value);
            }
        }

        let request = ApiRequest::get(path).query_pairs(params);
        let Some(delivered) = self.interceptor.dispatch(request).await? else {
            return Ok(Value::Null);
        };

        // only a response for the live credential may populate the cache
        if let Some(ttl) = ttl {
            if delivered.epoch == self.credentials().epoch() {
                let key = Fingerprint::new(delivered.org_id, path, params);
                self.cache.set(key.as_str(), delivered.response.body.clone(), ttl);
            }
        }

        Ok(delivered.response.body)
    }

    /// GET decoded into `T`. A rejected session yields `T::default()`.
    ///
    /// # Errors
    ///
    /// As [`get_value`](Self::get_value), plus `Decode` for an unexpected
    /// body.
    pub async fn get_json<T>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Default,
    {
        decode(self.get_value(path, params).await?)
    }

    /// Loads `path` for `tab`, or returns `Restricted` without any request
    /// if `snapshot` does not allow the tab.
    ///
    /// # Errors
    ///
    /// As [`get_json`](Self::get_json).
    pub async fn get_for_tab<T>(
        &self,
        tab: &str,
        snapshot: &AccessSnapshot,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<TabView<T>, ClientError>
    where
        T: DeserializeOwned + Default,
    {
        if !snapshot.can_view(&self.resolver, tab) {
            log::debug!(
                target: "orgsession::session",
                "msg=\"tab restricted\" tab=\"{tab}\" role={} org_id={:?}",
                snapshot.role,
                snapshot.org_id
            );
            return Ok(TabView::Restricted);
        }
        Ok(TabView::Granted(self.get_json(path, params).await?))
    }

    /// Sends any request. Mutations that succeed invalidate their paired
    /// cached reads before this returns.
    ///
    /// # Errors
    ///
    /// Whatever the interceptor surfaces.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(method = %request.method, path = %request.path), err)
    )]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let method = request.method;
        let path = request.path.clone();

        let Some(delivered) = self.interceptor.dispatch(request).await? else {
            return Ok(ApiResponse::empty());
        };

        if method.is_mutating() {
            self.invalidation
                .apply(&self.cache, delivered.org_id, method, &path);
        }

        Ok(delivered.response)
    }

    /// # Errors
    ///
    /// As [`send`](Self::send), plus `Decode` for an unexpected body.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        decode(self.send(ApiRequest::post(path).json(body)).await?.body)
    }

    /// # Errors
    ///
    /// As [`send`](Self::send), plus `Decode` for an unexpected body.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        decode(self.send(ApiRequest::put(path).json(body)).await?.body)
    }

    /// # Errors
    ///
    /// As [`send`](Self::send), plus `Decode` for an unexpected body.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        decode(self.send(ApiRequest::patch(path).json(body)).await?.body)
    }

    /// # Errors
    ///
    /// As [`send`](Self::send).
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }
}

fn decode<T>(body: Value) -> Result<T, ClientError>
where
    T: DeserializeOwned + Default,
{
    if body.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}
