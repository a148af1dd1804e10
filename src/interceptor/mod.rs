//! Uniform request/response handling.
//!
//! Every outbound call goes through [`RequestInterceptor`]. It attaches the
//! bearer credential, applies the per-endpoint timeout and reacts to a
//! rejected session so call sites never have to.

mod failure;
mod liveness;
mod navigator;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
pub use failure::{classify, flatten_detail, is_auth_failure_message};
pub use liveness::{LivenessProbe, ProbeOutcome};
pub use navigator::{HeadlessNavigator, Navigator, View};

use crate::ClientError;
use crate::config::TimeoutConfig;
use crate::credential::CredentialManager;
use crate::events::{SessionEvent, dispatch};
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

type SessionHook = Box<dyn Fn() + Send + Sync>;

/// A response that made it through the interceptor.
#[derive(Debug, Clone)]
pub(crate) struct Delivered {
    pub response: ApiResponse,
    /// Credential epoch the request was sent under.
    pub epoch: u64,
    /// Organization of the credential the request was sent with.
    pub org_id: Option<i64>,
}

/// Attaches credentials and handles session rejection centrally.
///
/// A 401 or 403 on any endpoint:
/// 1. clears the credential,
/// 2. schedules one redirect to the login view (unless already there),
/// 3. hands the caller an empty result instead of an error.
///
/// Responses that arrive after the credential they were sent with was
/// cleared or replaced are dropped the same way, without touching state.
pub struct RequestInterceptor {
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialManager>,
    navigator: Arc<dyn Navigator>,
    timeouts: TimeoutConfig,
    redirect_scheduled: AtomicBool,
    hooks: RwLock<Vec<SessionHook>>,
}

impl RequestInterceptor {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialManager>,
        navigator: Arc<dyn Navigator>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            navigator,
            timeouts,
            redirect_scheduled: AtomicBool::new(false),
            hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Registers a hook run every time the session is invalidated.
    pub fn on_session_invalid(&self, hook: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut hooks) = self.hooks.write() {
            hooks.push(Box::new(hook));
        }
    }

    /// Re-arms redirect scheduling once a new session is established.
    pub fn session_established(&self) {
        self.redirect_scheduled.store(false, Ordering::SeqCst);
    }

    /// Sends a request.
    ///
    /// A rejected session yields `ApiResponse::empty()`, never an error.
    ///
    /// # Errors
    ///
    /// `Transient` for network failures, `Validation` for structured 4xx
    /// rejections, `Http` for everything else.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        Ok(self
            .dispatch(request)
            .await?
            .map_or_else(ApiResponse::empty, |delivered| delivered.response))
    }

    /// Sends a request and reports whether the response was delivered.
    ///
    /// `Ok(None)` means the interceptor consumed the response.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dispatch",
            skip_all,
            fields(method = %request.method, path = %request.path),
            err
        )
    )]
    pub(crate) async fn dispatch(
        &self,
        mut request: ApiRequest,
    ) -> Result<Option<Delivered>, ClientError> {
        let epoch = self.credentials.epoch();
        let credential = self.credentials.current();
        let org_id = credential.as_ref().and_then(|c| c.org_id);

        request.bearer = credential.map(|c| c.token);
        request.timeout = Some(self.timeouts.for_path(&request.path));
        let method = request.method;
        let path = request.path.clone();

        let result = self.transport.send(request).await;

        if self.credentials.epoch() != epoch {
            log::debug!(
                target: "orgsession::interceptor",
                "msg=\"dropping response from a previous credential\" method={method} path=\"{path}\""
            );
            return Ok(None);
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                log::warn!(
                    target: "orgsession::interceptor",
                    "msg=\"request failed\" method={method} path=\"{path}\" error=\"{e}\""
                );
                return Err(match e {
                    TransportError::Timeout => ClientError::Transient("request timed out".to_owned()),
                    TransportError::Connect(msg) | TransportError::Other(msg) => {
                        ClientError::Transient(msg)
                    }
                });
            }
        };

        if response.is_session_invalid() {
            self.invalidate_session(&format!("{} on {method} {path}", response.status))
                .await;
            return Ok(None);
        }

        if !response.is_success() {
            let err = classify(response.status, &response.body);
            log::debug!(
                target: "orgsession::interceptor",
                "msg=\"request rejected\" method={method} path=\"{path}\" status={} error=\"{err}\"",
                response.status
            );
            return Err(err);
        }

        Ok(Some(Delivered {
            response,
            epoch,
            org_id,
        }))
    }

    /// Backstop for failures that never went through [`send`](Self::send).
    ///
    /// If `message` uses authorization vocabulary the session is invalidated
    /// exactly as for a 401. Returns whether the message was treated as one.
    pub async fn report_unhandled(&self, message: &str) -> bool {
        if !is_auth_failure_message(message) {
            return false;
        }
        if !self.credentials.is_present() && self.redirect_scheduled.load(Ordering::SeqCst) {
            return true;
        }
        self.invalidate_session("unhandled authorization failure").await;
        true
    }

    /// Clears the credential, runs hooks and schedules one login redirect.
    pub(crate) async fn invalidate_session(&self, reason: &str) {
        self.credentials.revoke();

        if let Ok(hooks) = self.hooks.read() {
            for hook in hooks.iter() {
                hook();
            }
        }

        let on_login = self.navigator.current_view().is_login();
        let first = !self.redirect_scheduled.swap(true, Ordering::SeqCst);
        if first && !on_login {
            self.navigator.schedule_login_redirect();
        }

        log::warn!(
            target: "orgsession::interceptor",
            "msg=\"session invalidated\" reason=\"{reason}\" redirect_scheduled={}",
            first && !on_login
        );

        if first {
            dispatch(SessionEvent::SessionInvalidated {
                reason: reason.to_owned(),
                at: Utc::now(),
            })
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::SecretString;
    use crate::credential::InMemoryCredentialStore;
    use crate::mocks::MockBackend;

    struct Fixture {
        backend: Arc<MockBackend>,
        navigator: HeadlessNavigator,
        interceptor: RequestInterceptor,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(MockBackend::standard());
        let navigator = HeadlessNavigator::at(View::Page("clients".to_owned()));
        let credentials = Arc::new(CredentialManager::new(
            Arc::new(InMemoryCredentialStore::new()),
            Duration::days(1),
        ));
        let interceptor = RequestInterceptor::new(
            backend.clone(),
            credentials,
            Arc::new(navigator.clone()),
            TimeoutConfig::default(),
        );
        Fixture {
            backend,
            navigator,
            interceptor,
        }
    }

    #[tokio::test]
    async fn test_attaches_bearer_when_present() {
        let f = fixture();
        let token = f.backend.issue_token("owner@acme.test", Some(1));
        f.interceptor
            .credentials()
            .install(SecretString::new(token.clone()), Some(1))
            .await
            .unwrap();

        let response = f.interceptor.send(ApiRequest::get("/auth/me")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(f.backend.last_bearer().as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_sends_unauthenticated_without_credential() {
        let f = fixture();

        let response = f
            .interceptor
            .send(ApiRequest::get("/auth/invite/validate").query("token", "nope"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(f.backend.last_bearer().is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_clears_and_returns_empty() {
        let f = fixture();
        f.interceptor
            .credentials()
            .install(SecretString::new("revoked-token"), Some(1))
            .await
            .unwrap();

        let response = f.interceptor.send(ApiRequest::get("/clients")).await.unwrap();

        assert_eq!(response, ApiResponse::empty());
        assert!(!f.interceptor.credentials().is_present());
        assert_eq!(f.navigator.scheduled_redirects(), 1);
    }

    #[tokio::test]
    async fn test_no_redirect_when_already_on_login() {
        let f = fixture();
        f.navigator.navigate(View::Login);

        let response = f
            .interceptor
            .send(ApiRequest::post("/auth/login").json(&json!({"email": "x@y.z", "password": "bad"})))
            .await
            .unwrap();

        assert!(response.is_empty());
        assert_eq!(f.navigator.scheduled_redirects(), 0);
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let f = fixture();
        f.backend.fail_next("/clients", 500, json!({"detail": "database unavailable"}));
        let token = f.backend.issue_token("owner@acme.test", Some(1));
        f.interceptor
            .credentials()
            .install(SecretString::new(token), Some(1))
            .await
            .unwrap();

        let err = f.interceptor.send(ApiRequest::get("/clients")).await.unwrap_err();

        assert_eq!(
            err,
            ClientError::Http {
                status: 500,
                message: "database unavailable".to_owned()
            }
        );
        assert!(f.interceptor.credentials().is_present());
    }

    #[tokio::test]
    async fn test_transport_failure_is_transient() {
        let f = fixture();
        f.backend.disconnect_next("/clients");

        let err = f.interceptor.send(ApiRequest::get("/clients")).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(f.navigator.scheduled_redirects(), 0);
    }

    #[tokio::test]
    async fn test_hooks_run_on_invalidation() {
        let f = fixture();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        f.interceptor.on_session_invalid(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        f.interceptor.send(ApiRequest::get("/clients")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_report_unhandled_matches_vocabulary() {
        let f = fixture();
        f.interceptor
            .credentials()
            .install(SecretString::new("tok"), Some(1))
            .await
            .unwrap();

        assert!(!f.interceptor.report_unhandled("TypeError: x is undefined").await);
        assert!(f.interceptor.credentials().is_present());

        assert!(f.interceptor.report_unhandled("Request failed with status code 401").await);
        assert!(!f.interceptor.credentials().is_present());
        assert_eq!(f.navigator.scheduled_redirects(), 1);

        // second report while the redirect is pending does nothing new
        assert!(f.interceptor.report_unhandled("Unauthorized").await);
        assert_eq!(f.navigator.scheduled_redirects(), 1);
    }

    #[tokio::test]
    async fn test_slow_endpoint_gets_slow_timeout() {
        let f = fixture();
        let token = f.backend.issue_token("owner@acme.test", Some(1));
        f.interceptor
            .credentials()
            .install(SecretString::new(token), Some(1))
            .await
            .unwrap();

        f.interceptor
            .send(ApiRequest::post("/integrations/stripe/sync"))
            .await
            .unwrap();
        assert_eq!(f.backend.last_timeout(), Some(Duration::minutes(3)));

        f.interceptor.send(ApiRequest::get("/clients")).await.unwrap();
        assert_eq!(f.backend.last_timeout(), Some(Duration::seconds(15)));
    }
}
