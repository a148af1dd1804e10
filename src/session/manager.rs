use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use serde_json::json;

use super::types::{LoginRequest, LoginResponse, TokenResponse};
use super::{ActiveSession, Identity, Organization, SessionState};
use crate::events::{SessionEvent, dispatch};
use crate::interceptor::LivenessProbe;
use crate::permissions::{AccessSnapshot, OverrideTable, normalize_tab};
use crate::transport::ApiRequest;
use crate::validators::{normalize_email, validate_login_password};
use crate::{ApiClient, ClientConfig, ClientError, SecretString};

/// What a login produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Active(ActiveSession),
    /// The user belongs to several organizations; call
    /// [`SessionManager::select_organization`] with one of these.
    SelectOrganization(Vec<Organization>),
}

/// Credentials kept while the user picks an organization and the backend did
/// not hand out a provisional token.
struct PendingLogin {
    email: String,
    password: SecretString,
}

/// Drives login, organization selection and switch, and logout.
///
/// Identity and tab access are always loaded from the backend
/// (`GET /auth/me`, `GET /users/tabs/access`) for the credential in use,
/// never carried over from a previous organization.
pub struct SessionManager {
    client: Arc<ApiClient>,
    state: RwLock<SessionState>,
    pending: Mutex<Option<PendingLogin>>,
    liveness: LivenessProbe,
}

impl SessionManager {
    pub fn new(client: Arc<ApiClient>, config: &ClientConfig) -> Self {
        let liveness = LivenessProbe::new(Arc::clone(client.interceptor()), config);
        Self {
            client,
            state: RwLock::new(SessionState::Anonymous),
            pending: Mutex::new(None),
            liveness,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn liveness(&self) -> &LivenessProbe {
        &self.liveness
    }

    /// Current state. An active session whose credential has disappeared
    /// (rejected, expired) reads as anonymous.
    pub fn state(&self) -> SessionState {
        let current = self.read_state();
        if current.is_active() && !self.client.credentials().is_present() {
            self.become_anonymous();
            return SessionState::Anonymous;
        }
        current
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state().active().map(|session| session.identity.clone())
    }

    pub fn access(&self) -> Option<AccessSnapshot> {
        self.state().active().map(|session| session.access.clone())
    }

    /// Whether `tab` is visible with the access loaded last. No request.
    pub fn can_view(&self, tab: &str) -> bool {
        self.access()
            .is_some_and(|access| access.can_view(self.client.resolver(), tab))
    }

    /// Filters a navigation list with the same rules as [`can_view`](Self::can_view).
    pub fn visible_tabs<'a>(&self, tabs: &[&'a str]) -> Vec<&'a str> {
        match self.access() {
            Some(access) => self
                .client
                .resolver()
                .visible_tabs(access.role, &access.overrides, tabs),
            None => Vec::new(),
        }
    }

    /// Restores a session from a stored credential.
    ///
    /// Also finishes an activation that failed midway (for example a
    /// transient error right after a switch).
    ///
    /// # Errors
    ///
    /// Transient and decode failures while loading identity or access. The
    /// credential is kept so bootstrap can be retried.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "bootstrap", skip_all, err))]
    pub async fn bootstrap(&self) -> Result<SessionState, ClientError> {
        if !self.client.credentials().is_present() {
            self.become_anonymous();
            return Ok(SessionState::Anonymous);
        }

        let current = self.read_state();
        if let SessionState::OrgSelectionPending { .. } = current {
            // the credential is provisional until an organization is picked
            return Ok(current);
        }

        self.set_state(SessionState::Authenticating);
        self.activate().await
    }

    /// Logs in.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed email or blank password (no request)
    /// - `InvalidCredentials` when the backend rejects the login
    /// - `CredentialNotPersisted` when the token could not be stored
    /// - transient and decode failures
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "login", skip_all, err))]
    pub async fn login(
        &self,
        email: &str,
        password: SecretString,
        org_id: Option<i64>,
    ) -> Result<LoginOutcome, ClientError> {
        let email = normalize_email(email)?;
        let email = email.as_str();
        validate_login_password(password.expose_secret())?;

        self.clear_pending();
        self.set_state(SessionState::Authenticating);

        let request = ApiRequest::post("/auth/login").json(&LoginRequest {
            email,
            password: password.expose_secret(),
            org_id,
        });

        let response = match self.client.send(request).await {
            Ok(response) if response.is_empty() => {
                return Err(self.login_failed(email, ClientError::InvalidCredentials).await);
            }
            Ok(response) => response,
            Err(e) => return Err(self.login_failed(email, e).await),
        };

        let body: LoginResponse = match serde_json::from_value(response.body) {
            Ok(body) => body,
            Err(e) => return Err(self.login_failed(email, ClientError::Decode(e.to_string())).await),
        };

        if body.requires_org_selection {
            return self.await_selection(email, password, body).await;
        }

        let Some(token) = body.access_token else {
            let err = ClientError::Decode("login response has no access_token".to_owned());
            return Err(self.login_failed(email, err).await);
        };

        if let Err(e) = self.client.credentials().install(token.into(), org_id).await {
            return Err(self.login_failed(email, e).await);
        }
        self.client.cache().clear();

        match self.activate().await? {
            SessionState::Active(session) => {
                dispatch(SessionEvent::LoginSucceeded {
                    user_id: session.identity.id,
                    email: session.identity.email.clone(),
                    org_id: session.org_id(),
                    at: Utc::now(),
                })
                .await;
                log::info!(
                    target: "orgsession::session",
                    "msg=\"login success\" user_id={} org_id={:?}",
                    session.identity.id,
                    session.org_id()
                );
                Ok(LoginOutcome::Active(session))
            }
            _ => Err(self.login_failed(email, ClientError::InvalidCredentials).await),
        }
    }

    /// Completes a login that asked for an organization.
    ///
    /// # Errors
    ///
    /// `InvalidState` outside org-selection-pending, `Validation` for an
    /// organization not offered. With a provisional token a failed exchange
    /// leaves selection pending; without one the retried login's errors
    /// apply.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "select_organization", skip(self), err))]
    pub async fn select_organization(&self, org_id: i64) -> Result<SessionState, ClientError> {
        let SessionState::OrgSelectionPending { organizations } = self.read_state() else {
            return Err(ClientError::InvalidState(
                "no organization selection is pending".to_owned(),
            ));
        };
        if !organizations.iter().any(|org| org.id == org_id) {
            return Err(ClientError::Validation(format!(
                "organization {org_id} is not one of the offered organizations"
            )));
        }

        let pending = self.pending.lock().ok().and_then(|mut pending| pending.take());
        if let Some(PendingLogin { email, password }) = pending {
            return match self.login(&email, password, Some(org_id)).await? {
                LoginOutcome::Active(session) => Ok(SessionState::Active(session)),
                LoginOutcome::SelectOrganization(_) => Ok(self.read_state()),
            };
        }

        if !self.client.credentials().is_present() {
            self.become_anonymous();
            return Err(ClientError::InvalidState(
                "selection expired; log in again".to_owned(),
            ));
        }

        let restore = SessionState::OrgSelectionPending { organizations };
        self.set_state(SessionState::Authenticating);
        let state = self.exchange_for_org(org_id, restore).await?;
        if let SessionState::Active(session) = &state {
            dispatch(SessionEvent::LoginSucceeded {
                user_id: session.identity.id,
                email: session.identity.email.clone(),
                org_id: session.org_id(),
                at: Utc::now(),
            })
            .await;
        }
        Ok(state)
    }

    /// Moves the active session to another organization.
    ///
    /// Everything cached for the old organization is dropped before the new
    /// one is loaded, and responses still in flight for the old credential
    /// are discarded on arrival.
    ///
    /// # Errors
    ///
    /// `InvalidState` without an active session. A failed switch that did
    /// not end the session restores the previous organization and returns
    /// the error.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "switch_organization", skip(self), err))]
    pub async fn switch_organization(&self, org_id: i64) -> Result<SessionState, ClientError> {
        let previous = self.state();
        let Some(from) = previous.active().map(ActiveSession::org_id) else {
            return Err(ClientError::InvalidState(
                "switching organization requires an active session".to_owned(),
            ));
        };
        if from == Some(org_id) {
            return Ok(previous);
        }

        self.set_state(SessionState::Authenticating);
        let state = self.exchange_for_org(org_id, previous).await?;

        if state.is_active() {
            dispatch(SessionEvent::OrganizationSwitched {
                from,
                to: org_id,
                at: Utc::now(),
            })
            .await;
            log::info!(
                target: "orgsession::session",
                "msg=\"organization switched\" from={from:?} to={org_id}"
            );
        }
        Ok(state)
    }

    /// Reloads identity, role and tab overrides for the active organization.
    /// `None` if there is no active session any more.
    ///
    /// # Errors
    ///
    /// Transient and decode failures; the previous snapshot stays in place.
    pub async fn refresh_access(&self) -> Result<Option<AccessSnapshot>, ClientError> {
        let Some(session) = self.state().active().cloned() else {
            return Ok(None);
        };

        let Some(me) = self.fetch_identity().await? else {
            return Ok(None);
        };
        let Some(overrides) = self.fetch_overrides().await? else {
            return Ok(None);
        };

        if me.org_id != session.org_id() {
            // the backend moved us; treat it like a switch
            self.client.credentials().rescope(me.org_id);
            self.client.cache().clear();
        }

        let access = AccessSnapshot::new(me.org_id, me.role, overrides);
        self.set_state(SessionState::Active(ActiveSession {
            identity: me,
            access: access.clone(),
        }));
        Ok(Some(access))
    }

    /// Navigation guard: re-fetches access, then resolves `tab`.
    ///
    /// A transient failure falls back to the access loaded last.
    pub async fn enter_tab(&self, tab: &str) -> bool {
        let tab = normalize_tab(tab);
        match self.refresh_access().await {
            Ok(Some(access)) => access.can_view(self.client.resolver(), &tab),
            Ok(None) => false,
            Err(e) => {
                log::warn!(
                    target: "orgsession::session",
                    "msg=\"access refresh failed, using last known access\" tab=\"{tab}\" error=\"{e}\""
                );
                self.can_view(&tab)
            }
        }
    }

    /// Ends the session locally. In-flight requests are not cancelled; their
    /// responses are dropped on arrival.
    pub async fn logout(&self) {
        let user_id = self.read_state().active().map(|s| s.identity.id);

        self.client.credentials().revoke();
        self.client.cache().clear();
        self.become_anonymous();

        dispatch(SessionEvent::LoggedOut {
            user_id,
            at: Utc::now(),
        })
        .await;
        log::info!(target: "orgsession::session", "msg=\"logout\" user_id={user_id:?}");
    }

    /// Installs a token obtained outside login (invitation accept) and
    /// activates the session with it.
    pub(crate) async fn activate_with_token(
        &self,
        token: SecretString,
    ) -> Result<SessionState, ClientError> {
        self.clear_pending();
        self.set_state(SessionState::Authenticating);
        if let Err(e) = self.client.credentials().install(token, None).await {
            self.become_anonymous();
            return Err(e);
        }
        self.client.cache().clear();
        self.activate().await
    }

    async fn await_selection(
        &self,
        email: &str,
        password: SecretString,
        body: LoginResponse,
    ) -> Result<LoginOutcome, ClientError> {
        match body.access_token {
            Some(provisional) => {
                if let Err(e) = self.client.credentials().install(provisional.into(), None).await {
                    return Err(self.login_failed(email, e).await);
                }
            }
            None => {
                // the previous credential must not serve reads for this identity
                self.client.credentials().revoke();
                if let Ok(mut pending) = self.pending.lock() {
                    *pending = Some(PendingLogin {
                        email: email.to_owned(),
                        password,
                    });
                }
            }
        }

        self.client.cache().clear();
        let organizations = body.organizations;
        self.set_state(SessionState::OrgSelectionPending {
            organizations: organizations.clone(),
        });

        dispatch(SessionEvent::OrganizationSelectionRequired {
            email: email.to_owned(),
            organizations: organizations.len(),
            at: Utc::now(),
        })
        .await;
        log::info!(
            target: "orgsession::session",
            "msg=\"organization selection required\" organizations={}",
            organizations.len()
        );

        Ok(LoginOutcome::SelectOrganization(organizations))
    }

    /// `POST /auth/switch-organization`, then install and activate.
    ///
    /// `restore` is put back if the exchange fails without ending the
    /// session.
    async fn exchange_for_org(
        &self,
        org_id: i64,
        restore: SessionState,
    ) -> Result<SessionState, ClientError> {
        let request = ApiRequest::post("/auth/switch-organization").json(&json!({ "org_id": org_id }));

        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(e) => {
                self.restore_or_drop(restore);
                return Err(e);
            }
        };
        if response.is_empty() {
            // rejected: the interceptor already cleared the credential
            self.become_anonymous();
            return Ok(SessionState::Anonymous);
        }

        let token = match serde_json::from_value::<TokenResponse>(response.body) {
            Ok(body) => body.access_token,
            Err(e) => {
                self.restore_or_drop(restore);
                return Err(ClientError::Decode(e.to_string()));
            }
        };

        if let Err(e) = self
            .client
            .credentials()
            .install(token.into(), Some(org_id))
            .await
        {
            self.become_anonymous();
            return Err(e);
        }
        let dropped = self.client.cache().clear();
        log::debug!(
            target: "orgsession::session",
            "msg=\"cache cleared for organization change\" org_id={org_id} dropped={dropped}"
        );

        self.activate().await
    }

    /// Loads identity and access for the installed credential.
    async fn activate(&self) -> Result<SessionState, ClientError> {
        let loaded = async {
            let Some(identity) = self.fetch_identity().await? else {
                return Ok(None);
            };
            self.client.credentials().rescope(identity.org_id);
            let Some(overrides) = self.fetch_overrides().await? else {
                return Ok(None);
            };
            Ok::<_, ClientError>(Some((identity, overrides)))
        }
        .await;

        match loaded {
            Ok(Some((identity, overrides))) => {
                let access = AccessSnapshot::new(identity.org_id, identity.role, overrides);
                let state = SessionState::Active(ActiveSession { identity, access });
                self.set_state(state.clone());
                self.client.interceptor().session_established();
                self.liveness.start();
                Ok(state)
            }
            Ok(None) => {
                self.become_anonymous();
                Ok(SessionState::Anonymous)
            }
            Err(e) => {
                log::warn!(
                    target: "orgsession::session",
                    "msg=\"session activation failed\" error=\"{e}\""
                );
                Err(e)
            }
        }
    }

    /// `None` when the session was rejected.
    async fn fetch_identity(&self) -> Result<Option<Identity>, ClientError> {
        let body = self.client.get_value("/auth/me", &[]).await?;
        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn fetch_overrides(&self) -> Result<Option<OverrideTable>, ClientError> {
        let body = self.client.get_value("/users/tabs/access", &[]).await?;
        if body.is_null() && !self.client.credentials().is_present() {
            return Ok(None);
        }
        OverrideTable::from_json(&body).map(Some)
    }

    async fn login_failed(&self, email: &str, err: ClientError) -> ClientError {
        self.client.credentials().revoke();
        self.become_anonymous();

        dispatch(SessionEvent::LoginFailed {
            email: email.to_owned(),
            reason: err.to_string(),
            at: Utc::now(),
        })
        .await;
        log::warn!(
            target: "orgsession::session",
            "msg=\"login failed\" error=\"{err}\""
        );
        err
    }

    fn restore_or_drop(&self, restore: SessionState) {
        if self.client.credentials().is_present() {
            self.set_state(restore);
        } else {
            self.become_anonymous();
        }
    }

    fn become_anonymous(&self) {
        self.liveness.stop();
        self.clear_pending();
        self.set_state(SessionState::Anonymous);
    }

    fn clear_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.take();
        }
    }

    fn read_state(&self) -> SessionState {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    fn set_state(&self, next: SessionState) {
        if let Ok(mut state) = self.state.write() {
            if state.name() != next.name() {
                log::debug!(
                    target: "orgsession::session",
                    "msg=\"session state\" from={} to={}",
                    state.name(),
                    next.name()
                );
            }
            *state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::InMemoryCredentialStore;
    use crate::interceptor::{HeadlessNavigator, View};
    use crate::mocks::MockBackend;
    use crate::permissions::Role;
    use crate::transport::Method;

    struct Fixture {
        backend: Arc<MockBackend>,
        session: SessionManager,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(MockBackend::standard());
        let config = ClientConfig::default();
        let client = ApiClient::new(
            &config,
            backend.clone(),
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(HeadlessNavigator::at(View::Login)),
        );
        let session = SessionManager::new(Arc::new(client), &config);
        Fixture { backend, session }
    }

    #[tokio::test]
    async fn test_single_org_login_goes_active() {
        let f = fixture();

        let outcome = f
            .session
            .login("admin@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();

        let LoginOutcome::Active(session) = outcome else {
            panic!("expected active session");
        };
        assert_eq!(session.identity.role, Role::Admin);
        assert_eq!(session.org_id(), Some(1));
        assert!(f.session.state().is_active());
        assert_eq!(
            f.session.client().credentials().current().unwrap().org_id,
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_login_validates_before_sending() {
        let f = fixture();

        let err = f
            .session
            .login("not-an-email", "pw".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let err = f
            .session
            .login("admin@acme.test", "  ".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        assert_eq!(f.backend.calls_to(Method::Post, "/auth/login"), 0);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let f = fixture();

        let err = f
            .session
            .login("admin@acme.test", "wrong".into(), None)
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::InvalidCredentials);
        assert!(f.session.state().is_anonymous());
        assert!(!f.session.client().credentials().is_present());
    }

    #[tokio::test]
    async fn test_multi_org_selection_with_provisional_token() {
        let f = fixture();

        let outcome = f
            .session
            .login("owner@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();
        let LoginOutcome::SelectOrganization(orgs) = outcome else {
            panic!("expected selection");
        };
        assert_eq!(orgs.len(), 2);
        assert!(matches!(
            f.session.state(),
            SessionState::OrgSelectionPending { .. }
        ));

        let state = f.session.select_organization(2).await.unwrap();

        assert_eq!(state.org_id(), Some(2));
        assert_eq!(state.active().unwrap().identity.role, Role::Member);
        assert_eq!(f.backend.calls_to(Method::Post, "/auth/switch-organization"), 1);
    }

    #[tokio::test]
    async fn test_selection_without_provisional_token_retries_login() {
        let f = fixture();
        f.backend.without_provisional_tokens();

        f.session
            .login("owner@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();
        assert!(!f.session.client().credentials().is_present());

        let state = f.session.select_organization(1).await.unwrap();

        assert_eq!(state.org_id(), Some(1));
        assert_eq!(f.backend.calls_to(Method::Post, "/auth/login"), 2);
        assert_eq!(f.backend.calls_to(Method::Post, "/auth/switch-organization"), 0);
    }

    #[tokio::test]
    async fn test_login_as_another_user_drops_cached_reads() {
        let f = fixture();
        let client = f.session.client();
        f.session
            .login("admin@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();
        client.get_value("/clients", &[]).await.unwrap();

        f.session
            .login("owner@acme.test", "correct-horse".into(), Some(1))
            .await
            .unwrap();
        client.get_value("/clients", &[]).await.unwrap();

        assert_eq!(f.backend.calls_to(Method::Get, "/clients"), 2);
    }

    #[tokio::test]
    async fn test_login_needing_selection_drops_cached_reads() {
        let f = fixture();
        let client = f.session.client();
        f.session
            .login("admin@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();
        client.get_value("/clients", &[]).await.unwrap();

        f.session
            .login("owner@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();

        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_select_unknown_org() {
        let f = fixture();
        f.session
            .login("owner@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();

        let err = f.session.select_organization(99).await.unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert!(matches!(
            f.session.state(),
            SessionState::OrgSelectionPending { .. }
        ));
    }

    #[tokio::test]
    async fn test_switch_reloads_role_and_clears_cache() {
        let f = fixture();
        f.session
            .login("owner@acme.test", "correct-horse".into(), Some(1))
            .await
            .unwrap();
        assert!(f.session.can_view("organization"));
        f.session.client().get_value("/clients", &[]).await.unwrap();

        let state = f.session.switch_organization(2).await.unwrap();

        assert_eq!(state.org_id(), Some(2));
        assert!(!f.session.can_view("organization"));
        assert!(f.session.client().cache().keys().iter().all(|k| !k.starts_with("o1|")));
    }

    #[tokio::test]
    async fn test_failed_switch_restores_previous_org() {
        let f = fixture();
        f.session
            .login("owner@acme.test", "correct-horse".into(), Some(1))
            .await
            .unwrap();

        let err = f.session.switch_organization(3).await.unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(f.session.state().org_id(), Some(1));
        assert!(f.session.client().credentials().is_present());
    }

    #[tokio::test]
    async fn test_switch_requires_active_session() {
        let f = fixture();
        let err = f.session.switch_organization(1).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_enter_tab_refetches_overrides() {
        let f = fixture();
        f.session
            .login("admin@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();
        assert!(f.session.can_view("funnels"));

        f.backend.set_override(1, "funnels", false);

        // cached snapshot still says yes until navigation refreshes it
        assert!(f.session.can_view("funnels"));
        assert!(!f.session.enter_tab("Funnels").await);
        assert!(!f.session.can_view("funnels"));
    }

    #[tokio::test]
    async fn test_bootstrap_restores_session() {
        let f = fixture();
        f.session
            .login("admin@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();

        let restored = SessionManager::new(
            Arc::new(ApiClient::new(
                &ClientConfig::default(),
                f.backend.clone(),
                Arc::new(InMemoryCredentialStore::with(
                    f.session.client().credentials().current().unwrap(),
                )),
                Arc::new(HeadlessNavigator::new()),
            )),
            &ClientConfig::default(),
        );

        let state = restored.bootstrap().await.unwrap();
        assert_eq!(state.active().unwrap().identity.email, "admin@acme.test");
    }

    #[tokio::test]
    async fn test_bootstrap_without_credential() {
        let f = fixture();
        assert_eq!(f.session.bootstrap().await.unwrap(), SessionState::Anonymous);
        assert_eq!(f.backend.calls_to(Method::Get, "/auth/me"), 0);
    }

    #[tokio::test]
    async fn test_logout() {
        let f = fixture();
        f.session
            .login("admin@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();
        f.session.client().get_value("/clients", &[]).await.unwrap();

        f.session.logout().await;

        assert!(f.session.state().is_anonymous());
        assert!(f.session.client().cache().is_empty());
        assert!(!f.session.can_view("clients"));
        assert!(!f.session.liveness().is_running());
    }

    #[tokio::test]
    async fn test_rejected_credential_reads_as_anonymous() {
        let f = fixture();
        f.session
            .login("admin@acme.test", "correct-horse".into(), None)
            .await
            .unwrap();

        f.backend.revoke_all_tokens();
        f.session.client().get_value("/clients", &[]).await.unwrap();

        assert!(f.session.state().is_anonymous());
    }
}
