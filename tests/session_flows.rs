//! End-to-end session flows against the in-memory backend.
//!
//! Run with: `cargo test --features mocks --test session_flows`

#![cfg(feature = "mocks")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use orgsession::credential::InMemoryCredentialStore;
use orgsession::interceptor::{HeadlessNavigator, View};
use orgsession::mocks::{MockBackend, RejectingCredentialStore};
use orgsession::session::LoginOutcome;
use orgsession::transport::Method;
use orgsession::{
    ApiClient, ClientConfig, ClientError, InvitationFlow, InvitationKind, InvitationState, Role,
    SecretString, SessionManager, SessionState,
};

const TABS: [&str; 5] = ["clients", "funnels", "integrations", "team", "organization"];

struct Harness {
    backend: Arc<MockBackend>,
    navigator: HeadlessNavigator,
    session: SessionManager,
}

fn harness(view: View) -> Harness {
    let backend = Arc::new(MockBackend::standard());
    let navigator = HeadlessNavigator::at(view);
    let config = ClientConfig::default();
    let client = ApiClient::new(
        &config,
        backend.clone(),
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(navigator.clone()),
    );
    Harness {
        backend,
        navigator,
        session: SessionManager::new(Arc::new(client), &config),
    }
}

fn password() -> SecretString {
    SecretString::new(MockBackend::PASSWORD)
}

#[tokio::test]
async fn two_org_user_picks_an_organization() {
    let h = harness(View::Login);

    let outcome = h
        .session
        .login("owner@acme.test", password(), None)
        .await
        .unwrap();
    let LoginOutcome::SelectOrganization(orgs) = outcome else {
        panic!("expected organization selection");
    };
    let names: Vec<&str> = orgs.iter().map(|org| org.name.as_str()).collect();
    assert_eq!(names, vec!["Acme", "Globex"]);
    assert_eq!(orgs[0].role, Some(Role::Owner));

    // nothing tenant-scoped is readable while selection is pending
    assert!(h.session.access().is_none());
    assert!(!h.session.can_view("clients"));

    let state = h.session.select_organization(1).await.unwrap();
    let active = state.active().unwrap();
    assert_eq!(active.identity.role, Role::Owner);
    assert_eq!(active.org_id(), Some(1));
    assert_eq!(h.session.visible_tabs(&TABS), TABS.to_vec());
}

#[tokio::test]
async fn member_never_sees_team_or_organization() {
    let h = harness(View::Login);
    h.session
        .login("owner@acme.test", password(), Some(2))
        .await
        .unwrap();

    assert_eq!(
        h.session.visible_tabs(&TABS),
        vec!["clients", "funnels", "integrations"]
    );
}

#[tokio::test]
async fn overrides_hide_tabs_even_for_owners_except_organization() {
    let h = harness(View::Login);
    h.backend.set_override(1, "clients", false);
    h.backend.set_override(1, "organization", false);
    h.backend.set_override(1, "team", false);

    h.session
        .login("owner@acme.test", password(), Some(1))
        .await
        .unwrap();

    assert!(!h.session.can_view("clients"));
    assert!(!h.session.can_view("team"));
    assert!(h.session.can_view("organization"));
}

#[tokio::test]
async fn admin_invitation_creates_an_active_admin_session() {
    let h = harness(View::Page("invite".to_owned()));
    let mut flow = InvitationFlow::new(MockBackend::ADMIN_INVITE);

    flow.validate(h.session.client()).await.unwrap();
    assert_eq!(flow.state(), &InvitationState::Valid);
    let details = flow.details().unwrap();
    assert_eq!(details.kind, Some(InvitationKind::OrgAdmin));
    assert_eq!(details.org_name.as_deref(), Some("Startup"));

    let state = flow
        .accept(&h.session, Some(SecretString::new("longenough1")))
        .await
        .unwrap();

    let active = state.active().unwrap();
    assert_eq!(active.identity.email, "founder@startup.test");
    assert_eq!(active.identity.role, Role::Admin);
    assert!(h.session.can_view("team"));
    assert!(!h.session.can_view("organization"));
    assert_eq!(flow.state(), &InvitationState::Accepted);

    // single use
    let mut again = InvitationFlow::new(MockBackend::ADMIN_INVITE);
    again.validate(h.session.client()).await.unwrap();
    assert!(matches!(again.state(), InvitationState::Invalid { .. }));
}

#[tokio::test]
async fn invited_founder_can_log_in_afterwards() {
    let h = harness(View::Page("invite".to_owned()));
    let mut flow = InvitationFlow::new(MockBackend::ADMIN_INVITE);
    flow.validate(h.session.client()).await.unwrap();
    flow.accept(&h.session, Some(SecretString::new("longenough1")))
        .await
        .unwrap();
    h.session.logout().await;

    let outcome = h
        .session
        .login("founder@startup.test", SecretString::new("longenough1"), None)
        .await
        .unwrap();

    assert!(matches!(outcome, LoginOutcome::Active(_)));
}

#[tokio::test]
async fn concurrent_rejections_redirect_once() {
    let h = harness(View::Page("clients".to_owned()));
    h.session
        .login("admin@acme.test", password(), None)
        .await
        .unwrap();
    h.backend.revoke_all_tokens();

    let client = h.session.client();
    let reads = ["/clients", "/funnels", "/integrations/status", "/auth/me", "/users/tabs/access"]
        .map(|path| client.get_value(path, &[]));
    let results = futures::future::join_all(reads).await;

    assert!(results.iter().all(|result| matches!(result, Ok(value) if value.is_null())));
    assert_eq!(h.navigator.scheduled_redirects(), 1);
    assert!(!client.credentials().is_present());
    assert!(client.cache().is_empty());
    assert!(h.session.state().is_anonymous());
}

#[tokio::test]
async fn redirect_lands_on_login_and_next_login_rearms_it() {
    let h = harness(View::Page("clients".to_owned()));
    h.session
        .login("admin@acme.test", password(), None)
        .await
        .unwrap();
    h.backend.revoke_all_tokens();

    h.session.client().get_value("/clients", &[]).await.unwrap();
    tokio::task::yield_now().await;
    h.navigator.flush();
    assert_eq!(h.navigator.performed_redirects(), 1);

    h.session
        .login("admin@acme.test", password(), None)
        .await
        .unwrap();
    h.navigator.navigate(View::Page("funnels".to_owned()));
    h.backend.revoke_all_tokens();
    h.session.client().get_value("/funnels", &[]).await.unwrap();

    assert_eq!(h.navigator.scheduled_redirects(), 2);
}

#[tokio::test]
async fn refused_credential_never_becomes_active() {
    let backend = Arc::new(MockBackend::standard());
    let config = ClientConfig::default();
    let client = ApiClient::new(
        &config,
        backend.clone(),
        Arc::new(RejectingCredentialStore),
        Arc::new(HeadlessNavigator::new()),
    );
    let session = SessionManager::new(Arc::new(client), &config);

    let err = session
        .login("admin@acme.test", password(), None)
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::CredentialNotPersisted);
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(backend.calls_to(Method::Get, "/auth/me"), 0);
}
