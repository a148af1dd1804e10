#![allow(clippy::significant_drop_tightening)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Duration;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value, json};

use crate::cache::{Captures, EndpointPattern};
use crate::permissions::{OverrideTable, Role};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};

#[derive(Debug, Clone, Copy)]
struct Grant {
    user_id: i64,
    org_id: Option<i64>,
}

#[derive(Debug, Clone)]
struct User {
    id: i64,
    email: String,
    password: String,
}

#[derive(Debug, Clone)]
enum InviteTarget {
    /// ORG_ADMIN: the organization is created on accept.
    New(String),
    Existing(i64),
}

#[derive(Debug, Clone)]
struct Invitation {
    target: InviteTarget,
    role: Role,
    email: String,
    used: bool,
}

impl Invitation {
    fn kind(&self) -> &'static str {
        match self.target {
            InviteTarget::New(_) => "ORG_ADMIN",
            InviteTarget::Existing(_) => "ORG_MEMBER",
        }
    }
}

/// A row owned by `parent` (an organization or a client).
#[derive(Debug, Clone)]
struct Record {
    parent: i64,
    fields: Map<String, Value>,
}

type Table = BTreeMap<i64, Record>;

#[derive(Debug, Default)]
struct World {
    users: Vec<User>,
    orgs: BTreeMap<i64, String>,
    memberships: HashMap<(i64, i64), Role>,
    tokens: HashMap<String, Grant>,
    invitations: HashMap<String, Invitation>,
    overrides: HashMap<i64, OverrideTable>,
    clients: Table,
    payments: Table,
    funnels: Table,
    integrations: BTreeMap<(i64, String), bool>,
}

impl World {
    fn user_id(&self, email: &str) -> Option<i64> {
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .map(|user| user.id)
    }

    fn organizations_of(&self, user_id: i64) -> Vec<Value> {
        self.orgs
            .iter()
            .filter_map(|(id, name)| {
                self.memberships
                    .get(&(user_id, *id))
                    .map(|role| json!({"id": id, "name": name, "role": role.as_str()}))
            })
            .collect()
    }

    fn is_member(&self, user_id: i64, org_id: i64) -> bool {
        self.memberships.contains_key(&(user_id, org_id))
    }
}

#[derive(Debug)]
struct Recorded {
    method: Method,
    path: String,
    bearer: Option<String>,
    timeout: Option<Duration>,
    body: Option<Value>,
}

#[derive(Debug)]
enum Fault {
    Status(u16, Value),
    Disconnect,
}

/// The dashboard API, served from memory.
///
/// [`standard`](Self::standard) seeds:
///
/// | org | name     | `owner@acme.test` | `admin@acme.test` |
/// |-----|----------|-------------------|-------------------|
/// | 1   | Acme     | owner             | admin             |
/// | 2   | Globex   | member            | -                 |
/// | 3   | Initrode | -                 | -                 |
///
/// Both users log in with [`PASSWORD`](Self::PASSWORD). Every call is
/// recorded for assertions, and faults can be queued per path.
pub struct MockBackend {
    world: RwLock<World>,
    calls: RwLock<Vec<Recorded>>,
    faults: RwLock<HashMap<String, VecDeque<Fault>>>,
    next_id: AtomicI64,
    provisional_tokens: AtomicBool,
    invitee_hints: AtomicBool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn detail(status: u16, message: &str) -> ApiResponse {
    ApiResponse::new(status, json!({ "detail": message }))
}

fn field_error(field: &str, msg: &str) -> ApiResponse {
    ApiResponse::new(
        422,
        json!({"detail": [{"loc": ["body", field], "msg": msg, "type": "value_error"}]}),
    )
}

fn not_found() -> ApiResponse {
    detail(404, "Not Found")
}

fn method_not_allowed() -> ApiResponse {
    detail(405, "Method Not Allowed")
}

fn capture(pattern: &str, path: &str) -> Option<Captures> {
    EndpointPattern::parse(pattern).matches(path)
}

fn id_of(captures: &Captures, name: &str) -> Option<i64> {
    captures.get(name).and_then(|raw| raw.parse().ok())
}

fn list(table: &Table, parent: i64) -> ApiResponse {
    ApiResponse::ok(Value::Array(
        table
            .values()
            .filter(|record| record.parent == parent)
            .map(|record| Value::Object(record.fields.clone()))
            .collect(),
    ))
}

fn owned(table: &Table, id: i64, parent: i64) -> bool {
    table.get(&id).is_some_and(|record| record.parent == parent)
}

impl MockBackend {
    pub const PASSWORD: &'static str = "correct-horse";
    /// ORG_ADMIN invitation for `founder@startup.test`, a new user.
    pub const ADMIN_INVITE: &'static str = "inv-admin-7f3a";
    /// ORG_MEMBER invitation into Globex for `admin@acme.test`, an existing user.
    pub const MEMBER_INVITE: &'static str = "inv-member-91c2";
    /// Already consumed.
    pub const USED_INVITE: &'static str = "inv-used-0d4e";

    /// A backend with no users and no organizations.
    pub fn new() -> Self {
        Self {
            world: RwLock::new(World::default()),
            calls: RwLock::new(Vec::new()),
            faults: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(100),
            provisional_tokens: AtomicBool::new(true),
            invitee_hints: AtomicBool::new(true),
        }
    }

    pub fn standard() -> Self {
        let backend = Self::new();
        {
            let mut world = write(&backend.world);
            world.orgs.insert(1, "Acme".to_owned());
            world.orgs.insert(2, "Globex".to_owned());
            world.orgs.insert(3, "Initrode".to_owned());
        }

        backend.with_user("owner@acme.test", Self::PASSWORD);
        backend.with_user("admin@acme.test", Self::PASSWORD);
        backend.with_membership("owner@acme.test", 1, Role::Owner);
        backend.with_membership("owner@acme.test", 2, Role::Member);
        backend.with_membership("admin@acme.test", 1, Role::Admin);

        let initech = backend.seed_client(1, "Initech");
        backend.seed_client(1, "Hooli");
        backend.seed_client(2, "Umbrella");
        {
            let mut world = write(&backend.world);
            let id = backend.next_id();
            world.payments.insert(
                id,
                Record {
                    parent: initech,
                    fields: object(json!({"id": id, "amount": 1200, "status": "settled"})),
                },
            );
            let id = backend.next_id();
            world.funnels.insert(
                id,
                Record {
                    parent: 1,
                    fields: object(json!({"id": id, "name": "Trial to paid"})),
                },
            );
            world.integrations.insert((1, "stripe".to_owned()), true);
            world.integrations.insert((1, "hubspot".to_owned()), false);

            world.invitations.insert(
                Self::ADMIN_INVITE.to_owned(),
                Invitation {
                    target: InviteTarget::New("Startup".to_owned()),
                    role: Role::Admin,
                    email: "founder@startup.test".to_owned(),
                    used: false,
                },
            );
            world.invitations.insert(
                Self::MEMBER_INVITE.to_owned(),
                Invitation {
                    target: InviteTarget::Existing(2),
                    role: Role::Member,
                    email: "admin@acme.test".to_owned(),
                    used: false,
                },
            );
            world.invitations.insert(
                Self::USED_INVITE.to_owned(),
                Invitation {
                    target: InviteTarget::Existing(1),
                    role: Role::Member,
                    email: "late@acme.test".to_owned(),
                    used: true,
                },
            );
        }
        backend
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn seed_client(&self, org_id: i64, name: &str) -> i64 {
        let id = self.next_id();
        write(&self.world).clients.insert(
            id,
            Record {
                parent: org_id,
                fields: object(json!({"id": id, "name": name, "status": "active"})),
            },
        );
        id
    }

    /// Adds an organization and returns its id.
    pub fn with_org(&self, name: &str) -> i64 {
        let id = self.next_id();
        write(&self.world).orgs.insert(id, name.to_owned());
        id
    }

    /// Adds a user and returns its id.
    pub fn with_user(&self, email: &str, password: &str) -> i64 {
        let id = self.next_id();
        write(&self.world).users.push(User {
            id,
            email: email.to_owned(),
            password: password.to_owned(),
        });
        id
    }

    /// Adds or replaces a membership. Unknown emails are ignored.
    pub fn with_membership(&self, email: &str, org_id: i64, role: Role) {
        let mut world = write(&self.world);
        if let Some(user_id) = world.user_id(email) {
            world.memberships.insert((user_id, org_id), role);
        }
    }

    /// Sets a per-organization tab override served by `GET /users/tabs/access`.
    pub fn set_override(&self, org_id: i64, tab: &str, allowed: bool) {
        write(&self.world)
            .overrides
            .entry(org_id)
            .or_default()
            .set(tab, allowed);
    }

    /// Multi-org logins stop returning a provisional token.
    pub fn without_provisional_tokens(&self) {
        self.provisional_tokens.store(false, Ordering::SeqCst);
    }

    /// Invitation validation answers with the documented fields only,
    /// leaving out `email` and `existing_user`.
    pub fn without_invitee_hints(&self) {
        self.invitee_hints.store(false, Ordering::SeqCst);
    }

    /// Mints a token as if `email` had logged in to `org_id`.
    pub fn issue_token(&self, email: &str, org_id: Option<i64>) -> String {
        let mut world = write(&self.world);
        let user_id = world.user_id(email).unwrap_or_default();
        self.grant(&mut world, user_id, org_id)
    }

    /// Every token issued so far stops working.
    pub fn revoke_all_tokens(&self) {
        write(&self.world).tokens.clear();
    }

    /// The next call to `path` answers `status` with `body`.
    pub fn fail_next(&self, path: &str, status: u16, body: Value) {
        write(&self.faults)
            .entry(path.to_owned())
            .or_default()
            .push_back(Fault::Status(status, body));
    }

    /// The next call to `path` never gets a response.
    pub fn disconnect_next(&self, path: &str) {
        write(&self.faults)
            .entry(path.to_owned())
            .or_default()
            .push_back(Fault::Disconnect);
    }

    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        read(&self.calls)
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        read(&self.calls).len()
    }

    pub fn last_bearer(&self) -> Option<String> {
        read(&self.calls).last().and_then(|call| call.bearer.clone())
    }

    pub fn last_timeout(&self) -> Option<Duration> {
        read(&self.calls).last().and_then(|call| call.timeout)
    }

    pub fn last_body(&self) -> Option<Value> {
        read(&self.calls).last().and_then(|call| call.body.clone())
    }

    /// Body of the most recent call to `path`.
    pub fn last_body_to(&self, method: Method, path: &str) -> Option<Value> {
        read(&self.calls)
            .iter()
            .rev()
            .find(|call| call.method == method && call.path == path)
            .and_then(|call| call.body.clone())
    }

    fn grant(&self, world: &mut World, user_id: i64, org_id: Option<i64>) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        world.tokens.insert(token.clone(), Grant { user_id, org_id });
        token
    }

    fn handle(&self, request: &ApiRequest, path: &str) -> ApiResponse {
        let body = request.body.clone().unwrap_or(Value::Null);
        let mut world = write(&self.world);

        match (request.method, path) {
            (Method::Post, "/auth/login") => return self.login(&mut world, &body),
            (Method::Get, "/auth/invite/validate") => {
                let token = request.query_value("token").unwrap_or_default();
                let hints = self.invitee_hints.load(Ordering::SeqCst);
                return validate_invitation(&world, token, hints);
            }
            (Method::Post, "/auth/invite/accept") => return self.accept_invitation(&mut world, &body),
            _ => {}
        }

        let grant = request
            .bearer
            .as_ref()
            .and_then(|token| world.tokens.get(token.expose_secret()))
            .copied();
        let Some(grant) = grant else {
            return detail(401, "Not authenticated");
        };

        match (request.method, path) {
            (Method::Post, "/auth/switch-organization") => {
                return self.switch_organization(&mut world, grant, &body);
            }
            (Method::Get, "/auth/me") => return me(&world, grant),
            (Method::Get, "/users/tabs/access") => {
                return ApiResponse::ok(
                    grant
                        .org_id
                        .and_then(|org_id| world.overrides.get(&org_id))
                        .map_or_else(|| json!({}), OverrideTable::to_json),
                );
            }
            _ => {}
        }

        let Some(org_id) = grant.org_id else {
            return detail(400, "Select an organization first");
        };
        self.resource(&mut world, org_id, request.method, path, body)
    }

    fn login(&self, world: &mut World, body: &Value) -> ApiResponse {
        let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
        let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

        let user = world
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email) && user.password == password)
            .map(|user| user.id);
        let Some(user_id) = user else {
            return detail(401, "Incorrect email or password");
        };

        let organizations = world.organizations_of(user_id);
        let org_id = match body.get("org_id").and_then(Value::as_i64) {
            Some(org_id) if world.is_member(user_id, org_id) => Some(org_id),
            Some(_) => return detail(400, "You are not a member of that organization"),
            None if organizations.len() > 1 => {
                let mut response = json!({
                    "requires_org_selection": true,
                    "organizations": organizations,
                });
                if self.provisional_tokens.load(Ordering::SeqCst) {
                    response["access_token"] = json!(self.grant(world, user_id, None));
                }
                return ApiResponse::ok(response);
            }
            None => organizations
                .first()
                .and_then(|org| org.get("id"))
                .and_then(Value::as_i64),
        };

        ApiResponse::ok(json!({
            "access_token": self.grant(world, user_id, org_id),
            "token_type": "bearer",
        }))
    }

    fn switch_organization(&self, world: &mut World, grant: Grant, body: &Value) -> ApiResponse {
        let Some(org_id) = body.get("org_id").and_then(Value::as_i64) else {
            return field_error("org_id", "field required");
        };
        if !world.is_member(grant.user_id, org_id) {
            return detail(400, &format!("You are not a member of organization {org_id}"));
        }
        ApiResponse::ok(json!({
            "access_token": self.grant(world, grant.user_id, Some(org_id)),
            "token_type": "bearer",
        }))
    }

    fn accept_invitation(&self, world: &mut World, body: &Value) -> ApiResponse {
        let token = body.get("token").and_then(Value::as_str).unwrap_or_default();
        let Some(invitation) = world.invitations.get(token).cloned() else {
            return detail(400, "Invalid invitation");
        };
        if invitation.used {
            return detail(400, "This invitation has already been used");
        }

        let user_id = match world.user_id(&invitation.email) {
            Some(user_id) => user_id,
            None => {
                let Some(password) = body.get("password").and_then(Value::as_str) else {
                    return field_error("password", "field required");
                };
                if password.chars().count() < 8 {
                    return field_error("password", "ensure this value has at least 8 characters");
                }
                let id = self.next_id();
                world.users.push(User {
                    id,
                    email: invitation.email.clone(),
                    password: password.to_owned(),
                });
                id
            }
        };

        let org_id = match &invitation.target {
            InviteTarget::Existing(org_id) => *org_id,
            InviteTarget::New(name) => {
                let org_id = self.next_id();
                world.orgs.insert(org_id, name.clone());
                org_id
            }
        };
        world.memberships.insert((user_id, org_id), invitation.role);
        if let Some(stored) = world.invitations.get_mut(token) {
            stored.used = true;
        }

        ApiResponse::ok(json!({
            "access_token": self.grant(world, user_id, Some(org_id)),
            "token_type": "bearer",
        }))
    }

    fn resource(
        &self,
        world: &mut World,
        org_id: i64,
        method: Method,
        path: &str,
        body: Value,
    ) -> ApiResponse {
        match path {
            "/clients" => {
                return match method {
                    Method::Get => list(&world.clients, org_id),
                    Method::Post => self.create(&mut world.clients, org_id, body, "name"),
                    _ => method_not_allowed(),
                };
            }
            "/funnels" => {
                return match method {
                    Method::Get => list(&world.funnels, org_id),
                    Method::Post => self.create(&mut world.funnels, org_id, body, "name"),
                    _ => method_not_allowed(),
                };
            }
            "/integrations/status" if method == Method::Get => {
                let status: Map<String, Value> = world
                    .integrations
                    .iter()
                    .filter(|((org, _), _)| *org == org_id)
                    .map(|((_, provider), connected)| {
                        (provider.clone(), json!({ "connected": connected }))
                    })
                    .collect();
                return ApiResponse::ok(Value::Object(status));
            }
            "/payments/reconcile" if method == Method::Post => {
                let reconciled = world
                    .payments
                    .values()
                    .filter(|payment| owned(&world.clients, payment.parent, org_id))
                    .count();
                return ApiResponse::ok(json!({ "reconciled": reconciled }));
            }
            _ => {}
        }

        if let Some(captures) = capture("/clients/{client_id}/payments", path) {
            let client_id = id_of(&captures, "client_id")
                .filter(|id| owned(&world.clients, *id, org_id));
            let Some(client_id) = client_id else {
                return not_found();
            };
            return match method {
                Method::Get => list(&world.payments, client_id),
                Method::Post => self.create(&mut world.payments, client_id, body, "amount"),
                _ => method_not_allowed(),
            };
        }

        if let Some(captures) = capture("/clients/{client_id}", path) {
            return match id_of(&captures, "client_id") {
                Some(id) => record(&mut world.clients, org_id, id, method, body),
                None => not_found(),
            };
        }

        if let Some(captures) = capture("/funnels/{funnel_id}", path) {
            return match id_of(&captures, "funnel_id") {
                Some(id) => record(&mut world.funnels, org_id, id, method, body),
                None => not_found(),
            };
        }

        if let Some(captures) = capture("/integrations/{provider}/{action}", path) {
            if method != Method::Post {
                return method_not_allowed();
            }
            let provider = captures.get("provider").cloned().unwrap_or_default();
            let key = (org_id, provider.clone());
            return match captures.get("action").map(String::as_str) {
                Some("connect") => {
                    world.integrations.insert(key, true);
                    ApiResponse::ok(json!({"provider": provider, "connected": true}))
                }
                Some("disconnect") => {
                    world.integrations.insert(key, false);
                    ApiResponse::ok(json!({"provider": provider, "connected": false}))
                }
                Some("sync") if world.integrations.get(&key).copied().unwrap_or_default() => {
                    ApiResponse::ok(json!({"provider": provider, "synced": true}))
                }
                Some("sync") => detail(400, &format!("{provider} is not connected")),
                _ => not_found(),
            };
        }

        not_found()
    }

    fn create(&self, table: &mut Table, parent: i64, body: Value, required: &str) -> ApiResponse {
        let Value::Object(mut fields) = body else {
            return field_error(required, "field required");
        };
        if fields.get(required).map_or(true, Value::is_null) {
            return field_error(required, "field required");
        }
        let id = self.next_id();
        fields.insert("id".to_owned(), json!(id));
        table.insert(
            id,
            Record {
                parent,
                fields: fields.clone(),
            },
        );
        ApiResponse::new(201, Value::Object(fields))
    }
}

/// GET, PUT, PATCH and DELETE on a single row.
fn record(table: &mut Table, parent: i64, id: i64, method: Method, body: Value) -> ApiResponse {
    if !owned(table, id, parent) {
        return not_found();
    }
    match method {
        Method::Get => table
            .get(&id)
            .map_or_else(not_found, |row| ApiResponse::ok(Value::Object(row.fields.clone()))),
        Method::Put | Method::Patch => {
            let Value::Object(changes) = body else {
                return detail(400, "Expected a JSON object");
            };
            let Some(row) = table.get_mut(&id) else {
                return not_found();
            };
            for (key, value) in changes {
                if key != "id" {
                    row.fields.insert(key, value);
                }
            }
            ApiResponse::ok(Value::Object(row.fields.clone()))
        }
        Method::Delete => {
            table.remove(&id);
            ApiResponse::ok(json!({"id": id, "deleted": true}))
        }
        Method::Post => method_not_allowed(),
    }
}

fn me(world: &World, grant: Grant) -> ApiResponse {
    let Some(user) = world.users.iter().find(|user| user.id == grant.user_id) else {
        return detail(401, "Not authenticated");
    };
    let role = grant
        .org_id
        .and_then(|org_id| world.memberships.get(&(user.id, org_id)))
        .copied()
        .unwrap_or_default();
    ApiResponse::ok(json!({
        "id": user.id,
        "email": user.email,
        "role": role.as_str(),
        "org_id": grant.org_id,
    }))
}

fn validate_invitation(world: &World, token: &str, hints: bool) -> ApiResponse {
    match world.invitations.get(token) {
        None => ApiResponse::ok(json!({"valid": false, "message": "Invitation not found"})),
        Some(invitation) if invitation.used => ApiResponse::ok(json!({
            "valid": false,
            "message": "This invitation has already been used",
        })),
        Some(invitation) => {
            let org_name = match &invitation.target {
                InviteTarget::New(name) => Some(name.clone()),
                InviteTarget::Existing(org_id) => world.orgs.get(org_id).cloned(),
            };
            let mut body = json!({
                "valid": true,
                "org_name": org_name,
                "invitation_type": invitation.kind(),
                "role": invitation.role.as_str(),
            });
            if hints {
                body["email"] = json!(invitation.email);
                body["existing_user"] = json!(world.user_id(&invitation.email).is_some());
            }
            ApiResponse::ok(body)
        }
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.split('?').next().unwrap_or_default().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[async_trait]
impl Transport for MockBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        // lets concurrent callers interleave like real network calls
        tokio::task::yield_now().await;

        let path = normalize(&request.path);
        write(&self.calls).push(Recorded {
            method: request.method,
            path: path.clone(),
            bearer: request
                .bearer
                .as_ref()
                .map(|token| token.expose_secret().to_owned()),
            timeout: request.timeout,
            body: request.body.clone(),
        });

        let fault = write(&self.faults)
            .get_mut(&path)
            .and_then(VecDeque::pop_front);
        match fault {
            Some(Fault::Status(status, body)) => Ok(ApiResponse::new(status, body)),
            Some(Fault::Disconnect) => Err(TransportError::Connect(
                "connection reset by peer".to_owned(),
            )),
            None => Ok(self.handle(&request, &path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecretString;

    fn call(method: Method, path: &str, bearer: Option<&str>, body: Option<Value>) -> ApiRequest {
        let mut request = ApiRequest::new(method, path);
        request.bearer = bearer.map(SecretString::new);
        request.body = body;
        request
    }

    #[tokio::test]
    async fn test_login_requires_selection_for_multi_org_user() {
        let backend = MockBackend::standard();

        let response = backend
            .send(call(
                Method::Post,
                "/auth/login",
                None,
                Some(json!({"email": "owner@acme.test", "password": MockBackend::PASSWORD})),
            ))
            .await
            .unwrap();

        assert_eq!(response.body["requires_org_selection"], true);
        assert_eq!(response.body["organizations"].as_array().unwrap().len(), 2);
        assert!(response.body["access_token"].is_string());
    }

    #[tokio::test]
    async fn test_data_is_scoped_to_token_org() {
        let backend = MockBackend::standard();
        let acme = backend.issue_token("owner@acme.test", Some(1));
        let globex = backend.issue_token("owner@acme.test", Some(2));

        let acme_clients = backend
            .send(call(Method::Get, "/clients", Some(&acme), None))
            .await
            .unwrap();
        let globex_clients = backend
            .send(call(Method::Get, "/clients", Some(&globex), None))
            .await
            .unwrap();

        assert_eq!(acme_clients.body.as_array().unwrap().len(), 2);
        assert_eq!(globex_clients.body[0]["name"], "Umbrella");
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let backend = MockBackend::standard();
        let response = backend
            .send(call(Method::Get, "/funnels", Some("forged"), None))
            .await
            .unwrap();
        assert_eq!(response.status, 401);
    }

    #[tokio::test]
    async fn test_faults_are_consumed_once() {
        let backend = MockBackend::standard();
        let token = backend.issue_token("admin@acme.test", Some(1));
        backend.fail_next("/clients", 503, json!({"detail": "maintenance"}));

        let first = backend
            .send(call(Method::Get, "/clients/", Some(&token), None))
            .await
            .unwrap();
        let second = backend
            .send(call(Method::Get, "/clients", Some(&token), None))
            .await
            .unwrap();

        assert_eq!(first.status, 503);
        assert_eq!(second.status, 200);
        assert_eq!(backend.calls_to(Method::Get, "/clients"), 2);
    }

    #[tokio::test]
    async fn test_sync_requires_connection() {
        let backend = MockBackend::standard();
        let token = backend.issue_token("admin@acme.test", Some(1));

        let hubspot = backend
            .send(call(Method::Post, "/integrations/hubspot/sync", Some(&token), None))
            .await
            .unwrap();
        let stripe = backend
            .send(call(Method::Post, "/integrations/stripe/sync", Some(&token), None))
            .await
            .unwrap();

        assert_eq!(hubspot.status, 400);
        assert_eq!(stripe.body["synced"], true);
    }
}
