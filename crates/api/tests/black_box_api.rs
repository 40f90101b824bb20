use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use tenantguard_api::app::{build_app, AppServices};
use tenantguard_auth::{AccessClaims, Identity, Role};
use tenantguard_core::{IdentityId, TenantId};
use tenantguard_infra::{
    AuthConfig, IdentityDirectory, InMemoryIdentityDirectory, InMemoryRefreshCredentialStore, IssuedCredentials,
    SigningSecret, StoreError,
};

const SECRET: &str = "black-box-test-secret-0123456789abcdef";

struct TestServer {
    base_url: String,
    services: AppServices,
    directory: Arc<InMemoryIdentityDirectory>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = AuthConfig::with_secret(SigningSecret::new(SECRET).unwrap());
        let (services, directory) = AppServices::in_memory(&config);
        Self::serve(services, directory).await
    }

    async fn serve(services: AppServices, directory: Arc<InMemoryIdentityDirectory>) -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            directory,
            handle,
        }
    }

    /// Register an identity and issue it a credential pair.
    async fn login(&self, identity: Identity) -> IssuedCredentials {
        let id = identity.id;
        self.directory.upsert(identity).unwrap();
        self.services.credentials.issue(id, Utc::now()).await.unwrap()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn identity(tenant_id: TenantId, role: Role) -> Identity {
    Identity::new(IdentityId::new(), tenant_id, role)
}

/// Directory whose lookups never come back in time.
struct StalledDirectory;

#[async_trait]
impl IdentityDirectory for StalledDirectory {
    async fn find(&self, _id: IdentityId) -> Result<Option<Identity>, StoreError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(None)
    }
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client.get(srv.url("/whoami")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn identity_and_tenant_are_resolved_from_the_directory() {
    let srv = TestServer::spawn().await;
    let tenant_id = TenantId::new();
    let member = identity(tenant_id, Role::MEMBER).with_raw_overrides(["inventory:products:f"]);
    let member_id = member.id;
    let issued = srv.login(member).await;

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&issued.access_token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["tenant_id"].as_str().unwrap(), tenant_id.to_string());
    assert_eq!(body["identity_id"].as_str().unwrap(), member_id.to_string());
    assert_eq!(body["role"], "member");
    assert_eq!(body["overrides"], json!(["inventory:products:f"]));
}

#[tokio::test]
async fn foreign_expired_and_orphaned_credentials_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let now = Utc::now();
    let claims = AccessClaims {
        sub: IdentityId::new(),
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };
    let foreign = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret-that-is-long-enough"),
    )
    .unwrap();

    let expired_claims = AccessClaims {
        sub: IdentityId::new(),
        issued_at: now - ChronoDuration::hours(1),
        expires_at: now - ChronoDuration::minutes(30),
    };
    let expired = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &expired_claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    // validly signed, but nobody in the directory
    let orphan = srv.services.credentials.issue(IdentityId::new(), now).await.unwrap();

    for token in [foreign.as_str(), expired.as_str(), orphan.access_token.as_str(), "garbage"] {
        let res = client.get(srv.url("/whoami")).bearer_auth(token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn refresh_is_single_use_and_reuse_ends_every_session() {
    let srv = TestServer::spawn().await;
    let issued = srv.login(identity(TenantId::new(), Role::MANAGER)).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": issued.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rotated: serde_json::Value = res.json().await.unwrap();
    let new_refresh = rotated["refresh_token"].as_str().unwrap().to_string();
    let new_access = rotated["access_token"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, issued.refresh_token);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&new_access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // replay of the consumed credential
    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": issued.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    // the successor was revoked along with the rest of the lineage
    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": new_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_refresh_credential_gets_the_same_401() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": "never-issued" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn malformed_session_bodies_get_the_same_401() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/auth/refresh", "/auth/logout"] {
        let res = client
            .post(srv.url(path))
            .header("content-type", "application/json")
            .body("not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthenticated");

        let res = client.post(srv.url(path)).json(&json!({ "wrong": 1 })).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthenticated");

        // no content type at all
        let res = client.post(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn logout_revokes_the_refresh_credential() {
    let srv = TestServer::spawn().await;
    let issued = srv.login(identity(TenantId::new(), Role::MEMBER)).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let res = client
            .post(srv.url("/auth/logout"))
            .json(&json!({ "refresh_token": issued.refresh_token }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": issued.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn explain_reports_the_deciding_layer() {
    let srv = TestServer::spawn().await;
    let tenant_id = TenantId::new();
    let member = srv.login(identity(tenant_id, Role::MEMBER)).await;
    let restricted = srv
        .login(identity(tenant_id, Role::ADMIN).with_raw_overrides(["billing:invoices:0"]))
        .await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/authz/explain?resource=billing:invoices&action=read"))
        .bearer_auth(&member.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["decision"]["outcome"], "allowed_conditional");
    assert_eq!(body["layer"], "role_default");
    assert_eq!(body["effective_mask"], 4);

    let res = client
        .get(srv.url("/authz/explain?resource=billing:invoices&action=delete"))
        .bearer_auth(&restricted.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["decision"]["outcome"], "denied");
    assert_eq!(body["decision"]["reason"], "override_restriction");
    assert_eq!(body["layer"], "override");

    let res = client
        .get(srv.url("/authz/explain?resource=payroll:salaries&action=read"))
        .bearer_auth(&member.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn explaining_other_identities_requires_user_read() {
    let srv = TestServer::spawn().await;
    let tenant_id = TenantId::new();

    let target = identity(tenant_id, Role::GUEST);
    let target_id = target.id;
    srv.directory.upsert(target).unwrap();

    let member = srv.login(identity(tenant_id, Role::MEMBER)).await;
    let admin = srv.login(identity(tenant_id, Role::ADMIN)).await;
    let outsider = srv.login(identity(TenantId::new(), Role::ADMIN)).await;
    let client = reqwest::Client::new();

    let path = format!("/authz/explain?resource=inventory:products&action=read&identity_id={target_id}");

    let res = client.get(srv.url(&path)).bearer_auth(&member.access_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.get(srv.url(&path)).bearer_auth(&admin.access_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["identity_id"].as_str().unwrap(), target_id.to_string());
    assert_eq!(body["decision"]["outcome"], "denied");
    assert_eq!(body["decision"]["reason"], "insufficient_role");

    // identities of other tenants are invisible
    let res = client.get(srv.url(&path)).bearer_auth(&outsider.access_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn explaining_yourself_by_id_needs_no_user_read() {
    let srv = TestServer::spawn().await;
    let member = identity(TenantId::new(), Role::MEMBER);
    let member_id = member.id;
    let issued = srv.login(member).await;
    let client = reqwest::Client::new();

    let path = format!("/authz/explain?resource=billing:invoices&action=read&identity_id={member_id}");
    let res = client.get(srv.url(&path)).bearer_auth(&issued.access_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["identity_id"].as_str().unwrap(), member_id.to_string());
    assert_eq!(body["decision"]["outcome"], "allowed_conditional");
}

#[tokio::test]
async fn stalled_directory_fails_fast() {
    let mut config = AuthConfig::with_secret(SigningSecret::new(SECRET).unwrap());
    config.query_timeout = Duration::from_millis(50);
    let services = AppServices::new(
        &config,
        Arc::new(InMemoryRefreshCredentialStore::new()),
        Arc::new(StalledDirectory),
    );
    let srv = TestServer::serve(services, Arc::new(InMemoryIdentityDirectory::new())).await;
    let issued = srv.services.credentials.issue(IdentityId::new(), Utc::now()).await.unwrap();
    let client = reqwest::Client::new();

    let started = Instant::now();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&issued.access_token)
        .send()
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn role_table_is_visible_to_admins_only() {
    let srv = TestServer::spawn().await;
    let tenant_id = TenantId::new();
    let admin = srv.login(identity(tenant_id, Role::ADMIN)).await;
    let guest = srv.login(identity(tenant_id, Role::GUEST)).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/authz/roles")).bearer_auth(&admin.access_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let roles: Vec<&str> = body["roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["admin", "guest", "manager", "member"]);
    assert_eq!(body["roles"][3]["rules"]["billing:invoices"]["conditional"], true);

    let res = client.get(srv.url("/authz/roles")).bearer_auth(&guest.access_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
