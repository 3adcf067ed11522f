//! HTTP client tests against a local axum server.
//!
//! The server mimics the handful of Grafana endpoints the engine uses and
//! records every request it sees, so tests can assert on paths, query strings,
//! headers and bodies.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aspen_grafana_secrets::ClientError;
use aspen_grafana_secrets::GrafanaApi;
use aspen_grafana_secrets::GrafanaClient;
use aspen_grafana_secrets::GrafanaSecretsEngine;
use aspen_grafana_secrets::InMemorySecretsBackend;
use aspen_grafana_secrets::RoleKind;
use aspen_grafana_secrets::WriteConfigRequest;
use aspen_grafana_secrets::WriteRoleRequest;
use aspen_grafana_secrets::client::CreateCloudAccessPolicyInput;
use aspen_grafana_secrets::client::CreateServiceAccountInput;
use aspen_grafana_secrets::client::CreateServiceAccountTokenInput;
use aspen_grafana_secrets::client::Permission;
use aspen_grafana_secrets::client::RbacRole;
use aspen_grafana_secrets::client::ServiceAccountRoleAssignmentsInput;
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Mutex;

// =============================================================================
// Fake Grafana Server
// =============================================================================

/// One request as seen by the fake server.
#[derive(Debug, Clone)]
struct Seen {
    route: String,
    authorization: Option<String>,
    query: HashMap<String, String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    async fn push(&self, route: String, headers: &HeaderMap, query: HashMap<String, String>, body: Value) {
        let authorization = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
        self.seen.lock().await.push(Seen {
            route,
            authorization,
            query,
            body,
        });
    }

    async fn all(&self) -> Vec<Seen> {
        self.seen.lock().await.clone()
    }
}

async fn create_access_policy(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let name = body["name"].clone();
    rec.push("POST /api/v1/accesspolicies".into(), &headers, query, body).await;
    Json(json!({ "id": "ap-1", "name": name, "createdAt": "2024-05-01T10:00:00Z" }))
}

async fn delete_access_policy(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    rec.push(format!("DELETE /api/v1/accesspolicies/{id}"), &headers, query, Value::Null).await;
    StatusCode::NO_CONTENT
}

async fn create_access_policy_token(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    rec.push("POST /api/v1/tokens".into(), &headers, query, body).await;
    (StatusCode::FORBIDDEN, Json(json!({ "message": "token quota exceeded" })))
}

async fn create_service_account(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let name = body["name"].clone();
    rec.push("POST /api/serviceaccounts".into(), &headers, HashMap::new(), body).await;
    (StatusCode::CREATED, Json(json!({ "id": 5, "name": name, "role": "Viewer", "unknownField": true })))
}

async fn create_service_account_token(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.push(format!("POST /api/serviceaccounts/{id}/tokens"), &headers, HashMap::new(), body).await;
    Json(json!({ "id": 9, "name": "vault", "key": "glsa_from_server" }))
}

async fn delete_service_account(State(rec): State<Recorder>, headers: HeaderMap, Path(id): Path<i64>) -> Json<Value> {
    rec.push(format!("DELETE /api/serviceaccounts/{id}"), &headers, HashMap::new(), Value::Null).await;
    Json(json!({ "message": "Service account deleted" }))
}

async fn create_stack_service_account_token(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Path((stack, id)): Path<(String, i64)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.push(format!("POST /api/instances/{stack}/api/serviceaccounts/{id}/tokens"), &headers, HashMap::new(), body)
        .await;
    Json(json!({ "id": 3, "name": "vault", "key": "glsa_stack" }))
}

async fn set_role_assignments(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.push(format!("PUT /api/access-control/users/{id}/roles"), &headers, HashMap::new(), body).await;
    Json(json!({ "message": "Role assignments updated" }))
}

async fn list_roles(State(rec): State<Recorder>, headers: HeaderMap) -> Json<Value> {
    rec.push("GET /api/access-control/roles".into(), &headers, HashMap::new(), Value::Null).await;
    Json(json!([
        { "uid": "", "name": "custom:empty" },
        { "uid": "uid-1", "name": "custom:reader", "permissions": [{ "action": "dashboards:read", "scope": "dashboards:*" }] }
    ]))
}

async fn create_custom_role(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut created = body.clone();
    created["uid"] = json!("uid-new");
    rec.push("POST /api/access-control/roles".into(), &headers, HashMap::new(), body).await;
    (StatusCode::CREATED, Json(created))
}

async fn delete_custom_role(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.push(format!("DELETE /api/access-control/roles/{uid}"), &headers, query, Value::Null).await;
    Json(json!({ "message": "Role deleted" }))
}

async fn home_dashboard(State(rec): State<Recorder>, headers: HeaderMap) -> Json<Value> {
    rec.push("GET /api/dashboards/home".into(), &headers, HashMap::new(), Value::Null).await;
    Json(json!({ "dashboard": { "title": "Home" }, "meta": { "slug": "home", "folderId": 0 } }))
}

async fn slow(State(_rec): State<Recorder>) -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

/// Start the fake server; returns its base URL and recorder.
async fn spawn_server(prefix: &str) -> (String, Recorder) {
    let recorder = Recorder::default();
    let api = Router::new()
        .route("/api/v1/accesspolicies", post(create_access_policy))
        .route("/api/v1/accesspolicies/:id", delete(delete_access_policy))
        .route("/api/v1/tokens", post(create_access_policy_token))
        .route("/api/serviceaccounts", post(create_service_account))
        .route("/api/serviceaccounts/:id", delete(delete_service_account))
        .route("/api/serviceaccounts/:id/tokens", post(create_service_account_token))
        .route("/api/instances/:stack/api/serviceaccounts/:id/tokens", post(create_stack_service_account_token))
        .route("/api/access-control/users/:id/roles", put(set_role_assignments))
        .route("/api/access-control/roles", get(list_roles).post(create_custom_role))
        .route("/api/access-control/roles/:uid", delete(delete_custom_role))
        .route("/api/dashboards/home", get(home_dashboard))
        .route("/slow/api/dashboards/home", get(slow))
        .with_state(recorder.clone());

    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}{prefix}"), recorder)
}

// =============================================================================
// Client Tests
// =============================================================================

#[tokio::test]
async fn test_bearer_token_and_body() {
    let (url, recorder) = spawn_server("").await;
    let client = GrafanaClient::new(&url, "T").unwrap();

    let account = client
        .create_service_account(&CreateServiceAccountInput {
            name: "vault-abc".into(),
            role: "Viewer".into(),
            is_disabled: None,
        })
        .await
        .unwrap();
    assert_eq!(account.id, 5);
    assert_eq!(account.name, "vault-abc");

    let seen = recorder.all().await;
    assert_eq!(seen[0].route, "POST /api/serviceaccounts");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer T"));
    assert_eq!(seen[0].body, json!({ "name": "vault-abc", "role": "Viewer" }));
}

#[tokio::test]
async fn test_region_query_parameter() {
    let (url, recorder) = spawn_server("").await;
    let client = GrafanaClient::new(&url, "T").unwrap();

    let policy = client
        .create_access_policy("prod-us-east-0", &CreateCloudAccessPolicyInput {
            name: "vault-abc".into(),
            display_name: "vault-abc".into(),
            scopes: vec!["metrics:read".into()],
            realms: vec![],
            conditions: None,
        })
        .await
        .unwrap();
    assert_eq!(policy.id, "ap-1");
    assert!(policy.created_at.is_some());

    client.delete_access_policy("prod-us-east-0", "ap-1").await.unwrap();

    let seen = recorder.all().await;
    assert_eq!(seen[0].query.get("region").map(String::as_str), Some("prod-us-east-0"));
    assert_eq!(seen[0].body["displayName"], "vault-abc");
    assert!(seen[0].body.get("conditions").is_none());
    assert_eq!(seen[1].route, "DELETE /api/v1/accesspolicies/ap-1");
    assert_eq!(seen[1].query.get("region").map(String::as_str), Some("prod-us-east-0"));
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let (url, _) = spawn_server("").await;
    let client = GrafanaClient::new(&url, "T").unwrap();

    let err = client
        .create_access_policy_token("us", &Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("token quota exceeded"));
}

#[tokio::test]
async fn test_path_parameters() {
    let (url, recorder) = spawn_server("").await;
    let client = GrafanaClient::new(&url, "T").unwrap();

    let token = client
        .create_cloud_service_account_token("acme", &CreateServiceAccountTokenInput {
            name: "vault-abc".into(),
            service_account_id: 12,
            seconds_to_live: Some(60),
        })
        .await
        .unwrap();
    assert_eq!(token.key, "glsa_stack");

    client
        .set_service_account_role_assignments(&ServiceAccountRoleAssignmentsInput {
            service_account_id: 12,
            global: false,
            role_uids: vec!["uid-1".into()],
            include_hidden: false,
        })
        .await
        .unwrap();
    client.delete_service_account(12).await.unwrap();

    let seen = recorder.all().await;
    assert_eq!(seen[0].route, "POST /api/instances/acme/api/serviceaccounts/12/tokens");
    assert_eq!(seen[0].body, json!({ "name": "vault-abc", "secondsToLive": 60 }));
    assert_eq!(seen[1].route, "PUT /api/access-control/users/12/roles");
    assert_eq!(seen[1].body, json!({ "global": false, "roleUids": ["uid-1"], "includeHidden": false }));
    assert_eq!(seen[2].route, "DELETE /api/serviceaccounts/12");
}

#[tokio::test]
async fn test_custom_role_create_and_force_delete() {
    let (url, recorder) = spawn_server("").await;
    let client = GrafanaClient::new(&url, "T").unwrap();

    let created = client
        .create_custom_role(&RbacRole {
            version: 1,
            name: "custom:reader".into(),
            display_name: "Reader".into(),
            permissions: vec![Permission {
                action: "dashboards:read".into(),
                scope: "dashboards:*".into(),
            }],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.uid, "uid-new");
    assert_eq!(created.name, "custom:reader");

    client.delete_custom_role("uid-new").await.unwrap();

    let seen = recorder.all().await;
    assert_eq!(seen[0].route, "POST /api/access-control/roles");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer T"));
    assert_eq!(seen[0].body["name"], "custom:reader");
    assert_eq!(seen[0].body["displayName"], "Reader");
    assert_eq!(seen[0].body["permissions"], json!([{ "action": "dashboards:read", "scope": "dashboards:*" }]));
    assert!(seen[0].body.get("uid").is_none());
    assert_eq!(seen[1].route, "DELETE /api/access-control/roles/uid-new");
    assert_eq!(seen[1].query.get("force").map(String::as_str), Some("true"));
}

#[tokio::test]
async fn test_base_url_path_prefix() {
    let (url, recorder) = spawn_server("/grafana").await;
    let client = GrafanaClient::new(&url, "T").unwrap();

    let dashboard = client.home_dashboard().await.unwrap();
    assert_eq!(dashboard.meta.slug, "home");
    assert_eq!(recorder.all().await[0].route, "GET /api/dashboards/home");
}

#[tokio::test]
async fn test_timeout_is_a_request_error() {
    let (url, _) = spawn_server("").await;
    let client = GrafanaClient::with_timeout(&format!("{url}/slow"), "T", Duration::from_millis(100)).unwrap();

    let err = client.home_dashboard().await.unwrap_err();
    assert!(matches!(err, ClientError::Request { .. }), "unexpected error: {err}");
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_connection_refused_is_a_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GrafanaClient::new(&format!("http://{addr}"), "T").unwrap();
    let err = client.list_roles().await.unwrap_err();
    assert!(matches!(err, ClientError::Request { .. }));
}

// =============================================================================
// Engine Over HTTP
// =============================================================================

#[tokio::test]
async fn test_engine_issues_and_revokes_over_http() {
    let (url, recorder) = spawn_server("").await;
    let engine = GrafanaSecretsEngine::new(Arc::new(InMemorySecretsBackend::new()));

    engine.write_config(WriteConfigRequest::create("grafana", "root-token").with_url(&url)).await.unwrap();
    engine
        .write_role(
            WriteRoleRequest::create("ops", RoleKind::ServiceAccount)
                .with_role("Viewer")
                .with_rbac_roles(vec!["custom:reader".into()]),
        )
        .await
        .unwrap();

    let credential = engine.issue_credentials("ops").await.unwrap();
    assert_eq!(credential.token, "glsa_from_server");
    assert_eq!(credential.internal.service_account_id, 5);

    engine.revoke(&credential.internal).await.unwrap();

    let routes: Vec<String> = recorder.all().await.into_iter().map(|s| s.route).collect();
    assert_eq!(routes, vec![
        "POST /api/serviceaccounts",
        "GET /api/access-control/roles",
        "PUT /api/access-control/users/5/roles",
        "POST /api/serviceaccounts/5/tokens",
        "DELETE /api/serviceaccounts/5",
    ]);
    assert!(recorder.all().await.iter().all(|s| s.authorization.as_deref() == Some("Bearer root-token")));
}

#[tokio::test]
async fn test_engine_rolls_back_over_http() {
    let (url, recorder) = spawn_server("").await;
    let engine = GrafanaSecretsEngine::new(Arc::new(InMemorySecretsBackend::new()));

    // The fake server rejects every access policy token request.
    engine.write_config(WriteConfigRequest::create("cloud", "T").with_url(&url)).await.unwrap();
    engine
        .write_role(
            WriteRoleRequest::create("metrics", RoleKind::CloudAccessPolicy)
                .with_region("us")
                .with_scopes(vec!["metrics:read".into()])
                .with_realms("[]"),
        )
        .await
        .unwrap();

    let err = engine.issue_credentials("metrics").await.unwrap_err();
    assert!(err.to_string().contains("(403)"));

    let routes: Vec<String> = recorder.all().await.into_iter().map(|s| s.route).collect();
    assert_eq!(routes, vec!["POST /api/v1/accesspolicies", "POST /api/v1/tokens", "DELETE /api/v1/accesspolicies/ap-1",]);
}
