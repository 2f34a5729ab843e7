//! End-to-end tests for the HTTP API over the in-memory directory.
//!
//! Each test binds the router to an ephemeral port and talks to it with
//! reqwest.

use std::sync::Arc;

use segura_authz::{AuthzConfig, User};
use segura_authz_memory::{InMemoryDirectory, create_engine};
use segura_server::build_app;
use segura_server::config::AppConfig;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    backend: Arc<InMemoryDirectory>,
    client: reqwest::Client,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request")
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let res = self.client.get(self.url(path)).send().await.expect("request");
        let status = res.status().as_u16();
        (status, res.json().await.expect("json body"))
    }
}

async fn start_server(authz: AuthzConfig) -> TestServer {
    let config = AppConfig {
        authz: authz.clone(),
        ..Default::default()
    };
    let (backend, engine) = create_engine(authz);
    let app = build_app(&config, Arc::new(engine));

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        backend,
        client: reqwest::Client::new(),
        shutdown: tx,
        handle,
    }
}

/// Creates a role and a view over HTTP and binds a user to the role.
async fn seed(server: &TestServer) -> (String, String) {
    let res = server
        .post("/authz/roles", json!({"name": "Vendedor", "accessLevel": 3}))
        .await;
    assert_eq!(res.status().as_u16(), 201);
    let role: Value = res.json().await.unwrap();
    let role_id = role["id"].as_str().unwrap().to_string();

    let res = server
        .post("/authz/views", json!({"name": "Leads", "route": "/leads"}))
        .await;
    assert_eq!(res.status().as_u16(), 201);
    let view: Value = res.json().await.unwrap();
    let view_id = view["id"].as_str().unwrap().to_string();

    server
        .backend
        .upsert_user(User::new("u-1", "ana").with_role(&role_id));
    (role_id, view_id)
}

#[tokio::test]
async fn healthz_reports_ok_and_echoes_request_id() {
    let server = start_server(AuthzConfig::default()).await;

    let res = server
        .client
        .get(server.url("/healthz"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(
        res.headers().get("x-request-id").unwrap().to_str().unwrap(),
        "req-123"
    );
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    server.stop().await;
}

#[tokio::test]
async fn assign_verify_and_unassign_flow() {
    let server = start_server(AuthzConfig::default()).await;
    let (role_id, view_id) = seed(&server).await;

    // Denied before any grant
    let res = server
        .post(
            "/authz/verify/view",
            json!({"userId": "u-1", "viewRoute": "/leads"}),
        )
        .await;
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"hasAccess": false, "message": "Acceso a la vista denegado"}));

    // Assign creates the grant once
    let assign_path = format!("/authz/roles/{role_id}/views/{view_id}");
    let res = server.post(&assign_path, json!({})).await;
    assert_eq!(res.status().as_u16(), 201);
    let res = server.post(&assign_path, json!({})).await;
    assert_eq!(res.status().as_u16(), 200);

    let (_, grants) = server
        .get_json(&format!("{assign_path}/grants"))
        .await;
    assert_eq!(grants["total"], 1);

    let res = server
        .post(
            "/authz/verify/permission",
            json!({"userId": "u-1", "viewRoute": "/leads", "permissionName": "acceso"}),
        )
        .await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["hasAccess"], true);
    assert_eq!(body["message"], "Permiso concedido");

    let res = server
        .post(
            "/authz/verify/route",
            json!({"userId": "u-1", "fullPath": "/leads/42/editar"}),
        )
        .await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["hasAccess"], true);

    let (status, views) = server
        .get_json(&format!("/authz/roles/{role_id}/views"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(views.as_array().unwrap().len(), 1);
    assert_eq!(views[0]["route"], "/leads");

    // Unassign revokes
    let res = server
        .client
        .delete(server.url(&assign_path))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["removed"], 1);

    let res = server
        .post(
            "/authz/verify/view",
            json!({"userId": "u-1", "viewRoute": "/leads"}),
        )
        .await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["hasAccess"], false);

    server.stop().await;
}

#[tokio::test]
async fn unknown_route_without_fallback_is_reported() {
    let mut authz = AuthzConfig::default();
    authz.resolver.generic_fallback = false;
    let server = start_server(authz).await;
    seed(&server).await;

    let res = server
        .post(
            "/authz/verify/route",
            json!({"userId": "u-1", "fullPath": "/no-existe"}),
        )
        .await;
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"hasAccess": false, "message": "Ruta no encontrada"}));

    server.stop().await;
}

#[tokio::test]
async fn admin_operations_report_missing_records() {
    let server = start_server(AuthzConfig::default()).await;
    let (role_id, _) = seed(&server).await;

    let res = server
        .post(&format!("/authz/roles/{role_id}/views/missing"), json!({}))
        .await;
    assert_eq!(res.status().as_u16(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not-found");

    let res = server
        .client
        .delete(server.url("/authz/roles/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    let (status, _) = server.get_json("/authz/roles/missing/views").await;
    assert_eq!(status, 404);

    // A role with no assignments has an empty list
    let (status, views) = server
        .get_json(&format!("/authz/roles/{role_id}/views"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(views, json!([]));

    server.stop().await;
}

#[tokio::test]
async fn duplicate_names_conflict() {
    let server = start_server(AuthzConfig::default()).await;
    seed(&server).await;

    let res = server
        .post("/authz/roles", json!({"name": "Vendedor", "accessLevel": 1}))
        .await;
    assert_eq!(res.status().as_u16(), 409);

    let res = server.post("/authz/views", json!({"name": "", "route": "/x"})).await;
    assert_eq!(res.status().as_u16(), 400);

    server.stop().await;
}

#[tokio::test]
async fn listings_stats_and_audit() {
    let server = start_server(AuthzConfig::default()).await;
    let (role_id, view_id) = seed(&server).await;
    server
        .post(&format!("/authz/roles/{role_id}/views/{view_id}"), json!({}))
        .await;

    let (_, roles) = server.get_json("/authz/roles").await;
    assert_eq!(roles["total"], 1);
    let (_, permissions) = server.get_json("/authz/permissions").await;
    assert_eq!(permissions["items"][0]["name"], "acceso");

    let (_, stats) = server.get_json("/authz/stats").await;
    assert_eq!(stats["activeViews"], 1);
    assert_eq!(stats["activePermissions"], 1);
    assert_eq!(stats["activeRoles"], 1);
    assert_eq!(stats["totalGrants"], 1);

    let (status, audit) = server.get_json("/authz/audit?table=grant&action=assign").await;
    assert_eq!(status, 200);
    assert_eq!(audit["total"], 1);

    let (status, _) = server.get_json("/authz/audit?dateFrom=ayer").await;
    assert_eq!(status, 400);

    // Deactivated views disappear from listings
    let res = server
        .client
        .delete(server.url(&format!("/authz/views/{view_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 204);
    let (_, views) = server.get_json("/authz/views").await;
    assert_eq!(views["total"], 0);

    server.stop().await;
}
