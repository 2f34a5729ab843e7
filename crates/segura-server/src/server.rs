use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use segura_authz::AuthorizationEngine;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};
use crate::{bootstrap, config::AppConfig, middleware as app_middleware};

pub struct SeguraServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, engine: Arc<AuthorizationEngine>) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let state = AppState { engine };

    Router::new()
        .route("/healthz", get(handlers::healthz))
        // Verification
        .route("/authz/verify/permission", post(handlers::verify_permission))
        .route("/authz/verify/view", post(handlers::verify_view))
        .route("/authz/verify/route", post(handlers::verify_route))
        // Roles and grants
        .route(
            "/authz/roles",
            get(handlers::list_roles).post(handlers::create_role),
        )
        .route("/authz/roles/{role_id}", delete(handlers::deactivate_role))
        .route("/authz/roles/{role_id}/views", get(handlers::role_views))
        .route(
            "/authz/roles/{role_id}/views/{view_id}",
            post(handlers::assign_view).delete(handlers::unassign_view),
        )
        .route(
            "/authz/roles/{role_id}/views/{view_id}/grants",
            get(handlers::count_grants),
        )
        .route(
            "/authz/roles/{role_id}/views/{view_id}/permissions/{name}",
            post(handlers::grant_permission),
        )
        // Views and permissions
        .route(
            "/authz/views",
            get(handlers::list_views).post(handlers::create_view),
        )
        .route("/authz/views/{view_id}", delete(handlers::deactivate_view))
        .route(
            "/authz/permissions",
            get(handlers::list_permissions).post(handlers::create_permission),
        )
        // Reporting
        .route("/authz/stats", get(handlers::stats))
        .route("/authz/audit", get(handlers::audit_log))
        .with_state(state)
        // Middleware stack (order: request id -> compression/cors/trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    engine: Option<Arc<AuthorizationEngine>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            engine: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Serves a pre-built engine instead of one built from the storage config.
    pub fn with_engine(mut self, engine: Arc<AuthorizationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub async fn build(self) -> anyhow::Result<SeguraServer> {
        let engine = match self.engine {
            Some(engine) => engine,
            None => {
                let directory = bootstrap::build_directory(&self.config.storage).await?;
                Arc::new(AuthorizationEngine::new(
                    directory,
                    self.config.authz.clone(),
                ))
            }
        };

        if self.config.bootstrap.seed_default_roles {
            let created = bootstrap::seed_default_roles(&engine).await?;
            tracing::info!(created, "Default roles checked");
        }

        let app = build_app(&self.config, engine);
        Ok(SeguraServer {
            addr: self.addr,
            app,
        })
    }
}

impl SeguraServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use segura_authz::{AuthzConfig, Directory};
    use segura_authz_memory::InMemoryDirectory;
    use tower::ServiceExt;

    fn app() -> Router {
        let directory = Directory::from_backend(Arc::new(InMemoryDirectory::new()));
        let engine = AuthorizationEngine::new(directory, AuthzConfig::default());
        build_app(&AppConfig::default(), Arc::new(engine))
    }

    #[tokio::test]
    async fn verify_for_unknown_user_is_a_denial_not_an_error() {
        let req = Request::post("/authz/verify/view")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"userId":"ghost","viewRoute":"/leads"}"#))
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(crate::middleware::REQUEST_ID_HEADER));

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["hasAccess"], false);
        assert_eq!(json["message"], "Usuario no encontrado");
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let req = Request::post("/authz/verify/route")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"userId":"u"}"#))
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert!(res.status().is_client_error());
    }
}
