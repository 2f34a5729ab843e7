//! HTTP handlers for the authorization API.
//!
//! Verification endpoints always answer 200 with `{hasAccess, message}`;
//! a denial is not an HTTP error. Administrative endpoints answer 404 for
//! unknown roles, views or permissions.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use segura_authz::{
    AccessDecision, AuditAction, AuditFilter, AuditTable, AuthorizationEngine, Permission, Role,
    View,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuthorizationEngine>,
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPermissionRequest {
    pub user_id: String,
    pub view_route: String,
    pub permission_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyViewRequest {
    pub user_id: String,
    pub view_route: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRouteRequest {
    pub user_id: String,
    pub full_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub name: String,
    pub access_level: i32,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateViewRequest {
    pub name: String,
    pub route: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Audit query string. Values are parsed explicitly so that a malformed
/// value is a 400 rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub table: Option<String>,
    pub action: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn into_filter(self) -> Result<AuditFilter, ApiError> {
        let table = self
            .table
            .map(|t| {
                AuditTable::parse(&t).ok_or_else(|| ApiError::bad_request(format!("unknown table '{t}'")))
            })
            .transpose()?;
        let action = self
            .action
            .map(|a| {
                AuditAction::parse(&a)
                    .ok_or_else(|| ApiError::bad_request(format!("unknown action '{a}'")))
            })
            .transpose()?;

        Ok(AuditFilter {
            table,
            action,
            date_from: parse_timestamp("dateFrom", self.date_from)?,
            date_to: parse_timestamp("dateTo", self.date_to)?,
            limit: self.limit,
        })
    }
}

fn parse_timestamp(field: &str, value: Option<String>) -> Result<Option<OffsetDateTime>, ApiError> {
    value
        .map(|v| {
            OffsetDateTime::parse(&v, &Rfc3339)
                .map_err(|e| ApiError::bad_request(format!("{field} must be RFC 3339: {e}")))
        })
        .transpose()
}

fn required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

// =============================================================================
// Health
// =============================================================================

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

// =============================================================================
// Verification
// =============================================================================

/// POST /authz/verify/permission
pub async fn verify_permission(
    State(state): State<AppState>,
    Json(req): Json<VerifyPermissionRequest>,
) -> Result<Json<AccessDecision>, ApiError> {
    let decision = state
        .engine
        .verify_permission(&req.user_id, &req.view_route, &req.permission_name)
        .await?;
    Ok(Json(decision))
}

/// POST /authz/verify/view
pub async fn verify_view(
    State(state): State<AppState>,
    Json(req): Json<VerifyViewRequest>,
) -> Result<Json<AccessDecision>, ApiError> {
    let decision = state
        .engine
        .verify_view(&req.user_id, &req.view_route)
        .await?;
    Ok(Json(decision))
}

/// POST /authz/verify/route
pub async fn verify_route(
    State(state): State<AppState>,
    Json(req): Json<VerifyRouteRequest>,
) -> Result<Json<AccessDecision>, ApiError> {
    let decision = state
        .engine
        .verify_route(&req.user_id, &req.full_path)
        .await?;
    Ok(Json(decision))
}

// =============================================================================
// Grants
// =============================================================================

/// POST /authz/roles/{role_id}/views/{view_id}
pub async fn assign_view(
    State(state): State<AppState>,
    Path((role_id, view_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.engine.assign_view_to_role(&role_id, &view_id).await?;
    let (status, message) = if outcome.is_inserted() {
        (StatusCode::CREATED, "Vista asignada al rol")
    } else {
        (StatusCode::OK, "La vista ya estaba asignada al rol")
    };
    Ok((status, Json(json!({ "message": message }))))
}

/// DELETE /authz/roles/{role_id}/views/{view_id}
pub async fn unassign_view(
    State(state): State<AppState>,
    Path((role_id, view_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .engine
        .unassign_view_from_role(&role_id, &view_id)
        .await?;
    Ok(Json(json!({
        "message": "Vista desasignada del rol",
        "removed": removed,
    })))
}

/// GET /authz/roles/{role_id}/views
pub async fn role_views(
    State(state): State<AppState>,
    Path(role_id): Path<String>,
) -> Result<Json<Vec<View>>, ApiError> {
    Ok(Json(state.engine.get_views_for_role(&role_id).await?))
}

/// POST /authz/roles/{role_id}/views/{view_id}/permissions/{name}
pub async fn grant_permission(
    State(state): State<AppState>,
    Path((role_id, view_id, name)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .engine
        .grant_permission(&role_id, &view_id, &name)
        .await?;
    let (status, message) = if outcome.is_inserted() {
        (StatusCode::CREATED, "Permiso asignado al rol")
    } else {
        (StatusCode::OK, "El rol ya tenía el permiso")
    };
    Ok((status, Json(json!({ "message": message }))))
}

/// GET /authz/roles/{role_id}/views/{view_id}/grants
pub async fn count_grants(
    State(state): State<AppState>,
    Path((role_id, view_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let total = state.engine.count_grants(&role_id, &view_id).await?;
    Ok(Json(json!({ "total": total })))
}

// =============================================================================
// Directory Records
// =============================================================================

/// POST /authz/roles
pub async fn create_role(
    State(state): State<AppState>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    required("name", &req.name)?;
    let mut builder = Role::builder(req.name.trim(), req.access_level);
    if let Some(description) = req.description {
        builder = builder.description(description);
    }
    let role = state.engine.create_role(builder.build()).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// DELETE /authz/roles/{role_id}
pub async fn deactivate_role(
    State(state): State<AppState>,
    Path(role_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.deactivate_role(&role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /authz/views
pub async fn create_view(
    State(state): State<AppState>,
    Json(req): Json<CreateViewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    required("name", &req.name)?;
    required("route", &req.route)?;
    let mut view = View::new(req.name.trim(), req.route.trim());
    if let Some(description) = req.description {
        view = view.with_description(description);
    }
    let view = state.engine.create_view(view).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// DELETE /authz/views/{view_id}
pub async fn deactivate_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.deactivate_view(&view_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /authz/permissions
pub async fn create_permission(
    State(state): State<AppState>,
    Json(req): Json<CreatePermissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    required("name", &req.name)?;
    let mut permission = Permission::new(req.name.trim());
    if let Some(description) = req.description {
        permission = permission.with_description(description);
    }
    let permission = state.engine.create_permission(permission).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

// =============================================================================
// Listings
// =============================================================================

/// GET /authz/roles
pub async fn list_roles(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.list_active_roles().await?))
}

/// GET /authz/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.list_active_permissions().await?))
}

/// GET /authz/views
pub async fn list_views(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.list_active_views().await?))
}

/// GET /authz/stats
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.stats().await?))
}

/// GET /authz/audit
///
/// Query parameters:
/// - `table`: `grant` or `permission`
/// - `action`: `assign`, `unassign`, `grant` or `create`
/// - `dateFrom`, `dateTo`: inclusive RFC 3339 bounds
/// - `limit`: maximum entries (default from `authz.audit.default_limit`)
pub async fn audit_log(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter()?;
    Ok(Json(state.engine.audit_log(&filter).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_query_parses_every_field() {
        let query = AuditQuery {
            table: Some("grant".into()),
            action: Some("unassign".into()),
            date_from: Some("2026-01-01T00:00:00Z".into()),
            date_to: None,
            limit: Some(5),
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.table, Some(AuditTable::Grant));
        assert_eq!(filter.action, Some(AuditAction::Unassign));
        assert!(filter.date_from.is_some());
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn audit_query_rejects_bad_values() {
        let query = AuditQuery {
            action: Some("rename".into()),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(ApiError::BadRequest(_))));

        let query = AuditQuery {
            date_to: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(ApiError::BadRequest(_))));
    }
}
