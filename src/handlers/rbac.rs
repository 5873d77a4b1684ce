// src/handlers/rbac.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{CanManageRoles, RequireCapability},
    models::role_binding::{NewRoleBinding, RoleBinding},
};

// GET /api/roles
pub async fn list_bindings(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageRoles>,
) -> Result<Json<Vec<RoleBinding>>, AppError> {
    Ok(Json(app_state.role_admin().list_bindings(&ctx).await?))
}

// POST /api/roles
pub async fn assign_role(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageRoles>,
    Json(payload): Json<NewRoleBinding>,
) -> Result<impl IntoResponse, AppError> {
    let binding = app_state.role_admin().assign_role(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(binding)))
}

// DELETE /api/roles/{id}
pub async fn revoke_role(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageRoles>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.role_admin().revoke_role(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
