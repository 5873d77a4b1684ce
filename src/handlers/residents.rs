// src/handlers/residents.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::params::ListParams,
    middleware::rbac::{CanManageResidents, CanViewCommunity, RequireCapability},
    models::resident::{NewResident, ResidentPatch, ResidentRecord},
};

// GET /api/residents
pub async fn list_residents(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ResidentRecord>>, AppError> {
    let params = ListParams::from_query(raw)?;
    let residents = app_state
        .residents()
        .filter(&ctx, &params.criteria, &params.sort, params.limit)
        .await?;
    Ok(Json(residents))
}

// GET /api/residents/{id}
pub async fn get_resident(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResidentRecord>, AppError> {
    let resident = app_state
        .residents()
        .get(&ctx, id)
        .await?
        .ok_or(AppError::NotFound("Morador"))?;
    Ok(Json(resident))
}

// POST /api/residents
pub async fn create_resident(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageResidents>,
    Json(payload): Json<NewResident>,
) -> Result<impl IntoResponse, AppError> {
    let resident = app_state.residents().create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(resident)))
}

// PATCH /api/residents/{id}
pub async fn update_resident(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageResidents>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResidentPatch>,
) -> Result<Json<ResidentRecord>, AppError> {
    let resident = app_state.residents().update(&ctx, id, payload).await?;
    Ok(Json(resident))
}

// DELETE /api/residents/{id}
pub async fn delete_resident(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageResidents>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.residents().delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Fila de aprovação
// ---

// GET /api/residents/pending
pub async fn list_pending(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageResidents>,
) -> Result<Json<Vec<ResidentRecord>>, AppError> {
    Ok(Json(app_state.approvals().pending_for_tenant(&ctx).await?))
}

// POST /api/residents/{id}/approve
pub async fn approve_resident(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageResidents>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResidentRecord>, AppError> {
    Ok(Json(app_state.approvals().approve(&ctx, id).await?))
}

// POST /api/residents/{id}/reject
pub async fn reject_resident(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageResidents>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResidentRecord>, AppError> {
    Ok(Json(app_state.approvals().reject(&ctx, id).await?))
}

// POST /api/residents/{id}/deactivate
pub async fn deactivate_resident(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageResidents>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResidentRecord>, AppError> {
    Ok(Json(app_state.approvals().deactivate(&ctx, id).await?))
}
