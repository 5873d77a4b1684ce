// src/handlers/visitors.rs

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
    middleware::rbac::{CanLogVisitors, CanViewCommunity, RequireCapability},
    models::visitor::{NewVisitor, VisitorPatch, VisitorRecord},
};

// GET /api/visitors
pub async fn list_visitors(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Vec<VisitorRecord>>, AppError> {
    let params = ListParams::from_query(raw)?;
    let visitors = app_state
        .visitors()
        .filter(&ctx, &params.criteria, &params.sort, params.limit)
        .await?;
    Ok(Json(visitors))
}

// GET /api/visitors/{id}
pub async fn get_visitor(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitorRecord>, AppError> {
    let visitor = app_state
        .visitors()
        .get(&ctx, id)
        .await?
        .ok_or(AppError::NotFound("Visitante"))?;
    Ok(Json(visitor))
}

// POST /api/visitors
pub async fn create_visitor(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanLogVisitors>,
    Json(payload): Json<NewVisitor>,
) -> Result<impl IntoResponse, AppError> {
    let visitor = app_state.visitors().create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(visitor)))
}

// PATCH /api/visitors/{id}
pub async fn update_visitor(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanLogVisitors>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VisitorPatch>,
) -> Result<Json<VisitorRecord>, AppError> {
    Ok(Json(app_state.visitors().update(&ctx, id, payload).await?))
}

// DELETE /api/visitors/{id}
pub async fn delete_visitor(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanLogVisitors>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.visitors().delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
