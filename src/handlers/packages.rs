// src/handlers/packages.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::params::ListParams,
    middleware::rbac::{CanLogPackages, CanViewCommunity, RequireCapability},
    models::package::{NewPackage, PackagePatch, PackageRecord},
};

// GET /api/packages
pub async fn list_packages(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PackageRecord>>, AppError> {
    let params = ListParams::from_query(raw)?;
    let packages = app_state
        .packages()
        .filter(&ctx, &params.criteria, &params.sort, params.limit)
        .await?;
    Ok(Json(packages))
}

// GET /api/packages/{id}
pub async fn get_package(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
    Path(id): Path<Uuid>,
) -> Result<Json<PackageRecord>, AppError> {
    let package = app_state
        .packages()
        .get(&ctx, id)
        .await?
        .ok_or(AppError::NotFound("Encomenda"))?;
    Ok(Json(package))
}

// POST /api/packages
pub async fn create_package(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanLogPackages>,
    Json(payload): Json<NewPackage>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let package = app_state.packages().create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(package)))
}

// PATCH /api/packages/{id}
pub async fn update_package(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanLogPackages>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PackagePatch>,
) -> Result<Json<PackageRecord>, AppError> {
    Ok(Json(app_state.packages().update(&ctx, id, payload).await?))
}

// DELETE /api/packages/{id}
pub async fn delete_package(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanLogPackages>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.packages().delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
