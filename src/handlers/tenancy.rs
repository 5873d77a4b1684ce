// src/handlers/tenancy.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{CanManageTenants, CanManageUnits, RequireCapability},
    models::{
        context::TenantContext,
        tenancy::{Block, NewBlock, NewTenant, NewUnit, Tenant, Unit},
    },
};

// POST /api/tenants
pub async fn create_tenant(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageTenants>,
    Json(payload): Json<NewTenant>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let tenant = app_state.tenant_admin().create_tenant(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

// GET /api/tenants
pub async fn list_tenants(
    State(app_state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<Vec<Tenant>>, AppError> {
    Ok(Json(app_state.tenant_admin().list_tenants(&ctx).await?))
}

// POST /api/tenants/blocks
pub async fn create_block(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageUnits>,
    Json(payload): Json<NewBlock>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let block = app_state.tenant_admin().create_block(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

// GET /api/tenants/blocks
pub async fn list_blocks(
    State(app_state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<Vec<Block>>, AppError> {
    Ok(Json(app_state.tenant_admin().list_blocks(&ctx).await?))
}

// POST /api/tenants/units
pub async fn create_unit(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageUnits>,
    Json(payload): Json<NewUnit>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let unit = app_state.tenant_admin().create_unit(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

#[derive(Debug, Deserialize)]
pub struct UnitFilter {
    pub block_id: Option<Uuid>,
}

// GET /api/tenants/units?block_id=...
pub async fn list_units(
    State(app_state): State<AppState>,
    ctx: TenantContext,
    Query(filter): Query<UnitFilter>,
) -> Result<Json<Vec<Unit>>, AppError> {
    Ok(Json(app_state.tenant_admin().list_units(&ctx, filter.block_id).await?))
}
