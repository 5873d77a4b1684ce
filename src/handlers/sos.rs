// src/handlers/sos.rs

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
    middleware::rbac::{CanAttendSos, CanRaiseSos, RequireCapability},
    models::sos::{NewSosAlert, SosPatch, SosRecord},
};

// GET /api/sos
pub async fn list_alerts(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanAttendSos>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Vec<SosRecord>>, AppError> {
    let params = ListParams::from_query(raw)?;
    let alerts = app_state
        .sos_alerts()
        .filter(&ctx, &params.criteria, &params.sort, params.limit)
        .await?;
    Ok(Json(alerts))
}

// GET /api/sos/{id}
pub async fn get_alert(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanAttendSos>,
    Path(id): Path<Uuid>,
) -> Result<Json<SosRecord>, AppError> {
    let alert = app_state
        .sos_alerts()
        .get(&ctx, id)
        .await?
        .ok_or(AppError::NotFound("Alerta"))?;
    Ok(Json(alert))
}

// POST /api/sos
pub async fn raise_alert(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanRaiseSos>,
    Json(payload): Json<NewSosAlert>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let alert = app_state.sos_alerts().raise(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

// PATCH /api/sos/{id}
pub async fn attend_alert(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanAttendSos>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SosPatch>,
) -> Result<Json<SosRecord>, AppError> {
    Ok(Json(app_state.sos_alerts().attend(&ctx, id, payload).await?))
}
