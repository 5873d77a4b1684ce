// src/handlers/announcements.rs

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
    middleware::rbac::{CanPublishAnnouncements, CanViewCommunity, RequireCapability},
    models::announcement::{AnnouncementPatch, AnnouncementRecord, NewAnnouncement},
};

// GET /api/announcements (mural: só ativos e dentro da validade)
pub async fn list_visible(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
) -> Result<Json<Vec<AnnouncementRecord>>, AppError> {
    Ok(Json(app_state.announcements().visible(&ctx).await?))
}

// GET /api/announcements/all
pub async fn list_announcements(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanPublishAnnouncements>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Vec<AnnouncementRecord>>, AppError> {
    let params = ListParams::from_query(raw)?;
    let announcements = app_state
        .announcements()
        .filter(&ctx, &params.criteria, &params.sort, params.limit)
        .await?;
    Ok(Json(announcements))
}

// GET /api/announcements/{id}
pub async fn get_announcement(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnnouncementRecord>, AppError> {
    let announcement = app_state
        .announcements()
        .get(&ctx, id)
        .await?
        .ok_or(AppError::NotFound("Aviso"))?;
    Ok(Json(announcement))
}

// POST /api/announcements
pub async fn create_announcement(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanPublishAnnouncements>,
    Json(payload): Json<NewAnnouncement>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let announcement = app_state.announcements().create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

// PATCH /api/announcements/{id}
pub async fn update_announcement(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanPublishAnnouncements>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnnouncementPatch>,
) -> Result<Json<AnnouncementRecord>, AppError> {
    Ok(Json(app_state.announcements().update(&ctx, id, payload).await?))
}

// DELETE /api/announcements/{id}
pub async fn delete_announcement(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanPublishAnnouncements>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.announcements().delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
