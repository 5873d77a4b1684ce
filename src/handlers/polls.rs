// src/handlers/polls.rs

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
    middleware::rbac::{CanManagePolls, CanViewCommunity, CanVote, RequireCapability},
    models::poll::{CastVote, NewPoll, PollPatch, PollRecord},
};

// GET /api/polls
pub async fn list_polls(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PollRecord>>, AppError> {
    let params = ListParams::from_query(raw)?;
    let polls = app_state
        .polls()
        .filter(&ctx, &params.criteria, &params.sort, params.limit)
        .await?;
    Ok(Json(polls))
}

// GET /api/polls/{id}
pub async fn get_poll(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanViewCommunity>,
    Path(id): Path<Uuid>,
) -> Result<Json<PollRecord>, AppError> {
    let poll = app_state
        .polls()
        .get(&ctx, id)
        .await?
        .ok_or(AppError::NotFound("Enquete"))?;
    Ok(Json(poll))
}

// POST /api/polls
pub async fn create_poll(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManagePolls>,
    Json(payload): Json<NewPoll>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let poll = app_state.polls().create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(poll)))
}

// PATCH /api/polls/{id}
pub async fn update_poll(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManagePolls>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PollPatch>,
) -> Result<Json<PollRecord>, AppError> {
    Ok(Json(app_state.polls().update(&ctx, id, payload).await?))
}

// DELETE /api/polls/{id}
pub async fn delete_poll(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManagePolls>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.polls().delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/polls/{id}/vote
pub async fn vote(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanVote>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CastVote>,
) -> Result<Json<PollRecord>, AppError> {
    Ok(Json(app_state.polls().vote(&ctx, id, payload.option_id).await?))
}
