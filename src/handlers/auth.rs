// src/handlers/auth.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::CurrentSession,
        rbac::{CanManageResidents, RequireCapability},
    },
    models::{
        access::RoleInfo,
        auth::{
            AuthResponse, ResetPasswordPayload, SignInPayload, SignUpOutcome, SignUpPayload,
            UpdatePasswordPayload,
        },
    },
};

// POST /api/auth/register
pub async fn sign_up(
    State(app_state): State<AppState>,
    Json(payload): Json<SignUpPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let session = app_state.auth_session(app_state.auth.unbound());
    let outcome = session.sign_up(payload).await?;

    let status = match outcome {
        SignUpOutcome::SignedIn { .. } => StatusCode::CREATED,
        SignUpOutcome::ConfirmationPending { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(outcome)))
}

// POST /api/auth/login
pub async fn sign_in(
    State(app_state): State<AppState>,
    Json(payload): Json<SignInPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let session = app_state.auth_session(app_state.auth.unbound());
    let response = session.sign_in(&payload.email, &payload.password).await?;
    Ok(Json(response))
}

// POST /api/auth/reset-password
// Sempre 202: não revela se o e-mail existe.
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let session = app_state.auth_session(app_state.auth.unbound());
    session.reset_password(&payload.email).await?;
    Ok(StatusCode::ACCEPTED)
}

// POST /api/users/me/logout
pub async fn sign_out(
    State(app_state): State<AppState>,
    CurrentSession(auth): CurrentSession,
) -> Result<impl IntoResponse, AppError> {
    app_state.auth_session(auth.provider).sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/users/me
// Papel, condomínio e situação da sessão (é o que o frontend usa para
// escolher o painel).
pub async fn get_me(
    State(app_state): State<AppState>,
    CurrentSession(auth): CurrentSession,
) -> Result<impl IntoResponse, AppError> {
    let access: RoleInfo = app_state.auth_session(auth.provider).current_access().await;
    let dashboard = access.dashboard().map(|d| d.path());
    Ok(Json(json!({ "access": access, "dashboard": dashboard })))
}

// GET /api/users/me/refresh
pub async fn refresh_me(
    State(app_state): State<AppState>,
    CurrentSession(auth): CurrentSession,
) -> Result<Json<RoleInfo>, AppError> {
    let access = app_state.resolver(auth.provider).resolve_role(true).await?;
    Ok(Json(access))
}

// PUT /api/users/me/password
pub async fn update_password(
    State(app_state): State<AppState>,
    CurrentSession(auth): CurrentSession,
    Json(payload): Json<UpdatePasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    app_state
        .auth_session(auth.provider)
        .update_password(&payload.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/residents/users/{user_id}/confirm
// Confirmação manual de e-mail pela administração.
pub async fn confirm_user(
    State(app_state): State<AppState>,
    RequireCapability(ctx, _): RequireCapability<CanManageResidents>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Só usuários com cadastro no condomínio do contexto.
    app_state
        .residents()
        .get_by_user_id(&ctx, user_id)
        .await?
        .ok_or(AppError::NotFound("Morador"))?;

    app_state.auth.confirm_user(user_id).await?;
    tracing::info!("E-mail de {} confirmado por {}", user_id, ctx.user_id);
    Ok(StatusCode::NO_CONTENT)
}
