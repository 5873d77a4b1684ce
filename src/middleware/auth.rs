// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::Session,
    services::{auth_provider::AuthProvider, password_auth::PasswordAuth},
};

/// O que o guardião deixa nas extensões da requisição: o provedor ligado
/// ao token dela e a sessão já validada.
#[derive(Clone)]
pub struct RequestAuth {
    pub provider: PasswordAuth,
    pub session: Session,
}

// O middleware em si
pub async fn auth_guard(
    State(app_state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::Unauthenticated)?;
    let provider = app_state.auth.bind_token(bearer.token());
    let session = provider
        .get_session()
        .await?
        .ok_or(AppError::Unauthenticated)?;

    request
        .extensions_mut()
        .insert(RequestAuth { provider, session });
    Ok(next.run(request).await)
}

// Extrator para obter a sessão autenticada diretamente nos handlers
pub struct CurrentSession(pub RequestAuth);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestAuth>()
            .cloned()
            .map(CurrentSession)
            .ok_or(AppError::Unauthenticated)
    }
}
