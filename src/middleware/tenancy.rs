// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::RequestAuth,
    models::context::TenantContext,
    services::tenant_guard,
};

// O cabeçalho com o condomínio alvo (admin global)
const TENANT_ID_HEADER: &str = "x-tenant-id";

fn target_tenant(parts: &Parts) -> Result<Option<Uuid>, AppError> {
    let Some(value) = parts.headers.get(TENANT_ID_HEADER) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| {
        AppError::Validation("Cabeçalho X-Tenant-ID contém caracteres inválidos.".into())
    })?;
    let tenant_id = Uuid::parse_str(value.trim()).map_err(|_| {
        AppError::Validation("Cabeçalho X-Tenant-ID inválido (não é um UUID).".into())
    })?;
    Ok(Some(tenant_id))
}

/// O contexto de condomínio da requisição. Exige o `auth_guard` antes.
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let auth = parts
            .extensions
            .get::<RequestAuth>()
            .cloned()
            .ok_or(AppError::Unauthenticated)?;

        let resolver = app_state.resolver(auth.provider);
        let ctx = tenant_guard::get_context(&resolver).await?;
        ctx.with_target(target_tenant(parts)?)
    }
}
