// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{context::TenantContext, role::Capability},
};

/// 1. O Trait que define uma capacidade exigida pela rota
pub trait CapabilityDef: Send + Sync + 'static {
    fn capability() -> Capability;
}

/// 2. O Extractor (Guardião): contexto do condomínio + capacidade conferida
pub struct RequireCapability<T>(pub TenantContext, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireCapability<T>
where
    T: CapabilityDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = TenantContext::from_request_parts(parts, state).await?;
        let required = T::capability();
        if !ctx.can(required) {
            tracing::debug!("Usuário {} sem a capacidade {:?}", ctx.user_id, required);
            return Err(AppError::Forbidden);
        }
        Ok(RequireCapability(ctx, PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS CAPACIDADES (TIPOS)
// ---

macro_rules! capability {
    ($name:ident, $capability:ident) => {
        pub struct $name;
        impl CapabilityDef for $name {
            fn capability() -> Capability {
                Capability::$capability
            }
        }
    };
}

capability!(CanManageTenants, ManageTenants);
capability!(CanManageRoles, ManageRoles);
capability!(CanManageResidents, ManageResidents);
capability!(CanManageUnits, ManageUnits);
capability!(CanLogPackages, LogPackages);
capability!(CanLogVisitors, LogVisitors);
capability!(CanPublishAnnouncements, PublishAnnouncements);
capability!(CanManagePolls, ManagePolls);
capability!(CanAttendSos, AttendSos);
capability!(CanRaiseSos, RaiseSos);
capability!(CanVote, Vote);
capability!(CanViewCommunity, ViewCommunity);
