// src/services/tenant_guard.rs

use crate::{
    common::error::{AppError, AppResult},
    models::{
        access::{AccessStatus, RoleInfo},
        context::TenantContext,
        role::Role,
    },
    services::role_resolver::RoleResolver,
};

/// Converte o resultado da resolução no contexto de condomínio.
pub fn context_from(info: &RoleInfo) -> AppResult<TenantContext> {
    if !info.is_authenticated {
        return Err(AppError::Unauthenticated);
    }
    let user_id = info.user_id.ok_or(AppError::Unauthenticated)?;

    match info.effective_role {
        None => Err(AppError::NoTenantBound),
        Some(Role::GlobalAdmin) => Ok(TenantContext::global_admin(user_id)),
        Some(role) => {
            // Morador só opera depois de aprovado.
            match info.status {
                AccessStatus::Active => {}
                AccessStatus::Pending | AccessStatus::NoRole => return Err(AppError::PendingApproval),
                AccessStatus::Rejected | AccessStatus::Inactive => return Err(AppError::Forbidden),
            }
            let tenant_id = info.tenant_id.ok_or(AppError::NoTenantBound)?;
            Ok(TenantContext::scoped(user_id, tenant_id, role))
        }
    }
}

/// O contexto da sessão atual (usa o cache de papel).
pub async fn get_context(resolver: &RoleResolver) -> AppResult<TenantContext> {
    let info = resolver.resolve_role(false).await?;
    context_from(&info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn info(role: Option<Role>, tenant_id: Option<Uuid>, status: AccessStatus) -> RoleInfo {
        RoleInfo {
            effective_role: role,
            tenant_id,
            status,
            ..RoleInfo::without_role(Uuid::new_v4(), "a@b.com".into())
        }
    }

    #[test]
    fn maps_role_info_to_context() {
        let tenant = Uuid::new_v4();

        let ctx = context_from(&info(Some(Role::Gatekeeper), Some(tenant), AccessStatus::Active)).unwrap();
        assert_eq!(ctx.tenant_id, Some(tenant));
        assert!(!ctx.is_global_admin);

        let ctx = context_from(&info(Some(Role::GlobalAdmin), None, AccessStatus::Active)).unwrap();
        assert!(ctx.is_global_admin);
        assert_eq!(ctx.tenant_id, None);
    }

    #[test]
    fn refuses_incomplete_access() {
        assert!(matches!(context_from(&RoleInfo::signed_out()), Err(AppError::Unauthenticated)));
        assert!(matches!(
            context_from(&info(Some(Role::TenantAdmin), None, AccessStatus::Active)),
            Err(AppError::NoTenantBound)
        ));
        assert!(matches!(
            context_from(&info(None, None, AccessStatus::NoRole)),
            Err(AppError::NoTenantBound)
        ));
        assert!(matches!(
            context_from(&info(Some(Role::Resident), Some(Uuid::new_v4()), AccessStatus::Pending)),
            Err(AppError::PendingApproval)
        ));
        assert!(matches!(
            context_from(&info(Some(Role::Resident), Some(Uuid::new_v4()), AccessStatus::Rejected)),
            Err(AppError::Forbidden)
        ));
    }
}
