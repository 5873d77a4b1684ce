// src/services/role_admin.rs

use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    cache::RoleCache,
    common::error::{AppError, AppResult},
    db::{fetch_all, fetch_optional, from_row, to_row, DataStore, Query, Sort, Table},
    models::{
        context::TenantContext,
        role::{Capability, Role},
        role_binding::{NewRoleBinding, RoleBinding},
    },
};

/// Concede e revoga papéis. Toda mudança invalida o cache de papel do
/// usuário afetado antes de retornar.
#[derive(Clone)]
pub struct RoleAdminService {
    store: Arc<dyn DataStore>,
    roles: Arc<RoleCache>,
}

impl RoleAdminService {
    pub fn new(store: Arc<dyn DataStore>, roles: Arc<RoleCache>) -> Self {
        Self { store, roles }
    }

    pub async fn list_bindings(&self, ctx: &TenantContext) -> AppResult<Vec<RoleBinding>> {
        ctx.require(Capability::ManageRoles)?;
        let mut query = Query::new().order(Sort::parse("created_at"));
        if let Some(tenant_id) = ctx.read_scope()? {
            query = query.eq("tenant_id", json!(tenant_id));
        }
        let bindings: Vec<RoleBinding> =
            fetch_all(self.store.as_ref(), Table::RoleBindings, &query).await?;
        Ok(ctx.scope_filter(bindings))
    }

    pub async fn assign_role(&self, ctx: &TenantContext, input: NewRoleBinding) -> AppResult<RoleBinding> {
        ctx.require(Capability::ManageRoles)?;

        let tenant_id = if input.role.is_global() {
            // Só admin global cria outro admin global, e sem condomínio.
            if !ctx.is_global_admin {
                return Err(AppError::Forbidden);
            }
            None
        } else {
            let tenant_id = match input.tenant_id {
                Some(tenant_id) => tenant_id,
                None => ctx.tenant_id.ok_or(AppError::MissingTenant)?,
            };
            ctx.require_tenant(tenant_id)?;
            Some(tenant_id)
        };

        let tenant_value = tenant_id.map(|t| json!(t)).unwrap_or(Value::Null);
        let existing: Option<RoleBinding> = fetch_optional(
            self.store.as_ref(),
            Table::RoleBindings,
            &Query::new()
                .eq("user_id", json!(input.user_id))
                .eq("tenant_id", tenant_value)
                .eq("role", json!(input.role)),
        )
        .await?;
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let binding = NewRoleBinding {
            user_id: input.user_id,
            tenant_id,
            role: input.role,
        };
        let saved: RoleBinding =
            from_row(self.store.insert(Table::RoleBindings, to_row(&binding)?).await?)?;

        self.roles.invalidate(saved.user_id);
        tracing::info!("Papel {} concedido a {} por {}", saved.role, saved.user_id, ctx.user_id);
        Ok(saved)
    }

    pub async fn revoke_role(&self, ctx: &TenantContext, binding_id: Uuid) -> AppResult<()> {
        ctx.require(Capability::ManageRoles)?;

        let binding: RoleBinding = fetch_optional::<RoleBinding>(
            self.store.as_ref(),
            Table::RoleBindings,
            &Query::new().eq("id", json!(binding_id)),
        )
        .await?
        .filter(|b| ctx.owns(b.tenant_id))
        .ok_or(AppError::NotFound("Vínculo"))?;

        if binding.role == Role::GlobalAdmin && !ctx.is_global_admin {
            return Err(AppError::Forbidden);
        }

        self.store.delete(Table::RoleBindings, binding.id).await?;
        self.roles.invalidate(binding.user_id);
        tracing::info!("Papel {} revogado de {} por {}", binding.role, binding.user_id, ctx.user_id);
        Ok(())
    }
}
