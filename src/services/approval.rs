// src/services/approval.rs

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    adapters::ResidentAdapter,
    cache::RoleCache,
    common::error::{AppError, AppResult},
    db::{fetch_all, to_row, DataStore, Filter, Query, Sort, Table},
    models::{
        context::TenantContext,
        resident::{ResidentRecord, ResidentStatus},
        role::{Capability, Role},
        role_binding::{NewRoleBinding, RoleBinding},
    },
};

/// Fila de aprovação de moradores. Rejeitar e desligar mudam o status,
/// nunca apagam o cadastro.
#[derive(Clone)]
pub struct ApprovalService {
    residents: ResidentAdapter,
    store: Arc<dyn DataStore>,
    roles: Arc<RoleCache>,
}

impl ApprovalService {
    pub fn new(residents: ResidentAdapter, store: Arc<dyn DataStore>, roles: Arc<RoleCache>) -> Self {
        Self { residents, store, roles }
    }

    pub async fn pending_for_tenant(&self, ctx: &TenantContext) -> AppResult<Vec<ResidentRecord>> {
        ctx.require(Capability::ManageResidents)?;
        let criteria = [Filter::Eq("status".into(), json!(ResidentStatus::Pending))];
        self.residents
            .filter(ctx, &criteria, &Sort::parse("created_at"), None)
            .await
    }

    /// pendente -> aprovado. Garante o vínculo de morador no condomínio.
    pub async fn approve(&self, ctx: &TenantContext, resident_id: Uuid) -> AppResult<ResidentRecord> {
        let current = self.transition_from(ctx, resident_id, ResidentStatus::Pending).await?;
        if let Some(tenant_id) = current.tenant_id {
            self.ensure_resident_binding(current.user_id, tenant_id).await?;
        }

        let record = self
            .residents
            .set_status(ctx, resident_id, ResidentStatus::Approved)
            .await?;
        tracing::info!("✅ Morador {} aprovado por {}", record.user_id, ctx.user_id);
        Ok(record)
    }

    /// pendente -> rejeitado.
    pub async fn reject(&self, ctx: &TenantContext, resident_id: Uuid) -> AppResult<ResidentRecord> {
        self.transition_from(ctx, resident_id, ResidentStatus::Pending).await?;
        let record = self
            .residents
            .set_status(ctx, resident_id, ResidentStatus::Rejected)
            .await?;
        tracing::info!("Morador {} rejeitado por {}", record.user_id, ctx.user_id);
        Ok(record)
    }

    /// aprovado -> inativo (mudança, saída do condomínio).
    pub async fn deactivate(&self, ctx: &TenantContext, resident_id: Uuid) -> AppResult<ResidentRecord> {
        self.transition_from(ctx, resident_id, ResidentStatus::Approved).await?;
        let record = self
            .residents
            .set_status(ctx, resident_id, ResidentStatus::Inactive)
            .await?;
        tracing::info!("Morador {} desligado por {}", record.user_id, ctx.user_id);
        Ok(record)
    }

    async fn transition_from(
        &self,
        ctx: &TenantContext,
        resident_id: Uuid,
        expected: ResidentStatus,
    ) -> AppResult<ResidentRecord> {
        ctx.require(Capability::ManageResidents)?;
        let current = self
            .residents
            .get(ctx, resident_id)
            .await?
            .ok_or(AppError::NotFound("Morador"))?;

        if current.status != expected {
            return Err(AppError::Validation(format!(
                "Cadastro está '{}', esperado '{}'.",
                current.status.as_str(),
                expected.as_str()
            )));
        }
        Ok(current)
    }

    async fn ensure_resident_binding(&self, user_id: Uuid, tenant_id: Uuid) -> AppResult<()> {
        let existing: Vec<RoleBinding> = fetch_all(
            self.store.as_ref(),
            Table::RoleBindings,
            &Query::new()
                .eq("user_id", json!(user_id))
                .eq("tenant_id", json!(tenant_id))
                .eq("role", json!(Role::Resident)),
        )
        .await?;
        if existing.is_empty() {
            let binding = NewRoleBinding {
                user_id,
                tenant_id: Some(tenant_id),
                role: Role::Resident,
            };
            self.store.insert(Table::RoleBindings, to_row(&binding)?).await?;
            self.roles.invalidate(user_id);
        }
        Ok(())
    }
}
