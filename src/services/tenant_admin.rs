// src/services/tenant_admin.rs

use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    adapters::{scope::id_values, UnitDirectory},
    common::error::{AppError, AppResult},
    db::{fetch_all, from_row, to_row, DataStore, Query, Sort, Table},
    models::{
        context::TenantContext,
        role::Capability,
        tenancy::{Block, NewBlock, NewTenant, NewUnit, Tenant, Unit},
    },
};

/// Cadastro da estrutura: condomínios, blocos e unidades.
#[derive(Clone)]
pub struct TenantAdminService {
    store: Arc<dyn DataStore>,
    units: UnitDirectory,
}

impl TenantAdminService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            units: UnitDirectory::new(store.clone()),
            store,
        }
    }

    pub async fn create_tenant(&self, ctx: &TenantContext, payload: NewTenant) -> AppResult<Tenant> {
        ctx.require(Capability::ManageTenants)?;
        let saved = self.store.insert(Table::Tenants, to_row(&payload)?).await?;
        let tenant: Tenant = from_row(saved)?;
        tracing::info!("🏢 Condomínio '{}' criado por {}", tenant.name, ctx.user_id);
        Ok(tenant)
    }

    /// Admin global vê todos; os demais só o próprio condomínio.
    pub async fn list_tenants(&self, ctx: &TenantContext) -> AppResult<Vec<Tenant>> {
        let mut query = Query::new().order(Sort::parse("name"));
        if let Some(tenant_id) = ctx.read_scope()? {
            query = query.eq("id", json!(tenant_id));
        }
        let tenants: Vec<Tenant> = fetch_all(self.store.as_ref(), Table::Tenants, &query).await?;
        Ok(ctx.scope_filter(tenants))
    }

    pub async fn create_block(&self, ctx: &TenantContext, payload: NewBlock) -> AppResult<Block> {
        ctx.require(Capability::ManageUnits)?;
        let payload = ctx.scope_for_insert(payload)?;
        let saved = self.store.insert(Table::Blocks, to_row(&payload)?).await?;
        from_row(saved)
    }

    pub async fn list_blocks(&self, ctx: &TenantContext) -> AppResult<Vec<Block>> {
        let mut query = Query::new().order(Sort::parse("name"));
        if let Some(tenant_id) = ctx.read_scope()? {
            query = query.eq("tenant_id", json!(tenant_id));
        }
        let blocks: Vec<Block> = fetch_all(self.store.as_ref(), Table::Blocks, &query).await?;
        Ok(ctx.scope_filter(blocks))
    }

    /// O bloco precisa ser do condomínio do contexto.
    pub async fn create_unit(&self, ctx: &TenantContext, payload: NewUnit) -> AppResult<Unit> {
        ctx.require(Capability::ManageUnits)?;
        self.visible_block(ctx, payload.block_id).await?;
        let saved = self.store.insert(Table::Units, to_row(&payload)?).await?;
        from_row(saved)
    }

    /// Unidades do condomínio, opcionalmente de um único bloco.
    pub async fn list_units(&self, ctx: &TenantContext, block_id: Option<Uuid>) -> AppResult<Vec<Unit>> {
        let mut query = Query::new().order(Sort::parse("number"));

        if let Some(block_id) = block_id {
            self.visible_block(ctx, block_id).await?;
            query = query.eq("block_id", json!(block_id));
        } else if let Some(tenant_id) = ctx.read_scope()? {
            let block_ids: Vec<Uuid> = self.list_blocks(ctx).await?.iter().map(|b| b.id).collect();
            if block_ids.is_empty() {
                return Ok(Vec::new());
            }
            tracing::debug!("Listando unidades de {} blocos do condomínio {}", block_ids.len(), tenant_id);
            query = query.is_in("block_id", id_values(&block_ids));
        }

        fetch_all(self.store.as_ref(), Table::Units, &query).await
    }

    async fn visible_block(&self, ctx: &TenantContext, block_id: Uuid) -> AppResult<Block> {
        self.units
            .block(block_id)
            .await?
            .filter(|b| ctx.owns(Some(b.tenant_id)))
            .filter(|b| ctx.tenant_id.is_none_or(|t| t == b.tenant_id))
            .ok_or(AppError::NotFound("Bloco"))
    }
}
