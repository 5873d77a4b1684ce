// src/adapters/units.rs

use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    adapters::scope::{id_values, unique_ids},
    common::error::{AppError, AppResult},
    db::{fetch_all, fetch_optional, DataStore, Query, Table},
    models::{
        context::TenantContext,
        tenancy::{Block, Tenant, Unit, UnitPlacement},
    },
};

/// Resolve unidade -> bloco -> condomínio em lotes. Nunca guarda nada em
/// cache: o condomínio de um morador é sempre recalculado pela cadeia.
#[derive(Clone)]
pub struct UnitDirectory {
    store: Arc<dyn DataStore>,
}

impl UnitDirectory {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Uma consulta por tabela, não importa quantas unidades.
    pub async fn placements(&self, unit_ids: &[Uuid]) -> AppResult<HashMap<Uuid, UnitPlacement>> {
        let unit_ids = unique_ids(unit_ids.iter().copied());
        if unit_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let units: Vec<Unit> = fetch_all(
            self.store.as_ref(),
            Table::Units,
            &Query::new().is_in("id", id_values(&unit_ids)),
        )
        .await?;

        let block_ids = unique_ids(units.iter().map(|u| u.block_id));
        let blocks: HashMap<Uuid, Block> = if block_ids.is_empty() {
            HashMap::new()
        } else {
            fetch_all::<Block>(
                self.store.as_ref(),
                Table::Blocks,
                &Query::new().is_in("id", id_values(&block_ids)),
            )
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect()
        };

        let tenant_ids = unique_ids(blocks.values().map(|b| b.tenant_id));
        let tenants: HashMap<Uuid, Tenant> = if tenant_ids.is_empty() {
            HashMap::new()
        } else {
            fetch_all::<Tenant>(
                self.store.as_ref(),
                Table::Tenants,
                &Query::new().is_in("id", id_values(&tenant_ids)),
            )
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect()
        };

        // Unidade sem bloco não tem condomínio: fica de fora.
        Ok(units
            .into_iter()
            .filter_map(|unit| {
                let block = blocks.get(&unit.block_id)?.clone();
                let tenant = tenants.get(&block.tenant_id).cloned();
                Some((unit.id, UnitPlacement { unit, block, tenant }))
            })
            .collect())
    }

    pub async fn placement(&self, unit_id: Uuid) -> AppResult<Option<UnitPlacement>> {
        Ok(self.placements(&[unit_id]).await?.remove(&unit_id))
    }

    /// A unidade referenciada por uma escrita precisa ser do condomínio
    /// alvo. Unidade de outro condomínio responde como inexistente.
    pub async fn require_in_tenant(&self, tenant_id: Uuid, unit_id: Uuid) -> AppResult<UnitPlacement> {
        match self.placement(unit_id).await? {
            Some(placement) if placement.tenant_id() == tenant_id => Ok(placement),
            _ => Err(AppError::NotFound("Unidade")),
        }
    }

    /// Como `require_in_tenant`, usando o contexto: admin global sem alvo
    /// aceita qualquer unidade existente.
    pub async fn require_visible(&self, ctx: &TenantContext, unit_id: Uuid) -> AppResult<UnitPlacement> {
        match self.placement(unit_id).await? {
            Some(placement) if ctx.owns(Some(placement.tenant_id())) => Ok(placement),
            _ => Err(AppError::NotFound("Unidade")),
        }
    }

    /// Todas as unidades de um condomínio (via blocos).
    pub async fn unit_ids_of_tenant(&self, tenant_id: Uuid) -> AppResult<Vec<Uuid>> {
        let blocks: Vec<Block> = fetch_all(
            self.store.as_ref(),
            Table::Blocks,
            &Query::new().eq("tenant_id", json!(tenant_id)),
        )
        .await?;
        if blocks.is_empty() {
            return Ok(Vec::new());
        }

        let block_ids: Vec<Uuid> = blocks.iter().map(|b| b.id).collect();
        let units: Vec<Unit> = fetch_all(
            self.store.as_ref(),
            Table::Units,
            &Query::new().is_in("block_id", id_values(&block_ids)),
        )
        .await?;
        Ok(units.into_iter().map(|u| u.id).collect())
    }

    pub async fn block(&self, block_id: Uuid) -> AppResult<Option<Block>> {
        fetch_optional(
            self.store.as_ref(),
            Table::Blocks,
            &Query::new().eq("id", json!(block_id)),
        )
        .await
    }
}
