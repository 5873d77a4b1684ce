// src/adapters/residents.rs

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    adapters::{
        profiles::ProfileDirectory,
        scope::id_values,
        units::UnitDirectory,
    },
    cache::RoleCache,
    common::error::{AppError, AppResult},
    db::{fetch_all, from_row, to_row, DataStore, Filter, Query, Sort, Table},
    models::{
        context::TenantContext,
        profile::PersonDisplay,
        resident::{NewResident, ResidentPatch, ResidentRecord, ResidentRow, ResidentStatus},
    },
};

/// Moradores. A tabela não tem `tenant_id`: o condomínio vem da cadeia
/// unidade -> bloco -> condomínio, resolvida em lote a cada leitura.
#[derive(Clone)]
pub struct ResidentAdapter {
    store: Arc<dyn DataStore>,
    units: UnitDirectory,
    profiles: Arc<ProfileDirectory>,
    roles: Arc<RoleCache>,
}

impl ResidentAdapter {
    pub fn new(
        store: Arc<dyn DataStore>,
        profiles: Arc<ProfileDirectory>,
        roles: Arc<RoleCache>,
    ) -> Self {
        Self {
            units: UnitDirectory::new(store.clone()),
            store,
            profiles,
            roles,
        }
    }

    pub async fn list(&self, ctx: &TenantContext, sort: &Sort) -> AppResult<Vec<ResidentRecord>> {
        self.filter(ctx, &[], sort, None).await
    }

    /// Critérios são aplicados nas colunas gravadas, exceto `tenant_id`,
    /// que só existe depois da montagem do registro.
    pub async fn filter(
        &self,
        ctx: &TenantContext,
        criteria: &[Filter],
        sort: &Sort,
        limit: Option<usize>,
    ) -> AppResult<Vec<ResidentRecord>> {
        let (tenant_criteria, column_criteria): (Vec<&Filter>, Vec<&Filter>) =
            criteria.iter().partition(|f| f.field() == "tenant_id");

        let mut query = Query::new().order(sort.clone());
        for filter in column_criteria {
            query = query.filter(filter.clone());
        }
        // Sem critério pós-montagem o limite pode ir para o banco.
        if tenant_criteria.is_empty() {
            query = query.limit(limit);
        }

        if let Some(tenant_id) = ctx.read_scope()? {
            let unit_ids = self.units.unit_ids_of_tenant(tenant_id).await?;
            if unit_ids.is_empty() {
                return Ok(Vec::new());
            }
            query = query.is_in("unit_id", id_values(&unit_ids));
        }

        let rows: Vec<ResidentRow> = fetch_all(self.store.as_ref(), Table::Residents, &query).await?;
        let records = ctx.scope_filter(self.assemble(rows).await?);

        let mut records: Vec<ResidentRecord> = records
            .into_iter()
            .filter(|r| tenant_criteria.iter().all(|f| tenant_matches(f, r.tenant_id)))
            .collect();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> AppResult<Option<ResidentRecord>> {
        let rows: Vec<ResidentRow> = fetch_all(
            self.store.as_ref(),
            Table::Residents,
            &Query::new().eq("id", json!(id)).limit(Some(1)),
        )
        .await?;
        Ok(ctx.scope_filter(self.assemble(rows).await?).pop())
    }

    /// O cadastro mais recente do usuário no condomínio do contexto.
    pub async fn get_by_user_id(&self, ctx: &TenantContext, user_id: Uuid) -> AppResult<Option<ResidentRecord>> {
        let criteria = [Filter::Eq("user_id".into(), json!(user_id))];
        Ok(self
            .filter(ctx, &criteria, &Sort::newest_first(), None)
            .await?
            .into_iter()
            .next())
    }

    pub async fn create(&self, ctx: &TenantContext, input: NewResident) -> AppResult<ResidentRecord> {
        let placement = self.units.require_visible(ctx, input.unit_id).await?;
        ctx.require_tenant(placement.tenant_id())?;

        let input = NewResident {
            status: Some(input.status.unwrap_or_default()),
            ..input
        };
        let saved = self.store.insert(Table::Residents, to_row(&input)?).await?;
        let row: ResidentRow = from_row(saved)?;

        self.roles.invalidate(row.user_id);
        tracing::info!("Morador {} cadastrado na unidade {}", row.user_id, row.unit_id);

        let person = self.profiles.person(row.user_id).await;
        Ok(ResidentRecord::assemble(row, person, Some(&placement)))
    }

    pub async fn update(&self, ctx: &TenantContext, id: Uuid, patch: ResidentPatch) -> AppResult<ResidentRecord> {
        let current = self.get(ctx, id).await?.ok_or(AppError::NotFound("Morador"))?;

        // Transferência só para unidade do mesmo condomínio.
        if let Some(unit_id) = patch.unit_id {
            let target = current.tenant_id.ok_or(AppError::NotFound("Unidade"))?;
            self.units.require_in_tenant(target, unit_id).await?;
        }

        let changes_access = patch.changes_access();
        let row = to_row(&patch)?;
        if !row.is_empty() {
            self.store.update(Table::Residents, id, row).await?;
        }

        if changes_access {
            self.roles.invalidate(current.user_id);
        }
        self.profiles.invalidate(current.user_id);

        self.get(ctx, id).await?.ok_or(AppError::NotFound("Morador"))
    }

    pub async fn set_status(&self, ctx: &TenantContext, id: Uuid, status: ResidentStatus) -> AppResult<ResidentRecord> {
        let moved_out_at = (status == ResidentStatus::Inactive).then(|| Utc::now().date_naive());
        self.update(
            ctx,
            id,
            ResidentPatch {
                status: Some(status),
                moved_out_at,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> AppResult<()> {
        let current = self.get(ctx, id).await?.ok_or(AppError::NotFound("Morador"))?;
        self.store.delete(Table::Residents, id).await?;
        self.roles.invalidate(current.user_id);
        self.profiles.invalidate(current.user_id);
        Ok(())
    }

    /// Monta os registros: unidades em lote, depois perfis em lote.
    async fn assemble(&self, rows: Vec<ResidentRow>) -> AppResult<Vec<ResidentRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let unit_ids: Vec<Uuid> = rows.iter().map(|r| r.unit_id).collect();
        let placements = self.units.placements(&unit_ids).await?;
        let profiles = self.profiles.resolve(rows.iter().map(|r| r.user_id)).await;

        Ok(rows
            .into_iter()
            .map(|row| {
                let person = PersonDisplay::from_profile(profiles.get(&row.user_id));
                let placement = placements.get(&row.unit_id);
                ResidentRecord::assemble(row, person, placement)
            })
            .collect())
    }
}

fn tenant_matches(filter: &Filter, tenant_id: Option<Uuid>) -> bool {
    let Some(tenant_id) = tenant_id else {
        return false;
    };
    let same = |v: &Value| v.as_str().and_then(|s| Uuid::parse_str(s).ok()) == Some(tenant_id);
    match filter {
        Filter::Eq(_, value) => same(value),
        Filter::In(_, values) => values.iter().any(same),
    }
}
