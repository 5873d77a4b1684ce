// src/adapters/visitors.rs

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    adapters::{
        scope::{owned, scoped_query},
        units::UnitDirectory,
    },
    common::error::{AppError, AppResult},
    db::{fetch_all, from_row, to_row, DataStore, Filter, Sort, Table},
    models::{
        context::TenantContext,
        tenancy::UnitPlacement,
        visitor::{NewVisitor, VisitorPatch, VisitorRecord, VisitorRow, VisitorStatus},
    },
};

#[derive(Clone)]
pub struct VisitorAdapter {
    store: Arc<dyn DataStore>,
    units: UnitDirectory,
}

impl VisitorAdapter {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            units: UnitDirectory::new(store.clone()),
            store,
        }
    }

    pub async fn list(&self, ctx: &TenantContext, sort: &Sort) -> AppResult<Vec<VisitorRecord>> {
        self.filter(ctx, &[], sort, None).await
    }

    /// O status não é coluna: critérios de `status` são aplicados depois
    /// da montagem.
    pub async fn filter(
        &self,
        ctx: &TenantContext,
        criteria: &[Filter],
        sort: &Sort,
        limit: Option<usize>,
    ) -> AppResult<Vec<VisitorRecord>> {
        let mut status_criteria = Vec::new();
        let mut column_criteria = Vec::new();
        for filter in criteria {
            if filter.field() == "status" {
                status_criteria.push(filter.clone());
            } else {
                column_criteria.push(stored_criterion(filter));
            }
        }

        let db_limit = if status_criteria.is_empty() { limit } else { None };
        let query = scoped_query(ctx, &column_criteria, &stored_sort(sort), db_limit)?;
        let rows: Vec<VisitorRow> = fetch_all(self.store.as_ref(), Table::Visitors, &query).await?;

        let mut records: Vec<VisitorRecord> = ctx
            .scope_filter(self.assemble(rows).await?)
            .into_iter()
            .filter(|r| status_criteria.iter().all(|f| status_matches(f, r.status)))
            .collect();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> AppResult<Option<VisitorRecord>> {
        match owned::<VisitorRow>(self.store.as_ref(), Table::Visitors, ctx, id, "Visitante").await {
            Ok(row) => Ok(self.assemble(vec![row]).await?.pop()),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, ctx: &TenantContext, input: NewVisitor) -> AppResult<VisitorRecord> {
        let input = ctx.scope_for_insert(input)?;
        let tenant_id = input.tenant_id.ok_or(AppError::MissingTenant)?;
        if let Some(unit_id) = input.unit_id {
            self.units.require_in_tenant(tenant_id, unit_id).await?;
        }

        let insert = input
            .into_insert(tenant_id, ctx.user_id)
            .ok_or_else(|| AppError::Validation("O nome do visitante é obrigatório.".into()))?;

        let saved = self.store.insert(Table::Visitors, to_row(&insert)?).await?;
        let row: VisitorRow = from_row(saved)?;
        tracing::info!("Visitante {} registrado", row.id);

        self.assemble(vec![row])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Visitante"))
    }

    pub async fn update(&self, ctx: &TenantContext, id: Uuid, patch: VisitorPatch) -> AppResult<VisitorRecord> {
        let current: VisitorRow = owned(self.store.as_ref(), Table::Visitors, ctx, id, "Visitante").await?;

        let row = patch.into_row(&current, Utc::now());
        let saved = if row.is_empty() {
            current
        } else {
            from_row(self.store.update(Table::Visitors, id, row).await?)?
        };

        self.assemble(vec![saved])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Visitante"))
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> AppResult<()> {
        owned::<VisitorRow>(self.store.as_ref(), Table::Visitors, ctx, id, "Visitante").await?;
        self.store.delete(Table::Visitors, id).await
    }

    async fn assemble(&self, rows: Vec<VisitorRow>) -> AppResult<Vec<VisitorRecord>> {
        let unit_ids: Vec<Uuid> = rows.iter().filter_map(|r| r.unit_id).collect();
        let placements = self.units.placements(&unit_ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let placement = row.unit_id.and_then(|id| placements.get(&id));
                record(row, placement)
            })
            .collect())
    }
}

fn record(row: VisitorRow, placement: Option<&UnitPlacement>) -> VisitorRecord {
    let status = row.status();
    VisitorRecord {
        id: row.id,
        tenant_id: row.tenant_id,
        unit_id: row.unit_id,
        status,
        visitor_name: row.name.clone(),
        name: row.name,
        visitor_document: row.document.clone(),
        document: row.document,
        notes: row.note.clone(),
        note: row.note,
        entered_at: row.entered_at,
        starts_at: row.entered_at.or(row.created_at),
        photo_url: row.photo_url,
        registered_by: row.registered_by,
        left_at: row.left_at,
        cancelled_at: row.cancelled_at,
        created_at: row.created_at,
        unit_number: placement.map(|p| p.unit.number.clone()).unwrap_or_default(),
        block_name: placement.map(|p| p.block.name.clone()).unwrap_or_default(),
        address_label: placement.map(UnitPlacement::address_label).unwrap_or_default(),
    }
}

fn stored_field(field: &str) -> &str {
    match field {
        "visitor_name" => "name",
        "visitor_document" => "document",
        "notes" => "note",
        "starts_at" => "entered_at",
        other => other,
    }
}

fn stored_criterion(filter: &Filter) -> Filter {
    let field = stored_field(filter.field()).to_string();
    match filter {
        Filter::Eq(_, value) => Filter::Eq(field, value.clone()),
        Filter::In(_, values) => Filter::In(field, values.clone()),
    }
}

fn stored_sort(sort: &Sort) -> Sort {
    Sort {
        field: stored_field(&sort.field).to_string(),
        ascending: sort.ascending,
    }
}

fn status_matches(filter: &Filter, status: VisitorStatus) -> bool {
    let parse = |v: &serde_json::Value| serde_json::from_value::<VisitorStatus>(v.clone()).ok();
    match filter {
        Filter::Eq(_, value) => parse(value) == Some(status),
        Filter::In(_, values) => values.iter().any(|v| parse(v) == Some(status)),
    }
}
