// src/adapters/packages.rs

use chrono::Utc;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    adapters::{
        profiles::ProfileDirectory,
        scope::{id_values, owned, scoped_query, unique_ids},
        units::UnitDirectory,
    },
    common::error::{AppError, AppResult},
    db::{fetch_all, fetch_optional, from_row, to_patch_row, to_row, DataStore, Filter, Query, Sort, Table},
    models::{
        context::TenantContext,
        package::{NewPackage, PackageDisplayStatus, PackagePatch, PackageRecord, PackageRow, PackageStatus},
        profile::PersonDisplay,
        resident::ResidentRow,
        tenancy::UnitPlacement,
    },
    services::dispatch::{Dispatcher, Job},
};

#[derive(Clone)]
pub struct PackageAdapter {
    store: Arc<dyn DataStore>,
    units: UnitDirectory,
    profiles: Arc<ProfileDirectory>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl PackageAdapter {
    pub fn new(
        store: Arc<dyn DataStore>,
        profiles: Arc<ProfileDirectory>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            units: UnitDirectory::new(store.clone()),
            store,
            profiles,
            dispatcher,
        }
    }

    pub async fn list(&self, ctx: &TenantContext, sort: &Sort) -> AppResult<Vec<PackageRecord>> {
        self.filter(ctx, &[], sort, None).await
    }

    pub async fn filter(
        &self,
        ctx: &TenantContext,
        criteria: &[Filter],
        sort: &Sort,
        limit: Option<usize>,
    ) -> AppResult<Vec<PackageRecord>> {
        let criteria: Vec<Filter> = criteria.iter().map(stored_criterion).collect();
        let query = scoped_query(ctx, &criteria, &stored_sort(sort), limit)?;
        let rows: Vec<PackageRow> = fetch_all(self.store.as_ref(), Table::Packages, &query).await?;
        Ok(ctx.scope_filter(self.assemble(rows).await?))
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> AppResult<Option<PackageRecord>> {
        match owned::<PackageRow>(self.store.as_ref(), Table::Packages, ctx, id, "Encomenda").await {
            Ok(row) => Ok(self.assemble(vec![row]).await?.pop()),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Registra a chegada e dispara o aviso ao morador.
    pub async fn create(&self, ctx: &TenantContext, input: NewPackage) -> AppResult<PackageRecord> {
        let input = ctx.scope_for_insert(input)?;
        let tenant_id = input.tenant_id.ok_or(AppError::MissingTenant)?;
        self.units.require_in_tenant(tenant_id, input.unit_id).await?;
        if let Some(resident_id) = input.resident_id {
            self.require_resident_of_unit(resident_id, input.unit_id).await?;
        }

        let mut insert = input.into_insert(tenant_id, Utc::now());
        insert.received_by.get_or_insert(ctx.user_id);

        let saved = self.store.insert(Table::Packages, to_row(&insert)?).await?;
        let row: PackageRow = from_row(saved)?;
        self.dispatcher.dispatch(Job::PackageArrived(row.id));
        tracing::info!("Encomenda {} registrada para a unidade {}", row.id, row.unit_id);

        self.assemble(vec![row])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Encomenda"))
    }

    pub async fn update(&self, ctx: &TenantContext, id: Uuid, patch: PackagePatch) -> AppResult<PackageRecord> {
        owned::<PackageRow>(self.store.as_ref(), Table::Packages, ctx, id, "Encomenda").await?;

        let mut update = patch.into_update(Utc::now());
        if update.status == Some(PackageStatus::PickedUp) {
            update.delivered_by.get_or_insert(ctx.user_id);
        }

        let saved = self.store.update(Table::Packages, id, to_patch_row(&update)?).await?;
        let row: PackageRow = from_row(saved)?;
        self.assemble(vec![row])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Encomenda"))
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> AppResult<()> {
        owned::<PackageRow>(self.store.as_ref(), Table::Packages, ctx, id, "Encomenda").await?;
        self.store.delete(Table::Packages, id).await
    }

    /// O destinatário precisa morar na unidade da encomenda. Morador de
    /// outra unidade (ou de outro condomínio) responde como inexistente.
    async fn require_resident_of_unit(&self, resident_id: Uuid, unit_id: Uuid) -> AppResult<ResidentRow> {
        let resident: Option<ResidentRow> = fetch_optional(
            self.store.as_ref(),
            Table::Residents,
            &Query::new().eq("id", json!(resident_id)),
        )
        .await?;
        resident
            .filter(|r| r.unit_id == unit_id)
            .ok_or(AppError::NotFound("Morador"))
    }

    async fn assemble(&self, rows: Vec<PackageRow>) -> AppResult<Vec<PackageRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let resident_ids = unique_ids(rows.iter().filter_map(|r| r.resident_id));
        let residents: HashMap<Uuid, ResidentRow> = if resident_ids.is_empty() {
            HashMap::new()
        } else {
            fetch_all::<ResidentRow>(
                self.store.as_ref(),
                Table::Residents,
                &Query::new().is_in("id", id_values(&resident_ids)),
            )
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect()
        };

        let unit_ids: Vec<Uuid> = rows
            .iter()
            .map(|r| r.unit_id)
            .chain(residents.values().map(|r| r.unit_id))
            .collect();
        let placements = self.units.placements(&unit_ids).await?;

        // Morador só aparece na encomenda do próprio condomínio.
        let residents: HashMap<Uuid, ResidentRow> = residents
            .into_iter()
            .filter(|(_, r)| {
                let tenant = placements.get(&r.unit_id).map(UnitPlacement::tenant_id);
                rows.iter()
                    .any(|row| row.resident_id == Some(r.id) && Some(row.tenant_id) == tenant)
            })
            .collect();
        let profiles = self.profiles.resolve(residents.values().map(|r| r.user_id)).await;

        Ok(rows
            .into_iter()
            .map(|row| {
                let person = row
                    .resident_id
                    .and_then(|id| residents.get(&id))
                    .filter(|r| {
                        placements.get(&r.unit_id).map(UnitPlacement::tenant_id) == Some(row.tenant_id)
                    })
                    .map(|r| PersonDisplay::from_profile(profiles.get(&r.user_id)))
                    .unwrap_or_default();
                let placement = placements.get(&row.unit_id);
                record(row, person, placement)
            })
            .collect())
    }
}

fn record(row: PackageRow, person: PersonDisplay, placement: Option<&UnitPlacement>) -> PackageRecord {
    let status = PackageDisplayStatus::from(row.status.unwrap_or(PackageStatus::Received));
    let received_at = row.received_at.or(row.created_at);

    PackageRecord {
        id: row.id,
        tenant_id: row.tenant_id,
        unit_id: row.unit_id,
        resident_id: row.resident_id,
        sender: row.sender,
        kind: row.kind,
        note: row.note,
        status,
        code: row.tracking_code.clone(),
        tracking_code: row.tracking_code,
        photo: row.photo_url.clone(),
        photo_url: row.photo_url,
        received_at,
        entered_at: received_at,
        received_by: row.received_by,
        gatekeeper_in: row.received_by,
        delivered_by: row.delivered_by,
        notified_at: row.notified_at,
        picked_up_at: row.picked_up_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        resident_name: person.name,
        resident_phone: person.phone,
        unit_number: placement.map(|p| p.unit.number.clone()).unwrap_or_default(),
        block_name: placement.map(|p| p.block.name.clone()).unwrap_or_default(),
        address_label: placement.map(UnitPlacement::address_label).unwrap_or_default(),
    }
}

/// Nome da coluna gravada para um nome de campo legado.
fn stored_field(field: &str) -> &str {
    match field {
        "code" => "tracking_code",
        "photo" => "photo_url",
        "entered_at" => "received_at",
        "gatekeeper_in" => "received_by",
        other => other,
    }
}

fn stored_status(value: &Value) -> Value {
    match serde_json::from_value::<PackageDisplayStatus>(value.clone()) {
        Ok(shown) => json!(PackageStatus::from(shown)),
        Err(_) => value.clone(),
    }
}

/// Critério em nomes e valores gravados (`awaiting` -> `received`).
fn stored_criterion(filter: &Filter) -> Filter {
    let field = stored_field(filter.field()).to_string();
    let is_status = field == "status";
    let map = |v: &Value| if is_status { stored_status(v) } else { v.clone() };
    match filter {
        Filter::Eq(_, value) => Filter::Eq(field, map(value)),
        Filter::In(_, values) => Filter::In(field, values.iter().map(map).collect()),
    }
}

fn stored_sort(sort: &Sort) -> Sort {
    Sort {
        field: stored_field(&sort.field).to_string(),
        ascending: sort.ascending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_use_stored_vocabulary() {
        let filter = Filter::Eq("status".into(), json!("awaiting"));
        assert_eq!(stored_criterion(&filter), Filter::Eq("status".into(), json!("received")));

        let filter = Filter::In("code".into(), vec![json!("BR1")]);
        assert_eq!(stored_criterion(&filter), Filter::In("tracking_code".into(), vec![json!("BR1")]));
    }
}
