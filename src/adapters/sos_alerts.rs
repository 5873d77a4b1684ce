// src/adapters/sos_alerts.rs

use chrono::Utc;
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    adapters::{
        profiles::ProfileDirectory,
        scope::{id_values, owned, scoped_query, unique_ids},
        units::UnitDirectory,
    },
    common::error::{AppError, AppResult},
    db::{fetch_all, from_row, to_row, DataStore, Filter, Query, Sort, Table},
    models::{
        context::TenantContext,
        profile::PersonDisplay,
        resident::{ResidentRow, ResidentStatus},
        sos::{NewSosAlert, SosInsert, SosPatch, SosRecord, SosRow, SosStatus, SosUpdate},
        tenancy::UnitPlacement,
    },
    services::dispatch::{Dispatcher, Job},
};

#[derive(Clone)]
pub struct SosAdapter {
    store: Arc<dyn DataStore>,
    units: UnitDirectory,
    profiles: Arc<ProfileDirectory>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl SosAdapter {
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

    pub async fn list(&self, ctx: &TenantContext, sort: &Sort) -> AppResult<Vec<SosRecord>> {
        self.filter(ctx, &[], sort, None).await
    }

    pub async fn filter(
        &self,
        ctx: &TenantContext,
        criteria: &[Filter],
        sort: &Sort,
        limit: Option<usize>,
    ) -> AppResult<Vec<SosRecord>> {
        let query = scoped_query(ctx, criteria, sort, limit)?;
        let rows: Vec<SosRow> = fetch_all(self.store.as_ref(), Table::SosAlerts, &query).await?;
        Ok(ctx.scope_filter(self.assemble(rows).await?))
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> AppResult<Option<SosRecord>> {
        match owned::<SosRow>(self.store.as_ref(), Table::SosAlerts, ctx, id, "Alerta").await {
            Ok(row) => Ok(self.assemble(vec![row]).await?.pop()),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// O morador abre o alerta pelo próprio cadastro aprovado no condomínio.
    pub async fn raise(&self, ctx: &TenantContext, input: NewSosAlert) -> AppResult<SosRecord> {
        let input = ctx.scope_for_insert(input)?;
        let tenant_id = input.tenant_id.ok_or(AppError::MissingTenant)?;
        let resident = self.own_resident(ctx.user_id, tenant_id).await?;

        let insert = SosInsert {
            tenant_id,
            resident_id: resident.id,
            kind: input.kind,
            description: input.description,
            location: input.location,
            status: SosStatus::Open,
            raised_at: Utc::now(),
        };
        let row: SosRow = from_row(self.store.insert(Table::SosAlerts, to_row(&insert)?).await?)?;
        self.dispatcher.dispatch(Job::SosRaised(row.id));
        tracing::warn!("🚨 SOS {:?} aberto pelo morador {}", row.kind, row.resident_id);

        self.assemble(vec![row])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Alerta"))
    }

    /// Portaria ou administração assume ou encerra o alerta.
    pub async fn attend(&self, ctx: &TenantContext, id: Uuid, patch: SosPatch) -> AppResult<SosRecord> {
        let current: SosRow = owned(self.store.as_ref(), Table::SosAlerts, ctx, id, "Alerta").await?;
        if !current.status().can_move_to(patch.status) {
            return Err(AppError::Validation(format!(
                "Não é possível mudar o alerta de {:?} para {:?}.",
                current.status(),
                patch.status
            )));
        }

        let update = SosUpdate {
            status: patch.status,
            attendant_id: ctx.user_id,
            attended_at: Utc::now(),
        };
        let row: SosRow = from_row(self.store.update(Table::SosAlerts, id, to_row(&update)?).await?)?;
        tracing::info!("SOS {} agora {:?}", row.id, row.status());

        self.assemble(vec![row])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Alerta"))
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> AppResult<()> {
        owned::<SosRow>(self.store.as_ref(), Table::SosAlerts, ctx, id, "Alerta").await?;
        self.store.delete(Table::SosAlerts, id).await
    }

    async fn own_resident(&self, user_id: Uuid, tenant_id: Uuid) -> AppResult<ResidentRow> {
        let rows: Vec<ResidentRow> = fetch_all(
            self.store.as_ref(),
            Table::Residents,
            &Query::new().eq("user_id", json!(user_id)),
        )
        .await?;
        let unit_ids: Vec<Uuid> = rows.iter().map(|r| r.unit_id).collect();
        let placements = self.units.placements(&unit_ids).await?;

        rows.into_iter()
            .filter(|r| r.status() == ResidentStatus::Approved)
            .find(|r| placements.get(&r.unit_id).is_some_and(|p| p.tenant_id() == tenant_id))
            .ok_or(AppError::Forbidden)
    }

    async fn assemble(&self, rows: Vec<SosRow>) -> AppResult<Vec<SosRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let resident_ids = unique_ids(rows.iter().map(|r| r.resident_id));
        let residents: HashMap<Uuid, ResidentRow> = fetch_all::<ResidentRow>(
            self.store.as_ref(),
            Table::Residents,
            &Query::new().is_in("id", id_values(&resident_ids)),
        )
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

        let unit_ids: Vec<Uuid> = residents.values().map(|r| r.unit_id).collect();
        let placements = self.units.placements(&unit_ids).await?;
        let profiles = self.profiles.resolve(residents.values().map(|r| r.user_id)).await;

        Ok(rows
            .into_iter()
            .map(|row| {
                let resident = residents.get(&row.resident_id);
                let person = resident
                    .map(|r| PersonDisplay::from_profile(profiles.get(&r.user_id)))
                    .unwrap_or_default();
                let address_label = resident
                    .and_then(|r| placements.get(&r.unit_id))
                    .map(UnitPlacement::address_label)
                    .unwrap_or_default();

                SosRecord {
                    status: row.status(),
                    id: row.id,
                    tenant_id: row.tenant_id,
                    resident_id: row.resident_id,
                    kind: row.kind,
                    description: row.description,
                    location: row.location,
                    attendant_id: row.attendant_id,
                    raised_at: row.raised_at.or(row.created_at),
                    attended_at: row.attended_at,
                    created_at: row.created_at,
                    resident_name: person.name,
                    resident_phone: person.phone,
                    address_label,
                }
            })
            .collect())
    }
}
