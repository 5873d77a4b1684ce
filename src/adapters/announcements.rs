// src/adapters/announcements.rs

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    adapters::{
        profiles::ProfileDirectory,
        scope::{owned, scoped_query},
    },
    common::error::{AppError, AppResult},
    db::{fetch_all, from_row, to_row, DataStore, Filter, Sort, Table},
    models::{
        announcement::{AnnouncementPatch, AnnouncementRecord, AnnouncementRow, NewAnnouncement},
        context::TenantContext,
        profile::PersonDisplay,
    },
};

#[derive(Clone)]
pub struct AnnouncementAdapter {
    store: Arc<dyn DataStore>,
    profiles: Arc<ProfileDirectory>,
}

impl AnnouncementAdapter {
    pub fn new(store: Arc<dyn DataStore>, profiles: Arc<ProfileDirectory>) -> Self {
        Self { store, profiles }
    }

    pub async fn list(&self, ctx: &TenantContext, sort: &Sort) -> AppResult<Vec<AnnouncementRecord>> {
        self.filter(ctx, &[], sort, None).await
    }

    pub async fn filter(
        &self,
        ctx: &TenantContext,
        criteria: &[Filter],
        sort: &Sort,
        limit: Option<usize>,
    ) -> AppResult<Vec<AnnouncementRecord>> {
        let criteria: Vec<Filter> = criteria
            .iter()
            .map(|f| match f {
                Filter::Eq(field, value) if field == "content" => Filter::Eq("body".into(), value.clone()),
                other => other.clone(),
            })
            .collect();
        let query = scoped_query(ctx, &criteria, sort, limit)?;
        let rows: Vec<AnnouncementRow> = fetch_all(self.store.as_ref(), Table::Announcements, &query).await?;
        Ok(ctx.scope_filter(self.assemble(rows).await))
    }

    /// Só os avisos ativos e dentro da validade, para o mural.
    pub async fn visible(&self, ctx: &TenantContext) -> AppResult<Vec<AnnouncementRecord>> {
        let now = Utc::now();
        Ok(self
            .list(ctx, &Sort::newest_first())
            .await?
            .into_iter()
            .filter(|a| a.is_visible_at(now))
            .collect())
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> AppResult<Option<AnnouncementRecord>> {
        match owned::<AnnouncementRow>(self.store.as_ref(), Table::Announcements, ctx, id, "Aviso").await {
            Ok(row) => Ok(self.assemble(vec![row]).await.pop()),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, ctx: &TenantContext, input: NewAnnouncement) -> AppResult<AnnouncementRecord> {
        let input = ctx.scope_for_insert(input)?;
        let tenant_id = input.tenant_id.ok_or(AppError::MissingTenant)?;

        let insert = input.into_insert(tenant_id, ctx.user_id, Utc::now());
        let saved = self.store.insert(Table::Announcements, to_row(&insert)?).await?;
        let row: AnnouncementRow = from_row(saved)?;
        tracing::info!("Aviso {} publicado", row.id);

        self.assemble(vec![row])
            .await
            .pop()
            .ok_or(AppError::NotFound("Aviso"))
    }

    pub async fn update(&self, ctx: &TenantContext, id: Uuid, patch: AnnouncementPatch) -> AppResult<AnnouncementRecord> {
        let current: AnnouncementRow =
            owned(self.store.as_ref(), Table::Announcements, ctx, id, "Aviso").await?;

        let row = to_row(&patch.normalized())?;
        let saved = if row.is_empty() {
            current
        } else {
            from_row(self.store.update(Table::Announcements, id, row).await?)?
        };

        self.assemble(vec![saved])
            .await
            .pop()
            .ok_or(AppError::NotFound("Aviso"))
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> AppResult<()> {
        owned::<AnnouncementRow>(self.store.as_ref(), Table::Announcements, ctx, id, "Aviso").await?;
        self.store.delete(Table::Announcements, id).await
    }

    async fn assemble(&self, rows: Vec<AnnouncementRow>) -> Vec<AnnouncementRecord> {
        let authors = self.profiles.resolve(rows.iter().filter_map(|r| r.author_id)).await;
        rows.into_iter()
            .map(|row| {
                let author = row.author_id.and_then(|id| authors.get(&id));
                let name = PersonDisplay::from_profile(author).name;
                AnnouncementRecord::from_row(row, name)
            })
            .collect()
    }
}
