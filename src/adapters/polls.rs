// src/adapters/polls.rs

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    adapters::scope::{id_values, owned, scoped_query},
    common::error::{AppError, AppResult},
    db::{fetch_all, from_row, to_row, DataStore, Filter, Query, Sort, Table},
    models::{
        context::TenantContext,
        poll::{
            NewPoll, PollInsert, PollOption, PollOptionInsert, PollPatch, PollRecord, PollRow, PollVote,
            PollVoteInsert,
        },
    },
};

/// Enquetes. Opções e votos não têm `tenant_id`: pertencem ao condomínio
/// pela enquete, então todo acesso a eles parte de uma enquete já escopada.
#[derive(Clone)]
pub struct PollAdapter {
    store: Arc<dyn DataStore>,
}

impl PollAdapter {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, ctx: &TenantContext, sort: &Sort) -> AppResult<Vec<PollRecord>> {
        self.filter(ctx, &[], sort, None).await
    }

    pub async fn filter(
        &self,
        ctx: &TenantContext,
        criteria: &[Filter],
        sort: &Sort,
        limit: Option<usize>,
    ) -> AppResult<Vec<PollRecord>> {
        let query = scoped_query(ctx, criteria, sort, limit)?;
        let rows: Vec<PollRow> = fetch_all(self.store.as_ref(), Table::Polls, &query).await?;
        Ok(ctx.scope_filter(self.assemble(ctx, rows).await?))
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> AppResult<Option<PollRecord>> {
        match owned::<PollRow>(self.store.as_ref(), Table::Polls, ctx, id, "Enquete").await {
            Ok(row) => Ok(self.assemble(ctx, vec![row]).await?.pop()),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, ctx: &TenantContext, input: NewPoll) -> AppResult<PollRecord> {
        let input = ctx.scope_for_insert(input)?;
        let tenant_id = input.tenant_id.ok_or(AppError::MissingTenant)?;

        let options: Vec<String> = input
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if options.len() < 2 {
            return Err(AppError::Validation("A enquete precisa de ao menos duas opções.".into()));
        }
        if let (Some(opens), Some(closes)) = (input.opens_at, input.closes_at) {
            if closes <= opens {
                return Err(AppError::Validation("O encerramento precisa ser depois da abertura.".into()));
            }
        }

        let insert = PollInsert {
            tenant_id,
            author_id: ctx.user_id,
            question: input.question,
            description: input.description,
            opens_at: input.opens_at,
            closes_at: input.closes_at,
        };
        let poll: PollRow = from_row(self.store.insert(Table::Polls, to_row(&insert)?).await?)?;

        for (position, text) in options.into_iter().enumerate() {
            let option = PollOptionInsert {
                poll_id: poll.id,
                text,
                position: position as i32,
            };
            self.store.insert(Table::PollOptions, to_row(&option)?).await?;
        }
        tracing::info!("Enquete {} criada", poll.id);

        self.assemble(ctx, vec![poll])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Enquete"))
    }

    pub async fn update(&self, ctx: &TenantContext, id: Uuid, patch: PollPatch) -> AppResult<PollRecord> {
        let current: PollRow = owned(self.store.as_ref(), Table::Polls, ctx, id, "Enquete").await?;

        let row = to_row(&patch)?;
        let saved = if row.is_empty() {
            current
        } else {
            from_row(self.store.update(Table::Polls, id, row).await?)?
        };

        self.assemble(ctx, vec![saved])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Enquete"))
    }

    /// Remove a enquete com suas opções e votos.
    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> AppResult<()> {
        owned::<PollRow>(self.store.as_ref(), Table::Polls, ctx, id, "Enquete").await?;

        let by_poll = Query::new().eq("poll_id", json!(id));
        let votes: Vec<PollVote> = fetch_all(self.store.as_ref(), Table::PollVotes, &by_poll).await?;
        for vote in votes {
            self.store.delete(Table::PollVotes, vote.id).await?;
        }
        let options: Vec<PollOption> = fetch_all(self.store.as_ref(), Table::PollOptions, &by_poll).await?;
        for option in options {
            self.store.delete(Table::PollOptions, option.id).await?;
        }
        self.store.delete(Table::Polls, id).await
    }

    /// Um voto por usuário por enquete, só com a enquete aberta.
    pub async fn vote(&self, ctx: &TenantContext, poll_id: Uuid, option_id: Uuid) -> AppResult<PollRecord> {
        let poll: PollRow = owned(self.store.as_ref(), Table::Polls, ctx, poll_id, "Enquete").await?;
        if !poll.is_open_at(Utc::now()) {
            return Err(AppError::Validation("Esta enquete não está aberta para votação.".into()));
        }

        let options: Vec<PollOption> = fetch_all(
            self.store.as_ref(),
            Table::PollOptions,
            &Query::new().eq("poll_id", json!(poll_id)),
        )
        .await?;
        if !options.iter().any(|o| o.id == option_id) {
            return Err(AppError::NotFound("Opção"));
        }

        let existing: Vec<PollVote> = fetch_all(
            self.store.as_ref(),
            Table::PollVotes,
            &Query::new()
                .eq("poll_id", json!(poll_id))
                .eq("user_id", json!(ctx.user_id)),
        )
        .await?;
        if !existing.is_empty() {
            return Err(AppError::Validation("Você já votou nesta enquete.".into()));
        }

        let vote = PollVoteInsert {
            poll_id,
            option_id,
            user_id: ctx.user_id,
        };
        self.store.insert(Table::PollVotes, to_row(&vote)?).await?;

        self.assemble(ctx, vec![poll])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Enquete"))
    }

    async fn assemble(&self, ctx: &TenantContext, polls: Vec<PollRow>) -> AppResult<Vec<PollRecord>> {
        if polls.is_empty() {
            return Ok(Vec::new());
        }

        let poll_ids: Vec<Uuid> = polls.iter().map(|p| p.id).collect();
        let by_polls = Query::new()
            .is_in("poll_id", id_values(&poll_ids))
            .order(Sort::parse("position"));
        let options: Vec<PollOption> = fetch_all(self.store.as_ref(), Table::PollOptions, &by_polls).await?;
        let votes: Vec<PollVote> = fetch_all(
            self.store.as_ref(),
            Table::PollVotes,
            &Query::new().is_in("poll_id", id_values(&poll_ids)),
        )
        .await?;

        let now = Utc::now();
        Ok(polls
            .into_iter()
            .map(|poll| {
                let own: Vec<PollOption> = options.iter().filter(|o| o.poll_id == poll.id).cloned().collect();
                PollRecord::assemble(poll, own, &votes, ctx.user_id, now)
            })
            .collect())
    }
}
