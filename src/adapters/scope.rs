// src/adapters/scope.rs

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    common::error::{AppError, AppResult},
    db::{from_row, DataStore, Filter, Query, Sort, Table},
    models::context::TenantContext,
};

/// Consulta com os critérios do chamador mais o filtro de condomínio do
/// contexto. Todo adaptador com coluna `tenant_id` passa por aqui.
pub fn scoped_query(
    ctx: &TenantContext,
    criteria: &[Filter],
    sort: &Sort,
    limit: Option<usize>,
) -> AppResult<Query> {
    let mut query = Query::new().order(sort.clone()).limit(limit);
    for filter in criteria {
        query = query.filter(filter.clone());
    }
    if let Some(tenant_id) = ctx.read_scope()? {
        query = query.eq("tenant_id", json!(tenant_id));
    }
    Ok(query)
}

/// Busca pelo id dentro do condomínio do contexto. "Não existe" e "é de
/// outro condomínio" dão o mesmo `NotFound`.
pub async fn owned<T: DeserializeOwned>(
    store: &dyn DataStore,
    table: Table,
    ctx: &TenantContext,
    id: Uuid,
    what: &'static str,
) -> AppResult<T> {
    let query = scoped_query(ctx, &[Filter::Eq("id".into(), json!(id))], &Sort::default(), Some(1))?;
    let rows = store.select(table, &query).await?;
    let row = ctx
        .scope_filter_rows(rows, "tenant_id")
        .pop()
        .ok_or(AppError::NotFound(what))?;
    from_row(row)
}

/// Ids únicos, na ordem em que apareceram.
pub fn unique_ids<I: IntoIterator<Item = Uuid>>(ids: I) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

pub fn id_values(ids: &[Uuid]) -> Vec<Value> {
    ids.iter().map(|id| json!(id)).collect()
}
