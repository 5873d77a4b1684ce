// src/db/memory_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

use crate::{
    common::error::{AppError, AppResult},
    db::store::{DataStore, Filter, Query, Row, Table},
};

#[derive(Default)]
struct Inner {
    tables: HashMap<Table, Vec<Row>>,
    selects: HashMap<Table, usize>,
    writes: usize,
    failing: HashSet<Table>,
}

/// Implementação em memória do `DataStore`, para desenvolvimento local
/// (sem `DATABASE_URL`) e para os testes. Conta as consultas por tabela.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Insere linhas prontas, sem passar pelas regras de `insert`.
    pub fn seed(&self, table: Table, rows: impl IntoIterator<Item = Value>) {
        let mut inner = self.lock();
        let entries = inner.tables.entry(table).or_default();
        for row in rows {
            if let Value::Object(row) = row {
                entries.push(row);
            }
        }
    }

    /// Quantos `select` foram feitos na tabela.
    pub fn select_count(&self, table: Table) -> usize {
        self.lock().selects.get(&table).copied().unwrap_or(0)
    }

    pub fn total_selects(&self) -> usize {
        self.lock().selects.values().sum()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Faz toda operação na tabela falhar com `UpstreamError`.
    pub fn fail_table(&self, table: Table) {
        self.lock().failing.insert(table);
    }

    pub fn heal_table(&self, table: Table) {
        self.lock().failing.remove(&table);
    }

    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.lock().tables.get(&table).cloned().unwrap_or_default()
    }

    fn check_failure(inner: &Inner, table: Table) -> AppResult<()> {
        if inner.failing.contains(&table) {
            return Err(AppError::UpstreamError(format!(
                "tabela {} indisponível",
                table.as_str()
            )));
        }
        Ok(())
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(field, Value::Null) => row.get(field).is_none_or(Value::is_null),
        Filter::Eq(field, expected) => row.get(field).is_some_and(|v| same_value(v, expected)),
        Filter::In(field, values) => row
            .get(field)
            .is_some_and(|v| values.iter().any(|expected| same_value(v, expected))),
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        // UUIDs podem chegar com maiúsculas de clientes antigos
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        _ => a == b,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        // Nulos por último, como `NULLS LAST`
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => {
            // Datas RFC 3339 com frações de tamanho variável não ordenam como texto.
            match (
                DateTime::parse_from_rfc3339(a),
                DateTime::parse_from_rfc3339(b),
            ) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, table: Table, query: &Query) -> AppResult<Vec<Row>> {
        let mut inner = self.lock();
        *inner.selects.entry(table).or_default() += 1;
        Self::check_failure(&inner, table)?;

        let mut rows: Vec<Row> = inner
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(&sort.field), b.get(&sort.field));
                if sort.ascending { ordering } else { ordering.reverse() }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn insert(&self, table: Table, mut row: Row) -> AppResult<Row> {
        let mut inner = self.lock();
        Self::check_failure(&inner, table)?;
        inner.writes += 1;

        let now = json!(Utc::now());
        if row.get("id").is_none_or(Value::is_null) {
            row.insert("id".into(), json!(Uuid::new_v4()));
        }
        if row.get("created_at").is_none_or(Value::is_null) {
            row.insert("created_at".into(), now.clone());
        }
        if table.tracks_updates() {
            row.insert("updated_at".into(), now);
        }

        inner.tables.entry(table).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, id: Uuid, patch: Row) -> AppResult<Row> {
        let mut inner = self.lock();
        Self::check_failure(&inner, table)?;
        inner.writes += 1;

        let id = json!(id);
        let row = inner
            .tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| r.get("id").is_some_and(|v| same_value(v, &id))))
            .ok_or(AppError::NotFound("Registro"))?;

        for (key, value) in patch {
            row.insert(key, value);
        }
        if table.tracks_updates() {
            row.insert("updated_at".into(), json!(Utc::now()));
        }

        Ok(row.clone())
    }

    async fn delete(&self, table: Table, id: Uuid) -> AppResult<()> {
        let mut inner = self.lock();
        Self::check_failure(&inner, table)?;
        inner.writes += 1;

        let id = json!(id);
        let rows = inner.tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| !r.get("id").is_some_and(|v| same_value(v, &id)));

        if rows.len() == before {
            return Err(AppError::NotFound("Registro"));
        }
        Ok(())
    }
}
