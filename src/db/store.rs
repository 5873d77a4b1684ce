// src/db/store.rs

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::common::error::{AppError, AppResult};

/// Uma linha persistida, como objeto JSON (coluna -> valor).
pub type Row = Map<String, Value>;

/// As tabelas que o núcleo conhece. Nomes de tabela nunca vêm do cliente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Tenants,
    Blocks,
    Units,
    Profiles,
    RoleBindings,
    Residents,
    Packages,
    Visitors,
    Announcements,
    Polls,
    PollOptions,
    PollVotes,
    SosAlerts,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Tenants => "tenants",
            Table::Blocks => "blocks",
            Table::Units => "units",
            Table::Profiles => "profiles",
            Table::RoleBindings => "role_bindings",
            Table::Residents => "residents",
            Table::Packages => "packages",
            Table::Visitors => "visitors",
            Table::Announcements => "announcements",
            Table::Polls => "polls",
            Table::PollOptions => "poll_options",
            Table::PollVotes => "poll_votes",
            Table::SosAlerts => "sos_alerts",
        }
    }

    /// Tabelas com coluna `updated_at`, atualizada a cada `update`.
    pub fn tracks_updates(self) -> bool {
        matches!(
            self,
            Table::Users
                | Table::Tenants
                | Table::Profiles
                | Table::Residents
                | Table::Packages
                | Table::Announcements
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Filter::Eq(field, _) | Filter::In(field, _) => field,
        }
    }
}

/// Ordenação no formato legado `"-created_at"` (hífen = decrescente).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub ascending: bool,
}

impl Sort {
    pub fn parse(raw: &str) -> Self {
        let ascending = !raw.starts_with('-');
        let field = raw.trim_start_matches('-');
        // Nome antigo do campo de criação
        let field = if field == "created_date" { "created_at" } else { field };
        Self {
            field: field.to_string(),
            ascending,
        }
    }

    pub fn newest_first() -> Self {
        Self::parse("-created_at")
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::newest_first()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Sort>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    pub fn is_in<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(Filter::In(field.to_string(), values));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, sort: Sort) -> Self {
        self.order = Some(sort);
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// A capacidade genérica de consulta de que o núcleo depende.
/// Nenhuma API de produto específico vaza daqui para cima.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Seleção com filtros, ordenação e limite.
    async fn select(&self, table: Table, query: &Query) -> AppResult<Vec<Row>>;

    /// Insere e devolve a linha gravada (com `id` e datas preenchidos).
    async fn insert(&self, table: Table, row: Row) -> AppResult<Row>;

    /// Atualiza pelo `id` e devolve a linha resultante.
    async fn update(&self, table: Table, id: Uuid, patch: Row) -> AppResult<Row>;

    async fn delete(&self, table: Table, id: Uuid) -> AppResult<()>;
}

// ---
// Helpers tipados sobre o DataStore
// ---

pub async fn fetch_all<T: DeserializeOwned>(
    store: &dyn DataStore,
    table: Table,
    query: &Query,
) -> AppResult<Vec<T>> {
    store
        .select(table, query)
        .await?
        .into_iter()
        .map(from_row)
        .collect()
}

pub async fn fetch_optional<T: DeserializeOwned>(
    store: &dyn DataStore,
    table: Table,
    query: &Query,
) -> AppResult<Option<T>> {
    let query = query.clone().limit(Some(1));
    let mut rows = store.select(table, &query).await?;
    match rows.pop() {
        Some(row) => Ok(Some(from_row(row)?)),
        None => Ok(None),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> AppResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Serializa um struct em linha. Campos `None` são omitidos para que o
/// banco aplique os valores padrão das colunas.
pub fn to_row<T: Serialize>(value: &T) -> AppResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        _ => Err(AppError::Validation("registro precisa ser um objeto".into())),
    }
}

/// Serializa uma alteração. Diferente de `to_row`, mantém os `null`
/// explícitos: a coluna é limpa. Campos que não mudam devem ser pulados
/// na serialização (`skip_serializing_if`).
pub fn to_patch_row<T: Serialize>(value: &T) -> AppResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Validation("registro precisa ser um objeto".into())),
    }
}

/// Para campos `Option<Option<T>>` de alterações, com `#[serde(default)]`:
/// ausente fica `None` (não muda), `null` vira `Some(None)` (limpa).
pub fn clearable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_parsing_understands_prefix_and_legacy_name() {
        assert_eq!(
            Sort::parse("-created_date"),
            Sort { field: "created_at".into(), ascending: false }
        );
        assert_eq!(
            Sort::parse("sender"),
            Sort { field: "sender".into(), ascending: true }
        );
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        #[derive(Serialize, Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
            note: Option<Option<String>>,
            #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
            code: Option<Option<String>>,
        }

        let patch: Patch = serde_json::from_value(serde_json::json!({ "note": null })).unwrap();
        assert_eq!(patch.note, Some(None));
        assert_eq!(patch.code, None);

        let row = to_patch_row(&patch).unwrap();
        assert_eq!(row.len(), 1);
        assert!(row["note"].is_null());
    }

    #[test]
    fn to_row_drops_nulls() {
        #[derive(Serialize)]
        struct Input {
            a: Option<i32>,
            b: Option<i32>,
        }
        let row = to_row(&Input { a: Some(1), b: None }).unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row["a"], 1);
    }
}
