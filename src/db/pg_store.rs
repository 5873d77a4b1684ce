// src/db/pg_store.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::{AppError, AppResult},
    db::store::{DataStore, Filter, Query, Row, Table},
};

/// `DataStore` sobre Postgres. As linhas saem como JSON (`row_to_json`) e
/// entram via `json_populate_record`, então o núcleo nunca monta SQL por
/// entidade.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Nomes de coluna vêm de critérios de filtro e das chaves das linhas.
// Só aceitamos identificadores simples.
fn column(name: &str) -> AppResult<&str> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        Ok(name)
    } else {
        Err(AppError::Validation(format!("Campo inválido: '{}'", name)))
    }
}

// Comparação feita como texto: uuid, enum, bool e número têm
// representação textual estável no Postgres.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn into_row(value: Value) -> AppResult<Row> {
    match value {
        Value::Object(row) => Ok(row),
        _ => Err(AppError::UpstreamError("linha não é um objeto JSON".into())),
    }
}

fn map_write_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") => AppError::EmailAlreadyExists,
                _ => AppError::Validation("Registro duplicado.".into()),
            };
        }
        if db_err.is_foreign_key_violation() {
            return AppError::Validation("Referência a registro inexistente.".into());
        }
    }
    e.into()
}

#[async_trait]
impl DataStore for PgStore {
    async fn select(&self, table: Table, query: &Query) -> AppResult<Vec<Row>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT row_to_json(t)::jsonb FROM {} t",
            table.as_str()
        ));

        for (i, filter) in query.filters.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            let field = column(filter.field())?;
            match filter {
                Filter::Eq(_, Value::Null) => {
                    qb.push(format!("t.{} IS NULL", field));
                }
                Filter::Eq(_, value) => {
                    qb.push(format!("t.{}::text = ", field));
                    qb.push_bind(as_text(value));
                }
                Filter::In(_, values) => {
                    qb.push(format!("t.{}::text = ANY(", field));
                    qb.push_bind(values.iter().map(as_text).collect::<Vec<_>>());
                    qb.push(")");
                }
            }
        }

        if let Some(sort) = &query.order {
            let direction = if sort.ascending { "ASC" } else { "DESC" };
            qb.push(format!(" ORDER BY t.{} {} NULLS LAST", column(&sort.field)?, direction));
        }

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit as i64);
        }

        let rows = qb
            .build_query_scalar::<Value>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(into_row).collect()
    }

    async fn insert(&self, table: Table, row: Row) -> AppResult<Row> {
        let columns = row
            .keys()
            .map(|k| column(k))
            .collect::<AppResult<Vec<_>>>()?
            .join(", ");
        let name = table.as_str();

        // Só as colunas informadas: as demais recebem o DEFAULT da tabela.
        let sql = format!(
            "INSERT INTO {name} ({columns}) \
             SELECT {columns} FROM json_populate_record(NULL::{name}, $1::json) \
             RETURNING row_to_json({name}.*)::jsonb"
        );

        let inserted = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Value::Object(row))
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        into_row(inserted)
    }

    async fn update(&self, table: Table, id: Uuid, patch: Row) -> AppResult<Row> {
        let name = table.as_str();
        let mut columns = patch
            .keys()
            .filter(|k| k.as_str() != "id")
            .map(|k| column(k).map(str::to_string))
            .collect::<AppResult<Vec<String>>>()?;

        if columns.is_empty() {
            // Nada para alterar: devolve a linha atual.
            let query = Query::new().eq("id", id.to_string());
            return self
                .select(table, &query)
                .await?
                .pop()
                .ok_or(AppError::NotFound("Registro"));
        }

        let touch = if table.tracks_updates() && !columns.iter().any(|c| c == "updated_at") {
            ", updated_at = now()"
        } else {
            ""
        };
        columns.sort_unstable();
        let columns = columns.join(", ");

        let sql = format!(
            "UPDATE {name} SET ({columns}) = \
             (SELECT {columns} FROM json_populate_record(NULL::{name}, $1::json)){touch} \
             WHERE id = $2 \
             RETURNING row_to_json({name}.*)::jsonb"
        );

        let updated = sqlx::query_scalar::<_, Value>(&sql)
            .bind(Value::Object(patch))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or(AppError::NotFound("Registro"))?;

        into_row(updated)
    }

    async fn delete(&self, table: Table, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table.as_str()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Registro"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_suspicious_column_names() {
        assert!(column("tenant_id").is_ok());
        assert!(column("tenant_id; DROP TABLE users").is_err());
        assert!(column("Tenant").is_err());
        assert!(column("").is_err());
    }
}
