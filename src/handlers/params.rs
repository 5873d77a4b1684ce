// src/handlers/params.rs

use serde_json::Value;
use std::collections::HashMap;

use crate::{
    common::error::{AppError, AppResult},
    db::{Filter, Sort},
};

/// Parâmetros de listagem vindos da query string:
/// `?sort=-created_at&limit=20&status=received&unit_id=...`.
/// Tudo que não é `sort` nem `limit` vira critério de igualdade.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub sort: Sort,
    pub limit: Option<usize>,
    pub criteria: Vec<Filter>,
}

impl ListParams {
    pub fn from_query(mut raw: HashMap<String, String>) -> AppResult<Self> {
        let sort = raw
            .remove("sort")
            .filter(|s| !s.trim().is_empty())
            .map(|s| Sort::parse(s.trim()))
            .unwrap_or_default();

        let limit = match raw.remove("limit") {
            Some(value) => Some(value.trim().parse::<usize>().map_err(|_| {
                AppError::Validation(format!("Parâmetro 'limit' inválido: '{}'", value))
            })?),
            None => None,
        };

        let mut criteria: Vec<Filter> = raw
            .into_iter()
            .map(|(field, value)| Filter::Eq(field, criterion_value(&value)))
            .collect();
        // Ordem estável, independente do HashMap.
        criteria.sort_by(|a, b| a.field().cmp(b.field()));

        Ok(Self { sort, limit, criteria })
    }
}

fn criterion_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sort_limit_and_criteria() {
        let raw = HashMap::from([
            ("sort".to_string(), "-received_at".to_string()),
            ("limit".to_string(), "5".to_string()),
            ("status".to_string(), "received".to_string()),
            ("active".to_string(), "true".to_string()),
        ]);
        let params = ListParams::from_query(raw).unwrap();

        assert_eq!(params.sort, Sort::parse("-received_at"));
        assert_eq!(params.limit, Some(5));
        assert_eq!(
            params.criteria,
            vec![
                Filter::Eq("active".into(), Value::Bool(true)),
                Filter::Eq("status".into(), Value::String("received".into())),
            ]
        );
    }

    #[test]
    fn rejects_bad_limit() {
        let raw = HashMap::from([("limit".to_string(), "dez".to_string())]);
        assert!(matches!(ListParams::from_query(raw), Err(AppError::Validation(_))));
    }
}
