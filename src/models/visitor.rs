// src/models/visitor.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    db::Row,
    models::context::{TenantScoped, TenantStamped},
};

/// Status exibido de um visitante. Não é gravado: deriva das datas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorStatus {
    #[serde(alias = "agendado")]
    Scheduled,
    #[serde(alias = "entrou")]
    Entered,
    #[serde(alias = "saiu")]
    Left,
    #[serde(alias = "cancelado")]
    Cancelled,
}

impl VisitorStatus {
    pub const ALL: [VisitorStatus; 4] = [
        VisitorStatus::Scheduled,
        VisitorStatus::Entered,
        VisitorStatus::Left,
        VisitorStatus::Cancelled,
    ];

    /// Cancelamento vence saída, que vence entrada.
    pub fn derive(
        entered_at: Option<DateTime<Utc>>,
        left_at: Option<DateTime<Utc>>,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Self {
        if cancelled_at.is_some() {
            VisitorStatus::Cancelled
        } else if left_at.is_some() {
            VisitorStatus::Left
        } else if entered_at.is_some() {
            VisitorStatus::Entered
        } else {
            VisitorStatus::Scheduled
        }
    }

    /// As colunas que, lidas de volta, produzem exatamente este status.
    /// Datas já gravadas são mantidas quando continuam coerentes.
    pub fn columns(self, current: &VisitorRow, now: DateTime<Utc>) -> Row {
        let mut row = Row::new();
        let keep_or_now = |at: Option<DateTime<Utc>>| json!(at.unwrap_or(now));

        match self {
            VisitorStatus::Scheduled => {
                row.insert("entered_at".into(), Value::Null);
                row.insert("left_at".into(), Value::Null);
                row.insert("cancelled_at".into(), Value::Null);
            }
            VisitorStatus::Entered => {
                row.insert("entered_at".into(), keep_or_now(current.entered_at));
                row.insert("left_at".into(), Value::Null);
                row.insert("cancelled_at".into(), Value::Null);
            }
            VisitorStatus::Left => {
                row.insert("entered_at".into(), keep_or_now(current.entered_at));
                row.insert("left_at".into(), keep_or_now(current.left_at));
                row.insert("cancelled_at".into(), Value::Null);
            }
            VisitorStatus::Cancelled => {
                row.insert("cancelled_at".into(), keep_or_now(current.cancelled_at));
            }
        }
        row
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub registered_by: Option<Uuid>,
    #[serde(default)]
    pub entered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub left_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl VisitorRow {
    pub fn status(&self) -> VisitorStatus {
        VisitorStatus::derive(self.entered_at, self.left_at, self.cancelled_at)
    }
}

/// O visitante para a aplicação, com os nomes antigos repetidos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub status: VisitorStatus,

    pub name: String,
    pub visitor_name: String,

    pub document: Option<String>,
    pub visitor_document: Option<String>,

    pub note: Option<String>,
    pub notes: Option<String>,

    pub entered_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,

    pub photo_url: Option<String>,
    pub registered_by: Option<Uuid>,
    pub left_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,

    pub unit_number: String,
    pub block_name: String,
    pub address_label: String,
}

impl TenantScoped for VisitorRecord {
    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.tenant_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVisitor {
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub visitor_name: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub visitor_document: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub entered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub left_at: Option<DateTime<Utc>>,
}

impl TenantStamped for NewVisitor {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: Uuid) {
        self.tenant_id = Some(tenant_id);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VisitorInsert {
    pub tenant_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub name: String,
    pub document: Option<String>,
    pub note: Option<String>,
    pub photo_url: Option<String>,
    pub registered_by: Uuid,
    pub entered_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
}

impl NewVisitor {
    pub fn into_insert(self, tenant_id: Uuid, registered_by: Uuid) -> Option<VisitorInsert> {
        let name = self
            .name
            .or(self.visitor_name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())?;

        Some(VisitorInsert {
            tenant_id,
            unit_id: self.unit_id,
            name,
            document: self.document.or(self.visitor_document),
            note: self.note.or(self.notes),
            photo_url: self.photo_url,
            registered_by,
            entered_at: self.entered_at.or(self.starts_at),
            left_at: self.left_at,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitorPatch {
    #[serde(default)]
    pub status: Option<VisitorStatus>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub visitor_name: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub visitor_document: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub entered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub left_at: Option<DateTime<Utc>>,
}

impl VisitorPatch {
    /// Monta as colunas a gravar. Datas explícitas entram primeiro e o
    /// status, quando vem, decide o estado final das três colunas de data.
    pub fn into_row(self, current: &VisitorRow, now: DateTime<Utc>) -> Row {
        let mut row = Row::new();
        if let Some(name) = self.name.or(self.visitor_name) {
            row.insert("name".into(), json!(name));
        }
        if let Some(document) = self.document.or(self.visitor_document) {
            row.insert("document".into(), json!(document));
        }
        if let Some(note) = self.note.or(self.notes) {
            row.insert("note".into(), json!(note));
        }

        let mut dated = current.clone();
        if let Some(at) = self.entered_at.or(self.starts_at) {
            dated.entered_at = Some(at);
            row.insert("entered_at".into(), json!(at));
        }
        if let Some(at) = self.left_at {
            dated.left_at = Some(at);
            row.insert("left_at".into(), json!(at));
        }

        if let Some(status) = self.status {
            row.extend(status.columns(&dated, now));
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::from_row;

    fn visitor() -> VisitorRow {
        VisitorRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            unit_id: None,
            name: "Maria".into(),
            document: None,
            note: None,
            photo_url: None,
            registered_by: None,
            entered_at: None,
            left_at: None,
            cancelled_at: None,
            created_at: None,
        }
    }

    #[test]
    fn written_status_reads_back() {
        let now = Utc::now();
        for status in VisitorStatus::ALL {
            for start in [VisitorStatus::Scheduled, VisitorStatus::Left, VisitorStatus::Cancelled] {
                let mut current = serde_json::to_value(visitor()).unwrap();
                let seeded = start.columns(&visitor(), now);
                for (k, v) in seeded {
                    current[k] = v;
                }
                let current: VisitorRow = serde_json::from_value(current).unwrap();

                let mut written = serde_json::to_value(&current).unwrap();
                for (k, v) in status.columns(&current, now) {
                    written[k] = v;
                }
                let Value::Object(row) = written else { unreachable!() };
                let read: VisitorRow = from_row(row).unwrap();
                assert_eq!(read.status(), status, "{start:?} -> {status:?}");
            }
        }
    }

    #[test]
    fn alias_fields_are_accepted() {
        let input = NewVisitor {
            visitor_name: Some(" João ".into()),
            notes: Some("entrega".into()),
            ..Default::default()
        };
        let insert = input.into_insert(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        assert_eq!(insert.name, "João");
        assert_eq!(insert.note.as_deref(), Some("entrega"));
    }

    #[test]
    fn name_is_required() {
        assert!(NewVisitor::default().into_insert(Uuid::new_v4(), Uuid::new_v4()).is_none());
    }
}
