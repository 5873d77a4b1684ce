// src/models/announcement.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::context::{TenantScoped, TenantStamped};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementPriority {
    #[serde(alias = "baixa")]
    Low,
    #[default]
    #[serde(alias = "normal")]
    Normal,
    #[serde(alias = "alta")]
    High,
    #[serde(alias = "urgente")]
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub priority: Option<AnnouncementPriority>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub author_id: Option<Uuid>,
    pub author_name: String,
    pub title: String,
    pub body: String,
    // Nome antigo de `body`
    pub content: String,
    pub kind: String,
    pub priority: AnnouncementPriority,
    pub active: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AnnouncementRecord {
    pub fn from_row(row: AnnouncementRow, author_name: String) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            author_id: row.author_id,
            author_name,
            title: row.title,
            content: row.body.clone(),
            body: row.body,
            kind: row.kind.unwrap_or_else(|| "geral".to_string()),
            priority: row.priority.unwrap_or_default(),
            active: row.active.unwrap_or(true),
            published_at: row.published_at.or(row.created_at),
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// Ativo e ainda dentro da validade.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|at| at > now)
    }
}

impl TenantScoped for AnnouncementRecord {
    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.tenant_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewAnnouncement {
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub priority: Option<AnnouncementPriority>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TenantStamped for NewAnnouncement {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: Uuid) {
        self.tenant_id = Some(tenant_id);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementInsert {
    pub tenant_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub kind: Option<String>,
    pub priority: AnnouncementPriority,
    pub active: bool,
    pub published_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewAnnouncement {
    pub fn into_insert(self, tenant_id: Uuid, author_id: Uuid, now: DateTime<Utc>) -> AnnouncementInsert {
        AnnouncementInsert {
            tenant_id,
            author_id,
            title: self.title,
            body: self.body.or(self.content).unwrap_or_default(),
            kind: self.kind,
            priority: self.priority.unwrap_or_default(),
            active: true,
            published_at: now,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnouncementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<AnnouncementPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AnnouncementPatch {
    /// Resolve `content` em `body`.
    pub fn normalized(mut self) -> Self {
        if self.body.is_none() {
            self.body = self.content.take();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_alias_fills_body() {
        let insert = NewAnnouncement {
            title: "Manutenção".into(),
            content: Some("Elevador parado".into()),
            ..Default::default()
        }
        .into_insert(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        assert_eq!(insert.body, "Elevador parado");

        let patch = AnnouncementPatch {
            content: Some("novo".into()),
            ..Default::default()
        }
        .normalized();
        let row = crate::db::to_row(&patch).unwrap();
        assert_eq!(row["body"], "novo");
        assert!(row.get("content").is_none());
    }
}
