// src/models/sos.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::context::{TenantScoped, TenantStamped};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SosKind {
    #[serde(alias = "medica", alias = "médica")]
    Medical,
    #[serde(alias = "incendio", alias = "incêndio")]
    Fire,
    #[serde(alias = "seguranca", alias = "segurança")]
    Security,
    #[serde(alias = "invasao", alias = "invasão")]
    Intrusion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SosStatus {
    #[default]
    #[serde(alias = "aberto")]
    Open,
    #[serde(alias = "em_atendimento")]
    Acknowledged,
    #[serde(alias = "resolvido")]
    Resolved,
}

impl SosStatus {
    /// Só avança: aberto -> em atendimento -> resolvido.
    pub fn can_move_to(self, next: SosStatus) -> bool {
        matches!(
            (self, next),
            (SosStatus::Open, SosStatus::Acknowledged)
                | (SosStatus::Open, SosStatus::Resolved)
                | (SosStatus::Acknowledged, SosStatus::Resolved)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub resident_id: Uuid,
    pub kind: SosKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<SosStatus>,
    #[serde(default)]
    pub attendant_id: Option<Uuid>,
    #[serde(default)]
    pub raised_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attended_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl SosRow {
    pub fn status(&self) -> SosStatus {
        self.status.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub resident_id: Uuid,
    pub kind: SosKind,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: SosStatus,
    pub attendant_id: Option<Uuid>,
    pub raised_at: Option<DateTime<Utc>>,
    pub attended_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,

    pub resident_name: String,
    pub resident_phone: String,
    pub address_label: String,
}

impl TenantScoped for SosRecord {
    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.tenant_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSosAlert {
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    pub kind: SosKind,
    #[validate(length(max = 500, message = "Descrição muito longa."))]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl TenantStamped for NewSosAlert {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: Uuid) {
        self.tenant_id = Some(tenant_id);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SosInsert {
    pub tenant_id: Uuid,
    pub resident_id: Uuid,
    pub kind: SosKind,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: SosStatus,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SosPatch {
    pub status: SosStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SosUpdate {
    pub status: SosStatus,
    pub attendant_id: Uuid,
    pub attended_at: DateTime<Utc>,
}
