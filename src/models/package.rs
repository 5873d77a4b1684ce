// src/models/package.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::clearable,
    models::context::{TenantScoped, TenantStamped},
};

// ---
// Status: vocabulário gravado x vocabulário exibido
// ---

/// Como o status fica gravado no banco.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    #[serde(alias = "recebida")]
    Received,
    #[serde(alias = "notificada")]
    Notified,
    #[serde(alias = "retirada")]
    PickedUp,
}

/// Como o status é exibido e recebido pela aplicação.
///
/// `received` gravado aparece como `awaiting`. O mapeamento vale nos dois
/// sentidos: escrever `awaiting` grava `received`. O vocabulário gravado
/// também é aceito na escrita.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageDisplayStatus {
    #[serde(alias = "received", alias = "aguardando", alias = "recebida")]
    Awaiting,
    #[serde(alias = "notificada")]
    Notified,
    #[serde(alias = "retirada")]
    PickedUp,
}

impl PackageDisplayStatus {
    pub const ALL: [PackageDisplayStatus; 3] = [
        PackageDisplayStatus::Awaiting,
        PackageDisplayStatus::Notified,
        PackageDisplayStatus::PickedUp,
    ];
}

// Leitura
impl From<PackageStatus> for PackageDisplayStatus {
    fn from(stored: PackageStatus) -> Self {
        match stored {
            PackageStatus::Received => PackageDisplayStatus::Awaiting,
            PackageStatus::Notified => PackageDisplayStatus::Notified,
            PackageStatus::PickedUp => PackageDisplayStatus::PickedUp,
        }
    }
}

// Escrita
impl From<PackageDisplayStatus> for PackageStatus {
    fn from(shown: PackageDisplayStatus) -> Self {
        match shown {
            PackageDisplayStatus::Awaiting => PackageStatus::Received,
            PackageDisplayStatus::Notified => PackageStatus::Notified,
            PackageDisplayStatus::PickedUp => PackageStatus::PickedUp,
        }
    }
}

/// A linha de `packages` como está gravada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    #[serde(default)]
    pub resident_id: Option<Uuid>,
    pub sender: String,
    pub kind: String,
    #[serde(default)]
    pub tracking_code: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub received_by: Option<Uuid>,
    #[serde(default)]
    pub delivered_by: Option<Uuid>,
    #[serde(default)]
    pub status: Option<PackageStatus>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub picked_up_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A encomenda para a aplicação. Os campos legados (`code`, `photo`,
/// `entered_at`, `gatekeeper_in`) repetem os canônicos para que telas
/// antigas e novas funcionem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub resident_id: Option<Uuid>,
    pub sender: String,
    pub kind: String,
    pub note: Option<String>,
    pub status: PackageDisplayStatus,

    pub tracking_code: Option<String>,
    pub code: Option<String>,

    pub photo_url: Option<String>,
    pub photo: Option<String>,

    pub received_at: Option<DateTime<Utc>>,
    pub entered_at: Option<DateTime<Utc>>,

    pub received_by: Option<Uuid>,
    pub gatekeeper_in: Option<Uuid>,

    pub delivered_by: Option<Uuid>,
    pub notified_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,

    pub resident_name: String,
    pub resident_phone: String,
    pub unit_number: String,
    pub block_name: String,
    pub address_label: String,
}

impl TenantScoped for PackageRecord {
    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.tenant_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPackage {
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    pub unit_id: Uuid,
    #[serde(default)]
    pub resident_id: Option<Uuid>,
    #[validate(length(min = 1, message = "O remetente é obrigatório."))]
    pub sender: String,
    #[validate(length(min = 1, message = "O tipo da encomenda é obrigatório."))]
    pub kind: String,
    #[serde(default)]
    pub tracking_code: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub received_by: Option<Uuid>,
    #[serde(default)]
    pub status: Option<PackageDisplayStatus>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entered_at: Option<DateTime<Utc>>,
}

impl TenantStamped for NewPackage {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: Uuid) {
        self.tenant_id = Some(tenant_id);
    }
}

/// O que de fato vai para a tabela, só com nomes canônicos.
#[derive(Debug, Clone, Serialize)]
pub struct PackageInsert {
    pub tenant_id: Uuid,
    pub unit_id: Uuid,
    pub resident_id: Option<Uuid>,
    pub sender: String,
    pub kind: String,
    pub tracking_code: Option<String>,
    pub photo_url: Option<String>,
    pub note: Option<String>,
    pub received_by: Option<Uuid>,
    pub status: PackageStatus,
    pub received_at: DateTime<Utc>,
}

impl NewPackage {
    /// Resolve os apelidos (o nome canônico vence quando os dois vêm).
    pub fn into_insert(self, tenant_id: Uuid, now: DateTime<Utc>) -> PackageInsert {
        PackageInsert {
            tenant_id,
            unit_id: self.unit_id,
            resident_id: self.resident_id,
            sender: self.sender,
            kind: self.kind,
            tracking_code: self.tracking_code.or(self.code),
            photo_url: self.photo_url.or(self.photo),
            note: self.note,
            received_by: self.received_by,
            status: self
                .status
                .map(PackageStatus::from)
                .unwrap_or(PackageStatus::Received),
            received_at: self.received_at.or(self.entered_at).unwrap_or(now),
        }
    }
}

/// Campos de texto usam `Option<Option<_>>`: ausente não muda, `null`
/// limpa a coluna.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackagePatch {
    #[serde(default)]
    pub status: Option<PackageDisplayStatus>,
    #[serde(default, deserialize_with = "clearable")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub tracking_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub code: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub photo_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub photo: Option<Option<String>>,
    #[serde(default)]
    pub notified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub picked_up_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_by: Option<Uuid>,
}

/// As colunas alteradas por um `PackagePatch`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PackageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_code: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked_up_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_by: Option<Uuid>,
}

impl PackagePatch {
    pub fn into_update(self, now: DateTime<Utc>) -> PackageUpdate {
        let status = self.status.map(PackageStatus::from);
        let notified_at = self
            .notified_at
            .or_else(|| (status == Some(PackageStatus::Notified)).then_some(now));
        let picked_up_at = self
            .picked_up_at
            .or_else(|| (status == Some(PackageStatus::PickedUp)).then_some(now));

        PackageUpdate {
            status,
            note: self.note,
            tracking_code: self.tracking_code.or(self.code),
            photo_url: self.photo_url.or(self.photo),
            notified_at,
            picked_up_at,
            delivered_by: self.delivered_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_round_trips() {
        for shown in PackageDisplayStatus::ALL {
            let stored = PackageStatus::from(shown);
            assert_eq!(PackageDisplayStatus::from(stored), shown);
        }
    }

    #[test]
    fn writes_accept_both_vocabularies() {
        let raw: PackageDisplayStatus = serde_json::from_str("\"received\"").unwrap();
        let shown: PackageDisplayStatus = serde_json::from_str("\"awaiting\"").unwrap();
        assert_eq!(raw, shown);
        assert_eq!(PackageStatus::from(raw), PackageStatus::Received);
    }

    #[test]
    fn canonical_name_wins_over_alias() {
        let input = NewPackage {
            tenant_id: None,
            unit_id: Uuid::new_v4(),
            resident_id: None,
            sender: "Loja".into(),
            kind: "caixa".into(),
            tracking_code: Some("BR123".into()),
            code: Some("OLD".into()),
            photo_url: None,
            photo: Some("foto.jpg".into()),
            note: None,
            received_by: None,
            status: None,
            received_at: None,
            entered_at: None,
        };
        let now = Utc::now();
        let insert = input.into_insert(Uuid::new_v4(), now);

        assert_eq!(insert.tracking_code.as_deref(), Some("BR123"));
        assert_eq!(insert.photo_url.as_deref(), Some("foto.jpg"));
        assert_eq!(insert.status, PackageStatus::Received);
        assert_eq!(insert.received_at, now);
    }

    #[test]
    fn picking_up_stamps_time() {
        let now = Utc::now();
        let update = PackagePatch {
            status: Some(PackageDisplayStatus::PickedUp),
            ..Default::default()
        }
        .into_update(now);
        assert_eq!(update.picked_up_at, Some(now));
        assert_eq!(update.notified_at, None);
    }

    #[test]
    fn null_clears_and_absent_keeps() {
        let patch: PackagePatch = serde_json::from_value(serde_json::json!({ "note": null, "code": "BR9" })).unwrap();
        let row = crate::db::to_patch_row(&patch.into_update(Utc::now())).unwrap();

        assert!(row["note"].is_null());
        assert_eq!(row["tracking_code"], "BR9");
        assert!(!row.contains_key("photo_url"));
    }
}
