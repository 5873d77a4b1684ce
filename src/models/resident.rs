// src/models/resident.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    context::TenantScoped,
    profile::PersonDisplay,
    tenancy::{address_label, short_label, UnitKind, UnitPlacement},
};

/// Ciclo de aprovação de um morador. Rejeição e desligamento são mudanças
/// de status, nunca exclusão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidentStatus {
    #[default]
    #[serde(alias = "pendente")]
    Pending,
    #[serde(alias = "aprovado")]
    Approved,
    #[serde(alias = "rejeitado")]
    Rejected,
    #[serde(alias = "inativo")]
    Inactive,
}

impl ResidentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResidentStatus::Pending => "pending",
            ResidentStatus::Approved => "approved",
            ResidentStatus::Rejected => "rejected",
            ResidentStatus::Inactive => "inactive",
        }
    }
}

/// A linha de `residents` como está gravada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub unit_id: Uuid,
    #[serde(default)]
    pub status: Option<ResidentStatus>,
    #[serde(default)]
    pub is_owner: Option<bool>,
    #[serde(default)]
    pub moved_in_at: Option<NaiveDate>,
    #[serde(default)]
    pub moved_out_at: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResidentRow {
    pub fn status(&self) -> ResidentStatus {
        self.status.unwrap_or_default()
    }
}

/// O morador achatado para a aplicação: perfil, unidade, bloco e condomínio
/// em um único registro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub unit_id: Uuid,
    pub status: ResidentStatus,
    pub is_owner: bool,
    pub moved_in_at: Option<NaiveDate>,
    pub moved_out_at: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub person: PersonDisplay,

    pub unit_number: String,
    pub unit_kind: UnitKind,
    pub block_id: Option<Uuid>,
    pub block_name: String,
    pub tenant_id: Option<Uuid>,
    pub tenant_name: String,

    pub address_label: String,
    pub short_label: String,
}

impl ResidentRecord {
    pub fn assemble(
        row: ResidentRow,
        person: PersonDisplay,
        placement: Option<&UnitPlacement>,
    ) -> Self {
        let block_name = placement.map(|p| p.block.name.as_str());
        let unit_number = placement.map(|p| p.unit.number.as_str());

        Self {
            id: row.id,
            user_id: row.user_id,
            unit_id: row.unit_id,
            status: row.status(),
            is_owner: row.is_owner.unwrap_or(false),
            moved_in_at: row.moved_in_at,
            moved_out_at: row.moved_out_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            person,
            unit_number: unit_number.unwrap_or_default().to_string(),
            unit_kind: placement.and_then(|p| p.unit.kind).unwrap_or_default(),
            block_id: placement.map(|p| p.block.id),
            block_name: block_name.unwrap_or_default().to_string(),
            tenant_id: placement.map(|p| p.tenant_id()),
            tenant_name: placement
                .and_then(|p| p.tenant.as_ref())
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            address_label: address_label(block_name, unit_number),
            short_label: short_label(block_name, unit_number),
        }
    }
}

impl TenantScoped for ResidentRecord {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResident {
    pub user_id: Uuid,
    pub unit_id: Uuid,
    #[serde(default)]
    pub status: Option<ResidentStatus>,
    #[serde(default)]
    pub is_owner: Option<bool>,
    #[serde(default)]
    pub moved_in_at: Option<NaiveDate>,
    #[serde(default)]
    pub moved_out_at: Option<NaiveDate>,
}

/// Só os campos de morador que podem ser alterados.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidentPatch {
    pub unit_id: Option<Uuid>,
    pub status: Option<ResidentStatus>,
    pub is_owner: Option<bool>,
    pub moved_in_at: Option<NaiveDate>,
    pub moved_out_at: Option<NaiveDate>,
}

impl ResidentPatch {
    /// Mudanças que alteram papel ou condomínio do usuário.
    pub fn changes_access(&self) -> bool {
        self.unit_id.is_some() || self.status.is_some()
    }
}
