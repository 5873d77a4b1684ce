// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::context::{TenantScoped, TenantStamped};

// ---
// 1. Tenant (O "Condomínio")
// ---
// A raiz do isolamento: todo outro registro pertence a exatamente um.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

// ---
// 2. Block (O "Bloco")
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    #[default]
    #[serde(alias = "apartamento")]
    Apartment,
    #[serde(alias = "casa")]
    House,
    #[serde(alias = "sala")]
    Office,
    #[serde(alias = "loja")]
    Store,
}

// ---
// 3. Unit (A "Unidade")
// ---
// Unit -> Block -> Tenant é o caminho canônico de posse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub block_id: Uuid,
    pub number: String,
    #[serde(default)]
    pub kind: Option<UnitKind>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Uma unidade com o bloco e o condomínio já resolvidos.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitPlacement {
    pub unit: Unit,
    pub block: Block,
    pub tenant: Option<Tenant>,
}

impl UnitPlacement {
    pub fn tenant_id(&self) -> Uuid {
        self.block.tenant_id
    }

    /// "Bloco A - 101"
    pub fn address_label(&self) -> String {
        address_label(Some(&self.block.name), Some(&self.unit.number))
    }

    /// "Bloco A 101"
    pub fn short_label(&self) -> String {
        short_label(Some(&self.block.name), Some(&self.unit.number))
    }
}

pub fn address_label(block: Option<&str>, unit: Option<&str>) -> String {
    format!("{} - {}", block.unwrap_or(""), unit.unwrap_or(""))
        .trim()
        .to_string()
}

pub fn short_label(block: Option<&str>, unit: Option<&str>) -> String {
    format!("{} {}", block.unwrap_or(""), unit.unwrap_or(""))
        .trim()
        .to_string()
}

// ---
// Payloads administrativos
// ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewTenant {
    #[validate(length(min = 1, message = "O nome do condomínio é obrigatório."))]
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewBlock {
    // Preenchido pelo guardião de contexto
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[validate(length(min = 1, message = "O nome do bloco é obrigatório."))]
    pub name: String,
}

impl TenantStamped for NewBlock {
    fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: Uuid) {
        self.tenant_id = Some(tenant_id);
    }
}

impl TenantScoped for Block {
    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.tenant_id)
    }
}

impl TenantScoped for Tenant {
    fn tenant_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUnit {
    pub block_id: Uuid,
    #[validate(length(min = 1, message = "O número da unidade é obrigatório."))]
    pub number: String,
    #[serde(default)]
    pub kind: Option<UnitKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_trim_missing_parts() {
        assert_eq!(address_label(Some("Bloco A"), Some("101")), "Bloco A - 101");
        assert_eq!(address_label(None, None), "-");
        assert_eq!(short_label(Some("Bloco A"), None), "Bloco A");
    }
}
